//! Property-based tests for the requirement-line grammar.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::requirement::{canonical_name, parse_line, to_reqs};
    use proptest::prelude::*;

    // ============================================================================
    // canonical_name property tests
    // ============================================================================

    proptest! {
        /// Property: canonical_name is idempotent
        #[test]
        fn canonical_name_is_idempotent(name in "[A-Za-z0-9][A-Za-z0-9._-]{0,30}") {
            let once = canonical_name(&name);
            prop_assert_eq!(canonical_name(&once), once);
        }

        /// Property: canonical names never contain separator runs or
        /// uppercase letters
        #[test]
        fn canonical_name_is_normalized(name in "[A-Za-z0-9][A-Za-z0-9._-]{0,30}") {
            let result = canonical_name(&name);
            prop_assert!(!result.contains('_'));
            prop_assert!(!result.contains('.'));
            prop_assert!(!result.contains("--"));
            prop_assert_eq!(result.to_lowercase(), result);
        }

        /// Property: spelling variants of the same name collapse to one key
        #[test]
        fn canonical_name_collapses_separators(stem in "[a-z0-9]{1,10}", tail in "[a-z0-9]{1,10}") {
            let dotted = format!("{}.{}", stem, tail);
            let dashed = format!("{}-{}", stem, tail);
            let scored = format!("{}_{}", stem, tail);
            prop_assert_eq!(canonical_name(&dotted), canonical_name(&dashed));
            prop_assert_eq!(canonical_name(&scored), canonical_name(&dashed));
        }
    }

    // ============================================================================
    // parse_line / to_line property tests
    // ============================================================================

    proptest! {
        /// Property: a plain name-and-specifier line survives a
        /// parse/serialize round trip
        #[test]
        fn simple_line_round_trips(
            name in "[A-Za-z0-9][A-Za-z0-9._-]{0,20}",
            major in 0u32..100,
            minor in 0u32..100,
        ) {
            let line = format!("{}>={}.{}", name, major, minor);
            let req = parse_line(&line, false).unwrap();
            prop_assert_eq!(req.to_line(";", "", " ", false), format!("{}\n", line));
        }

        /// Property: parsing is deterministic
        #[test]
        fn parse_line_is_deterministic(line in "[A-Za-z0-9][A-Za-z0-9._<>=!,-]{0,30}") {
            let first = parse_line(&line, false);
            let second = parse_line(&line, false);
            prop_assert_eq!(first.is_ok(), second.is_ok());
            if let (Ok(a), Ok(b)) = (first, second) {
                prop_assert_eq!(a, b);
            }
        }

        /// Property: the parsed package name canonicalizes to the same key
        /// as the raw name
        #[test]
        fn parsed_name_keeps_canonical_key(
            name in "[A-Za-z0-9][A-Za-z0-9._-]{0,20}",
        ) {
            let line = format!("{}>=1.0", name);
            let req = parse_line(&line, false).unwrap();
            prop_assert_eq!(req.canonical(), canonical_name(&name));
        }

        /// Property: a trailing comment is split off the specifiers
        #[test]
        fn comment_is_separated(
            name in "[A-Za-z][A-Za-z0-9]{0,10}",
            note in "[a-zA-Z0-9 ]{0,15}",
        ) {
            let line = format!("{}>=1.0  # {}", name, note.trim());
            let req = parse_line(&line, false).unwrap();
            prop_assert_eq!(req.specifiers, ">=1.0");
            prop_assert!(req.comment.starts_with('#'));
        }
    }

    // ============================================================================
    // to_reqs property tests
    // ============================================================================

    proptest! {
        /// Property: every input line yields exactly one sequence entry,
        /// and the stored raw lines reassemble the input
        #[test]
        fn sequence_preserves_lines(
            names in prop::collection::vec("[A-Za-z][A-Za-z0-9]{0,10}", 0..8),
        ) {
            let content: String = names
                .iter()
                .map(|n| format!("{}>=1.0\n", n))
                .collect();
            let sequence = to_reqs(&content, false).unwrap();
            prop_assert_eq!(sequence.len(), names.len());
            let reassembled: String = sequence.iter().map(|(_, line)| line.as_str()).collect();
            prop_assert_eq!(reassembled, content);
        }
    }
}
