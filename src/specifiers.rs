//! # Specifier and exclusion analysis
//!
//! Helpers that pick apart a comma-joined specifier string for the
//! validator and the constraints checker. Real version arithmetic is
//! delegated to `pep440_rs`; this module only classifies clauses
//! (exclusions vs. bounds) and answers containment questions.

use std::collections::BTreeSet;
use std::str::FromStr;

use pep440_rs::{Operator, Version, VersionSpecifiers};

use crate::error::{Error, Result};

/// Iterate the non-empty, trimmed clauses of a specifier string.
pub fn clauses(specifiers: &str) -> impl Iterator<Item = &str> {
    specifiers.split(',').map(str::trim).filter(|c| !c.is_empty())
}

/// The exclusion clauses of a specifier string: anything using `!=` or
/// `<`, denoting a known-bad or disallowed version/range.
pub fn exclusions(specifiers: &str) -> BTreeSet<String> {
    clauses(specifiers)
        .filter(|c| c.contains("!=") || c.contains('<'))
        .map(str::to_string)
        .collect()
}

/// True if the specifier string declares some lower bound (`>` or `>=`).
pub fn has_lower_bound(specifiers: &str) -> bool {
    clauses(specifiers).any(|c| c.contains('>'))
}

/// Parse a version string, mapping the error into our error type.
pub fn parse_version(value: &str) -> Result<Version> {
    Version::from_str(value).map_err(|e| Error::Version {
        value: value.to_string(),
        message: e.to_string(),
    })
}

/// Parse a specifier set, mapping the error into our error type.
pub fn parse_specifiers(value: &str) -> Result<VersionSpecifiers> {
    VersionSpecifiers::from_str(value).map_err(|e| Error::Specifier {
        value: value.to_string(),
        message: e.to_string(),
    })
}

/// True if `version` satisfies the whole specifier set.
///
/// Pre-releases are allowed by policy (though discouraged), so the check
/// is pure range arithmetic.
pub fn contains_version(specifiers: &str, version: &str) -> Result<bool> {
    let specs = parse_specifiers(specifiers)?;
    let version = parse_version(version)?;
    Ok(specs.contains(&version))
}

/// The version attached to a `>=`, `==` or `===` clause, depending on
/// what kind of entry this is (requirement vs. pin). Used to align lower
/// constraints and to merge constraint sets.
pub fn lower_bound_version(specifiers: &str) -> Result<Option<Version>> {
    let specs = parse_specifiers(specifiers)?;
    for spec in specs.iter() {
        if matches!(
            spec.operator(),
            Operator::GreaterThanEqual | Operator::Equal | Operator::ExactEqual
        ) {
            return Ok(Some(spec.version().clone()));
        }
    }
    Ok(None)
}
