//! # Requirement-line grammar
//!
//! This module turns one raw line of a requirements file into a structured
//! [`Requirement`] record, groups parsed lines into a store keyed by
//! canonical package name, and serializes records back to file content.
//!
//! The grammar is a subset of pip requirements files:
//!
//! ```text
//! [ "-e" SP ] ( URL "#egg=" NAME | NAME [ "[" EXTRA ("," EXTRA)* "]" ] [ SPECIFIERS ] )
//!     [ (";"|":") MARKERS ] [ "#" COMMENT ]
//! ```
//!
//! URL entries and pip options like `-f` are not permitted in the global
//! list. When encountered in a synchronised file they are illegal but
//! preserved as-is (pass-through lines). URL entries carrying an
//! `#egg=<name>` fragment can be parsed when `permit_urls` is enabled.
//!
//! This module has no I/O at all, and none should be added.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::LazyLock;

use pep440_rs::VersionSpecifiers;
use regex::Regex;

use crate::error::{Error, Result};

/// The boilerplate header emitted at the top of synchronised files.
///
/// Order is significant to pip, so the header warns against reordering.
pub const REQS_HEADER: [&str; 3] = [
    "# The order of packages is significant, because pip processes them in the order\n",
    "# of appearance. Changing the order has an impact on the overall integration\n",
    "# process, which may cause wedges in the gate later.\n",
];

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[\s*([^\]]*)\])?\s*(.*?)\s*$")
        .expect("static regex")
});

static CANONICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("static regex"));

/// A single parsed requirement line.
///
/// Immutable value record with structural equality and hashing. A record
/// with an empty `package` represents a pure comment line (or a blank
/// line); it carries the whole original text in `comment` and nothing else.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Requirement {
    /// Package name as written (original case preserved for display).
    pub package: String,
    /// URL/path for externally-hosted entries, including any `-e` flag.
    /// Empty for ordinary index entries.
    pub location: String,
    /// Comma-joined version specifier clauses, original order preserved.
    pub specifiers: String,
    /// Environment-marker expression, empty if none.
    pub markers: String,
    /// Trailing comment including its leading `#`, empty if none.
    pub comment: String,
    /// Extra-feature names; order-insensitive by construction.
    pub extras: BTreeSet<String>,
}

impl Requirement {
    /// A comment-only record carrying the given text verbatim.
    pub fn comment_line(text: &str) -> Self {
        Self {
            package: String::new(),
            location: String::new(),
            specifiers: String::new(),
            markers: String::new(),
            comment: text.trim_end_matches(['\n', '\r']).to_string(),
            extras: BTreeSet::new(),
        }
    }

    /// Canonical grouping key for this requirement's package name.
    pub fn canonical(&self) -> String {
        canonical_name(&self.package)
    }

    /// Serialize back to a single line (newline-terminated).
    ///
    /// `marker_sep` separates markers from specifiers (`;` for
    /// requirements files, `:` inside `setup.cfg` extras), `line_prefix`
    /// is prepended to named entries (extras bodies are indented), and
    /// `comment_prefix` pads a trailing comment on named entries.
    /// Specifier clauses keep their written order unless `sort_specifiers`
    /// is requested.
    pub fn to_line(
        &self,
        marker_sep: &str,
        line_prefix: &str,
        comment_prefix: &str,
        sort_specifiers: bool,
    ) -> String {
        let comment = if self.comment.is_empty() {
            String::new()
        } else if self.package.is_empty() {
            self.comment.clone()
        } else {
            format!("{}{}", comment_prefix, self.comment)
        };
        let marker = if self.markers.is_empty() {
            String::new()
        } else {
            format!("{}{}", marker_sep, self.markers)
        };
        let package = if self.package.is_empty() {
            String::new()
        } else {
            format!("{}{}", line_prefix, self.package)
        };
        let location = if self.location.is_empty() {
            String::new()
        } else {
            format!("{}#egg=", self.location)
        };
        let specifiers = if sort_specifiers {
            let mut clauses: Vec<&str> = self
                .specifiers
                .split(',')
                .filter(|c| !c.is_empty())
                .collect();
            clauses.sort_unstable();
            clauses.join(",")
        } else {
            self.specifiers.clone()
        };
        let extras = if self.extras.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = self.extras.iter().map(String::as_str).collect();
            format!("[{}]", names.join(","))
        };
        format!(
            "{}{}{}{}{}{}\n",
            location, package, extras, specifiers, marker, comment
        )
    }
}

/// An ordered sequence of requirements, usually one rewritten file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Requirements {
    pub reqs: Vec<Requirement>,
}

/// One parsed entry plus the original line it came from.
pub type Entry = (Requirement, String);

/// Requirement store: canonical package name to ordered entries.
///
/// Multiple entries per name are expected (marker-split declarations),
/// not a duplicate-detection failure. Comment-only records group under
/// the empty-string key.
pub type RequirementStore = BTreeMap<String, Vec<Entry>>;

/// Lower-cased, PEP 503 normalized package name.
///
/// Runs of `-`, `_` and `.` collapse to a single `-`. Used as a grouping
/// key only, never as the display value.
pub fn canonical_name(name: &str) -> String {
    CANONICAL_RE.replace_all(name, "-").to_lowercase()
}

/// True if the (already trimmed) line is preserved byte-for-byte and
/// never parsed or validated.
///
/// `-f` index flags always pass through. Editable installs and direct
/// URL lines pass through only while URL parsing is disabled; with
/// `permit_urls` they are parsed via their `#egg=` fragment instead.
fn is_pass_through(req_line: &str, permit_urls: bool) -> bool {
    if req_line.starts_with("-f") {
        return true;
    }
    if permit_urls {
        return false;
    }
    req_line.starts_with("-e")
        || req_line.starts_with("http://")
        || req_line.starts_with("https://")
}

/// Parse a single line of a requirements file.
///
/// Blank and `#`-prefixed lines parse to a comment-only [`Requirement`].
/// Malformed specifiers and (when `permit_urls` is off) inline URLs fail
/// with [`Error::RequirementParse`]; there is no silent recovery.
pub fn parse_line(req_line: &str, permit_urls: bool) -> Result<Requirement> {
    let end = req_line.len();
    let hash_pos = req_line.find('#').unwrap_or(end);
    if req_line[..hash_pos].contains("://") {
        if permit_urls {
            return parse_url(req_line);
        }
        return Err(Error::RequirementParse {
            line: req_line.to_string(),
            message: "URL entries are not allowed here".to_string(),
        });
    }
    // Markers start at the later of the first ';' and the first legacy
    // ':' before the comment.
    let semi_pos = req_line[..hash_pos].find(';');
    let colon_pos = req_line[..hash_pos].find(':');
    let marker_pos = match (semi_pos, colon_pos) {
        (Some(s), Some(c)) => s.max(c),
        (Some(s), None) => s,
        (None, Some(c)) => c,
        (None, None) => hash_pos,
    };
    let markers = if marker_pos < hash_pos {
        req_line[marker_pos + 1..hash_pos].trim().to_string()
    } else {
        String::new()
    };
    let comment = if hash_pos != end {
        req_line[hash_pos..].to_string()
    } else {
        String::new()
    };
    let name_spec = req_line[..marker_pos.min(hash_pos)].trim();

    if name_spec.is_empty() {
        return Ok(Requirement {
            package: String::new(),
            location: String::new(),
            specifiers: String::new(),
            markers,
            comment,
            extras: BTreeSet::new(),
        });
    }

    let caps = NAME_RE
        .captures(name_spec)
        .ok_or_else(|| Error::RequirementParse {
            line: req_line.to_string(),
            message: "expected a package name".to_string(),
        })?;
    let package = caps.get(1).map_or("", |m| m.as_str()).to_string();
    let extras: BTreeSet<String> = caps
        .get(2)
        .map_or("", |m| m.as_str())
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect();
    let raw_spec = caps.get(3).map_or("", |m| m.as_str());
    let specifiers = if raw_spec.is_empty() {
        String::new()
    } else {
        VersionSpecifiers::from_str(raw_spec).map_err(|e| Error::RequirementParse {
            line: req_line.to_string(),
            message: e.to_string(),
        })?;
        raw_spec
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(",")
    };

    Ok(Requirement {
        package,
        location: String::new(),
        specifiers,
        markers,
        comment,
        extras,
    })
}

/// Parse a URL entry carrying an `#egg=<name>` fragment.
///
/// Only this subset of URLs is accepted: the egg fragment names the
/// project without requiring network access. Any leading `-e` flag stays
/// part of the location.
fn parse_url(req_line: &str) -> Result<Requirement> {
    let egg_pos = req_line
        .find("#egg=")
        .ok_or_else(|| Error::RequirementParse {
            line: req_line.to_string(),
            message: "URL entries must carry an #egg= fragment".to_string(),
        })?;
    let name_start = egg_pos + "#egg=".len();
    let name_end = req_line[name_start..]
        .find([' ', '\t', '#', ';', ':'])
        .map_or(req_line.len(), |i| name_start + i);
    let package = req_line[name_start..name_end].to_string();
    if package.is_empty() {
        return Err(Error::RequirementParse {
            line: req_line.to_string(),
            message: "empty #egg= fragment".to_string(),
        });
    }
    let location = req_line[..egg_pos].trim_end().to_string();
    let rest = &req_line[name_end..];
    let rest_hash = rest.find('#').unwrap_or(rest.len());
    let comment = if rest_hash < rest.len() {
        rest[rest_hash..].to_string()
    } else {
        String::new()
    };
    let markers = rest[..rest_hash]
        .find([';', ':'])
        .map_or(String::new(), |i| rest[i + 1..rest_hash].trim().to_string());

    Ok(Requirement {
        package,
        location,
        specifiers: String::new(),
        markers,
        comment,
        extras: BTreeSet::new(),
    })
}

/// Parse file content into `(parsed, original line)` pairs.
///
/// Pass-through lines yield `(None, line)` and must be re-emitted
/// verbatim. Original lines keep their terminators.
pub fn to_reqs(content: &str, permit_urls: bool) -> Result<Vec<(Option<Requirement>, String)>> {
    let mut out = Vec::new();
    for content_line in content.split_inclusive('\n') {
        let req_line = content_line.trim();
        if is_pass_through(req_line, permit_urls) {
            out.push((None, content_line.to_string()));
        } else {
            out.push((Some(parse_line(req_line, permit_urls)?), content_line.to_string()));
        }
    }
    Ok(out)
}

/// Group a parsed sequence by canonical package name.
///
/// Pass-through lines are dropped from the store (they live only in the
/// original sequence); comment-only records group under `""`.
pub fn to_dict(req_sequence: &[(Option<Requirement>, String)]) -> RequirementStore {
    let mut reqs: RequirementStore = BTreeMap::new();
    for (req, req_line) in req_sequence {
        if let Some(req) = req {
            reqs.entry(req.canonical())
                .or_default()
                .push((req.clone(), req_line.clone()));
        }
    }
    reqs
}

/// Parse file content straight into a [`RequirementStore`].
pub fn parse(content: &str, permit_urls: bool) -> Result<RequirementStore> {
    Ok(to_dict(&to_reqs(content, permit_urls)?))
}

/// Serialize a requirement sequence back to file content.
pub fn to_content(
    reqs: &Requirements,
    marker_sep: &str,
    line_prefix: &str,
    prefix: bool,
) -> String {
    let mut out = String::new();
    if prefix {
        for line in REQS_HEADER {
            out.push_str(line);
        }
    }
    for req in &reqs.reqs {
        let _ = write!(out, "{}", req.to_line(marker_sep, line_prefix, " ", false));
    }
    out
}

/// Bounds policy for the global list: minimum versions belong to the
/// per-project lower constraints, so a global entry must not carry a
/// `>=` clause. Yields one message per offending package.
pub fn check_reqs_bounds_policy(global_reqs: &RequirementStore) -> Vec<String> {
    let mut messages = Vec::new();
    for (name, entries) in global_reqs {
        if name.is_empty() {
            continue;
        }
        for (req, _line) in entries {
            if req.specifiers.split(',').any(|c| c.contains(">=")) {
                messages.push(format!(
                    "Requirement {} should not include a >= specifier",
                    name
                ));
            }
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(
        package: &str,
        location: &str,
        specifiers: &str,
        markers: &str,
        comment: &str,
    ) -> Requirement {
        Requirement {
            package: package.to_string(),
            location: location.to_string(),
            specifiers: specifiers.to_string(),
            markers: markers.to_string(),
            comment: comment.to_string(),
            extras: BTreeSet::new(),
        }
    }

    #[test]
    fn test_parse_package_only() {
        assert_eq!(parse_line("swift", false).unwrap(), req("swift", "", "", "", ""));
    }

    #[test]
    fn test_parse_specifier() {
        assert_eq!(
            parse_line("alembic>=0.4.1", false).unwrap(),
            req("alembic", "", ">=0.4.1", "", "")
        );
    }

    #[test]
    fn test_parse_specifiers_keep_order() {
        assert_eq!(
            parse_line("alembic>=0.4.1,!=1.1.8", false).unwrap(),
            req("alembic", "", ">=0.4.1,!=1.1.8", "", "")
        );
    }

    #[test]
    fn test_parse_comment_only() {
        assert_eq!(parse_line("# foo", false).unwrap(), req("", "", "", "", "# foo"));
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(parse_line("", false).unwrap(), req("", "", "", "", ""));
    }

    #[test]
    fn test_parse_comment() {
        assert_eq!(
            parse_line("Pint>=0.5  # BSD", false).unwrap(),
            req("Pint", "", ">=0.5", "", "# BSD")
        );
    }

    #[test]
    fn test_parse_comment_with_semicolon() {
        assert_eq!(
            parse_line("Pint>=0.5  # BSD;fred", false).unwrap(),
            req("Pint", "", ">=0.5", "", "# BSD;fred")
        );
    }

    #[test]
    fn test_parse_case_preserved() {
        assert_eq!(
            parse_line("Babel>=1.3", false).unwrap(),
            req("Babel", "", ">=1.3", "", "")
        );
    }

    #[test]
    fn test_parse_markers() {
        assert_eq!(
            parse_line("pywin32;sys_platform=='win32'", false).unwrap(),
            req("pywin32", "", "", "sys_platform=='win32'", "")
        );
    }

    #[test]
    fn test_parse_markers_with_comment() {
        assert_eq!(
            parse_line("Sphinx<=1.2; python_version=='2.7'# Sadface", false).unwrap(),
            req("Sphinx", "", "<=1.2", "python_version=='2.7'", "# Sadface")
        );
    }

    #[test]
    fn test_parse_legacy_colon_marker() {
        assert_eq!(
            parse_line("b>=1:python_version=='2.7'", false).unwrap(),
            req("b", "", ">=1", "python_version=='2.7'", "")
        );
    }

    #[test]
    fn test_marker_separator_last_of_firsts() {
        // With both separators present the later one starts the markers.
        // The text before it is then held to the specifier grammar, so a
        // stray first separator is a parse error rather than marker text.
        assert!(parse_line("name>=1;x:y", false).is_err());
        assert!(parse_line("name>=1:x;y", false).is_err());
        assert_eq!(
            parse_line("name>=1;python_version=='2.7'", false)
                .unwrap()
                .markers,
            "python_version=='2.7'"
        );
    }

    #[test]
    fn test_parse_extras() {
        let parsed = parse_line("oslo.db[fixtures,mysql]>=1.11.0 # Apache-2.0", false).unwrap();
        assert_eq!(parsed.package, "oslo.db");
        assert_eq!(parsed.specifiers, ">=1.11.0");
        assert_eq!(
            parsed.extras,
            ["fixtures", "mysql"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn test_parse_url() {
        assert_eq!(
            parse_line("file:///path/to/thing#egg=thing", true).unwrap(),
            req("thing", "file:///path/to/thing", "", "", "")
        );
    }

    #[test]
    fn test_parse_url_dotted_name() {
        assert_eq!(
            parse_line("file:///path/to/oslo.thing#egg=oslo.thing", true).unwrap(),
            req("oslo.thing", "file:///path/to/oslo.thing", "", "", "")
        );
    }

    #[test]
    fn test_parse_url_comment() {
        assert_eq!(
            parse_line("file:///path/to/thing#egg=thing # http://altpath#egg=boo", true).unwrap(),
            req("thing", "file:///path/to/thing", "", "", "# http://altpath#egg=boo")
        );
    }

    #[test]
    fn test_parse_editable() {
        assert_eq!(
            parse_line("-e file:///path/to/bar#egg=bar", true).unwrap(),
            req("bar", "-e file:///path/to/bar", "", "", "")
        );
    }

    #[test]
    fn test_parse_editable_vcs_git() {
        assert_eq!(
            parse_line("-e git+http://github.com/path/to/oslo.bar#egg=oslo.bar", true).unwrap(),
            req("oslo.bar", "-e git+http://github.com/path/to/oslo.bar", "", "", "")
        );
    }

    #[test]
    fn test_parse_url_rejected_when_disabled() {
        let result = parse_line("file:///foo#egg=foo", false);
        assert!(matches!(result, Err(Error::RequirementParse { .. })));
    }

    #[test]
    fn test_parse_url_without_egg_rejected() {
        let result = parse_line("git+https://foo.com/bar.git", true);
        assert!(matches!(result, Err(Error::RequirementParse { .. })));
    }

    #[test]
    fn test_parse_malformed_specifier() {
        let result = parse_line("foo>=banana", false);
        assert!(matches!(result, Err(Error::RequirementParse { .. })));
    }

    #[test]
    fn test_pass_through_lines() {
        let content = "-e git+https://example.com/foo#egg=foo\n-f http://example.com/\nfoo>=1\n";
        let reqs = to_reqs(content, false).unwrap();
        assert_eq!(reqs.len(), 3);
        assert!(reqs[0].0.is_none());
        assert!(reqs[1].0.is_none());
        assert_eq!(reqs[2].0.as_ref().unwrap().package, "foo");
    }

    #[test]
    fn test_dash_f_passes_through_even_with_urls_permitted() {
        let reqs = to_reqs("-f http://example.com/\n", true).unwrap();
        assert!(reqs[0].0.is_none());
    }

    #[test]
    fn test_editable_parsed_when_urls_permitted() {
        let reqs = to_reqs("-e file:///foo#egg=foo", true).unwrap();
        assert_eq!(
            reqs,
            vec![(
                Some(req("foo", "-e file:///foo", "", "", "")),
                "-e file:///foo#egg=foo".to_string()
            )]
        );
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("Foo_bar"), "foo-bar");
        assert_eq!(canonical_name("foo-bar"), "foo-bar");
        assert_eq!(canonical_name("Foo__.Bar"), "foo-bar");
    }

    #[test]
    fn test_to_dict_canonicalises() {
        let seq = vec![(Some(req("Foo_bar", "", "", "", "")), "Foo_bar\n".to_string())];
        let store = to_dict(&seq);
        assert!(store.contains_key("foo-bar"));
        assert_eq!(store["foo-bar"][0].0.package, "Foo_bar");
    }

    #[test]
    fn test_parse_multiline() {
        let content = "oslo.config>=1.11.0     # Apache-2.0\n\
                       oslo.concurrency>=2.3.0 # Apache-2.0\n\
                       oslo.context>=0.2.0     # Apache-2.0\n";
        let reqs = parse(content, false).unwrap();
        let names: Vec<&str> = reqs.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["oslo-concurrency", "oslo-config", "oslo-context"]);
    }

    #[test]
    fn test_to_line_smoke() {
        let mut r = req("foo", "", "<=1", "python_version=='2.7'", "# BSD");
        assert_eq!(r.to_line("!", "", " ", false), "foo<=1!python_version=='2.7' # BSD\n");
        r.markers.clear();
        assert_eq!(r.to_line(";", "", " ", false), "foo<=1 # BSD\n");
    }

    #[test]
    fn test_to_line_location() {
        let r = req("foo", "file://foo", "", "python_version=='2.7'", "# BSD");
        assert_eq!(
            r.to_line(";", "", " ", false),
            "file://foo#egg=foo;python_version=='2.7' # BSD\n"
        );
    }

    #[test]
    fn test_to_line_sorted_specifiers() {
        let r = req("alembic", "", ">=0.4.1,!=1.1.8", "", "");
        assert_eq!(r.to_line(";", "", " ", true), "alembic!=1.1.8,>=0.4.1\n");
    }

    #[test]
    fn test_to_content_header() {
        let reqs = Requirements {
            reqs: vec![req("foo", "", "<=1", "python_version=='2.7'", "# BSD")],
        };
        let expected = format!(
            "{}foo<=1;python_version=='2.7' # BSD\n",
            REQS_HEADER.concat()
        );
        assert_eq!(to_content(&reqs, ";", "", true), expected);
    }

    #[test]
    fn test_roundtrip_reparses_equal() {
        for line in [
            "swift",
            "alembic>=0.4.1,!=1.1.8",
            "Pint>=0.5  # BSD",
            "pywin32;sys_platform=='win32'",
            "oslo.db[fixtures,mysql]>=1.11.0 # Apache-2.0",
            "# just a comment",
            "",
        ] {
            let parsed = parse_line(line, false).unwrap();
            let emitted = parsed.to_line(";", "", " ", false);
            let reparsed = parse_line(emitted.trim_end_matches('\n'), false).unwrap();
            assert_eq!(parsed, reparsed, "line {:?} did not round-trip", line);
        }
    }

    #[test]
    fn test_bounds_policy_pass() {
        let reqs = parse("cffi!=1.1.2\nother\n", false).unwrap();
        assert!(check_reqs_bounds_policy(&reqs).is_empty());
    }

    #[test]
    fn test_bounds_policy_fail() {
        let reqs = parse("cffi>=1.1.1,!=1.1.0\nother>=1,!=1.1.0\n", false).unwrap();
        let mut messages = check_reqs_bounds_policy(&reqs);
        messages.sort();
        assert_eq!(
            messages,
            vec![
                "Requirement cffi should not include a >= specifier".to_string(),
                "Requirement other should not include a >= specifier".to_string(),
            ]
        );
    }
}
