//! # Environment-marker compatibility
//!
//! Decides whether a project-declared marker and the corresponding global
//! marker are considered equivalent. The rules are deliberately
//! conservative: exact string equality, plus two documented relaxations
//! around the python-version transition. No general marker-language
//! evaluation happens here; only recognizable `python_version` patterns
//! are treated specially, anything else must match verbatim.

use std::sync::LazyLock;

use regex::Regex;

use crate::requirement::Requirement;

static PYTHON_3_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^python_version\s*(==|>=|>)\s*['"]3(\.\d+)?['"]$"#).expect("static regex")
});

static BACKPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^python_version\s*(<=?|==)\s*['"][23](\.\d+)?['"]$"#).expect("static regex")
});

/// True if the marker restricts the entry to some Python 3.x via `==`,
/// `>=` or `>`.
pub fn is_python_3_marker(markers: &str) -> bool {
    PYTHON_3_RE.is_match(markers.trim())
}

/// True if the marker looks like a backport-style interpreter pin
/// (`python_version <|<=|== '2.x'/'3.x'`). On packages designated as
/// backports such markers carry no policy meaning and are ignored.
pub fn is_backport_marker(markers: &str) -> bool {
    BACKPORT_RE.is_match(markers.trim())
}

/// True if an entry with these markers applies to a Python-3
/// interpreter. Markers that do not mention `python_version` at all
/// (platform conditions, for instance) are assumed to apply.
pub fn applies_to_python3(markers: &str) -> bool {
    let markers = markers.trim();
    if markers.is_empty() || !markers.contains("python_version") {
        return true;
    }
    is_python_3_marker(markers)
}

/// Count the global entries for one package that a Python-3-only project
/// is expected to cover.
pub fn python3_entry_count<'a>(reqs: impl IntoIterator<Item = &'a Requirement>) -> usize {
    reqs.into_iter()
        .filter(|r| applies_to_python3(&r.markers))
        .count()
}
