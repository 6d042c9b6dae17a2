//! # Project validation
//!
//! Compares one project's grouped requirements against the shared global
//! baseline. Policy violations never raise; they accumulate into a
//! [`ValidationReport`] so one run surfaces every problem in a single
//! pass. Only malformed input (a line the grammar rejects) propagates as
//! an error.
//!
//! ## Matching rules
//!
//! A project entry matches a global entry when `package`, `location` and
//! `markers` agree and the project's exclusion clauses are a subset of
//! the global ones. Marker comparison honors two relaxations:
//!
//! - **python-3-only**: with [`ValidateOptions::allow_3_only`], a project
//!   with no marker may match a global entry restricted to Python 3.x,
//!   so a project that no longer supports Python 2 can omit the
//!   restriction.
//! - **backports**: for packages designated as backports, a project-side
//!   interpreter pin is ignored entirely.
//!
//! A mismatch on any attribute makes that global *candidate* ineligible
//! and the next candidate is tried; global lists may carry several
//! marker-qualified entries per package.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use crate::error::Result;
use crate::markers;
use crate::project::Project;
use crate::requirement::{self, Requirement};
use crate::specifiers;

/// Grouped requirements for one package name: a set, since duplicate
/// text is not meaningful once comments are kept aside.
pub type ReqSet = BTreeSet<Requirement>;

/// Global baseline: canonical name to the set of blessed entries.
pub type GlobalReqs = BTreeMap<String, ReqSet>;

/// Knobs for a validation run. Threaded explicitly; there is no ambient
/// process state.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// Flag duplicate entries and missing final newlines.
    pub strict: bool,
    /// Accept projects that dropped Python-2-only lines.
    pub allow_3_only: bool,
    /// Canonical names of backport-style packages.
    pub backports: BTreeSet<String>,
}

/// Outcome of a validation run: an aggregate flag plus every diagnostic
/// collected along the way, in check order.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub failed: bool,
    pub diagnostics: Vec<String>,
}

impl ValidationReport {
    fn fail(&mut self, message: String) {
        self.failed = true;
        self.diagnostics.push(message);
    }
}

/// A project's requirements, grouped per file and per canonical name.
#[derive(Clone, Debug, Default)]
pub struct RequirementsList {
    pub name: String,
    pub reqs_by_file: BTreeMap<String, BTreeMap<String, ReqSet>>,
    /// Diagnostics raised while extracting (duplicates, missing final
    /// newline). Extraction problems are policy diagnostics, not errors.
    pub failed: bool,
    pub diagnostics: Vec<String>,
}

impl RequirementsList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// All requirements across files, merged per canonical name.
    pub fn reqs(&self) -> BTreeMap<String, ReqSet> {
        let mut merged: BTreeMap<String, ReqSet> = BTreeMap::new();
        for file_reqs in self.reqs_by_file.values() {
            for (name, reqs) in file_reqs {
                merged.entry(name.clone()).or_default().extend(reqs.iter().cloned());
            }
        }
        merged
    }

    /// Group one file's content, flagging duplicates in strict mode.
    ///
    /// Two entries are duplicates when identical after stripping
    /// comments; entries differing only by marker or extras are distinct
    /// declarations, not duplicates.
    pub fn extract_reqs(&mut self, content: &str, strict: bool) -> Result<BTreeMap<String, ReqSet>> {
        let mut reqs: BTreeMap<String, ReqSet> = BTreeMap::new();
        let parsed = requirement::parse(content, false)?;
        for (name, entries) in parsed {
            if name.is_empty() {
                // Comments and other unprocessed lines
                continue;
            }
            let list_reqs: Vec<Requirement> = entries.into_iter().map(|(r, _)| r).collect();
            let stripped: BTreeSet<Requirement> = list_reqs
                .iter()
                .map(|r| {
                    let mut r = r.clone();
                    r.comment.clear();
                    r
                })
                .collect();
            if strict && stripped.len() != list_reqs.len() {
                self.failed = true;
                self.diagnostics.push(format!(
                    "Requirements file has duplicate entries for package {} : {:?}.",
                    name, list_reqs
                ));
            }
            reqs.entry(name).or_default().extend(list_reqs);
        }
        Ok(reqs)
    }

    /// Convert a project into ready-to-check data: one grouped store per
    /// requirements file, plus one per declared extra.
    pub fn process(&mut self, project: &Project, strict: bool) -> Result<()> {
        info!("Checking {}", self.name);
        for (fname, content) in &project.requirements {
            debug!("Processing {}", fname);
            if strict && !content.is_empty() && !content.ends_with('\n') {
                self.diagnostics.push(format!(
                    "Requirements file {} does not end with a newline.",
                    fname
                ));
            }
            let extracted = self.extract_reqs(content, strict)?;
            self.reqs_by_file.insert(fname.clone(), extracted);
        }
        for (extra, content) in project.extras()? {
            debug!("Processing .[{}]", extra);
            let extracted = self.extract_reqs(&content, strict)?;
            self.reqs_by_file.insert(format!(".[{}]", extra), extracted);
        }
        Ok(())
    }
}

/// Parse global-list content into the [`GlobalReqs`] baseline.
///
/// The original lines are discarded; validation only compares records.
pub fn get_global_reqs(content: &str) -> Result<GlobalReqs> {
    let mut global_reqs = GlobalReqs::new();
    for (name, entries) in requirement::parse(content, false)? {
        global_reqs.insert(name, entries.into_iter().map(|(r, _)| r).collect());
    }
    Ok(global_reqs)
}

/// Parse denylist content (bare package names, one per line) into a set
/// of canonical names.
pub fn parse_denylist(content: &str) -> Result<BTreeSet<String>> {
    Ok(requirement::parse(content, false)?
        .into_keys()
        .filter(|name| !name.is_empty())
        .collect())
}

/// Try to match one project requirement against the global candidates.
///
/// Attribute mismatches are warning-level: they make a candidate
/// ineligible and the next one is tried. Only when every candidate has
/// been exhausted do the pending messages reach the report.
fn is_requirement_in_global_reqs(
    req: &Requirement,
    global_reqs: &ReqSet,
    opts: &ValidateOptions,
    pending: &mut Vec<String>,
) -> bool {
    let req_exclusions = specifiers::exclusions(&req.specifiers);
    for global_req in global_reqs {
        let mut matching = true;
        if req.package != global_req.package {
            warn!(
                "possible mismatch for package {}: name {:?} does not match {:?}",
                req.package, req.package, global_req.package
            );
            matching = false;
        }
        if req.location != global_req.location {
            warn!(
                "possible mismatch for package {}: location {:?} does not match {:?}",
                req.package, req.location, global_req.location
            );
            matching = false;
        }
        if req.markers != global_req.markers {
            let backport = opts.backports.contains(&req.canonical())
                && markers::is_backport_marker(&req.markers);
            let py3_only = opts.allow_3_only
                && req.markers.is_empty()
                && markers::is_python_3_marker(&global_req.markers);
            if !backport && !py3_only {
                warn!(
                    "possible mismatch for package {}: marker {:?} does not match {:?}",
                    req.package, req.markers, global_req.markers
                );
                matching = false;
            }
        }
        if !matching {
            continue;
        }

        let global_exclusions = specifiers::exclusions(&global_req.specifiers);
        let extra: Vec<&String> = req_exclusions.difference(&global_exclusions).collect();
        if extra.is_empty() {
            // A project may exclude fewer broken versions than globally
            // known, never more.
            return true;
        }
        pending.push(format!(
            "Requirement for package {} excludes a version not excluded in the global list.\n  \
             Local settings : {}\n  Global settings: {}",
            req.package, req.specifiers, global_req.specifiers
        ));
    }
    false
}

/// Validate a project's requirements against the global baseline.
///
/// `branch_reqs` is the unchanged baseline of the project itself (the
/// target branch); entries equal to it are skipped so only changing
/// lines are policed. Denylisted packages are managed by project teams
/// and skipped entirely.
pub fn validate(
    head_reqs: &RequirementsList,
    branch_reqs: Option<&RequirementsList>,
    denylist: &BTreeSet<String>,
    global_reqs: &GlobalReqs,
    opts: &ValidateOptions,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.failed = head_reqs.failed;
    report.diagnostics.extend(head_reqs.diagnostics.iter().cloned());
    let branch = branch_reqs.map(RequirementsList::reqs);

    for (fname, freqs) in &head_reqs.reqs_by_file {
        info!("Validating {}", fname);
        for (name, reqs) in freqs {
            // Unchanged, or a change that preserves a current value.
            if branch.as_ref().and_then(|b| b.get(name)) == Some(reqs) {
                continue;
            }
            if denylist.contains(name) {
                continue;
            }
            let Some(global_entries) = global_reqs.get(name) else {
                report.fail(format!(
                    "Requirement {:?} not in the global requirements list",
                    reqs
                ));
                continue;
            };

            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for req in reqs {
                if req.extras.is_empty() {
                    *counts.entry(String::new()).or_default() += 1;
                } else {
                    for extra in &req.extras {
                        *counts.entry(extra.clone()).or_default() += 1;
                    }
                }

                let mut pending = Vec::new();
                if !is_requirement_in_global_reqs(req, global_entries, opts, &mut pending) {
                    report.failed = true;
                    report.diagnostics.extend(pending);
                    report.diagnostics.push(format!(
                        "Requirement for package {} : {} does not match the global list value : {:?}",
                        name,
                        req.to_line(";", "", " ", false).trim_end(),
                        global_entries
                    ));
                }

                // Some lower bound must be declared, distinct from any
                // exclusion mismatch.
                if !specifiers::has_lower_bound(&req.specifiers) {
                    report.fail(format!(
                        "Requirement for package {} has no lower bound",
                        name
                    ));
                }
            }

            for (extra, count) in counts {
                if count == global_entries.len() {
                    continue;
                }
                if opts.allow_3_only && count >= markers::python3_entry_count(global_entries) {
                    info!("Package {} is only needed for python 3", name);
                    continue;
                }
                report.fail(format!(
                    "Package {}{} requirement does not match the number of lines ({}) in the global list",
                    name,
                    if extra.is_empty() {
                        String::new()
                    } else {
                        format!("[{}]", extra)
                    },
                    global_entries.len()
                ));
            }
        }
    }
    report
}
