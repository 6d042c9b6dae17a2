//! # Constraints file checks
//!
//! A constraints file pins every transitively reachable package to one
//! exact version with `===`. The checks here keep that file consistent
//! with the global requirements list and with each project's declared
//! lower bounds.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use crate::check::{GlobalReqs, RequirementsList};
use crate::error::Result;
use crate::requirement::{canonical_name, Requirement, RequirementStore};
use crate::specifiers;

/// Packages that cannot usefully be constrained: interpreter-bundled,
/// the installer itself, or Windows-only stubs that never resolve on the
/// platform running the pin job. The empty name covers comment lines.
pub const UNCONSTRAINABLE: [&str; 8] = [
    "argparse", "pip", "setuptools", "wmi", "pywin32", "pymi", "wheel", "",
];

fn is_unconstrainable(name: &str) -> bool {
    UNCONSTRAINABLE.contains(&name)
}

/// Every constraint must be a single arbitrary-equality pin.
pub fn check_format(constraints: &RequirementStore) -> Vec<String> {
    let mut diagnostics = Vec::new();
    for entries in constraints.values() {
        for (constraint, _) in entries {
            if !constraint.package.is_empty() && !constraint.specifiers.starts_with("===") {
                diagnostics.push(format!(
                    "{} does not have the format: name===version",
                    constraint.package
                ));
            }
        }
    }
    diagnostics
}

/// Every pinned version must satisfy at least one global specifier set
/// for that package. Pins for packages absent from the global list are
/// transitive dependencies and pass unchecked.
pub fn check_compatible(
    global_reqs: &GlobalReqs,
    constraints: &RequirementStore,
) -> Result<Vec<String>> {
    let mut diagnostics = Vec::new();
    for (name, entries) in constraints {
        let Some(global_entries) = global_reqs.get(name) else {
            continue;
        };
        for (constraint, _) in entries {
            if !constraint.specifiers.starts_with("===") {
                // Reported by the format check
                continue;
            }
            let pin = &constraint.specifiers[3..];
            let mut satisfied = false;
            for req in global_entries {
                // An empty specifier set admits every version.
                if specifiers::contains_version(&req.specifiers, pin)? {
                    satisfied = true;
                    break;
                }
            }
            if !satisfied {
                diagnostics.push(format!(
                    "Constraint {} for {} does not match requirement {:?}",
                    constraint.specifiers,
                    name,
                    global_entries
                        .iter()
                        .map(|r| r.specifiers.as_str())
                        .collect::<Vec<_>>()
                ));
            }
        }
    }
    Ok(diagnostics)
}

/// Every constrainable global package must appear in exactly one of the
/// constraints file or the denylist.
pub fn check_coverage(
    global_reqs: &GlobalReqs,
    constraints: &RequirementStore,
    denylist: &BTreeSet<String>,
) -> Vec<String> {
    let mut diagnostics = Vec::new();
    for name in global_reqs.keys() {
        if is_unconstrainable(name) {
            continue;
        }
        let constrained = constraints.contains_key(name);
        let denied = denylist.contains(name);
        if constrained && denied {
            diagnostics.push(format!(
                "{} appears in both the constraints file and the denylist",
                name
            ));
        } else if !constrained && !denied {
            diagnostics.push(format!(
                "{} appears in the global list but not the constraints file",
                name
            ));
        }
    }
    diagnostics
}

/// Pick the constraint entry applicable to one project requirement:
/// exact marker match first, markerless pin as the fallback.
fn applicable_constraint<'a>(
    entries: &'a [(Requirement, String)],
    markers: &str,
) -> Option<&'a Requirement> {
    entries
        .iter()
        .map(|(c, _)| c)
        .find(|c| c.markers == markers)
        .or_else(|| entries.iter().map(|(c, _)| c).find(|c| c.markers.is_empty()))
}

/// Check that a project's declared lower bounds line up with the pins:
/// each pin must equal the project's lower bound for that package and
/// satisfy its full specifier set.
pub fn check_lower_alignment(
    head_reqs: &RequirementsList,
    constraints: &RequirementStore,
    denylist: &BTreeSet<String>,
) -> Result<(bool, Vec<String>)> {
    let mut failed = false;
    let mut diagnostics = Vec::new();
    for (name, reqs) in head_reqs.reqs() {
        if denylist.contains(&name) || is_unconstrainable(&name) {
            continue;
        }
        let Some(entries) = constraints.get(&name) else {
            continue;
        };
        for req in &reqs {
            let Some(constraint) = applicable_constraint(entries, &req.markers) else {
                continue;
            };
            if !constraint.specifiers.starts_with("===") {
                continue;
            }
            let pin_text = &constraint.specifiers[3..];
            let pin = specifiers::parse_version(pin_text)?;
            if !specifiers::contains_version(&req.specifiers, pin_text)? {
                failed = true;
                diagnostics.push(format!(
                    "Package {} is constrained to {} which is incompatible with the settings {}",
                    name, constraint.specifiers, req.specifiers
                ));
            }
            if let Some(min) = specifiers::lower_bound_version(&req.specifiers)? {
                if min != pin {
                    failed = true;
                    diagnostics.push(format!(
                        "Package {} lower bound {} does not match the constrained version {}",
                        name, min, constraint.specifiers
                    ));
                }
            }
        }
    }
    Ok((failed, diagnostics))
}

/// Merge several per-project lower-constraints stores into one list:
/// the highest declared lower bound wins for each package.
///
/// Output lines are ordered by the SHA-256 of the canonical name. The
/// shuffle keeps alphabetically adjacent packages apart so a bad batch
/// of related pins does not land as one contiguous block.
pub fn merge_lower_constraints(stores: &[RequirementStore]) -> Result<Vec<String>> {
    let mut merged: std::collections::BTreeMap<String, Requirement> =
        std::collections::BTreeMap::new();
    for store in stores {
        for (name, entries) in store {
            if name.is_empty() {
                continue;
            }
            for (req, _) in entries {
                let candidate = specifiers::lower_bound_version(&req.specifiers)?;
                let Some(candidate) = candidate else { continue };
                match merged.get(name) {
                    Some(current) => {
                        let current_min = specifiers::lower_bound_version(&current.specifiers)?;
                        if current_min.map_or(true, |m| candidate > m) {
                            merged.insert(name.clone(), req.clone());
                        }
                    }
                    None => {
                        merged.insert(name.clone(), req.clone());
                    }
                }
            }
        }
    }
    let mut lines: Vec<(Vec<u8>, String)> = merged
        .values()
        .map(|req| {
            let key = Sha256::digest(canonical_name(&req.package).as_bytes()).to_vec();
            (key, req.to_line(";", "", "  # ", true).trim_end().to_string())
        })
        .collect();
    lines.sort();
    Ok(lines.into_iter().map(|(_, line)| line).collect())
}
