//! # Requirements synchronization
//!
//! Rewrites a project's requirements files so every named entry carries
//! the settings from the global list. Comments, blank lines and
//! pass-through lines survive in place; only named entries change. The
//! sync is a pure computation returning [`Action`]s so callers decide
//! whether to write, print, or discard the results.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::debug;

use crate::error::Result;
use crate::project::Project;
use crate::requirement::{self, Requirement, RequirementStore, Requirements, REQS_HEADER};

/// Generated setup.py body for projects using pbr. Rewritten on every
/// sync so local drift in the boilerplate gets reverted.
const SETUP_PY_TEXT: &str = "\
# THIS FILE IS MANAGED CENTRALLY. LOCAL CHANGES WILL BE OVERWRITTEN ON
# THE NEXT SYNC. ANY SETUP CUSTOMIZATION BELONGS IN setup.cfg.
import setuptools

setuptools.setup(
    setup_requires=['pbr>=2.0.0'],
    pbr=True)
";

/// One rewritten entry, for the change summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub name: String,
    pub old: String,
    pub new: String,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<30.30} ->   {}", self.old, self.new)
    }
}

/// Side effects a sync run wants performed, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// A policy failure. The run continues; the caller fails at the end.
    Error { message: String },
    /// Replace one file's content.
    File { filename: String, content: String },
    /// A message for normal output.
    StdOut { message: String },
    /// A message shown only when verbose output was requested.
    Verbose { message: String },
}

/// Knobs for a sync run.
#[derive(Clone, Debug, Default)]
pub struct SyncOptions {
    /// Only update entries already present; leave unknown ones alone.
    pub soft_update: bool,
    /// Canonical names exempt from synchronization.
    pub exempt: BTreeSet<String>,
    /// Write results to `<file>.<suffix>` instead of the file itself.
    pub suffix: Option<String>,
}

impl SyncOptions {
    /// Output file name for a destination, suffix applied.
    pub fn dest_name(&self, filename: &str) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}.{}", filename, suffix),
            None => filename.to_string(),
        }
    }
}

fn header_lines() -> BTreeSet<&'static str> {
    REQS_HEADER.iter().map(|l| l.trim_end()).collect()
}

/// Sync one destination file's parsed sequence against the global list.
///
/// Returns the actions to perform and the new content as structured
/// requirements, so extras blocks can be regenerated from the same
/// result.
pub fn sync_requirements_file(
    source_reqs: &RequirementStore,
    dest_sequence: &[(Option<Requirement>, String)],
    dest_label: &str,
    opts: &SyncOptions,
) -> (Vec<Action>, Requirements) {
    let mut actions = Vec::new();
    let mut changes = Vec::new();
    let mut output = Vec::new();
    let mut processed: BTreeSet<String> = BTreeSet::new();
    let dest_reqs = requirement::to_dict(dest_sequence);
    let header = header_lines();

    for (req, line) in dest_sequence {
        // The boilerplate header is regenerated by the caller.
        if header.contains(line.trim_end()) {
            continue;
        }
        let Some(req) = req else {
            output.push(Requirement::comment_line(line));
            continue;
        };
        if req.package.is_empty() {
            // Comment or pass-through line, kept verbatim.
            output.push(Requirement::comment_line(line));
            continue;
        }

        let canonical = req.canonical();
        if opts.exempt.contains(&canonical) {
            output.push(req.clone());
            continue;
        }
        // Later duplicates of an already-synced package are dropped.
        if !processed.insert(canonical.clone()) {
            continue;
        }

        let Some(reference_entries) = source_reqs.get(&canonical) else {
            if opts.soft_update {
                output.push(req.clone());
            } else {
                // Dropped from the output either way; the caller decides
                // whether the error is fatal.
                actions.push(Action::Error {
                    message: format!("'{}' is not in global-requirements.txt", req.package),
                });
            }
            continue;
        };

        // All of the project's declarations for this package, in file
        // order, aligned positionally against the global declarations.
        // A missing side shows up as an empty old or new text.
        let actual = dest_reqs.get(&canonical).map(Vec::as_slice).unwrap_or(&[]);
        let count = actual.len().max(reference_entries.len());
        for i in 0..count {
            match (actual.get(i), reference_entries.get(i)) {
                (Some((proj, proj_line)), Some((reference, _))) => {
                    let mut merged = reference.clone();
                    if merged.extras != proj.extras {
                        // Extras are a project-local annotation on top of
                        // the global pin.
                        merged.extras = proj.extras.clone();
                    }
                    let new_line = merged.to_line(";", "", " ", false).trim_end().to_string();
                    if *proj != merged {
                        debug!("New requirement for {}: {}", proj.package, new_line);
                        changes.push(Change {
                            name: proj.package.clone(),
                            old: proj_line.trim_end().to_string(),
                            new: new_line,
                        });
                    }
                    output.push(merged);
                }
                (None, Some((reference, reference_line))) => {
                    // More entries in the global list
                    changes.push(Change {
                        name: reference.package.clone(),
                        old: String::new(),
                        new: reference_line.trim_end().to_string(),
                    });
                    output.push(reference.clone());
                }
                (Some((proj, proj_line)), None) => {
                    // Fewer entries in the global list
                    changes.push(Change {
                        name: proj.package.clone(),
                        old: proj_line.trim_end().to_string(),
                        new: String::new(),
                    });
                }
                (None, None) => break,
            }
        }
    }

    if !changes.is_empty() {
        actions.push(Action::StdOut {
            message: format!("Version change for: {}",
                changes
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")),
        });
        actions.push(Action::StdOut {
            message: format!("Updated {}:", dest_label),
        });
        for change in &changes {
            actions.push(Action::StdOut {
                message: change.to_string(),
            });
        }
    }
    (actions, Requirements { reqs: output })
}

/// Sync one file from raw content, producing an [`Action::File`] when
/// anything changed.
pub fn sync_file_content(
    source_reqs: &RequirementStore,
    dest_content: &str,
    dest_label: &str,
    opts: &SyncOptions,
) -> Result<Vec<Action>> {
    let dest_sequence = requirement::to_reqs(dest_content, false)?;
    let (mut actions, reqs) =
        sync_requirements_file(source_reqs, &dest_sequence, dest_label, opts);
    let new_content = requirement::to_content(&reqs, ";", "", true);
    if new_content != dest_content {
        actions.push(Action::File {
            filename: opts.dest_name(dest_label),
            content: new_content,
        });
    } else {
        actions.push(Action::Verbose {
            message: format!("{} is already in sync", dest_label),
        });
    }
    Ok(actions)
}

/// Regenerated setup.py actions, only for pbr projects. A project
/// providing pbr itself is left alone.
fn check_setup_py(project: &Project) -> Vec<Action> {
    let Some(setup_py) = &project.setup_py else {
        return Vec::new();
    };
    if !setup_py.contains("pbr") {
        return Vec::new();
    }
    if project
        .setup_cfg
        .as_deref()
        .is_some_and(|cfg| cfg.contains("name = pbr"))
    {
        return Vec::new();
    }
    if *setup_py == SETUP_PY_TEXT {
        return vec![Action::Verbose {
            message: "setup.py is already in sync".to_string(),
        }];
    }
    vec![
        Action::Verbose {
            message: "Syncing setup.py".to_string(),
        },
        Action::File {
            filename: "setup.py".to_string(),
            content: SETUP_PY_TEXT.to_string(),
        },
    ]
}

/// Sync every requirements file, extras block and setup.py of a
/// project against the global list.
pub fn update_project(
    project: &Project,
    global_reqs: &RequirementStore,
    opts: &SyncOptions,
) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    for (name, content) in &project.requirements {
        actions.push(Action::Verbose {
            message: format!("Syncing {}", name),
        });
        actions.extend(sync_file_content(global_reqs, content, name, opts)?);
    }

    let mut output_extras: BTreeMap<String, Requirements> = BTreeMap::new();
    for (extra, content) in project.extras()? {
        actions.push(Action::Verbose {
            message: format!("Syncing extra [{}]", extra),
        });
        let dest_sequence = requirement::to_reqs(&content, false)?;
        let label = format!(".[{}]", extra);
        let (extra_actions, reqs) =
            sync_requirements_file(global_reqs, &dest_sequence, &label, opts);
        actions.extend(extra_actions);
        output_extras.insert(extra, reqs);
    }
    if let Some(merged) = project.merged_setup_cfg(&output_extras) {
        if project.setup_cfg.as_deref() != Some(merged.as_str()) {
            actions.push(Action::File {
                filename: opts.dest_name("setup.cfg"),
                content: merged,
            });
        }
    }

    actions.extend(check_setup_py(project));
    Ok(actions)
}
