//! # Project file access
//!
//! Reads a project checkout into memory, and applies the actions a sync
//! run produced. All filesystem traffic lives here so the policy code
//! stays pure.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::extras;
use crate::requirement::Requirements;
use crate::sync::Action;

/// Requirements file names consulted in every project, in sync order.
pub const REQUIREMENT_FILES: [&str; 5] = [
    "requirements.txt",
    "test-requirements.txt",
    "tools/pip-requires",
    "tools/test-requires",
    "doc/requirements.txt",
];

/// One project checkout, loaded into memory.
#[derive(Clone, Debug, Default)]
pub struct Project {
    pub root: PathBuf,
    pub setup_py: Option<String>,
    pub setup_cfg: Option<String>,
    /// Relative file name to content, for each requirements file present.
    pub requirements: BTreeMap<String, String>,
}

impl Project {
    /// Load a project from `root`. Missing files are skipped; projects
    /// are not required to carry every standard file.
    pub fn read(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let mut project = Project {
            setup_py: read_optional(&root.join("setup.py"))?,
            setup_cfg: read_optional(&root.join("setup.cfg"))?,
            requirements: BTreeMap::new(),
            root,
        };
        for name in REQUIREMENT_FILES {
            let path = project.root.join(name);
            if let Some(content) = read_optional(&path)? {
                project.requirements.insert(name.to_string(), content);
            }
        }
        Ok(project)
    }

    /// The project's declared extras groups as requirements-file content.
    pub fn extras(&self) -> Result<BTreeMap<String, String>> {
        let Some(cfg) = &self.setup_cfg else {
            return Ok(BTreeMap::new());
        };
        let (_, items, _) = extras::split_extras(cfg);
        let mut out = BTreeMap::new();
        for item in items.into_iter().flatten() {
            if let extras::ExtrasItem::Extra { name, content } = item {
                let mut body = String::new();
                for line in content.lines() {
                    body.push_str(line);
                    body.push('\n');
                }
                out.insert(name, body);
            }
        }
        Ok(out)
    }

    /// Regenerated setup.cfg with each extras block replaced.
    pub fn merged_setup_cfg(
        &self,
        new_extras: &BTreeMap<String, Requirements>,
    ) -> Option<String> {
        self.setup_cfg
            .as_ref()
            .map(|cfg| extras::merge_setup_cfg(cfg, new_extras))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Apply a sync run's actions under `root`.
///
/// File writes go through a temporary file and rename so a crash never
/// leaves a half-written requirements file. With `noop` the writes are
/// described instead of performed. Error actions are reported as they
/// stream past and turn into one failure at the end.
pub fn write_project(
    root: &Path,
    actions: &[Action],
    out: &mut dyn Write,
    verbose: bool,
    noop: bool,
) -> Result<()> {
    let mut failed = false;
    for action in actions {
        match action {
            Action::Error { message } => {
                failed = true;
                writeln!(out, "Error: {}", message)?;
            }
            Action::File { filename, content } => {
                if noop {
                    writeln!(out, "Would update {}.", filename)?;
                    continue;
                }
                debug!("Writing {}", filename);
                write_atomic(&root.join(filename), content)?;
            }
            Action::StdOut { message } => {
                writeln!(out, "{}", message)?;
            }
            Action::Verbose { message } => {
                if verbose {
                    writeln!(out, "{}", message)?;
                }
            }
        }
    }
    if failed {
        return Err(Error::Sync {
            root: root.display().to_string(),
        });
    }
    Ok(())
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
