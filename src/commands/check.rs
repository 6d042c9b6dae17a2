//! Check command implementation
//!
//! Validates one project's requirements files and extras against the
//! global requirements list. Every violation is printed; the command
//! exits nonzero when any was found.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use reqsync::check::{self, RequirementsList, ValidateOptions};
use reqsync::constraints;
use reqsync::output::{marker, OutputConfig};
use reqsync::project::Project;
use reqsync::requirement::{self, canonical_name};

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Project root to check
    #[arg(value_name = "PATH")]
    pub project: PathBuf,

    /// Global requirements file
    #[arg(long, value_name = "PATH", default_value = "global-requirements.txt")]
    pub global_requirements: PathBuf,

    /// File of package names managed by project teams, one per line
    #[arg(long, value_name = "PATH")]
    pub denylist: Option<PathBuf>,

    /// Unchanged checkout of the project, used as the comparison
    /// baseline so only changing entries are policed
    #[arg(long, value_name = "PATH")]
    pub branch_root: Option<PathBuf>,

    /// Accept projects that dropped Python-2-only entries
    #[arg(long)]
    pub allow_3_only: bool,

    /// Also flag duplicate entries and missing final newlines
    #[arg(long)]
    pub strict: bool,

    /// Package whose interpreter markers are not policed (repeatable)
    #[arg(long, value_name = "NAME")]
    pub backport: Vec<String>,

    /// Project lower-constraints file to align against declared bounds
    #[arg(long, value_name = "PATH")]
    pub lower_constraints: Option<PathBuf>,
}

/// Execute the check command
pub fn execute(args: CheckArgs, output: &OutputConfig) -> Result<()> {
    let global_content = fs::read_to_string(&args.global_requirements).with_context(|| {
        format!(
            "Failed to read global requirements from {}",
            args.global_requirements.display()
        )
    })?;
    let global_reqs = check::get_global_reqs(&global_content)?;

    let denylist = match &args.denylist {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read denylist from {}", path.display()))?;
            check::parse_denylist(&content)?
        }
        None => BTreeSet::new(),
    };

    let opts = ValidateOptions {
        strict: args.strict,
        allow_3_only: args.allow_3_only,
        backports: args.backport.iter().map(|n| canonical_name(n)).collect(),
    };

    let project = Project::read(&args.project)
        .with_context(|| format!("Failed to read project at {}", args.project.display()))?;
    let mut head_reqs = RequirementsList::new(args.project.display().to_string());
    head_reqs.process(&project, opts.strict)?;

    let branch_reqs = match &args.branch_root {
        Some(root) => {
            let branch_project = Project::read(root)
                .with_context(|| format!("Failed to read project at {}", root.display()))?;
            let mut reqs = RequirementsList::new(root.display().to_string());
            reqs.process(&branch_project, false)?;
            Some(reqs)
        }
        None => None,
    };

    let mut report = check::validate(
        &head_reqs,
        branch_reqs.as_ref(),
        &denylist,
        &global_reqs,
        &opts,
    );

    if let Some(path) = &args.lower_constraints {
        let content = fs::read_to_string(path).with_context(|| {
            format!("Failed to read lower constraints from {}", path.display())
        })?;
        let constraints_reqs = requirement::parse(&content, false)?;
        let (failed, diagnostics) =
            constraints::check_lower_alignment(&head_reqs, &constraints_reqs, &denylist)?;
        report.failed |= failed;
        report.diagnostics.extend(diagnostics);
    }

    for diagnostic in &report.diagnostics {
        println!(
            "{} {}",
            marker(output, "✗", "FAIL:"),
            output.violation(diagnostic)
        );
    }
    if report.failed {
        anyhow::bail!(
            "{} inconsistent with the global requirements list",
            args.project.display()
        );
    }
    println!(
        "{} {} matches the global requirements list",
        marker(output, "✓", "OK:"),
        args.project.display()
    );
    Ok(())
}
