//! Update command implementation
//!
//! Rewrites a project's requirements files, setup.cfg extras and
//! setup.py from the global requirements list.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use reqsync::output::{marker, OutputConfig};
use reqsync::project::{self, Project};
use reqsync::requirement::{self, canonical_name};
use reqsync::sync::{self, SyncOptions};

/// Arguments for the update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Project root to update
    #[arg(value_name = "PATH")]
    pub project: PathBuf,

    /// Directory holding the global requirements files
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub source: PathBuf,

    /// Keep entries not in the global list instead of failing
    #[arg(long)]
    pub soft_update: bool,

    /// Write results to <file>.<suffix> instead of in place
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Package left untouched by the sync (repeatable)
    #[arg(long, value_name = "NAME")]
    pub exempt: Vec<String>,

    /// Report entries missing from the global list without failing;
    /// they are still dropped from the output
    #[arg(long, env = "REQSYNC_NON_STANDARD")]
    pub allow_non_standard: bool,

    /// Show what would be done without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Show detailed progress information
    #[arg(short, long)]
    pub verbose: bool,
}

/// Execute the update command
pub fn execute(args: UpdateArgs, output: &OutputConfig) -> Result<()> {
    let global_path = args.source.join("global-requirements.txt");
    let global_content = fs::read_to_string(&global_path).with_context(|| {
        format!(
            "Failed to read global requirements from {}",
            global_path.display()
        )
    })?;
    let global_reqs = requirement::parse(&global_content, false)?;

    let opts = SyncOptions {
        soft_update: args.soft_update,
        exempt: args.exempt.iter().map(|n| canonical_name(n)).collect(),
        suffix: args.suffix,
    };

    if args.dry_run {
        println!(
            "{} DRY RUN MODE - No changes will be made",
            marker(output, "🔎", "[DRY-RUN]")
        );
    }

    let project = Project::read(&args.project)
        .with_context(|| format!("Failed to read project at {}", args.project.display()))?;
    let actions = sync::update_project(&project, &global_reqs, &opts)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result =
        project::write_project(&args.project, &actions, &mut out, args.verbose, args.dry_run);
    out.flush()?;
    match result {
        Err(reqsync::Error::Sync { .. }) if args.allow_non_standard => {
            println!(
                "{} some requirements are not in the global list but we are continuing",
                marker(output, "⚠", "WARN:")
            );
            Ok(())
        }
        other => other
            .with_context(|| format!("Failed to update project at {}", args.project.display())),
    }
}
