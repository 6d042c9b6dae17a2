//! Validate command implementation
//!
//! Applies the list-level policy rules to the global requirements,
//! constraints and denylist files. Every violation is printed; the
//! command exits nonzero when any was found.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use reqsync::check;
use reqsync::constraints;
use reqsync::output::{marker, OutputConfig};
use reqsync::requirement::{self, RequirementStore};

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Global requirements file
    #[arg(value_name = "PATH", default_value = "global-requirements.txt")]
    pub global_requirements: PathBuf,

    /// Constraints file of exact pins
    #[arg(value_name = "PATH", default_value = "upper-constraints.txt")]
    pub constraints: PathBuf,

    /// File of package names managed by project teams, one per line
    #[arg(value_name = "PATH", default_value = "denylist.txt")]
    pub denylist: PathBuf,
}

fn read_store(path: &Path) -> Result<RequirementStore> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(requirement::parse(&content, false)?)
}

/// Lines whose canonical rendering differs from what was written.
fn check_uniform_formatting(content: &str) -> Result<Vec<String>> {
    let mut diagnostics = Vec::new();
    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        let req = requirement::parse_line(line, false)?;
        let normed = req.to_line(";", "", "  ", true);
        if line.trim_end() != normed.trim_end() {
            diagnostics.push(format!("-{}\n+{}", line.trim_end(), normed.trim_end()));
        }
    }
    Ok(diagnostics)
}

/// Execute the validate command
pub fn execute(args: ValidateArgs, output: &OutputConfig) -> Result<()> {
    let mut error_count = 0;
    let mut report = |heading: &str, diagnostics: Vec<String>| {
        println!("\nChecking {}", heading);
        for diagnostic in diagnostics {
            println!(
                "{} {}",
                marker(output, "✗", "FAIL:"),
                output.violation(&diagnostic)
            );
            error_count += 1;
        }
    };

    let constraints_store = read_store(&args.constraints)?;
    report(
        &format!("format of {}", args.constraints.display()),
        constraints::check_format(&constraints_store),
    );

    let global_content = fs::read_to_string(&args.global_requirements).with_context(|| {
        format!("Failed to read {}", args.global_requirements.display())
    })?;
    let global_store = requirement::parse(&global_content, false)?;
    let global_reqs = check::get_global_reqs(&global_content)?;
    report(
        &format!(
            "constraint compatibility with {}",
            args.global_requirements.display()
        ),
        constraints::check_compatible(&global_reqs, &constraints_store)?,
    );

    report(
        &format!("bounds policy on {}", args.global_requirements.display()),
        requirement::check_reqs_bounds_policy(&global_store),
    );

    report(
        &format!(
            "uniform formatting of {}",
            args.global_requirements.display()
        ),
        check_uniform_formatting(&global_content)?,
    );

    let denylist_content = fs::read_to_string(&args.denylist)
        .with_context(|| format!("Failed to read {}", args.denylist.display()))?;
    let denylist: BTreeSet<String> = check::parse_denylist(&denylist_content)?;
    report(
        &format!("coverage against {}", args.denylist.display()),
        constraints::check_coverage(&global_reqs, &constraints_store, &denylist),
    );

    if error_count > 0 {
        anyhow::bail!("{} validation problem(s) found", error_count);
    }
    println!("\n{} All lists are consistent", marker(output, "✓", "OK:"));
    Ok(())
}
