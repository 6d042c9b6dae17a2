//! Merge-lower-constraints command implementation
//!
//! Combines the lower-constraints lists of several projects into one
//! list, keeping the highest declared lower bound for each package.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use reqsync::constraints;
use reqsync::requirement::{self, RequirementStore};

/// Arguments for the merge-lower-constraints command
#[derive(Args, Debug)]
pub struct MergeLowerArgs {
    /// Lower-constraints files to merge
    #[arg(value_name = "PATH", required = true)]
    pub files: Vec<PathBuf>,
}

/// Execute the merge-lower-constraints command
pub fn execute(args: MergeLowerArgs) -> Result<()> {
    let mut stores: Vec<RequirementStore> = Vec::new();
    for path in &args.files {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        stores.push(requirement::parse(&content, false)?);
    }
    for line in constraints::merge_lower_constraints(&stores)? {
        println!("{}", line);
    }
    Ok(())
}
