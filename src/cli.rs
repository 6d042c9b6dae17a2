//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use reqsync::output::OutputConfig;

use crate::commands;

/// reqsync - Keep project dependency declarations consistent
#[derive(Parser, Debug)]
#[command(name = "reqsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a project's requirements against the global list
    Check(commands::check::CheckArgs),
    /// Rewrite a project's requirements files from the global list
    Update(commands::update::UpdateArgs),
    /// Validate the global requirements and constraints files themselves
    Validate(commands::validate::ValidateArgs),
    /// Merge per-project lower-constraints files into one list
    MergeLowerConstraints(commands::merge_lower::MergeLowerArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .init();
        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Check(args) => commands::check::execute(args, &output),
            Commands::Update(args) => commands::update::execute(args, &output),
            Commands::Validate(args) => commands::validate::execute(args, &output),
            Commands::MergeLowerConstraints(args) => commands::merge_lower::execute(args),
        }
    }
}
