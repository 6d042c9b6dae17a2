//! # reqsync CLI
//!
//! Binary entry point for the `reqsync` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Handling top-level application errors and translating them into
//!   user-friendly output.
//!
//! The policy and sync logic lives in the library crate; the binary is a
//! thin wrapper around it. A run that found policy violations exits
//! nonzero after printing every violation.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
