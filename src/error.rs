//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `reqsync` application. It uses the `thiserror` library to create an
//! `Error` enum covering the failure modes of the requirement grammar and
//! the synchronization engine.
//!
//! Two kinds of failure exist in this tool and only one of them lives here:
//!
//! - **Structural errors** (malformed specifier, disallowed inline URL,
//!   unreadable file) are represented by `Error` variants and propagate
//!   with `?`. A corrupt line invalidates position tracking for the rest
//!   of the file, so there is no partial-line recovery.
//!
//! - **Policy violations** (missing lower bound, exclusion not in the
//!   global list, coverage gaps, ...) are *not* errors. They accumulate as
//!   diagnostic strings so a single run reports every problem at once; see
//!   the `check` and `constraints` modules.

use thiserror::Error;

/// Main error type for reqsync operations
#[derive(Error, Debug)]
pub enum Error {
    /// A requirement line could not be parsed.
    ///
    /// Includes the offending line and the specific grammar issue.
    #[error("Cannot parse requirement line {line:?}: {message}")]
    RequirementParse { line: String, message: String },

    /// A version specifier set was rejected by the PEP 440 parser.
    #[error("Invalid specifier set {value:?}: {message}")]
    Specifier { value: String, message: String },

    /// A version string was rejected by the PEP 440 parser.
    #[error("Invalid version {value:?}: {message}")]
    Version { value: String, message: String },

    /// Synchronization produced one or more `Error` actions for a project.
    ///
    /// The individual messages have already been written to the output
    /// stream by the action dispatcher.
    #[error("Errors occurred processing {root}")]
    Sync { root: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
