//! # reqsync
//!
//! Keeps Python dependency declarations consistent across a fleet of
//! projects. One global requirements list is the source of truth; every
//! project's requirements files, setup.cfg extras and constraints pins
//! are checked against it or rewritten from it.
//!
//! ## Architecture
//!
//! - [`requirement`] - the requirements-file line grammar and the
//!   grouped store keyed by canonical package name
//! - [`specifiers`] - version and specifier-set math on top of PEP 440
//! - [`markers`] - the conservative environment-marker comparisons
//! - [`check`] - project validation against the global list
//! - [`constraints`] - constraints-file format, compatibility, coverage
//!   and lower-bound alignment checks
//! - [`sync`] - the rewrite engine producing [`sync::Action`]s
//! - [`extras`] - setup.cfg `[extras]` section handling
//! - [`project`] - filesystem access and action application
//! - [`error`] - the error type shared by the library
//! - [`output`] - color handling for CLI diagnostics
//!
//! Policy violations accumulate into diagnostics and never abort a run;
//! only structurally malformed input raises [`error::Error`].

pub mod check;
pub mod constraints;
pub mod error;
pub mod extras;
pub mod markers;
pub mod output;
pub mod project;
pub mod requirement;
pub mod specifiers;
pub mod sync;

#[cfg(test)]
mod requirement_proptest;

pub use error::{Error, Result};
