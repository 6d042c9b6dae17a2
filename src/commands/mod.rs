//! CLI command implementations

pub mod check;
pub mod merge_lower;
pub mod update;
pub mod validate;
