//! Subcommand implementations
//!
//! Each `run` returns the JSON to print on stdout.

pub mod merge;
pub mod paginate;
pub mod parts;
pub mod validate;
