//! Roomstate CLI Library
//!
//! Command implementations behind the `roomstate` binary. Every command
//! reads JSON files, runs one engine operation and returns pretty JSON, so
//! the binary only has to parse arguments and print.

pub mod commands;
pub mod config;

pub use config::{load_config, DEFAULT_CONFIG_PATH};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Read and parse a JSON input file.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Render a value as pretty JSON.
pub fn to_pretty(value: &impl serde::Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
