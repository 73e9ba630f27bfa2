//! `roomstate validate`

use anyhow::Result;
use roomstate_core::validate::ValidationMode;
use roomstate_core::{StateShapeValidator, StoreConfig};
use std::path::Path;

/// Validate a room state file and print the report.
///
/// `assert` (or `validation.mode = "assert"`) turns an invalid state into
/// an error. With validation off the report is still produced, silently.
pub fn run(path: &Path, assert: bool, config: &StoreConfig) -> Result<String> {
    let state = crate::read_json(path)?;
    let mode = if assert {
        ValidationMode::Assert
    } else {
        config.validation.mode
    };

    let validator = StateShapeValidator::room();
    let context = path.display().to_string();
    let report = match validator.check(&state, mode, Some(&context))? {
        Some(report) => report,
        None => validator.validate(&state),
    };
    crate::to_pretty(&report)
}
