//! CLI configuration loading
//!
//! `--config` defaults to [`DEFAULT_CONFIG_PATH`]. A missing default file
//! means built-in defaults; a missing file named explicitly is an error.

use anyhow::{bail, Result};
use roomstate_core::StoreConfig;
use std::path::Path;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = ".roomstate/config.toml";

/// Load the layered configuration for this invocation.
pub fn load_config(explicit: Option<&Path>) -> Result<StoreConfig> {
    let file = match explicit {
        Some(path) if !path.exists() => {
            bail!("Config file not found: {}", path.display());
        }
        Some(path) => Some(path),
        None => Some(Path::new(DEFAULT_CONFIG_PATH)).filter(|path| path.exists()),
    };

    Ok(StoreConfig::load_layered(file)?)
}

/// Effective configuration rendered as TOML.
pub fn render(config: &StoreConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
