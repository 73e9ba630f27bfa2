//! Engine configuration
//!
//! Settings are layered: defaults, then a TOML or JSON file, then
//! `ROOMSTATE_*` environment variables, then explicit `key = value`
//! overrides (the CLI's flags). [`StoreConfig::validate`] reports every
//! problem at once.

mod validation;

pub use validation::{ConfigValidator, ValidationError};

use crate::collection::PaginateOptions;
use crate::errors::{Result, StoreError};
use crate::merge::ArrayPolicy;
use crate::slug::DEFAULT_DISAMBIGUATOR_LEN;
use crate::staleness::SequenceGuard;
use crate::validate::ValidationMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Log levels accepted by `logging.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Environment variables and the keys they set.
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("ROOMSTATE_ARRAY_POLICY", "merge.array_policy"),
    ("ROOMSTATE_SLUG_DISAMBIGUATOR_LEN", "slug.disambiguator_len"),
    ("ROOMSTATE_VALIDATION_MODE", "validation.mode"),
    ("ROOMSTATE_STALENESS_ENABLED", "staleness.enabled"),
    ("ROOMSTATE_LOG_LEVEL", "logging.level"),
];

/// A configuration that can be assembled from layered sources.
pub trait LayeredConfig: Sized + Default {
    /// Load from a file, picking the format from its extension.
    fn load_from_file(path: &Path) -> Result<Self>;

    /// Apply a single dotted `key = value` override.
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Check every setting.
    fn validate(&self) -> Result<()>;

    /// Apply overrides from `(name, value)` environment pairs.
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>;

    /// Apply overrides from the process environment.
    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }
}

// ============================================================================
// Sections
// ============================================================================

/// `[merge]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// How deep merges treat arrays
    pub array_policy: ArrayPolicy,
}

/// `[slug]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlugConfig {
    /// Id characters appended to a colliding slug
    pub disambiguator_len: usize,
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            disambiguator_len: DEFAULT_DISAMBIGUATOR_LEN,
        }
    }
}

/// `[validation]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// When and how the state validator runs
    pub mode: ValidationMode,
}

/// `[staleness]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StalenessConfig {
    /// Reject payloads older than the applied one
    pub enabled: bool,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// Store configuration
// ============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Merge behavior
    pub merge: MergeConfig,
    /// Slug derivation
    pub slug: SlugConfig,
    /// State validation
    pub validation: ValidationConfig,
    /// Out-of-order protection
    pub staleness: StalenessConfig,
    /// Log output
    pub logging: LoggingConfig,
}

impl StoreConfig {
    /// Defaults, then `file` (if given), then the environment; validated.
    pub fn load_layered(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Pagination options honoring the slug settings.
    pub fn paginate_options(&self, by_name: bool) -> PaginateOptions {
        PaginateOptions {
            by_name,
            disambiguator_len: self.slug.disambiguator_len,
        }
    }

    /// Sequence guard honoring `staleness.enabled`.
    pub fn sequence_guard(&self) -> SequenceGuard {
        SequenceGuard::with_enabled(self.staleness.enabled)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(StoreError::config(format!("Invalid boolean for {key}: '{value}'"))),
    }
}

impl LayeredConfig for StoreConfig {
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            StoreError::config(format!("Failed to read {}: {err}", path.display()))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => serde_json::from_str(&content)
                .map_err(|err| StoreError::config(format!("Invalid JSON: {err}"))),
            _ => Err(StoreError::config(format!(
                "Unsupported config format: {}",
                path.display()
            ))),
        }
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key.replace('-', "_").as_str() {
            "merge.array_policy" => {
                self.merge.array_policy = value.parse().map_err(StoreError::config)?;
            }
            "slug.disambiguator_len" => {
                self.slug.disambiguator_len = value.trim().parse().map_err(|_| {
                    StoreError::config(format!("Invalid number for {key}: '{value}'"))
                })?;
            }
            "validation.mode" => {
                self.validation.mode = value.parse().map_err(StoreError::config)?;
            }
            "staleness.enabled" => self.staleness.enabled = parse_bool(key, value)?,
            "logging.level" => self.logging.level = value.trim().to_ascii_lowercase(),
            _ => return Err(StoreError::config(format!("Unknown configuration key: {key}"))),
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let mut validator = ConfigValidator::new();
        validator
            .range("slug.disambiguator_len", self.slug.disambiguator_len, 1, 64)
            .one_of("logging.level", &self.logging.level, LOG_LEVELS);
        validator.finish()
    }

    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if let Some((_, key)) = ENV_KEYS.iter().find(|(env, _)| *env == name) {
                self.set_from_string(key, &value)?;
                tracing::debug!(%name, key, "config override from environment");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.merge.array_policy, ArrayPolicy::Replace);
        assert_eq!(config.slug.disambiguator_len, 5);
        assert_eq!(config.validation.mode, ValidationMode::Log);
        assert!(!config.staleness.enabled);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[merge]\narray_policy = \"merge-by-index\"\n\n[validation]\nmode = \"assert\""
        )
        .unwrap();

        let config = StoreConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.merge.array_policy, ArrayPolicy::MergeByIndex);
        assert_eq!(config.validation.mode, ValidationMode::Assert);
        assert_eq!(config.slug.disambiguator_len, 5);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"staleness": {{"enabled": true}}}}"#).unwrap();
        let config = StoreConfig::load_from_file(file.path()).unwrap();
        assert!(config.staleness.enabled);
        assert!(config.sequence_guard().is_enabled());
    }

    #[test]
    fn test_unknown_key_and_format_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[merge]\npolicy = \"replace\"").unwrap();
        assert!(StoreConfig::load_from_file(file.path()).is_err());

        let yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = StoreConfig::load_from_file(yaml.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported config format"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = StoreConfig::default();
        config
            .merge_with_vars(vars(&[
                ("ROOMSTATE_ARRAY_POLICY", "merge-by-index"),
                ("ROOMSTATE_SLUG_DISAMBIGUATOR_LEN", "8"),
                ("ROOMSTATE_STALENESS_ENABLED", "yes"),
                ("UNRELATED", "x"),
            ]))
            .unwrap();

        assert_eq!(config.merge.array_policy, ArrayPolicy::MergeByIndex);
        assert_eq!(config.paginate_options(true).disambiguator_len, 8);
        assert!(config.staleness.enabled);

        let err = config
            .merge_with_vars(vars(&[("ROOMSTATE_VALIDATION_MODE", "strict")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Config { .. }));
    }

    #[test]
    fn test_validate_reports_all_problems() {
        let mut config = StoreConfig::default();
        config.set_from_string("slug.disambiguator-len", "0").unwrap();
        config.set_from_string("logging.level", "chatty").unwrap();

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("slug.disambiguator_len"));
        assert!(message.contains("logging.level"));
        assert!(config.set_from_string("nope", "1").is_err());
    }
}
