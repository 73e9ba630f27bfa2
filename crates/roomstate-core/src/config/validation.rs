//! Accumulating configuration validator

use crate::errors::StoreError;
use std::fmt;

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Value is out of the accepted range
    OutOfRange {
        /// Dotted field name
        field: String,
        /// Inclusive lower bound
        min: String,
        /// Inclusive upper bound
        max: String,
        /// Offending value
        actual: String,
    },
    /// Value is not one of the accepted choices
    NotOneOf {
        /// Dotted field name
        field: String,
        /// Accepted values
        expected: Vec<String>,
        /// Offending value
        actual: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                field,
                min,
                max,
                actual,
            } => write!(f, "Field '{field}' must be between {min} and {max} (got {actual})"),
            Self::NotOneOf {
                field,
                expected,
                actual,
            } => write!(
                f,
                "Field '{field}' must be one of {} (got '{actual}')",
                expected.join(", ")
            ),
        }
    }
}

/// Collects every validation error instead of stopping at the first.
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
}

impl ConfigValidator {
    /// Create an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `min <= value <= max`.
    pub fn range<T>(&mut self, field: &str, value: T, min: T, max: T) -> &mut Self
    where
        T: PartialOrd + fmt::Display,
    {
        if value < min || value > max {
            self.errors.push(ValidationError::OutOfRange {
                field: field.to_string(),
                min: min.to_string(),
                max: max.to_string(),
                actual: value.to_string(),
            });
        }
        self
    }

    /// Require `value` (case-insensitive) to be one of `choices`.
    pub fn one_of(&mut self, field: &str, value: &str, choices: &[&str]) -> &mut Self {
        if !choices.iter().any(|c| c.eq_ignore_ascii_case(value.trim())) {
            self.errors.push(ValidationError::NotOneOf {
                field: field.to_string(),
                expected: choices.iter().map(|c| (*c).to_string()).collect(),
                actual: value.to_string(),
            });
        }
        self
    }

    /// Every error collected so far.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// `Ok` when nothing failed, otherwise one config error listing all failures.
    pub fn finish(self) -> Result<(), StoreError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let message = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(StoreError::config(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_errors() {
        let mut validator = ConfigValidator::new();
        validator
            .range("slug.disambiguator_len", 0usize, 1, 64)
            .one_of("logging.level", "loud", &["info", "debug"])
            .range("ok", 3, 1, 5);
        assert_eq!(validator.errors().len(), 2);

        let err = validator.finish().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Config error: Field 'slug.disambiguator_len' must be between 1 and 64 (got 0); \
             Field 'logging.level' must be one of info, debug (got 'loud')"
        );
    }

    #[test]
    fn test_one_of_ignores_case() {
        let mut validator = ConfigValidator::new();
        validator.one_of("logging.level", "DEBUG", &["debug"]);
        assert!(validator.finish().is_ok());
    }
}
