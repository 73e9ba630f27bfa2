//! Unified error type for the room state engine
//!
//! Merge, pagination, ordering and streaming operations never fail: they
//! degrade on malformed input and log what they dropped. The variants here
//! cover the few places that do fail: the fail-fast state assertion,
//! configuration loading, and (de)serialization at the JSON boundary.

use serde::{Deserialize, Serialize};

/// Unified error type for all roomstate operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum StoreError {
    /// Invalid input
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Room state failed structural validation
    #[error("{message}")]
    InvalidState {
        /// Call site that requested the assertion, if any
        context: Option<String>,
        /// Aggregated missing properties and errors
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Filesystem error while reading configuration
    #[error("IO error: {message}")]
    Io {
        /// Error message describing the IO failure
        message: String,
    },
}

impl StoreError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an invalid-state error from an already formatted message
    pub fn invalid_state(context: Option<&str>, message: impl Into<String>) -> Self {
        Self::InvalidState {
            context: context.map(str::to_string),
            message: message.into(),
        }
    }

    /// Whether this error came from the state-shape assertion
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

/// Standard Result type for roomstate operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Invalid TOML: {err}"))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}
