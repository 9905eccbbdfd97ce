//! Error types for pcb-step-export.
//!
//! Only [`ConversionError`] aborts a conversion. Per-component failures
//! ([`crate::merge::ModelError`], [`crate::mesh::MeshError`]) become
//! warnings on the [`crate::assembly::Conversion`].

use std::path::PathBuf;

use thiserror::Error;

use crate::board::BoardError;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Fatal conversion errors.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The board cannot be resolved from the input and options.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is missing or invalid.
        message: String,
    },

    /// The board geometry is invalid.
    #[error("invalid board: {0}")]
    Board(#[from] BoardError),
}

impl ConversionError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn conversion_error_display() {
        let error = ConversionError::configuration("board dimensions are missing");
        assert_eq!(
            error.to_string(),
            "configuration error: board dimensions are missing"
        );

        let error = ConversionError::from(BoardError::InvalidThickness { thickness: -1.0 });
        assert!(error.to_string().contains("-1"));
    }
}
