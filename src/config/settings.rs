//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::time::Duration;

use serde::Deserialize;

use crate::assembly::{ConversionOptions, DEFAULT_PRODUCT_NAME};
use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Conversion settings.
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let conversion = &self.conversion;

        if conversion.product_name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "product_name must not be empty".to_string(),
            });
        }

        if conversion.fetch_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError {
                message: "fetch_timeout_secs must be positive; omit it to wait indefinitely"
                    .to_string(),
            });
        }

        for (name, color) in [
            ("board_color", conversion.board_color),
            ("component_color", conversion.component_color),
        ] {
            if color.iter().any(|c| !(0.0..=1.0).contains(c)) {
                return Err(ConfigError::ValidationError {
                    message: format!("{name} components must be between 0 and 1, got {color:?}"),
                });
            }
        }

        if !(conversion.default_component_height.is_finite()
            && conversion.default_component_height > 0.0)
        {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "default_component_height must be positive, got {}",
                    conversion.default_component_height
                ),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }
        Ok(())
    }
}

/// Conversion defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionConfig {
    /// Product and board solid name.
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Emit component geometry.
    #[serde(default = "default_true")]
    pub include_components: bool,

    /// Resolve external STEP model references.
    #[serde(default = "default_true")]
    pub include_external_models: bool,

    /// Seconds to wait for each model fetch. `null` waits indefinitely.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: Option<u64>,

    /// Board colour, RGB in `0..=1`.
    #[serde(default = "default_board_color")]
    pub board_color: [f64; 3],

    /// Component colour, RGB in `0..=1`.
    #[serde(default = "default_component_color")]
    pub component_color: [f64; 3],

    /// Height of fallback component boxes in mm.
    #[serde(default = "default_component_height")]
    pub default_component_height: f64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            include_components: default_true(),
            include_external_models: default_true(),
            fetch_timeout_secs: default_fetch_timeout(),
            board_color: default_board_color(),
            component_color: default_component_color(),
            default_component_height: default_component_height(),
        }
    }
}

impl ConversionConfig {
    /// Builds conversion options from these settings.
    #[must_use]
    pub fn to_options(&self) -> ConversionOptions {
        ConversionOptions {
            product_name: self.product_name.clone(),
            include_components: self.include_components,
            include_external_models: self.include_external_models,
            fetch_timeout: self.fetch_timeout_secs.map(Duration::from_secs),
            board_color: self.board_color,
            component_color: self.component_color,
            default_component_height: self.default_component_height,
            ..ConversionOptions::default()
        }
    }
}

fn default_product_name() -> String {
    DEFAULT_PRODUCT_NAME.to_string()
}

const fn default_true() -> bool {
    true
}

#[allow(clippy::unnecessary_wraps)] // serde default must match the field type
const fn default_fetch_timeout() -> Option<u64> {
    Some(30)
}

fn default_board_color() -> [f64; 3] {
    ConversionOptions::default().board_color
}

fn default_component_color() -> [f64; 3] {
    ConversionOptions::default().component_color
}

const fn default_component_height() -> f64 {
    1.0
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
