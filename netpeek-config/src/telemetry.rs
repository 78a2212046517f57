//! Logging configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Default level; `RUST_LOG` takes precedence when set.
    #[validate(custom(function = validation::validate_log_level))]
    #[serde(default = "default_level")]
    pub log_level: String,

    /// `pretty` or `json`.
    #[validate(custom(function = validation::validate_log_format))]
    #[serde(default = "default_format")]
    pub log_format: String,
}

fn default_level() -> String {
    "info".into()
}

fn default_format() -> String {
    "pretty".into()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_level(),
            log_format: default_format(),
        }
    }
}
