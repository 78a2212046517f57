//! # netpeek configuration
//!
//! Layered settings for the capture engine and its front ends:
//!
//! 1. built-in defaults
//! 2. `config/netpeek.yaml`, when present
//! 3. `config/<NETPEEK_ENV>.yaml`, when present
//! 4. `NETPEEK_*` environment variables, `__` separating nested keys
//!    (`NETPEEK_EVENTS__SUBSCRIBER_CAPACITY=4096`)
//!
//! Every load is validated before it is returned.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod capture;
mod error;
mod events;
mod size;
mod telemetry;
mod validation;

pub use capture::{CaptureConfig, ALL_DEVICES};
pub use error::ConfigError;
pub use events::{EventsConfig, HistoryConfig};
pub use size::parse_size;
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/netpeek.yaml";
const ENV_PREFIX: &str = "NETPEEK_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct NetpeekConfig {
    #[validate(nested)]
    #[serde(default)]
    pub capture: CaptureConfig,

    #[validate(nested)]
    #[serde(default)]
    pub events: EventsConfig,

    #[validate(nested)]
    #[serde(default)]
    pub history: HistoryConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl NetpeekConfig {
    /// Loads defaults, the optional YAML files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(NetpeekConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        if let Ok(env) = std::env::var("NETPEEK_ENV") {
            let env_file = format!("config/{}.yaml", env);
            if Path::new(&env_file).exists() {
                figment = figment.merge(Yaml::file(env_file));
            }
        }

        Self::extract(figment)
    }

    /// Loads an explicit file over the defaults. A missing file is an error.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let figment =
            Figment::from(Serialized::defaults(NetpeekConfig::default())).merge(Yaml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }
}
