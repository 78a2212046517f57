//! Log subscriber setup.
//!
//! `RUST_LOG` wins over the configured level so a single run can be turned up
//! without touching configuration files.

use std::str::FromStr;

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::TelemetryError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

/// `RUST_LOG` if set and valid, otherwise `level`.
pub fn env_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| TelemetryError::Filter(e.to_string())),
    }
}

/// Installs the global subscriber. Fails instead of panicking when one is already set.
pub fn init(level: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let filter = env_filter(level)?;
    // stdout carries command output.
    let builder = fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    installed.map_err(|e| TelemetryError::Install(e.to_string()))?;

    tracing::debug!(?format, "Logging initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(TelemetryError::UnknownFormat(_))
        ));
    }

    #[test]
    fn rejects_malformed_level() {
        if std::env::var("RUST_LOG").is_err() {
            assert!(matches!(
                env_filter("netpeek=loud"),
                Err(TelemetryError::Filter(_))
            ));
        }
    }
}
