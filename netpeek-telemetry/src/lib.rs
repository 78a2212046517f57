//! # netpeek telemetry
//!
//! Log subscriber installation and Prometheus metrics.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::LogFormat;
pub use metrics::MetricsRecorder;
