use thiserror::Error;

/// Failures reported by a capture driver.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The device list could not be read or enumeration is unsupported.
    #[error("Interface enumeration failed: {0}")]
    Enumeration(String),

    #[error("Unknown capture device: {0}")]
    UnknownDevice(String),

    #[error("Permission denied opening capture on {0}")]
    PermissionDenied(String),

    #[error("Failed to open capture on {device}: {reason}")]
    Open { device: String, reason: String },

    #[error("Invalid capture filter `{filter}`: {reason}")]
    Filter { filter: String, reason: String },

    #[error("Capture read failed: {0}")]
    Read(String),

    /// The stream ended on its own (device removed, savefile exhausted).
    #[error("Capture stream on {0} ended")]
    StreamEnded(String),
}
