//! Live capture parameters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

pub const ALL_DEVICES: &str = "all";

/// Packet capture configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Device filter used when none is given on the command line.
    #[validate(custom(function = validation::validate_device))]
    #[serde(default = "default_device")]
    pub default_device: String,

    /// Snapshot length in bytes.
    #[validate(range(min = 64, max = 262144))]
    #[serde(default = "default_snaplen")]
    pub snaplen: u32,

    #[serde(default)]
    pub promiscuous: bool,

    /// Driver read timeout; also bounds how quickly a stopped stream is noticed.
    #[validate(range(min = 1, max = 5000))]
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u32,

    /// BPF expression applied to every opened stream.
    #[validate(length(min = 1))]
    #[serde(default)]
    pub bpf_filter: Option<String>,
}

fn default_device() -> String {
    ALL_DEVICES.into()
}

fn default_snaplen() -> u32 {
    4096
}

fn default_read_timeout() -> u32 {
    100
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_device: default_device(),
            snaplen: default_snaplen(),
            promiscuous: false,
            read_timeout_ms: default_read_timeout(),
            bpf_filter: None,
        }
    }
}
