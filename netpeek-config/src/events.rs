//! Event fan-out and packet retention.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::size::deserialize_optional_size;

/// Broadcaster sizing.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct EventsConfig {
    /// Queue bound per subscriber. A full queue drops its oldest summary.
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1, max = 1048576))]
    pub subscriber_capacity: usize,
}

fn default_capacity() -> usize {
    1024
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: default_capacity(),
        }
    }
}

/// Retained packet history for inspection.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct HistoryConfig {
    #[serde(default = "default_max_packets")]
    #[validate(range(min = 1, max = 10000000))]
    pub max_packets: usize,

    /// Optional memory cap, e.g. `"64MiB"`.
    #[serde(default, deserialize_with = "deserialize_optional_size")]
    #[validate(range(min = 1))]
    pub max_bytes: Option<usize>,
}

fn default_max_packets() -> usize {
    10_000
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_packets: default_max_packets(),
            max_bytes: None,
        }
    }
}
