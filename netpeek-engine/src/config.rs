//! Translation from loaded configuration to engine and driver settings.

use netpeek_capture::{CaptureOptions, DeviceFilter};
use netpeek_config::NetpeekConfig;
use netpeek_core::events::RetentionPolicy;

use crate::session::SessionOptions;

impl From<&NetpeekConfig> for SessionOptions {
    fn from(config: &NetpeekConfig) -> Self {
        Self {
            subscriber_capacity: config.events.subscriber_capacity,
            retention: RetentionPolicy {
                max_packets: config.history.max_packets,
                max_bytes: config.history.max_bytes,
            },
        }
    }
}

/// Driver parameters for live capture.
pub fn capture_options(config: &NetpeekConfig) -> CaptureOptions {
    CaptureOptions {
        snaplen: i32::try_from(config.capture.snaplen).unwrap_or(i32::MAX),
        promiscuous: config.capture.promiscuous,
        read_timeout_ms: i32::try_from(config.capture.read_timeout_ms).unwrap_or(i32::MAX),
        bpf_filter: config.capture.bpf_filter.clone(),
    }
}

pub fn default_device(config: &NetpeekConfig) -> DeviceFilter {
    DeviceFilter::from(config.capture.default_device.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_config_sections() {
        let mut config = NetpeekConfig::default();
        config.events.subscriber_capacity = 64;
        config.history.max_bytes = Some(1 << 20);
        config.capture.bpf_filter = Some("udp".into());

        let options = SessionOptions::from(&config);
        assert_eq!(options.subscriber_capacity, 64);
        assert_eq!(options.retention.max_bytes, Some(1 << 20));

        let capture = capture_options(&config);
        assert_eq!(capture.snaplen, 4096);
        assert_eq!(capture.read_timeout_ms, 100);
        assert_eq!(capture.bpf_filter.as_deref(), Some("udp"));

        assert_eq!(default_device(&config), DeviceFilter::All);
    }
}
