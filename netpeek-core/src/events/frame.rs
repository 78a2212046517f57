//! Raw link-layer frames as handed over by a capture driver.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Link-layer header type of a capture stream.
///
/// Values follow the pcap `DLT_*` numbering returned by `pcap_datalink`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// BSD loopback encapsulation, 4-byte address family in host byte order.
    Null,
    Ethernet,
    /// Raw IPv4/IPv6 without a link header.
    Raw,
    /// Linux "cooked" capture, used by the `any` pseudo-device.
    LinuxSll,
    LinuxSll2,
    Unknown(i32),
}

impl LinkType {
    pub fn from_dlt(value: i32) -> Self {
        match value {
            0 => LinkType::Null,
            1 => LinkType::Ethernet,
            12 | 14 | 101 => LinkType::Raw,
            113 => LinkType::LinuxSll,
            276 => LinkType::LinuxSll2,
            other => LinkType::Unknown(other),
        }
    }

    pub fn dlt(&self) -> i32 {
        match self {
            LinkType::Null => 0,
            LinkType::Ethernet => 1,
            LinkType::Raw => 101,
            LinkType::LinuxSll => 113,
            LinkType::LinuxSll2 => 276,
            LinkType::Unknown(value) => *value,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Null => write!(f, "NULL"),
            LinkType::Ethernet => write!(f, "EN10MB"),
            LinkType::Raw => write!(f, "RAW"),
            LinkType::LinuxSll => write!(f, "LINUX_SLL"),
            LinkType::LinuxSll2 => write!(f, "LINUX_SLL2"),
            LinkType::Unknown(value) => write!(f, "DLT({})", value),
        }
    }
}

/// One captured frame, owned.
///
/// `data` is copied out of the driver's buffer when the frame is produced, so
/// nothing downstream ever borrows memory the driver may reuse.
#[derive(Clone, Debug)]
pub struct RawFrame {
    /// Label of the stream the frame came from (`"all"` or an interface name).
    pub interface: Arc<str>,
    pub link_type: LinkType,
    pub captured_at: DateTime<Utc>,
    /// Length on the wire; may exceed `data.len()` when the snapshot length truncated the frame.
    pub wire_len: u32,
    pub data: Bytes,
}

impl RawFrame {
    pub fn new(
        interface: Arc<str>,
        link_type: LinkType,
        captured_at: DateTime<Utc>,
        data: Bytes,
    ) -> Self {
        let wire_len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self {
            interface,
            link_type,
            captured_at,
            wire_len,
            data,
        }
    }

    /// Copies `data` out of a borrowed driver buffer.
    pub fn copy_from_slice(
        interface: Arc<str>,
        link_type: LinkType,
        captured_at: DateTime<Utc>,
        wire_len: u32,
        data: &[u8],
    ) -> Self {
        Self {
            interface,
            link_type,
            captured_at,
            wire_len,
            data: Bytes::copy_from_slice(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dlt_values_map_to_link_types() {
        assert_eq!(LinkType::from_dlt(1), LinkType::Ethernet);
        assert_eq!(LinkType::from_dlt(113), LinkType::LinuxSll);
        assert_eq!(LinkType::from_dlt(12), LinkType::Raw);
        assert_eq!(LinkType::from_dlt(147), LinkType::Unknown(147));
        assert_eq!(LinkType::Unknown(147).dlt(), 147);
    }

    #[test]
    fn copied_frame_does_not_alias_source() {
        let mut buffer = vec![1u8, 2, 3];
        let frame = RawFrame::copy_from_slice(
            Arc::from("eth0"),
            LinkType::Ethernet,
            Utc::now(),
            3,
            &buffer,
        );
        buffer[0] = 9;
        assert_eq!(frame.data.as_ref(), &[1, 2, 3]);
    }
}
