//! Decoded packet observations.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Session-unique packet identity. Never reused within one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PacketId(pub u64);

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse protocol class of a packet, most specific layer first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Arp,
    Icmp,
    Icmpv6,
    Igmp,
    Tcp,
    Udp,
    Dns,
    Dhcp,
    Ntp,
    Http,
    Tls,
    Ssh,
    Other,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Arp => "ARP",
            Protocol::Icmp => "ICMP",
            Protocol::Icmpv6 => "ICMPv6",
            Protocol::Igmp => "IGMP",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Dns => "DNS",
            Protocol::Dhcp => "DHCP",
            Protocol::Ntp => "NTP",
            Protocol::Http => "HTTP",
            Protocol::Tls => "TLS",
            Protocol::Ssh => "SSH",
            Protocol::Other => "Other",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Protocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One decoded packet, immutable once built.
///
/// Header fields that could not be decoded are left empty (`""`) or zero.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PacketSummary {
    #[serde(rename = "ID")]
    pub id: PacketId,
    pub timestamp: DateTime<Utc>,
    /// Position within the stream that produced this packet.
    pub seq_number: u64,
    /// Device filter of the producing stream.
    pub interface: String,
    #[serde(rename = "SrcIP")]
    pub src_ip: String,
    #[serde(rename = "DstIP")]
    pub dst_ip: String,
    pub src_mac: String,
    pub dst_mac: String,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: Protocol,
    /// Wire length in bytes.
    pub length: u32,
    pub bytes: Bytes,
    pub readable_data: String,
    pub info: String,
}

impl PacketSummary {
    /// Approximate heap footprint, used by byte-bounded retention.
    pub fn footprint(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.bytes.len()
            + self.readable_data.len()
            + self.info.len()
            + self.interface.len()
            + self.src_ip.len()
            + self.dst_ip.len()
            + self.src_mac.len()
            + self.dst_mac.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn summary(id: u64, payload_len: usize) -> PacketSummary {
        PacketSummary {
            id: PacketId(id),
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
            seq_number: id,
            interface: "eth0".into(),
            src_ip: "10.0.0.1".into(),
            dst_ip: "10.0.0.2".into(),
            src_mac: String::new(),
            dst_mac: String::new(),
            src_port: 0,
            dst_port: 0,
            protocol: Protocol::Other,
            length: payload_len as u32,
            bytes: Bytes::from(vec![0u8; payload_len]),
            readable_data: String::new(),
            info: String::new(),
        }
    }

    #[test]
    fn serializes_with_ui_field_names() {
        let value = serde_json::to_value(summary(7, 4)).unwrap();
        assert_eq!(value["ID"], 7);
        assert_eq!(value["SeqNumber"], 7);
        assert_eq!(value["SrcIP"], "10.0.0.1");
        assert_eq!(value["Protocol"], "Other");
        assert!(value.get("ReadableData").is_some());
    }

    #[test]
    fn footprint_grows_with_payload() {
        assert!(summary(1, 1500).footprint() > summary(1, 10).footprint());
    }
}
