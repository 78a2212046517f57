//! Raw frame to [`PacketSummary`].
//!
//! Decoding walks link → network → transport and stops at the first layer it
//! cannot read. Whatever was decoded up to that point is kept; missing fields stay
//! empty or zero. Nothing here returns an error.

use netpeek_core::events::{LinkType, PacketId, PacketSummary, Protocol, RawFrame};

use crate::link::{self, format_mac, LinkHeader};
use crate::network::{self, NetworkHeader};
use crate::render::{self, hexdump};
use crate::transport::{self, TransportHeader};

/// Headers recovered from one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layers<'a> {
    pub link: Option<LinkHeader>,
    pub network: Option<NetworkHeader>,
    pub transport: Option<TransportHeader>,
    /// Bytes after the innermost decoded header.
    pub payload: &'a [u8],
}

impl Layers<'_> {
    /// Most specific classification available: transport service, then network class.
    pub fn protocol(&self) -> Protocol {
        if let Some(transport) = &self.transport {
            return transport.protocol();
        }
        match &self.network {
            Some(NetworkHeader::Arp { .. }) => Protocol::Arp,
            Some(header) => match header.transport_protocol() {
                Some(network::IPPROTO_TCP) => Protocol::Tcp,
                Some(network::IPPROTO_UDP) => Protocol::Udp,
                Some(network::IPPROTO_ICMP) => Protocol::Icmp,
                Some(network::IPPROTO_ICMPV6) => Protocol::Icmpv6,
                Some(network::IPPROTO_IGMP) => Protocol::Igmp,
                _ => Protocol::Other,
            },
            None => Protocol::Other,
        }
    }

    fn kind(&self) -> String {
        match &self.transport {
            Some(transport) => transport.kind(),
            None => format!("{} Packet", self.protocol()),
        }
    }
}

/// Splits `data` into the headers this crate understands.
pub fn dissect(link_type: LinkType, data: &[u8]) -> Layers<'_> {
    let mut layers = Layers {
        payload: data,
        ..Layers::default()
    };

    let Some((link, rest)) = link::parse(link_type, data) else {
        return layers;
    };
    let ethertype = link.ethertype;
    layers.link = Some(link);
    layers.payload = rest;

    let Some((network, rest)) = ethertype.and_then(|ethertype| network::parse(ethertype, rest))
    else {
        return layers;
    };
    let protocol = network.transport_protocol();
    layers.network = Some(network);
    layers.payload = rest;

    if let Some((transport, rest)) = protocol.and_then(|protocol| transport::parse(protocol, rest)) {
        layers.transport = Some(transport);
        layers.payload = rest;
    }

    layers
}

/// Decodes `frame` into a summary numbered `id` / `seq_number`.
pub fn decode(frame: &RawFrame, id: PacketId, seq_number: u64) -> PacketSummary {
    let layers = dissect(frame.link_type, &frame.data);

    let (src_ip, dst_ip) = match &layers.network {
        Some(network) => {
            let (src, dst) = network.endpoints();
            (
                src.map(|ip| ip.to_string()).unwrap_or_default(),
                dst.map(|ip| ip.to_string()).unwrap_or_default(),
            )
        }
        None => (String::new(), String::new()),
    };
    let (src_mac, dst_mac) = match &layers.link {
        Some(link) => (
            link.src_mac.as_ref().map(format_mac).unwrap_or_default(),
            link.dst_mac.as_ref().map(format_mac).unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };
    let (src_port, dst_port) = layers
        .transport
        .as_ref()
        .map(TransportHeader::ports)
        .unwrap_or_default();

    let protocol = layers.protocol();
    let info = info_line(&layers.kind(), &src_ip, &dst_ip, protocol, frame.wire_len);
    let readable_data = readable(&layers, frame);

    PacketSummary {
        id,
        timestamp: frame.captured_at,
        seq_number,
        interface: frame.interface.to_string(),
        src_ip,
        dst_ip,
        src_mac,
        dst_mac,
        src_port,
        dst_port,
        protocol,
        length: frame.wire_len,
        bytes: frame.data.clone(),
        readable_data,
        info,
    }
}

fn info_line(kind: &str, src_ip: &str, dst_ip: &str, protocol: Protocol, length: u32) -> String {
    if src_ip.is_empty() && dst_ip.is_empty() {
        format!("{} [{}] ({} bytes)", kind, protocol, length)
    } else {
        format!(
            "{} {} -> {} [{}] ({} bytes)",
            kind, src_ip, dst_ip, protocol, length
        )
    }
}

fn readable(layers: &Layers<'_>, frame: &RawFrame) -> String {
    let mut lines = Vec::with_capacity(5);
    match &layers.link {
        Some(link) => lines.push(render::link_line(link)),
        None => lines.push(format!("{:<10}{} frame not decoded", "Link", frame.link_type)),
    }
    if let Some(network) = &layers.network {
        lines.push(render::network_line(network));
    }
    if let Some(transport) = &layers.transport {
        lines.push(render::transport_line(transport));
    }
    lines.push(format!("{:<10}{} bytes", "Payload", layers.payload.len()));

    let mut out = lines.join("\n");
    out.push_str("\n\n");
    out.push_str(&hexdump(&frame.data));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::sync::Arc;

    // Ethernet / IPv4 / TCP SYN 10.0.0.1:51000 -> 93.184.216.34:80.
    const TCP_SYN: &str = concat!(
        "00155d010203", "00155d040506", "0800",
        "4500002800014000400600000a0000015db8d822",
        "c738005000000064000000005002faf000000000",
    );

    // Ethernet / IPv4 / UDP DNS query 192.168.1.5:53000 -> 192.168.1.1:53, 4 payload bytes.
    const UDP_DNS: &str = concat!(
        "00155d010203", "00155d040506", "0800",
        "450000200002400040110000c0a80105c0a80101",
        "cf080035000c0000", "12340100",
    );

    fn frame(link_type: LinkType, hex_data: &str) -> RawFrame {
        RawFrame::new(
            Arc::from("eth0"),
            link_type,
            DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            hex::decode(hex_data).unwrap().into(),
        )
    }

    #[test]
    fn tcp_syn_summary() {
        let summary = decode(&frame(LinkType::Ethernet, TCP_SYN), PacketId(9), 3);

        assert_eq!(summary.id, PacketId(9));
        assert_eq!(summary.seq_number, 3);
        assert_eq!(summary.interface, "eth0");
        assert_eq!(summary.src_mac, "00:15:5d:04:05:06");
        assert_eq!(summary.dst_mac, "00:15:5d:01:02:03");
        assert_eq!(summary.src_ip, "10.0.0.1");
        assert_eq!(summary.dst_ip, "93.184.216.34");
        assert_eq!((summary.src_port, summary.dst_port), (51000, 80));
        assert_eq!(summary.protocol, Protocol::Http);
        assert_eq!(summary.length, 54);
        assert_eq!(
            summary.info,
            "SYN Packet 10.0.0.1 -> 93.184.216.34 [HTTP] (54 bytes)"
        );
        assert!(summary.readable_data.contains("flags [SYN]"));
        assert!(summary.readable_data.contains("00000000  00 15 5d 01 02 03"));
    }

    #[test]
    fn udp_dns_summary() {
        let summary = decode(&frame(LinkType::Ethernet, UDP_DNS), PacketId(1), 1);
        assert_eq!(summary.protocol, Protocol::Dns);
        assert_eq!((summary.src_port, summary.dst_port), (53000, 53));
        assert_eq!(
            summary.info,
            "DNS Packet 192.168.1.5 -> 192.168.1.1 [DNS] (46 bytes)"
        );
        assert!(summary.readable_data.contains("Payload   4 bytes"));
    }

    #[test]
    fn truncated_link_header_yields_empty_fields() {
        let summary = decode(&frame(LinkType::Ethernet, "0011223344556677"), PacketId(1), 1);
        assert_eq!(summary.src_mac, "");
        assert_eq!(summary.dst_mac, "");
        assert_eq!(summary.src_ip, "");
        assert_eq!(summary.dst_ip, "");
        assert_eq!((summary.src_port, summary.dst_port), (0, 0));
        assert_eq!(summary.protocol, Protocol::Other);
        assert_eq!(summary.length, 8);
        assert_eq!(summary.bytes.len(), 8);
        assert_eq!(summary.info, "Other Packet [Other] (8 bytes)");
    }

    #[test]
    fn truncated_transport_keeps_network_fields() {
        // Cut the TCP header after the ports.
        let cut = &TCP_SYN[..(14 + 20 + 4) * 2];
        let summary = decode(&frame(LinkType::Ethernet, cut), PacketId(1), 1);
        assert_eq!(summary.src_ip, "10.0.0.1");
        assert_eq!((summary.src_port, summary.dst_port), (0, 0));
        assert_eq!(summary.protocol, Protocol::Tcp);
        assert_eq!(summary.info, "TCP Packet 10.0.0.1 -> 93.184.216.34 [TCP] (38 bytes)");
    }

    #[test]
    fn arp_reply_over_ethernet() {
        let data = concat!(
            "ffffffffffff", "001122334455", "0806",
            "0001080006040002", "001122334455c0a80101", "66778899aabbc0a80102",
        );
        let summary = decode(&frame(LinkType::Ethernet, data), PacketId(1), 1);
        assert_eq!(summary.protocol, Protocol::Arp);
        assert_eq!(summary.src_ip, "192.168.1.1");
        assert_eq!(summary.dst_ip, "192.168.1.2");
        assert!(summary.info.starts_with("ARP Packet 192.168.1.1 -> 192.168.1.2 [ARP]"));
    }

    #[test]
    fn raw_ip_icmp_echo() {
        let data = concat!(
            "4500001c00030000400100000a0000010a000002",
            "0800f7ff00000000",
        );
        let summary = decode(&frame(LinkType::Raw, data), PacketId(1), 1);
        assert_eq!(summary.protocol, Protocol::Icmp);
        assert_eq!(summary.src_mac, "");
        assert!(summary.info.starts_with("Echo request 10.0.0.1 -> 10.0.0.2 [ICMP]"));
    }

    #[test]
    fn unknown_link_type_keeps_bytes() {
        let summary = decode(&frame(LinkType::Unknown(147), "deadbeef"), PacketId(1), 1);
        assert_eq!(summary.protocol, Protocol::Other);
        assert!(summary.readable_data.starts_with("Link      DLT(147) frame not decoded"));
        assert_eq!(summary.bytes.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn wire_length_is_reported_for_snapped_frames() {
        let data = hex::decode(TCP_SYN).unwrap();
        let frame = RawFrame::copy_from_slice(
            Arc::from("all"),
            LinkType::Ethernet,
            Utc::now(),
            1514,
            &data,
        );
        let summary = decode(&frame, PacketId(1), 1);
        assert_eq!(summary.length, 1514);
        assert_eq!(summary.bytes.len(), data.len());
        assert_eq!(summary.interface, "all");
    }
}
