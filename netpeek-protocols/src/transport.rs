//! Transport layer: TCP, UDP, ICMP/ICMPv6 and IGMP headers, plus port-based
//! application classification.

use nom::number::{be_u16, be_u32, be_u8};
use nom::{IResult, Parser};

use netpeek_core::events::Protocol;

use crate::network::{IPPROTO_ICMP, IPPROTO_ICMPV6, IPPROTO_IGMP, IPPROTO_TCP, IPPROTO_UDP};

/// TCP control bits as they appear in byte 13 of the header.
pub mod tcp_flags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportHeader {
    Tcp {
        src_port: u16,
        dst_port: u16,
        seq: u32,
        ack: u32,
        flags: u8,
    },
    Udp {
        src_port: u16,
        dst_port: u16,
    },
    Icmp {
        v6: bool,
        kind: u8,
        code: u8,
    },
    Igmp {
        kind: u8,
    },
}

impl TransportHeader {
    pub fn ports(&self) -> (u16, u16) {
        match self {
            TransportHeader::Tcp {
                src_port, dst_port, ..
            }
            | TransportHeader::Udp { src_port, dst_port } => (*src_port, *dst_port),
            _ => (0, 0),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            TransportHeader::Tcp {
                src_port, dst_port, ..
            } => tcp_service(*src_port, *dst_port).unwrap_or(Protocol::Tcp),
            TransportHeader::Udp { src_port, dst_port } => {
                udp_service(*src_port, *dst_port).unwrap_or(Protocol::Udp)
            }
            TransportHeader::Icmp { v6: false, .. } => Protocol::Icmp,
            TransportHeader::Icmp { v6: true, .. } => Protocol::Icmpv6,
            TransportHeader::Igmp { .. } => Protocol::Igmp,
        }
    }

    /// Short description used as the lead of a summary's `Info`.
    pub fn kind(&self) -> String {
        match self {
            TransportHeader::Tcp { flags, .. } => tcp_kind(*flags).to_string(),
            TransportHeader::Udp { .. } => format!("{} Packet", self.protocol()),
            TransportHeader::Icmp { v6, kind, .. } => icmp_kind(*v6, *kind).to_string(),
            TransportHeader::Igmp { kind } => igmp_kind(*kind).to_string(),
        }
    }
}

fn tcp_kind(flags: u8) -> &'static str {
    use self::tcp_flags::*;
    if flags & SYN != 0 && flags & ACK != 0 {
        "SYN/ACK Packet"
    } else if flags & SYN != 0 {
        "SYN Packet"
    } else if flags & RST != 0 {
        "RST Packet"
    } else if flags & FIN != 0 {
        "FIN Packet"
    } else if flags & ACK != 0 {
        "ACK Packet"
    } else {
        "TCP Packet"
    }
}

pub fn tcp_flag_names(flags: u8) -> Vec<&'static str> {
    use self::tcp_flags::*;
    [
        (SYN, "SYN"),
        (ACK, "ACK"),
        (FIN, "FIN"),
        (RST, "RST"),
        (PSH, "PSH"),
        (URG, "URG"),
    ]
    .into_iter()
    .filter(|(bit, _)| flags & bit != 0)
    .map(|(_, name)| name)
    .collect()
}

fn icmp_kind(v6: bool, kind: u8) -> &'static str {
    match (v6, kind) {
        (false, 8) | (true, 128) => "Echo request",
        (false, 0) | (true, 129) => "Echo reply",
        (false, 3) | (true, 1) => "Destination unreachable",
        (false, 11) | (true, 3) => "Time exceeded",
        (true, 133) => "Router solicitation",
        (true, 134) => "Router advertisement",
        (true, 135) => "Neighbor solicitation",
        (true, 136) => "Neighbor advertisement",
        (false, _) => "ICMP Packet",
        (true, _) => "ICMPv6 Packet",
    }
}

fn igmp_kind(kind: u8) -> &'static str {
    match kind {
        0x11 => "Membership query",
        0x12 | 0x16 | 0x22 => "Membership report",
        0x17 => "Leave group",
        _ => "IGMP Packet",
    }
}

fn well_known<F>(src_port: u16, dst_port: u16, lookup: F) -> Option<Protocol>
where
    F: Fn(u16) -> Option<Protocol>,
{
    // The server side is usually the lower port.
    let (low, high) = if src_port <= dst_port {
        (src_port, dst_port)
    } else {
        (dst_port, src_port)
    };
    lookup(low).or_else(|| lookup(high))
}

fn tcp_service(src_port: u16, dst_port: u16) -> Option<Protocol> {
    well_known(src_port, dst_port, |port| match port {
        22 => Some(Protocol::Ssh),
        53 => Some(Protocol::Dns),
        80 | 8080 => Some(Protocol::Http),
        443 => Some(Protocol::Tls),
        _ => None,
    })
}

fn udp_service(src_port: u16, dst_port: u16) -> Option<Protocol> {
    well_known(src_port, dst_port, |port| match port {
        53 | 5353 => Some(Protocol::Dns),
        67 | 68 => Some(Protocol::Dhcp),
        123 => Some(Protocol::Ntp),
        _ => None,
    })
}

/// Parses the transport header for IP protocol `protocol`, returning it with its payload.
pub fn parse(protocol: u8, data: &[u8]) -> Option<(TransportHeader, &[u8])> {
    let parsed = match protocol {
        IPPROTO_TCP => tcp(data),
        IPPROTO_UDP => udp(data),
        IPPROTO_ICMP => icmp(data, false),
        IPPROTO_ICMPV6 => icmp(data, true),
        IPPROTO_IGMP => igmp(data),
        _ => return None,
    };
    parsed.ok().map(|(rest, header)| (header, rest))
}

fn tcp(input: &[u8]) -> IResult<&[u8], TransportHeader> {
    let (rest, src_port) = be_u16().parse(input)?;
    let (rest, dst_port) = be_u16().parse(rest)?;
    let (rest, seq) = be_u32().parse(rest)?;
    let (rest, ack) = be_u32().parse(rest)?;
    // Data offset in the high nibble, counted in 32-bit words.
    let (rest, offset) = be_u8().parse(rest)?;
    let (rest, flags) = be_u8().parse(rest)?;
    let (_, _window) = be_u16().parse(rest)?;

    let header_len = usize::from(offset >> 4) * 4;
    let payload = input.get(header_len.max(20)..).unwrap_or_default();

    Ok((
        payload,
        TransportHeader::Tcp {
            src_port,
            dst_port,
            seq,
            ack,
            flags,
        },
    ))
}

fn udp(input: &[u8]) -> IResult<&[u8], TransportHeader> {
    let (rest, src_port) = be_u16().parse(input)?;
    let (rest, dst_port) = be_u16().parse(rest)?;
    let (rest, _length) = be_u16().parse(rest)?;
    let (rest, _checksum) = be_u16().parse(rest)?;
    Ok((rest, TransportHeader::Udp { src_port, dst_port }))
}

fn icmp(input: &[u8], v6: bool) -> IResult<&[u8], TransportHeader> {
    let (rest, kind) = be_u8().parse(input)?;
    let (rest, code) = be_u8().parse(rest)?;
    let (rest, _checksum) = be_u16().parse(rest)?;
    Ok((rest, TransportHeader::Icmp { v6, kind, code }))
}

fn igmp(input: &[u8]) -> IResult<&[u8], TransportHeader> {
    let (rest, kind) = be_u8().parse(input)?;
    Ok((rest, TransportHeader::Igmp { kind }))
}
