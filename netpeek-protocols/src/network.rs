//! Network layer: IPv4 (RFC 791), IPv6 (RFC 8200) and ARP (RFC 826).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use nom::bytes::take;
use nom::number::{be_u128, be_u16, be_u32, be_u8};
use nom::{IResult, Parser};

use crate::link::{MacAddr, ETHERTYPE_ARP, ETHERTYPE_IPV4, ETHERTYPE_IPV6};

pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_IGMP: u8 = 2;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;
pub const IPPROTO_ICMPV6: u8 = 58;

const IPV6_HOP_BY_HOP: u8 = 0;
const IPV6_ROUTING: u8 = 43;
const IPV6_FRAGMENT: u8 = 44;
const IPV6_AUTH: u8 = 51;
const IPV6_DEST_OPTS: u8 = 60;
const MAX_EXTENSION_HEADERS: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkHeader {
    Ipv4 {
        src: Ipv4Addr,
        dst: Ipv4Addr,
        protocol: u8,
        ttl: u8,
        /// Non-first fragments carry no transport header.
        fragment_offset: u16,
    },
    Ipv6 {
        src: Ipv6Addr,
        dst: Ipv6Addr,
        /// Upper-layer protocol after any extension headers.
        next_header: u8,
        hop_limit: u8,
        fragment_offset: u16,
    },
    Arp {
        operation: u16,
        sender_mac: Option<MacAddr>,
        sender_ip: Option<Ipv4Addr>,
        target_ip: Option<Ipv4Addr>,
    },
}

impl NetworkHeader {
    pub fn name(&self) -> &'static str {
        match self {
            NetworkHeader::Ipv4 { .. } => "IPv4",
            NetworkHeader::Ipv6 { .. } => "IPv6",
            NetworkHeader::Arp { .. } => "ARP",
        }
    }

    pub fn endpoints(&self) -> (Option<IpAddr>, Option<IpAddr>) {
        match self {
            NetworkHeader::Ipv4 { src, dst, .. } => (Some((*src).into()), Some((*dst).into())),
            NetworkHeader::Ipv6 { src, dst, .. } => (Some((*src).into()), Some((*dst).into())),
            NetworkHeader::Arp {
                sender_ip,
                target_ip,
                ..
            } => (sender_ip.map(IpAddr::from), target_ip.map(IpAddr::from)),
        }
    }

    /// IP protocol number of the transport payload, when one follows.
    pub fn transport_protocol(&self) -> Option<u8> {
        match self {
            NetworkHeader::Ipv4 {
                protocol,
                fragment_offset: 0,
                ..
            } => Some(*protocol),
            NetworkHeader::Ipv6 {
                next_header,
                fragment_offset: 0,
                ..
            } => Some(*next_header),
            _ => None,
        }
    }
}

/// Parses the network header named by `ethertype`, returning it with its payload.
pub fn parse(ethertype: u16, data: &[u8]) -> Option<(NetworkHeader, &[u8])> {
    let parsed = match ethertype {
        ETHERTYPE_IPV4 => ipv4(data),
        ETHERTYPE_IPV6 => ipv6(data),
        ETHERTYPE_ARP => arp(data),
        _ => return None,
    };
    parsed.ok().map(|(rest, header)| (header, rest))
}

fn ipv4(input: &[u8]) -> IResult<&[u8], NetworkHeader> {
    // Version and IHL share the first byte.
    let (rest, version_ihl) = be_u8().parse(input)?;
    if version_ihl >> 4 != 4 {
        return Err(verify_error(input));
    }
    let header_len = usize::from(version_ihl & 0x0f) * 4;
    if header_len < 20 {
        return Err(verify_error(input));
    }

    let (rest, _tos) = be_u8().parse(rest)?;
    let (rest, total_len) = be_u16().parse(rest)?;
    let (rest, _identification) = be_u16().parse(rest)?;
    let (rest, flags_fragment) = be_u16().parse(rest)?;
    let (rest, ttl) = be_u8().parse(rest)?;
    let (rest, protocol) = be_u8().parse(rest)?;
    let (rest, _checksum) = be_u16().parse(rest)?;
    let (rest, src) = be_u32().parse(rest)?;
    let (_, dst) = be_u32().parse(rest)?;

    // Options end at the IHL boundary; trailing link padding ends at total length.
    let (_, _header) = take(header_len).parse(input)?;
    let end = usize::from(total_len).clamp(header_len, input.len());
    let payload = &input[header_len..end];

    Ok((
        payload,
        NetworkHeader::Ipv4 {
            src: Ipv4Addr::from(src),
            dst: Ipv4Addr::from(dst),
            protocol,
            ttl,
            fragment_offset: flags_fragment & 0x1fff,
        },
    ))
}

fn ipv6(input: &[u8]) -> IResult<&[u8], NetworkHeader> {
    let (rest, version_class_flow) = be_u32().parse(input)?;
    if version_class_flow >> 28 != 6 {
        return Err(verify_error(input));
    }
    let (rest, payload_len) = be_u16().parse(rest)?;
    let (rest, mut next_header) = be_u8().parse(rest)?;
    let (rest, hop_limit) = be_u8().parse(rest)?;
    let (rest, src) = be_u128().parse(rest)?;
    let (rest, dst) = be_u128().parse(rest)?;

    // Jumbograms report zero; keep whatever was captured then.
    let mut payload = match usize::from(payload_len) {
        0 => rest,
        len => &rest[..len.min(rest.len())],
    };

    let mut fragment_offset = 0;
    for _ in 0..MAX_EXTENSION_HEADERS {
        match extension(next_header, payload) {
            Some((following, body, offset)) => {
                next_header = following;
                payload = body;
                if let Some(offset) = offset {
                    fragment_offset = offset;
                }
            }
            None => break,
        }
    }

    Ok((
        payload,
        NetworkHeader::Ipv6 {
            src: Ipv6Addr::from(src),
            dst: Ipv6Addr::from(dst),
            next_header,
            hop_limit,
            fragment_offset,
        },
    ))
}

// Skips one IPv6 extension header: (next header, remaining payload, fragment offset).
fn extension(kind: u8, data: &[u8]) -> Option<(u8, &[u8], Option<u16>)> {
    let following = *data.first()?;
    let (len, fragment_offset) = match kind {
        IPV6_HOP_BY_HOP | IPV6_ROUTING | IPV6_DEST_OPTS => {
            ((usize::from(*data.get(1)?) + 1) * 8, None)
        }
        IPV6_FRAGMENT => {
            let raw = u16::from_be_bytes([*data.get(2)?, *data.get(3)?]);
            (8, Some(raw >> 3))
        }
        IPV6_AUTH => ((usize::from(*data.get(1)?) + 2) * 4, None),
        _ => return None,
    };
    Some((following, data.get(len..)?, fragment_offset))
}

fn arp(input: &[u8]) -> IResult<&[u8], NetworkHeader> {
    let (rest, _hardware_type) = be_u16().parse(input)?;
    let (rest, protocol_type) = be_u16().parse(rest)?;
    let (rest, hardware_len) = be_u8().parse(rest)?;
    let (rest, protocol_len) = be_u8().parse(rest)?;
    let (rest, operation) = be_u16().parse(rest)?;
    let (rest, sender_hw) = take(hardware_len).parse(rest)?;
    let (rest, sender_proto) = take(protocol_len).parse(rest)?;
    let (rest, _target_hw) = take(hardware_len).parse(rest)?;
    let (rest, target_proto) = take(protocol_len).parse(rest)?;

    let ipv4 = |raw: &[u8]| -> Option<Ipv4Addr> {
        if protocol_type != ETHERTYPE_IPV4 {
            return None;
        }
        let octets: [u8; 4] = raw.try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    };

    Ok((
        rest,
        NetworkHeader::Arp {
            operation,
            sender_mac: sender_hw.try_into().ok(),
            sender_ip: ipv4(sender_proto),
            target_ip: ipv4(target_proto),
        },
    ))
}

fn verify_error(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Verify,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 20-byte IPv4 header, TCP, 10.0.0.1 -> 10.0.0.2, total length 24, plus 2 bytes padding.
    const IPV4_TCP: &str = "4500001800004000400600000a0000010a000002deadbeef0000";

    #[test]
    fn ipv4_header_and_padding() {
        let data = hex::decode(IPV4_TCP).unwrap();
        let (header, payload) = parse(ETHERTYPE_IPV4, &data).unwrap();
        assert_eq!(
            header.endpoints(),
            (
                Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))),
                Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)))
            )
        );
        assert_eq!(header.transport_protocol(), Some(IPPROTO_TCP));
        assert_eq!(payload, &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn ipv4_truncated_header_is_rejected() {
        let data = hex::decode("45000018000040004006").unwrap();
        assert!(parse(ETHERTYPE_IPV4, &data).is_none());
    }

    #[test]
    fn ipv4_later_fragment_has_no_transport() {
        let data = hex::decode("4500001400000010401100000a0000010a000002").unwrap();
        let (header, _) = parse(ETHERTYPE_IPV4, &data).unwrap();
        assert_eq!(header.transport_protocol(), None);
    }

    #[test]
    fn ipv6_skips_extension_headers() {
        // Hop-by-hop (8 bytes) followed by UDP.
        let data = hex::decode(concat!(
            "6000000000100040",
            "fe800000000000000000000000000001",
            "ff020000000000000000000000000001",
            "1100000000000000",
            "0035003500080000",
        ))
        .unwrap();
        let (header, payload) = parse(ETHERTYPE_IPV6, &data).unwrap();
        assert_eq!(header.transport_protocol(), Some(IPPROTO_UDP));
        assert_eq!(payload.len(), 8);
        let (src, _) = header.endpoints();
        assert_eq!(src, Some("fe80::1".parse().unwrap()));
    }

    #[test]
    fn arp_request_addresses() {
        let data = hex::decode(concat!(
            "0001080006040001",
            "001122334455c0a80101",
            "000000000000c0a80102",
        ))
        .unwrap();
        let (header, _) = parse(ETHERTYPE_ARP, &data).unwrap();
        assert_eq!(
            header.endpoints(),
            (
                Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))),
                Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2)))
            )
        );
        assert!(matches!(header, NetworkHeader::Arp { operation: 1, .. }));
    }

    #[test]
    fn unknown_ethertype() {
        assert!(parse(0x88cc, &[0u8; 64]).is_none());
    }
}
