//! Link-layer headers: Ethernet (with VLAN tags), Linux cooked capture v1/v2,
//! BSD loopback and raw IP.

use nom::bytes::take;
use nom::number::{be_u16, be_u32, be_u8, le_u32};
use nom::{IResult, Parser};

use netpeek_core::events::LinkType;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_IPV6: u16 = 0x86dd;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_QINQ: u16 = 0x88a8;
// Values up to this are 802.3 length fields, not EtherTypes.
const MAX_8023_LENGTH: u16 = 1500;
const MAX_VLAN_TAGS: usize = 2;

const ARPHRD_ETHER: u16 = 1;

pub type MacAddr = [u8; 6];

/// Decoded link header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkHeader {
    pub name: &'static str,
    pub src_mac: Option<MacAddr>,
    pub dst_mac: Option<MacAddr>,
    /// EtherType of the payload, when the link layer names one.
    pub ethertype: Option<u16>,
    pub vlan: Option<u16>,
}

pub fn format_mac(mac: &MacAddr) -> String {
    mac.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn mac(input: &[u8]) -> IResult<&[u8], MacAddr> {
    let (rest, raw) = take(6usize).parse(input)?;
    let mut out = [0u8; 6];
    out.copy_from_slice(raw);
    Ok((rest, out))
}

/// Splits the link header off `data`. `None` when the header is truncated or the
/// link type is not understood.
pub fn parse(link_type: LinkType, data: &[u8]) -> Option<(LinkHeader, &[u8])> {
    let parsed = match link_type {
        LinkType::Ethernet => ethernet(data),
        LinkType::LinuxSll => linux_sll(data),
        LinkType::LinuxSll2 => linux_sll2(data),
        LinkType::Null => null(data),
        LinkType::Raw => return raw(data),
        LinkType::Unknown(_) => return None,
    };
    parsed.ok().map(|(rest, header)| (header, rest))
}

fn ethernet(input: &[u8]) -> IResult<&[u8], LinkHeader> {
    // Destination MAC, source MAC: 6 bytes each.
    let (rest, dst) = mac(input)?;
    let (rest, src) = mac(rest)?;
    let (mut rest, mut ethertype) = be_u16().parse(rest)?;

    let mut vlan = None;
    let mut tags = 0;
    while (ethertype == ETHERTYPE_VLAN || ethertype == ETHERTYPE_QINQ) && tags < MAX_VLAN_TAGS {
        // Tag control information, then the encapsulated EtherType.
        let (r, tci) = be_u16().parse(rest)?;
        let (r, inner) = be_u16().parse(r)?;
        vlan.get_or_insert(tci & 0x0fff);
        ethertype = inner;
        rest = r;
        tags += 1;
    }

    Ok((
        rest,
        LinkHeader {
            name: "Ethernet",
            src_mac: Some(src),
            dst_mac: Some(dst),
            ethertype: (ethertype > MAX_8023_LENGTH).then_some(ethertype),
            vlan,
        },
    ))
}

fn cooked_mac(hardware_type: u16, addr_len: u16, addr: &[u8]) -> Option<MacAddr> {
    if hardware_type != ARPHRD_ETHER || addr_len != 6 {
        return None;
    }
    let mut out = [0u8; 6];
    out.copy_from_slice(addr.get(..6)?);
    Some(out)
}

// 16-byte header: packet type, ARPHRD type, address length, 8-byte address, protocol.
fn linux_sll(input: &[u8]) -> IResult<&[u8], LinkHeader> {
    let (rest, _packet_type) = be_u16().parse(input)?;
    let (rest, hardware_type) = be_u16().parse(rest)?;
    let (rest, addr_len) = be_u16().parse(rest)?;
    let (rest, addr) = take(8usize).parse(rest)?;
    let (rest, protocol) = be_u16().parse(rest)?;

    Ok((
        rest,
        LinkHeader {
            name: "Linux cooked",
            src_mac: cooked_mac(hardware_type, addr_len, addr),
            dst_mac: None,
            ethertype: Some(protocol),
            vlan: None,
        },
    ))
}

// 20-byte header: protocol, reserved, interface index, ARPHRD type, packet type,
// address length, 8-byte address.
fn linux_sll2(input: &[u8]) -> IResult<&[u8], LinkHeader> {
    let (rest, protocol) = be_u16().parse(input)?;
    let (rest, _reserved) = be_u16().parse(rest)?;
    let (rest, _if_index) = be_u32().parse(rest)?;
    let (rest, hardware_type) = be_u16().parse(rest)?;
    let (rest, _packet_type) = be_u8().parse(rest)?;
    let (rest, addr_len) = be_u8().parse(rest)?;
    let (rest, addr) = take(8usize).parse(rest)?;

    Ok((
        rest,
        LinkHeader {
            name: "Linux cooked v2",
            src_mac: cooked_mac(hardware_type, u16::from(addr_len), addr),
            dst_mac: None,
            ethertype: Some(protocol),
            vlan: None,
        },
    ))
}

// 4-byte address family in the capturing host's byte order.
fn null(input: &[u8]) -> IResult<&[u8], LinkHeader> {
    let (rest, family) = le_u32().parse(input)?;
    let family = if family & 0xffff_0000 != 0 {
        family.swap_bytes()
    } else {
        family
    };

    let ethertype = match family {
        2 => Some(ETHERTYPE_IPV4),
        // Linux, NetBSD/OpenBSD, FreeBSD, Darwin.
        10 | 24 | 28 | 30 => Some(ETHERTYPE_IPV6),
        _ => None,
    };

    Ok((
        rest,
        LinkHeader {
            name: "Loopback",
            ethertype,
            ..LinkHeader::default()
        },
    ))
}

fn raw(data: &[u8]) -> Option<(LinkHeader, &[u8])> {
    let ethertype = match *data.first()? >> 4 {
        4 => ETHERTYPE_IPV4,
        6 => ETHERTYPE_IPV6,
        _ => return None,
    };
    Some((
        LinkHeader {
            name: "Raw IP",
            ethertype: Some(ethertype),
            ..LinkHeader::default()
        },
        data,
    ))
}
