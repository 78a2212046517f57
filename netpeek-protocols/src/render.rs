//! Human-oriented renderings of a decoded frame.

use std::fmt::Write;

use crate::link::{format_mac, LinkHeader};
use crate::network::NetworkHeader;
use crate::transport::{tcp_flag_names, TransportHeader};

const BYTES_PER_LINE: usize = 16;

/// Canonical hex dump: 8-digit offset, 16 bytes split in two groups, printable ASCII column.
///
/// ```
/// let dump = netpeek_protocols::render::hexdump(b"GET / HTTP/1.1\r\n");
/// assert_eq!(
///     dump,
///     "00000000  47 45 54 20 2f 20 48 54  54 50 2f 31 2e 31 0d 0a  |GET / HTTP/1.1..|\n"
/// );
/// ```
pub fn hexdump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(BYTES_PER_LINE) * 79);

    for (line, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        let _ = write!(out, "{:08x}  ", line * BYTES_PER_LINE);

        let encoded = hex::encode(chunk);
        for index in 0..BYTES_PER_LINE {
            match encoded.get(index * 2..index * 2 + 2) {
                Some(pair) => {
                    out.push_str(pair);
                    out.push(' ');
                }
                None => out.push_str("   "),
            }
            if index == 7 {
                out.push(' ');
            }
        }

        out.push_str(" |");
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                char::from(b)
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }

    out
}

pub(crate) fn link_line(header: &LinkHeader) -> String {
    let mut line = format!("{:<10}", header.name);
    match (&header.src_mac, &header.dst_mac) {
        (Some(src), Some(dst)) => {
            let _ = write!(line, "{} -> {}", format_mac(src), format_mac(dst));
        }
        (Some(src), None) => {
            let _ = write!(line, "from {}", format_mac(src));
        }
        _ => {}
    }
    if let Some(vlan) = header.vlan {
        let _ = write!(line, "  vlan {}", vlan);
    }
    if let Some(ethertype) = header.ethertype {
        let _ = write!(line, "  type 0x{:04x}", ethertype);
    }
    line.trim_end().to_string()
}

pub(crate) fn network_line(header: &NetworkHeader) -> String {
    let (src, dst) = header.endpoints();
    let endpoint = |ip: Option<std::net::IpAddr>| ip.map(|ip| ip.to_string()).unwrap_or_default();
    let mut line = format!("{:<10}{} -> {}", header.name(), endpoint(src), endpoint(dst));

    match header {
        NetworkHeader::Ipv4 {
            ttl,
            protocol,
            fragment_offset,
            ..
        } => {
            let _ = write!(line, "  ttl {}  proto {}", ttl, protocol);
            if *fragment_offset != 0 {
                let _ = write!(line, "  frag {}", fragment_offset);
            }
        }
        NetworkHeader::Ipv6 {
            hop_limit,
            next_header,
            ..
        } => {
            let _ = write!(line, "  hop limit {}  next {}", hop_limit, next_header);
        }
        NetworkHeader::Arp {
            operation,
            sender_mac,
            ..
        } => {
            let op = match operation {
                1 => "request",
                2 => "reply",
                _ => "op",
            };
            let _ = write!(line, "  {}", op);
            if let Some(mac) = sender_mac {
                let _ = write!(line, "  sender {}", format_mac(mac));
            }
        }
    }
    line
}

pub(crate) fn transport_line(header: &TransportHeader) -> String {
    match header {
        TransportHeader::Tcp {
            src_port,
            dst_port,
            seq,
            ack,
            flags,
        } => format!(
            "{:<10}{} -> {}  seq {}  ack {}  flags [{}]",
            "TCP",
            src_port,
            dst_port,
            seq,
            ack,
            tcp_flag_names(*flags).join(", ")
        ),
        TransportHeader::Udp { src_port, dst_port } => {
            format!("{:<10}{} -> {}", "UDP", src_port, dst_port)
        }
        TransportHeader::Icmp { v6, kind, code } => format!(
            "{:<10}type {}  code {}  {}",
            if *v6 { "ICMPv6" } else { "ICMP" },
            kind,
            code,
            header.kind()
        ),
        TransportHeader::Igmp { kind } => {
            format!("{:<10}type 0x{:02x}  {}", "IGMP", kind, header.kind())
        }
    }
}
