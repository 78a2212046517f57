//! Terminal rendering of interfaces and packet summaries.

use std::fmt::Write;

use netpeek_capture::device::flags;
use netpeek_capture::Interface;
use netpeek_core::events::PacketSummary;

fn flag_names(bits: u32) -> String {
    let names: Vec<&str> = [
        (flags::UP, "UP"),
        (flags::RUNNING, "RUNNING"),
        (flags::LOOPBACK, "LOOPBACK"),
        (flags::WIRELESS, "WIRELESS"),
    ]
    .into_iter()
    .filter(|(bit, _)| bits & bit != 0)
    .map(|(_, name)| name)
    .collect();
    names.join(",")
}

pub fn interface_table(interfaces: &[Interface]) -> String {
    let mut out = String::new();
    for interface in interfaces {
        let _ = writeln!(
            out,
            "{:<16} {:<24} {}",
            interface.name,
            flag_names(interface.flags),
            interface.description
        );
        for address in &interface.addresses {
            let _ = write!(out, "{:<16} {}", "", address.ip);
            if let Some(netmask) = address.netmask {
                let _ = write!(out, " netmask {}", netmask);
            }
            if let Some(broadcast) = address.broadcast {
                let _ = write!(out, " broadcast {}", broadcast);
            }
            if let Some(peer) = address.point_to_point {
                let _ = write!(out, " peer {}", peer);
            }
            out.push('\n');
        }
    }
    out
}

pub fn summary_line(summary: &PacketSummary) -> String {
    let mut line = format!(
        "{} {:>6} {:<6} {}",
        summary.timestamp.format("%H:%M:%S%.6f"),
        summary.id,
        summary.interface,
        summary.info
    );
    if summary.src_port != 0 || summary.dst_port != 0 {
        let _ = write!(line, " ports {} -> {}", summary.src_port, summary.dst_port);
    }
    line
}
