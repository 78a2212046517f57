#[macro_use]
extern crate criterion;

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use criterion::{black_box, Criterion};

use netpeek_core::events::{LinkType, PacketId, RawFrame};
use netpeek_protocols::decode;

// Ethernet / IPv4 / TCP SYN to port 80
const TCP_SYN: &[u8] = &[
    0x00, 0x15, 0x5d, 0x01, 0x02, 0x03, // Destination MAC
    0x00, 0x15, 0x5d, 0x04, 0x05, 0x06, // Source MAC
    0x08, 0x00, // EtherType IPv4
    0x45, 0x00, 0x00, 0x28, 0x00, 0x01, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, // IPv4 header
    0x0a, 0x00, 0x00, 0x01, // 10.0.0.1
    0x5d, 0xb8, 0xd8, 0x22, // 93.184.216.34
    0xc7, 0x38, 0x00, 0x50, // Ports 51000 -> 80
    0x00, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x00, // Seq, ack
    0x50, 0x02, 0xfa, 0xf0, 0x00, 0x00, 0x00, 0x00, // Offset, SYN, window, checksum, urgent
];

fn frame(link_type: LinkType, data: &'static [u8]) -> RawFrame {
    RawFrame::new(Arc::from("eth0"), link_type, Utc::now(), Bytes::from_static(data))
}

fn benchmark_tcp_decode(c: &mut Criterion) {
    let frame = frame(LinkType::Ethernet, TCP_SYN);

    c.bench_function("decode_tcp_syn", |b| {
        b.iter(|| black_box(decode(&frame, PacketId(1), 1)))
    });
}

fn benchmark_truncated_decode(c: &mut Criterion) {
    let frame = frame(LinkType::Ethernet, &TCP_SYN[..8]);

    c.bench_function("decode_truncated", |b| {
        b.iter(|| black_box(decode(&frame, PacketId(1), 1)))
    });
}

criterion_group!(benches, benchmark_tcp_decode, benchmark_truncated_decode);
criterion_main!(benches);
