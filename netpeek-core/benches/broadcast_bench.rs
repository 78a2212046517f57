#[macro_use]
extern crate criterion;

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use criterion::Criterion;

use netpeek_core::events::{Broadcaster, PacketId, PacketSummary, Protocol};

fn sample_summary() -> Arc<PacketSummary> {
    Arc::new(PacketSummary {
        id: PacketId(1),
        timestamp: Utc::now(),
        seq_number: 1,
        interface: "eth0".into(),
        src_ip: "192.168.1.10".into(),
        dst_ip: "192.168.1.1".into(),
        src_mac: "aa:bb:cc:dd:ee:ff".into(),
        dst_mac: "11:22:33:44:55:66".into(),
        src_port: 51000,
        dst_port: 443,
        protocol: Protocol::Tls,
        length: 64,
        bytes: Bytes::from_static(&[0u8; 64]),
        readable_data: String::new(),
        info: String::new(),
    })
}

fn bench_broadcast_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast_publish");

    for subscribers in [1usize, 4, 16] {
        group.throughput(criterion::Throughput::Elements(1));
        group.bench_function(format!("subscribers_{}", subscribers), |b| {
            let bus = Broadcaster::with_capacity(1024).unwrap();
            let subs: Vec<_> = (0..subscribers).map(|_| bus.subscribe()).collect();
            let summary = sample_summary();
            b.iter(|| {
                bus.publish(summary.clone());
                for sub in &subs {
                    sub.try_recv();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_broadcast_publish);
criterion_main!(benches);
