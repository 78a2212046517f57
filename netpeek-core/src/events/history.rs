//! Bounded retention of recently published packets for later inspection.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::packet::{PacketId, PacketSummary};

/// Eviction limits for retained packets. Oldest packets go first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_packets: usize,
    /// Optional cap on the summed [`PacketSummary::footprint`].
    pub max_bytes: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_packets: 10_000,
            max_bytes: None,
        }
    }
}

#[derive(Default)]
struct Ring {
    packets: VecDeque<Arc<PacketSummary>>,
    bytes: usize,
    evicted: u64,
}

/// Ring buffer of the most recent packets, shared between the capture
/// pipeline (writer) and inspectors (readers).
pub struct PacketHistory {
    policy: RetentionPolicy,
    ring: Mutex<Ring>,
}

impl PacketHistory {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            ring: Mutex::new(Ring::default()),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub fn push(&self, summary: Arc<PacketSummary>) {
        let mut ring = self.ring.lock();
        ring.bytes += summary.footprint();
        ring.packets.push_back(summary);

        while ring.packets.len() > self.policy.max_packets.max(1) || self.over_bytes(&ring) {
            match ring.packets.pop_front() {
                Some(old) => {
                    ring.bytes = ring.bytes.saturating_sub(old.footprint());
                    ring.evicted += 1;
                }
                None => break,
            }
        }
    }

    // A single packet larger than the byte cap is still kept.
    fn over_bytes(&self, ring: &Ring) -> bool {
        match self.policy.max_bytes {
            Some(limit) => ring.bytes > limit && ring.packets.len() > 1,
            None => false,
        }
    }

    /// Looks up a retained packet; `None` once it has been evicted.
    pub fn get(&self, id: PacketId) -> Option<Arc<PacketSummary>> {
        let ring = self.ring.lock();
        // Ids are assigned in increasing order, so the ring is sorted.
        let index = ring
            .packets
            .binary_search_by_key(&id, |summary| summary.id)
            .ok()?;
        ring.packets.get(index).cloned()
    }

    /// Up to `limit` packets, newest first.
    pub fn latest(&self, limit: usize) -> Vec<Arc<PacketSummary>> {
        self.ring
            .lock()
            .packets
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn retained_bytes(&self) -> usize {
        self.ring.lock().bytes
    }

    pub fn evicted(&self) -> u64 {
        self.ring.lock().evicted
    }
}
