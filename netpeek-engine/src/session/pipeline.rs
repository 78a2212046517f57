//! Producer side of a stream: pull, decode, retain, publish.
//!
//! Runs on a blocking thread and never touches the session's transition lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use netpeek_capture::{DriverError, FrameSource};
use netpeek_core::events::{Broadcaster, PacketHistory, PacketId, RawFrame};
use netpeek_protocols::decode;
use netpeek_telemetry::MetricsRecorder;

/// Frames handled by one stream before it stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames: u64,
}

pub(crate) struct Pipeline {
    pub(crate) broadcaster: Broadcaster,
    pub(crate) history: Arc<PacketHistory>,
    pub(crate) metrics: Arc<MetricsRecorder>,
    /// Session-wide id counter; ids are never reused across streams.
    pub(crate) next_id: Arc<AtomicU64>,
    pub(crate) cancel: Arc<AtomicBool>,
    pub(crate) finished: Arc<AtomicBool>,
}

/// Raises `finished` when dropped, including while unwinding from a panic.
struct FinishedGuard(Arc<AtomicBool>);

impl Drop for FinishedGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Pipeline {
    /// Pulls until cancelled or the driver fails. The source is dropped, closing the
    /// driver handle, before `finished` is raised.
    pub(crate) fn run(self, source: Box<dyn FrameSource>) -> Result<StreamStats, DriverError> {
        // Declared before `source` so it drops after it.
        let finished = FinishedGuard(self.finished.clone());
        let mut source = source;
        let mut stats = StreamStats::default();

        let outcome = loop {
            if self.cancel.load(Ordering::Acquire) {
                break Ok(stats);
            }
            match source.next_frame() {
                Ok(Some(frame)) => {
                    stats.frames += 1;
                    self.handle(frame, stats.frames);
                }
                Ok(None) => continue,
                Err(err) => break Err(err),
            }
        };

        drop(source);
        drop(finished);
        debug!(frames = stats.frames, "Producer stopped");
        outcome
    }

    fn handle(&self, frame: RawFrame, seq_number: u64) {
        let id = PacketId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let started = Instant::now();
        let summary = Arc::new(decode(&frame, id, seq_number));
        self.metrics
            .record_decode(started.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64);

        trace!(packet = %id, seq = seq_number, protocol = %summary.protocol, "Decoded frame");

        self.history.push(summary.clone());
        let report = self.broadcaster.publish(summary);

        self.metrics.frames_captured.inc();
        if report.delivered > 0 {
            self.metrics.summaries_published.inc();
        }
        self.metrics.summaries_dropped.inc_by(report.evicted as u64);
    }
}
