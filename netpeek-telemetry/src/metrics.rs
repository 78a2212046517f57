//! Prometheus counters for the capture pipeline.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

use crate::error::TelemetryError;

/// Metrics shared by the capture session and its producer task.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub frames_captured: IntCounter,
    pub summaries_published: IntCounter,
    /// Summaries evicted from a full subscriber queue.
    pub summaries_dropped: IntCounter,
    pub streams_opened: IntCounter,
    pub driver_errors: IntCounter,
    pub subscribers: IntGauge,
    pub decode_latency: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let frames_captured =
            IntCounter::new("netpeek_frames_captured_total", "Raw frames pulled from the driver")?;
        let summaries_published = IntCounter::new(
            "netpeek_summaries_published_total",
            "Decoded summaries handed to the broadcaster",
        )?;
        let summaries_dropped = IntCounter::new(
            "netpeek_summaries_dropped_total",
            "Summaries evicted from full subscriber queues",
        )?;
        let streams_opened =
            IntCounter::new("netpeek_streams_opened_total", "Driver streams opened")?;
        let driver_errors =
            IntCounter::new("netpeek_driver_errors_total", "Driver open and read failures")?;
        let subscribers = IntGauge::new("netpeek_subscribers", "Attached subscribers")?;
        let decode_latency = Histogram::with_opts(
            HistogramOpts::new("netpeek_decode_latency_ns", "Frame decode time")
                .buckets(vec![1_000.0, 10_000.0, 100_000.0, 1_000_000.0]),
        )?;

        registry.register(Box::new(frames_captured.clone()))?;
        registry.register(Box::new(summaries_published.clone()))?;
        registry.register(Box::new(summaries_dropped.clone()))?;
        registry.register(Box::new(streams_opened.clone()))?;
        registry.register(Box::new(driver_errors.clone()))?;
        registry.register(Box::new(subscribers.clone()))?;
        registry.register(Box::new(decode_latency.clone()))?;

        Ok(Self {
            registry,
            frames_captured,
            summaries_published,
            summaries_dropped,
            streams_opened,
            driver_errors,
            subscribers,
            decode_latency,
        })
    }

    /// Text exposition format.
    pub fn gather_metrics(&self) -> Result<String, TelemetryError> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn record_decode(&self, nanos: u64) {
        self.decode_latency.observe(nanos as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.frames_captured.inc_by(3);
        metrics.summaries_dropped.inc();
        metrics.subscribers.set(2);
        metrics.record_decode(2_500);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("netpeek_frames_captured_total 3"));
        assert!(text.contains("netpeek_summaries_dropped_total 1"));
        assert!(text.contains("netpeek_subscribers 2"));
        assert!(text.contains("netpeek_decode_latency_ns_count 1"));
    }

    #[test]
    fn recorders_are_independent() {
        let a = MetricsRecorder::new().unwrap();
        let b = MetricsRecorder::new().unwrap();
        a.streams_opened.inc();
        assert_eq!(b.streams_opened.get(), 0);
    }
}
