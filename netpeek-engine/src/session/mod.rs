//! Capture session: owns the device filter, the single open driver stream and the
//! subscriber set.
//!
//! Transitions (`start`, `pause`, `resume`, `stop`) serialize on an async mutex and
//! always close the previous stream, waiting for its producer to release the driver
//! handle, before opening a new one. The data plane (decode, retain, publish) runs
//! on the producer thread and never takes that mutex; subscribers are guarded by the
//! broadcaster's own lock.

mod error;
mod pipeline;
mod state;
mod stream;

use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use netpeek_capture::{registry, CaptureDriver, DeviceFilter, DriverError, Interface};
use netpeek_core::events::{
    Broadcaster, PacketHistory, PacketId, PacketSummary, RetentionPolicy, Subscription,
    SubscriptionId,
};
use netpeek_telemetry::MetricsRecorder;

pub use self::error::SessionError;
pub use self::pipeline::StreamStats;
pub use self::state::SessionState;

use self::pipeline::Pipeline;
use self::stream::ActiveStream;

/// Sizing of a session's event queues and history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    pub subscriber_capacity: usize,
    pub retention: RetentionPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            subscriber_capacity: 1024,
            retention: RetentionPolicy::default(),
        }
    }
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    stream: Option<ActiveStream>,
    last_error: Option<SessionError>,
}

pub struct CaptureSession<D: CaptureDriver + 'static> {
    driver: Arc<D>,
    inner: Mutex<Inner>,
    broadcaster: Broadcaster,
    history: Arc<PacketHistory>,
    metrics: Arc<MetricsRecorder>,
    next_id: Arc<AtomicU64>,
}

impl<D: CaptureDriver + 'static> CaptureSession<D> {
    pub fn new(
        driver: Arc<D>,
        options: SessionOptions,
        metrics: Arc<MetricsRecorder>,
    ) -> Result<Self, SessionError> {
        let broadcaster = Broadcaster::with_capacity(options.subscriber_capacity)?;
        debug!(
            capacity = options.subscriber_capacity,
            max_packets = options.retention.max_packets,
            "Capture session created"
        );

        Ok(Self {
            driver,
            inner: Mutex::new(Inner::default()),
            broadcaster,
            history: Arc::new(PacketHistory::new(options.retention)),
            metrics,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Interfaces the driver can capture on. Independent of session state.
    pub fn list_interfaces(&self) -> Result<Vec<Interface>, DriverError> {
        registry::list_interfaces(self.driver.as_ref()).inspect_err(|_| {
            self.metrics.driver_errors.inc();
        })
    }

    /// Current state. A stream whose producer died is reaped first, so this never
    /// reports `Running` without an open stream.
    pub async fn state(&self) -> SessionState {
        let mut inner = self.inner.lock().await;
        self.reap(&mut inner).await;
        inner.state.clone()
    }

    /// The error that last ended a stream or failed a transition, if any.
    pub async fn last_error(&self) -> Option<SessionError> {
        let mut inner = self.inner.lock().await;
        self.reap(&mut inner).await;
        inner.last_error.clone()
    }

    /// Starts capturing on `device`, replacing any open stream.
    ///
    /// Valid from every state; a running or paused capture is fully restarted.
    /// On failure the session is left `Idle`.
    #[instrument(level = "info", skip_all, fields(device = %device))]
    pub async fn start(&self, device: DeviceFilter) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        self.reap(&mut inner).await;
        self.close_stream(&mut inner).await;
        inner.state = SessionState::Idle;
        self.open(&mut inner, device).await
    }

    /// Suspends pulling. No-op unless running.
    #[instrument(level = "info", skip_all)]
    pub async fn pause(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        self.reap(&mut inner).await;

        match inner.state.clone() {
            SessionState::Running { device } => {
                self.close_stream(&mut inner).await;
                inner.state = SessionState::Paused {
                    device: device.clone(),
                };
                info!(device = %device, "Capture paused");
            }
            state => debug!("Pause ignored while {}", state),
        }
        Ok(())
    }

    /// Reopens the stream with the device filter recorded at pause time.
    #[instrument(level = "info", skip_all)]
    pub async fn resume(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        self.reap(&mut inner).await;

        match inner.state.clone() {
            SessionState::Paused { device } => {
                inner.state = SessionState::Idle;
                self.open(&mut inner, device).await
            }
            SessionState::Running { .. } => Ok(()),
            SessionState::Idle => Err(SessionError::InvalidTransition {
                operation: "resume",
                state: SessionState::Idle.to_string(),
            }),
        }
    }

    /// Closes any stream and clears the device filter. Idempotent.
    #[instrument(level = "info", skip_all)]
    pub async fn stop(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        self.reap(&mut inner).await;
        self.close_stream(&mut inner).await;
        if inner.state != SessionState::Idle {
            info!("Capture stopped");
        }
        inner.state = SessionState::Idle;
        Ok(())
    }

    /// Stops capture and closes every subscription.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.stop().await?;
        self.broadcaster.close_all();
        self.metrics.subscribers.set(0);
        info!("Capture session shut down");
        Ok(())
    }

    pub fn subscribe(&self) -> Subscription {
        let subscription = self.broadcaster.subscribe();
        self.metrics
            .subscribers
            .set(self.broadcaster.subscriber_count() as i64);
        subscription
    }

    /// Detaches a subscriber; once this returns nothing more is delivered to it.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.broadcaster.unsubscribe(id);
        self.metrics
            .subscribers
            .set(self.broadcaster.subscriber_count() as i64);
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    /// A retained packet, for inspection of its bytes and readable dump.
    pub fn packet(&self, id: PacketId) -> Option<Arc<PacketSummary>> {
        self.history.get(id)
    }

    /// Retained packets, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Arc<PacketSummary>> {
        self.history.latest(limit)
    }

    pub fn history(&self) -> &PacketHistory {
        &self.history
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    async fn open(&self, inner: &mut Inner, device: DeviceFilter) -> Result<(), SessionError> {
        let driver = self.driver.clone();
        let target = device.clone();
        let opened = tokio::task::spawn_blocking(move || driver.open_stream(&target)).await?;

        let source = match opened {
            Ok(source) => source,
            Err(err) => {
                self.metrics.driver_errors.inc();
                error!(device = %device, "Failed to open capture: {}", err);
                let err = SessionError::Driver(err);
                inner.last_error = Some(err.clone());
                return Err(err);
            }
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let pipeline = Pipeline {
            broadcaster: self.broadcaster.clone(),
            history: self.history.clone(),
            metrics: self.metrics.clone(),
            next_id: self.next_id.clone(),
            cancel: cancel.clone(),
            finished: finished.clone(),
        };
        let span = tracing::info_span!("producer", device = %device);
        let handle = tokio::task::spawn_blocking(move || span.in_scope(|| pipeline.run(source)));

        inner.stream = Some(ActiveStream::new(device.clone(), cancel, finished, handle));
        inner.state = SessionState::Running {
            device: device.clone(),
        };
        inner.last_error = None;
        self.metrics.streams_opened.inc();
        info!(device = %device, "Capture started");
        Ok(())
    }

    async fn close_stream(&self, inner: &mut Inner) {
        if let Some(stream) = inner.stream.take() {
            if let Err(err) = stream.close().await {
                self.record_stream_failure(inner, err);
            }
        }
    }

    // Drops a stream whose producer already exited and settles the state to Idle.
    async fn reap(&self, inner: &mut Inner) {
        let finished = inner
            .stream
            .as_ref()
            .is_some_and(|stream| stream.is_finished());
        if !finished {
            return;
        }

        if let Some(stream) = inner.stream.take() {
            let device = stream.device.clone();
            match stream.close().await {
                Ok(_) => info!(device = %device, "Capture stream ended"),
                Err(err) => self.record_stream_failure(inner, err),
            }
        }
        inner.state = SessionState::Idle;
    }

    fn record_stream_failure(&self, inner: &mut Inner, err: SessionError) {
        self.metrics.driver_errors.inc();
        warn!("Capture stream failed: {}", err);
        inner.last_error = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpeek_capture::ScriptedDriver;
    use netpeek_core::events::LinkType;
    use tracing_test::traced_test;

    fn session(driver: &ScriptedDriver) -> CaptureSession<ScriptedDriver> {
        let metrics = Arc::new(MetricsRecorder::new().unwrap());
        CaptureSession::new(Arc::new(driver.clone()), SessionOptions::default(), metrics).unwrap()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let metrics = Arc::new(MetricsRecorder::new().unwrap());
        let driver = Arc::new(ScriptedDriver::new(LinkType::Ethernet));
        let options = SessionOptions {
            subscriber_capacity: 0,
            ..SessionOptions::default()
        };
        assert!(matches!(
            CaptureSession::new(driver, options, metrics),
            Err(SessionError::Events(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn transitions_are_logged() {
        let driver = ScriptedDriver::new(LinkType::Ethernet);
        let session = session(&driver);

        session.start(DeviceFilter::All).await.unwrap();
        session.pause().await.unwrap();
        session.stop().await.unwrap();

        assert!(logs_contain("Capture started"));
        assert!(logs_contain("Capture paused"));
        assert!(logs_contain("Capture stopped"));
    }

    #[tokio::test]
    #[traced_test]
    async fn open_failures_are_logged() {
        let driver = ScriptedDriver::new(LinkType::Ethernet);
        let session = session(&driver);

        assert!(session.start("nope0".into()).await.is_err());
        assert!(logs_contain("Failed to open capture"));
        assert_eq!(session.metrics().driver_errors.get(), 1);
    }

    #[tokio::test]
    async fn subscriber_gauge_tracks_attach_and_detach() {
        let driver = ScriptedDriver::new(LinkType::Ethernet);
        let session = session(&driver);

        let first = session.subscribe();
        let _second = session.subscribe();
        assert_eq!(session.metrics().subscribers.get(), 2);

        session.unsubscribe(first.id());
        assert_eq!(session.metrics().subscribers.get(), 1);

        session.shutdown().await.unwrap();
        assert_eq!(session.metrics().subscribers.get(), 0);
    }

    #[tokio::test]
    async fn frames_without_subscribers_are_captured_not_published() {
        let driver = ScriptedDriver::new(LinkType::Ethernet)
            .with_frames("all", vec![vec![0u8; 60]; 5]);
        let session = session(&driver);

        session.start(DeviceFilter::All).await.unwrap();
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while session.metrics().frames_captured.get() < 5 {
            assert!(tokio::time::Instant::now() < deadline, "frames not captured in time");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let _late = session.subscribe();
        session.stop().await.unwrap();

        assert_eq!(session.metrics().summaries_published.get(), 0);
        assert_eq!(session.metrics().subscribers.get(), 1);
    }
}
