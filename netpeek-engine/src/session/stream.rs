use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use netpeek_capture::{DeviceFilter, DriverError};

use super::pipeline::StreamStats;
use super::SessionError;

/// The one open driver stream and the producer task reading it.
pub(crate) struct ActiveStream {
    pub(crate) device: DeviceFilter,
    cancel: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<StreamStats, DriverError>>>,
}

impl ActiveStream {
    pub(crate) fn new(
        device: DeviceFilter,
        cancel: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
        handle: JoinHandle<Result<StreamStats, DriverError>>,
    ) -> Self {
        Self {
            device,
            cancel,
            finished,
            handle: Some(handle),
        }
    }

    /// The producer exited on its own (driver error or end of stream).
    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Cancels the producer and waits until the driver handle is released.
    /// At most one more frame, already pulled, may still be published.
    pub(crate) async fn close(mut self) -> Result<StreamStats, SessionError> {
        self.cancel.store(true, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return Ok(StreamStats::default());
        };

        match handle.await {
            Ok(Ok(stats)) => {
                debug!(device = %self.device, frames = stats.frames, "Stream closed");
                Ok(stats)
            }
            Ok(Err(err)) => Err(SessionError::Driver(err)),
            Err(join) => {
                warn!(device = %self.device, "Producer task failed: {}", join);
                Err(SessionError::from(join))
            }
        }
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
    }
}
