//! In-memory driver that replays canned frames.
//!
//! Every stream replays the frames registered for its device label, optionally
//! looping, and the driver keeps count of how many streams are open at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use netpeek_core::events::{LinkType, RawFrame};

use crate::device::{DeviceFilter, Interface};
use crate::driver::{CaptureDriver, FrameSource};
use crate::error::DriverError;

// Poll interval of an exhausted, non-repeating stream.
const IDLE_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Default)]
struct StreamCounters {
    open: AtomicUsize,
    max_open: AtomicUsize,
    opened_total: AtomicUsize,
}

impl StreamCounters {
    fn opened(&self) {
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now, Ordering::SeqCst);
        self.opened_total.fetch_add(1, Ordering::SeqCst);
    }

    fn closed(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted [`CaptureDriver`]. Clones share stream accounting.
#[derive(Clone, Debug)]
pub struct ScriptedDriver {
    link_type: LinkType,
    interfaces: Vec<Interface>,
    enumeration_error: Option<DriverError>,
    frames: HashMap<String, Vec<Bytes>>,
    open_errors: Arc<Mutex<HashMap<String, DriverError>>>,
    frame_interval: Duration,
    repeat: bool,
    fail_after: Option<(usize, DriverError)>,
    counters: Arc<StreamCounters>,
}

impl ScriptedDriver {
    pub fn new(link_type: LinkType) -> Self {
        Self {
            link_type,
            interfaces: Vec::new(),
            enumeration_error: None,
            frames: HashMap::new(),
            open_errors: Arc::new(Mutex::new(HashMap::new())),
            frame_interval: Duration::ZERO,
            repeat: false,
            fail_after: None,
            counters: Arc::new(StreamCounters::default()),
        }
    }

    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Frames replayed by streams opened on `device` (`"all"` for the wildcard).
    pub fn with_frames<I>(mut self, device: &str, frames: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        self.frames
            .entry(DeviceFilter::from(device).label().to_string())
            .or_default()
            .extend(frames.into_iter().map(Into::into));
        self
    }

    /// Delay before each frame is handed out.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Loop over the frame list instead of going idle at its end.
    pub fn repeat(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn fail_enumeration(mut self, error: DriverError) -> Self {
        self.enumeration_error = Some(error);
        self
    }

    /// Makes opening `device` fail with `error` until [`Self::allow_open`] is called.
    pub fn fail_open(self, device: &str, error: DriverError) -> Self {
        self.set_open_failure(device, error);
        self
    }

    pub fn set_open_failure(&self, device: &str, error: DriverError) {
        self.open_errors
            .lock()
            .insert(DeviceFilter::from(device).label().to_string(), error);
    }

    pub fn allow_open(&self, device: &str) {
        self.open_errors
            .lock()
            .remove(DeviceFilter::from(device).label());
    }

    /// Every stream fails with `error` after delivering `frames` frames.
    pub fn fail_after(mut self, frames: usize, error: DriverError) -> Self {
        self.fail_after = Some((frames, error));
        self
    }

    /// Streams currently open.
    pub fn open_streams(&self) -> usize {
        self.counters.open.load(Ordering::SeqCst)
    }

    /// Highest number of streams that were ever open at the same time.
    pub fn max_concurrent_streams(&self) -> usize {
        self.counters.max_open.load(Ordering::SeqCst)
    }

    pub fn opened_total(&self) -> usize {
        self.counters.opened_total.load(Ordering::SeqCst)
    }
}

impl CaptureDriver for ScriptedDriver {
    fn list_interfaces(&self) -> Result<Vec<Interface>, DriverError> {
        match &self.enumeration_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.interfaces.clone()),
        }
    }

    fn open_stream(&self, device: &DeviceFilter) -> Result<Box<dyn FrameSource>, DriverError> {
        let label = device.label();
        if let Some(error) = self.open_errors.lock().get(label) {
            return Err(error.clone());
        }

        let known = matches!(device, DeviceFilter::All)
            || self.frames.contains_key(label)
            || self.interfaces.iter().any(|i| i.name == label);
        if !known {
            return Err(DriverError::UnknownDevice(label.to_string()));
        }

        self.counters.opened();
        debug!(device = label, "Scripted stream opened");

        Ok(Box::new(ScriptedSource {
            interface: Arc::from(label),
            link_type: self.link_type,
            frames: self.frames.get(label).cloned().unwrap_or_default(),
            position: 0,
            delivered: 0,
            interval: self.frame_interval,
            repeat: self.repeat,
            fail_after: self.fail_after.clone(),
            counters: self.counters.clone(),
        }))
    }
}

struct ScriptedSource {
    interface: Arc<str>,
    link_type: LinkType,
    frames: Vec<Bytes>,
    position: usize,
    delivered: usize,
    interval: Duration,
    repeat: bool,
    fail_after: Option<(usize, DriverError)>,
    counters: Arc<StreamCounters>,
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, DriverError> {
        if let Some((limit, error)) = &self.fail_after {
            if self.delivered >= *limit {
                return Err(error.clone());
            }
        }

        if self.position >= self.frames.len() {
            if self.repeat && !self.frames.is_empty() {
                self.position = 0;
            } else {
                std::thread::sleep(IDLE_POLL);
                return Ok(None);
            }
        }

        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }

        let data = self.frames[self.position].clone();
        self.position += 1;
        self.delivered += 1;

        Ok(Some(RawFrame::new(
            self.interface.clone(),
            self.link_type,
            Utc::now(),
            data,
        )))
    }

    fn link_type(&self) -> LinkType {
        self.link_type
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.counters.closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_frames_then_idles() {
        let driver = ScriptedDriver::new(LinkType::Ethernet)
            .with_frames("eth0", vec![vec![1u8, 2], vec![3u8]]);
        let mut source = driver.open_stream(&DeviceFilter::from("eth0")).unwrap();

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.data.as_ref(), &[1, 2]);
        assert_eq!(&*first.interface, "eth0");
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn tracks_open_streams() {
        let driver = ScriptedDriver::new(LinkType::Ethernet);
        let a = driver.open_stream(&DeviceFilter::All).unwrap();
        let b = driver.open_stream(&DeviceFilter::All).unwrap();
        assert_eq!(driver.open_streams(), 2);
        drop(a);
        drop(b);
        assert_eq!(driver.open_streams(), 0);
        assert_eq!(driver.max_concurrent_streams(), 2);
        assert_eq!(driver.opened_total(), 2);
    }

    #[test]
    fn open_failures_can_be_lifted() {
        let driver = ScriptedDriver::new(LinkType::Ethernet)
            .with_interface(Interface::new("eth0"))
            .fail_open("eth0", DriverError::PermissionDenied("eth0".into()));

        assert!(matches!(
            driver.open_stream(&DeviceFilter::from("eth0")),
            Err(DriverError::PermissionDenied(_))
        ));
        driver.allow_open("eth0");
        assert!(driver.open_stream(&DeviceFilter::from("eth0")).is_ok());
    }

    #[test]
    fn unknown_device_is_rejected() {
        let driver = ScriptedDriver::new(LinkType::Ethernet);
        assert!(matches!(
            driver.open_stream(&DeviceFilter::from("wlan9")),
            Err(DriverError::UnknownDevice(_))
        ));
    }

    #[test]
    fn fails_after_budget() {
        let driver = ScriptedDriver::new(LinkType::Ethernet)
            .with_frames("all", vec![vec![0u8; 4]])
            .repeat()
            .fail_after(2, DriverError::Read("link down".into()));
        let mut source = driver.open_stream(&DeviceFilter::All).unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert_eq!(
            source.next_frame().unwrap_err(),
            DriverError::Read("link down".into())
        );
    }
}
