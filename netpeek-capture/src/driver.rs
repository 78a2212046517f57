//! Contract between the capture session and the packet-capture facility.

use netpeek_core::events::{LinkType, RawFrame};

use crate::device::{DeviceFilter, Interface};
use crate::error::DriverError;

/// Packet-capture facility: enumerates devices and opens live frame streams.
pub trait CaptureDriver: Send + Sync {
    fn list_interfaces(&self) -> Result<Vec<Interface>, DriverError>;

    /// Opens a live stream scoped to `device`. Dropping the returned source closes it.
    fn open_stream(&self, device: &DeviceFilter) -> Result<Box<dyn FrameSource>, DriverError>;
}

/// A live, cancelable sequence of raw link-layer frames.
///
/// `next_frame` may block for at most the driver's read timeout. `Ok(None)` means
/// no frame arrived within that window; callers check for cancellation and retry.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, DriverError>;

    fn link_type(&self) -> LinkType;
}
