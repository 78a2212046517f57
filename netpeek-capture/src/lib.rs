//! netpeek-capture
//!
//! Capture driver seam for netpeek: device enumeration, live frame streams over
//! libpcap, and a scripted driver for tests and offline runs.

pub mod device;
pub mod driver;
pub mod error;
pub mod pcap_capture;
pub mod registry;
pub mod scripted;

pub use device::{DeviceFilter, Interface, InterfaceAddress, ALL_DEVICES};
pub use driver::{CaptureDriver, FrameSource};
pub use error::DriverError;
pub use pcap_capture::{CaptureOptions, PcapDriver};
pub use scripted::ScriptedDriver;
