//! # netpeek engine
//!
//! The capture session state machine and the pipeline that turns driver frames
//! into published [`PacketSummary`](netpeek_core::events::PacketSummary) values.

pub mod config;
pub mod session;

pub use session::{CaptureSession, SessionError, SessionOptions, SessionState, StreamStats};

pub mod prelude {
    pub use crate::session::{CaptureSession, SessionError, SessionOptions, SessionState};
    pub use netpeek_capture::{CaptureDriver, DeviceFilter, DriverError};
    pub use netpeek_core::events::{PacketSummary, Subscription};
}
