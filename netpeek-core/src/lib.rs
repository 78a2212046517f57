//! # netpeek-core
//!
//! Foundation layer shared by the capture, decoding and session crates.
//!
//! ### Key Submodules:
//! - `events`: frame and packet model, the event broadcaster, retained history
//! - `error`: error conditions of the event layer

pub mod error;
pub mod events;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::events::*;
}

pub use error::EventError;
