//! # netpeek protocol decoding
//!
//! Turns raw link-layer frames into [`PacketSummary`](netpeek_core::events::PacketSummary)
//! values. Decoding is best effort: it never fails, it only leaves fields empty.

pub mod decoder;
pub mod link;
pub mod network;
pub mod render;
pub mod transport;

pub use decoder::{decode, dissect, Layers};
