//! ## netpeek-core::events
//! **Packet model and fan-out**
//!
//! - `frame`: raw link-layer frames handed over by capture drivers
//! - `packet`: decoded, immutable packet summaries
//! - `bus`: per-subscriber bounded queues with drop-oldest overflow
//! - `history`: bounded retention of recent packets for inspection

pub mod bus;
pub mod frame;
pub mod history;
pub mod packet;

pub use bus::{Broadcaster, PublishReport, Subscription, SubscriptionId};
pub use frame::{LinkType, RawFrame};
pub use history::{PacketHistory, RetentionPolicy};
pub use packet::{PacketId, PacketSummary, Protocol};
