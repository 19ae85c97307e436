//! Middleware message types and the in-process message bus.
//!
//! The visualiser never talks to the network directly. Everything it
//! consumes or produces travels as a typed [`Message`] over a
//! [`bus::LocalBus`], which an outer transport (the JSON bridge, the demo
//! server, or a real middleware client) feeds and drains.
//!
//! ## Message Flow
//!
//! ```text
//! transport ──publish──> LocalBus ──spin_once──> subscriber callbacks
//!                            ^                        │
//!                            └──────publish───────────┘
//!                              (feedback, resync requests)
//! ```
//!
//! Message structs mirror the middleware definitions field for field so
//! that the JSON bridge can (de)serialise them without adapters.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Topic table, bounded subscriber queues and subscription handles.
pub mod bus;

/// Rosbridge-style JSON envelopes routed onto the bus.
pub mod bridge;

pub mod geometry_msgs;
pub mod nav_msgs;
pub mod sensor_msgs;
pub mod std_msgs;
pub mod tf2_msgs;
pub mod visualization_msgs;

pub use bus::{BusError, LocalBus, Subscription};

/// A message that can travel over the bus and through the JSON bridge.
pub trait Message: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Fully qualified middleware type name, e.g. `tf2_msgs/TFMessage`.
    const TYPE_NAME: &'static str;
}
