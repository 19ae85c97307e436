//! Host-page transport for the JSON bridge.
//!
//! When the engine runs as WASM inside an iframe, the parent page acts as
//! the middleware client. Envelopes travel both ways over `postMessage`
//! and are routed by [`crate::messages::bridge::BridgeRouter`].
//!
//! ## Message Flow
//!
//! ```text
//! Parent window  <──postMessage──>  engine (iframe)
//!      │                                  │
//!      ├─ {"op": "publish", ...} ───────> │ ─> LocalBus topic
//!      ├─ {"op": "subscribe", ...} ─────> │
//!      │ <───────── {"op": "publish"} ────┤ <─ subscribed topic traffic
//! ```
//!
//! ## Envelopes
//!
//! | op            | fields                               |
//! |---------------|--------------------------------------|
//! | `publish`     | `topic`, optional `type`, `msg`      |
//! | `subscribe`   | `topic`, `type`, optional `queue_length` |
//! | `unsubscribe` | `topic`                              |
//!
//! A publish without `type` is decoded with the type last seen for the
//! topic. Rejected envelopes are logged and dropped.

/// Bevy plugin moving envelopes between the page and the bridge router.
pub mod web_bridge;
