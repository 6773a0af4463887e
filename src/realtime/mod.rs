//! Real-time update layer
//!
//! Tracks live WebSocket connections grouped by subscriber identity and
//! fans typed event envelopes out to them. Delivery is at-most-once and
//! best-effort: a dead connection is dropped, never retried.

mod envelope;
mod registry;
pub mod session;

pub use envelope::{ClientMessage, DecodeError, WsEnvelope};
pub use registry::{ClientHandle, ConnectionId, ConnectionRegistry, ANONYMOUS_IDENTITY};
