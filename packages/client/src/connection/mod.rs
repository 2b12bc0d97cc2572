//! Live progress connection.
//!
//! - `transport`: the socket seam and its WebSocket implementation
//! - `worker`: the task that owns one socket and applies the reconnect policy
//! - `manager`: the owner-facing handle with callbacks and an event stream

mod event;
mod manager;
mod transport;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use event::ConnectionEvent;
pub use manager::ConnectionManager;
pub use transport::{Frame, StatusStream, Transport, WebSocketTransport};

/// Capacity of the queue between a connection worker and its owner
pub const EVENT_QUEUE_CAPACITY: usize = 32;
