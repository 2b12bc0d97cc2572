//! Events delivered by the connection manager.

use std::time::Duration;

use crate::{error::ConnectionError, status::StatusMessage};

/// One lifecycle or message event of a live connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The socket opened
    Open,
    /// A status message arrived
    Message(StatusMessage),
    /// Something went wrong; see [`ConnectionError::is_terminal`]
    Error(ConnectionError),
    /// The socket closed. `clean` is true only after a terminal status
    Closed { clean: bool },
    /// A reconnection attempt is scheduled after `delay`
    Reconnecting {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
}
