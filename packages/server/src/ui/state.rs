//! Shared server state.

use std::{sync::Arc, time::Duration};

use genwatch_shared::time::Clock;
use tokio::sync::Mutex;

use crate::store::AssignmentStore;

/// Shared application state
pub struct AppState {
    /// Assignments and chats
    pub store: Mutex<AssignmentStore>,
    /// Pause between two replayed progress updates
    pub step_delay: Duration,
    /// Bearer token required by the REST endpoints, if any
    pub token: Option<String>,
    /// Source of creation timestamps
    pub clock: Arc<dyn Clock>,
}
