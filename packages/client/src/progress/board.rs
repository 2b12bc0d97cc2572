//! Progress board: live tracking of every generating assignment of a listing.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use futures_util::future;
use genwatch_shared::dto::{Assignment, GenerationStatus};

use crate::{
    connection::{ConnectionManager, Transport, WebSocketTransport},
    domain::ReconnectPolicy,
    target::ConnectionTarget,
};

use super::{machine::ViewState, session::ProgressSession};

/// A change on one tracked assignment
#[derive(Debug, Clone, PartialEq)]
pub struct BoardUpdate {
    pub id: u64,
    pub state: ViewState,
    /// The session settled or went quiet and has been dropped from the board
    pub finished: bool,
}

/// One [`ProgressSession`] per generating assignment of a listing.
///
/// The board owns its sessions: dropping the board closes every connection.
pub struct ProgressBoard {
    base_url: String,
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    sessions: HashMap<u64, ProgressSession>,
    finished: HashSet<u64>,
}

impl ProgressBoard {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            policy,
            sessions: HashMap::new(),
            finished: HashSet::new(),
        }
    }

    /// Board whose sessions connect over WebSocket.
    pub fn websocket(base_url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self::new(base_url, Arc::new(WebSocketTransport), policy)
    }

    /// Align the tracked sessions with a fresh listing.
    ///
    /// Starts a session for every `in_progress` assignment that has none and
    /// drops the sessions of assignments no longer listed as in progress.
    /// Assignments whose run already finished on this board are not tracked
    /// again, even if the listing still reports them as in progress.
    pub fn sync(&mut self, assignments: &[Assignment]) {
        let generating: HashSet<u64> = assignments
            .iter()
            .filter(|a| a.generation_status == GenerationStatus::InProgress)
            .map(|a| a.id)
            .collect();

        self.sessions.retain(|id, _| {
            let keep = generating.contains(id);
            if !keep {
                tracing::debug!("Assignment {} is no longer generating", id);
            }
            keep
        });

        let mut new_ids: Vec<u64> = generating
            .into_iter()
            .filter(|id| !self.sessions.contains_key(id) && !self.finished.contains(id))
            .collect();
        new_ids.sort_unstable();
        for id in new_ids {
            let manager = ConnectionManager::new(self.transport.clone(), self.policy);
            let target = ConnectionTarget::assignment(id, self.base_url.as_str());
            self.sessions.insert(id, ProgressSession::start(target, manager));
        }
    }

    /// Ids of the tracked assignments, in ascending order.
    pub fn tracked(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn snapshot(&self, id: u64) -> Option<ViewState> {
        self.sessions.get(&id).map(ProgressSession::snapshot)
    }

    /// Wait for the next event on any tracked session.
    ///
    /// A session that settles or whose connection goes quiet is dropped,
    /// which closes its connection. Returns `None` when nothing is tracked.
    pub async fn next_update(&mut self) -> Option<BoardUpdate> {
        if self.sessions.is_empty() {
            return None;
        }

        let steps = self.sessions.iter_mut().map(|(id, session)| {
            let id = *id;
            Box::pin(async move { (id, session.step().await) })
        });
        // Pending steps are only parked on their event queue and can be dropped.
        let ((id, progressed), _, pending) = future::select_all(steps).await;
        drop(pending);

        let state = self.sessions.get(&id)?.snapshot();
        let finished = !progressed || state.connection_phase.is_settled();
        if finished {
            tracing::info!("Stopped tracking assignment {}", id);
            self.sessions.remove(&id);
            self.finished.insert(id);
        }
        Some(BoardUpdate {
            id,
            state,
            finished,
        })
    }
}
