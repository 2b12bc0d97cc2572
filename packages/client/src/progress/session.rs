//! Progress session: one tracked resource, one connection, one state machine.

use tokio::sync::watch;

use crate::{
    connection::ConnectionManager,
    status::StatusMessage,
    target::ConnectionTarget,
};

use super::machine::{Effect, ProgressMachine, ViewState};

type CompleteHandler = Box<dyn FnMut(&StatusMessage) + Send>;
type ErrorHandler = Box<dyn FnMut(&str) + Send>;

/// Tracks the generation progress of one resource.
///
/// The session owns its [`ConnectionManager`]; dropping the session closes
/// the connection. Display code reads snapshots through
/// [`subscribe`](Self::subscribe) and never mutates them.
pub struct ProgressSession {
    target: ConnectionTarget,
    manager: ConnectionManager,
    machine: ProgressMachine,
    snapshots: watch::Sender<ViewState>,
    on_complete: Option<CompleteHandler>,
    on_error: Option<ErrorHandler>,
}

impl ProgressSession {
    /// Start tracking `target` over `manager`.
    pub fn start(target: ConnectionTarget, mut manager: ConnectionManager) -> Self {
        let machine = ProgressMachine::new();
        let (snapshots, _) = watch::channel(machine.state().clone());

        tracing::info!("Tracking progress of {}", target);
        manager.connect(&target);

        Self {
            target,
            manager,
            machine,
            snapshots,
            on_complete: None,
            on_error: None,
        }
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Access the underlying manager, e.g. to register raw event callbacks.
    pub fn manager_mut(&mut self) -> &mut ConnectionManager {
        &mut self.manager
    }

    /// Register the completion callback, replacing any previous one.
    pub fn on_complete(&mut self, handler: impl FnMut(&StatusMessage) + Send + 'static) {
        self.on_complete = Some(Box::new(handler));
    }

    /// Register the error callback, replacing any previous one.
    pub fn on_error(&mut self, handler: impl FnMut(&str) + Send + 'static) {
        self.on_error = Some(Box::new(handler));
    }

    /// Current view state.
    pub fn snapshot(&self) -> ViewState {
        self.machine.state().clone()
    }

    /// Receiver of every published view state.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.snapshots.subscribe()
    }

    /// Process the next connection event.
    ///
    /// Returns `false` once the connection has no more events to deliver.
    pub async fn step(&mut self) -> bool {
        let Some(event) = self.manager.next_event().await else {
            return false;
        };

        let effects = self.machine.handle(&event);
        self.apply(effects);
        self.publish();
        true
    }

    /// Process events until the view settles or the connection goes quiet.
    pub async fn run(&mut self) -> ViewState {
        while !self.machine.state().connection_phase.is_settled() {
            if !self.step().await {
                break;
            }
        }
        self.snapshot()
    }

    /// Manual retry after an error.
    ///
    /// Returns `false` when the view is not in the error phase.
    pub fn retry(&mut self) -> bool {
        let effects = self.machine.retry();
        if effects.is_empty() {
            return false;
        }

        tracing::info!("Retrying progress tracking of {}", self.target);
        self.apply(effects);
        self.publish();
        true
    }

    /// Track another resource, discarding the current connection and state.
    pub fn retarget(&mut self, target: ConnectionTarget) {
        self.manager.disconnect();
        self.target = target;
        self.machine = ProgressMachine::new();
        self.publish();

        tracing::info!("Tracking progress of {}", self.target);
        self.manager.connect(&self.target);
    }

    /// Close the connection without changing the view state.
    pub fn close(&mut self) {
        self.manager.disconnect();
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Completed(message) => {
                    tracing::info!("Generation of {} completed", self.target);
                    if let Some(handler) = self.on_complete.as_mut() {
                        handler(&message);
                    }
                }
                Effect::Failed(reason) => {
                    tracing::warn!("Progress tracking of {}: {}", self.target, reason);
                    if let Some(handler) = self.on_error.as_mut() {
                        handler(&reason);
                    }
                }
                Effect::CloseConnection => self.manager.disconnect(),
                Effect::Reconnect => self.manager.connect(&self.target),
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.machine.state().clone());
    }
}
