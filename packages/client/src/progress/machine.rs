//! Progress view state machine.
//!
//! Turns connection events into a [`ViewState`] and a list of side effects.
//! The machine never touches the connection itself; the session applies the
//! effects it returns.

use crate::{
    connection::ConnectionEvent,
    error::ConnectionError,
    status::{self, FAILED_STEP_INDEX, GenerationStep, StatusMessage},
};

pub const CONNECTING_MESSAGE: &str = "Connecting to progress tracker...";
pub const CONNECTED_MESSAGE: &str = "Connected. Waiting for progress updates...";
pub const RECONNECTING_MESSAGE: &str = "Reconnecting...";
pub const CONNECTION_LOST_MESSAGE: &str = "connection lost";
pub const COMPLETED_MESSAGE: &str = "Generation completed";

/// Lifecycle phase of the tracked connection as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionPhase {
    Connecting,
    Connected,
    Disconnected,
    Error,
    Completed,
}

impl ConnectionPhase {
    /// Whether no further transition happens without a manual retry
    pub fn is_settled(&self) -> bool {
        matches!(self, ConnectionPhase::Error | ConnectionPhase::Completed)
    }
}

/// Snapshot consumed by display code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub connection_phase: ConnectionPhase,
    /// Active step in `[-1, 5]`; `-1` means error
    pub step_index: i32,
    /// Never empty
    pub display_message: String,
    pub last_error: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            connection_phase: ConnectionPhase::Connecting,
            step_index: 0,
            display_message: CONNECTING_MESSAGE.to_string(),
            last_error: None,
        }
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Generation finished; carries the terminal message
    Completed(StatusMessage),
    /// Report an error to the owner
    Failed(String),
    /// Close the connection deliberately
    CloseConnection,
    /// Open the connection again with a fresh attempt counter
    Reconnect,
}

/// State machine behind one progress view.
#[derive(Debug, Clone, Default)]
pub struct ProgressMachine {
    state: ViewState,
}

impl ProgressMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Feed one connection event.
    pub fn handle(&mut self, event: &ConnectionEvent) -> Vec<Effect> {
        if self.state.connection_phase.is_settled() {
            tracing::debug!("Ignoring {:?} in settled phase", event);
            return Vec::new();
        }

        match event {
            ConnectionEvent::Open => self.on_open(),
            ConnectionEvent::Message(message) => self.on_message(message),
            ConnectionEvent::Error(error) => self.on_error(error),
            ConnectionEvent::Closed { clean } => self.on_closed(*clean),
            ConnectionEvent::Reconnecting { .. } => self.on_reconnecting(),
        }
    }

    /// Manual retry from the error phase.
    ///
    /// Returns no effect unless the machine is in [`ConnectionPhase::Error`].
    pub fn retry(&mut self) -> Vec<Effect> {
        if self.state.connection_phase != ConnectionPhase::Error {
            return Vec::new();
        }
        self.state = ViewState::default();
        vec![Effect::Reconnect]
    }

    fn on_open(&mut self) -> Vec<Effect> {
        if self.state.connection_phase != ConnectionPhase::Connecting {
            return Vec::new();
        }
        self.state.connection_phase = ConnectionPhase::Connected;
        self.state.last_error = None;
        self.state.display_message = CONNECTED_MESSAGE.to_string();
        Vec::new()
    }

    fn on_message(&mut self, message: &StatusMessage) -> Vec<Effect> {
        if !matches!(
            self.state.connection_phase,
            ConnectionPhase::Connecting | ConnectionPhase::Connected
        ) {
            return Vec::new();
        }

        if status::is_completed(&message.status) {
            self.state.connection_phase = ConnectionPhase::Completed;
            self.state.step_index = GenerationStep::LAST_INDEX;
            self.state.display_message = match message.message.as_deref() {
                Some(text) if !text.trim().is_empty() => text.to_string(),
                _ => COMPLETED_MESSAGE.to_string(),
            };
            return vec![Effect::Completed(message.clone()), Effect::CloseConnection];
        }

        if status::is_failure(&message.status) {
            let reason = message.failure_reason();
            self.fail(reason.clone());
            return vec![Effect::Failed(reason), Effect::CloseConnection];
        }

        let mapping = status::map_status(message);
        self.state.connection_phase = ConnectionPhase::Connected;
        self.state.step_index = self.state.step_index.max(mapping.step_index);
        self.state.display_message = mapping.display_message;
        Vec::new()
    }

    fn on_error(&mut self, error: &ConnectionError) -> Vec<Effect> {
        let reason = error.to_string();
        if error.is_terminal() {
            self.fail(reason.clone());
            return vec![Effect::Failed(reason)];
        }

        self.state.display_message = match error {
            ConnectionError::MalformedPayload { reason } => {
                format!("Received an unreadable progress update: {}", reason)
            }
            ConnectionError::Transport(reason) => format!("Connection failed: {}", reason),
            other => other.to_string(),
        };
        self.state.last_error = Some(reason);
        Vec::new()
    }

    fn on_closed(&mut self, clean: bool) -> Vec<Effect> {
        if clean || self.state.connection_phase != ConnectionPhase::Connected {
            return Vec::new();
        }
        self.state.connection_phase = ConnectionPhase::Disconnected;
        self.state.display_message = "Connection lost".to_string();
        self.state.last_error = Some(CONNECTION_LOST_MESSAGE.to_string());
        vec![Effect::Failed(CONNECTION_LOST_MESSAGE.to_string())]
    }

    fn on_reconnecting(&mut self) -> Vec<Effect> {
        self.state.connection_phase = ConnectionPhase::Connecting;
        self.state.display_message = RECONNECTING_MESSAGE.to_string();
        Vec::new()
    }

    fn fail(&mut self, reason: String) {
        self.state.connection_phase = ConnectionPhase::Error;
        self.state.step_index = FAILED_STEP_INDEX;
        self.state.display_message = reason.clone();
        self.state.last_error = Some(reason);
    }
}
