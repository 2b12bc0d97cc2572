//! Connection manager: the owner-facing side of a live progress connection.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    domain::ReconnectPolicy,
    error::ConnectionError,
    status::StatusMessage,
    target::ConnectionTarget,
};

use super::{
    EVENT_QUEUE_CAPACITY,
    event::ConnectionEvent,
    transport::{Transport, WebSocketTransport},
    worker::Worker,
};

type OpenHandler = Box<dyn FnMut() + Send>;
type MessageHandler = Box<dyn FnMut(&StatusMessage) + Send>;
type ErrorHandler = Box<dyn FnMut(&ConnectionError) + Send>;
type CloseHandler = Box<dyn FnMut(bool) + Send>;

#[derive(Default)]
struct Handlers {
    on_open: Option<OpenHandler>,
    on_message: Option<MessageHandler>,
    on_error: Option<ErrorHandler>,
    on_close: Option<CloseHandler>,
}

impl Handlers {
    fn dispatch(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Open => {
                if let Some(handler) = self.on_open.as_mut() {
                    handler();
                }
            }
            ConnectionEvent::Message(message) => {
                if let Some(handler) = self.on_message.as_mut() {
                    handler(message);
                }
            }
            ConnectionEvent::Error(error) => {
                if let Some(handler) = self.on_error.as_mut() {
                    handler(error);
                }
            }
            ConnectionEvent::Closed { clean } => {
                if let Some(handler) = self.on_close.as_mut() {
                    handler(*clean);
                }
            }
            ConnectionEvent::Reconnecting { .. } => {}
        }
    }
}

struct ActiveConnection {
    target: ConnectionTarget,
    events: mpsc::Receiver<ConnectionEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

/// Maintains at most one live connection and surfaces its events.
///
/// Events are produced by a worker task and consumed through
/// [`next_event`](Self::next_event), which also invokes the registered
/// callbacks. Callbacks therefore only ever run on the owner's task, and none
/// run after [`disconnect`](Self::disconnect).
///
/// `connect` spawns a task and must be called from within a tokio runtime.
///
/// ```ignore
/// let mut manager = ConnectionManager::new(Arc::new(WebSocketTransport), ReconnectPolicy::default());
/// manager.on_message(|message| println!("{}", message.status));
/// manager.connect(&ConnectionTarget::assignment("42", "https://api.example.com"));
/// while manager.next_event().await.is_some() {}
/// ```
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    handlers: Handlers,
    active: Option<ActiveConnection>,
}

impl ConnectionManager {
    pub fn new(transport: Arc<dyn Transport>, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            policy,
            handlers: Handlers::default(),
            active: None,
        }
    }

    /// Manager backed by a real WebSocket transport.
    pub fn websocket(policy: ReconnectPolicy) -> Self {
        Self::new(Arc::new(WebSocketTransport), policy)
    }

    /// Register the open callback, replacing any previous one.
    pub fn on_open(&mut self, handler: impl FnMut() + Send + 'static) {
        self.handlers.on_open = Some(Box::new(handler));
    }

    /// Register the message callback, replacing any previous one.
    pub fn on_message(&mut self, handler: impl FnMut(&StatusMessage) + Send + 'static) {
        self.handlers.on_message = Some(Box::new(handler));
    }

    /// Register the error callback, replacing any previous one.
    pub fn on_error(&mut self, handler: impl FnMut(&ConnectionError) + Send + 'static) {
        self.handlers.on_error = Some(Box::new(handler));
    }

    /// Register the close callback, replacing any previous one.
    ///
    /// The argument is `true` when the close followed a terminal status.
    pub fn on_close(&mut self, handler: impl FnMut(bool) + Send + 'static) {
        self.handlers.on_close = Some(Box::new(handler));
    }

    /// Open a connection to `target`, tearing down any existing one first.
    ///
    /// Never fails directly: an invalid target is reported as a terminal
    /// error event, transport failures go through the reconnect policy.
    pub fn connect(&mut self, target: &ConnectionTarget) {
        self.disconnect();

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        let url = match target.url() {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot connect to {}: {}", target, e);
                // The queue is empty and freshly created, so this cannot fail
                let _ = events_tx.try_send(ConnectionEvent::Error(e));
                self.active = Some(ActiveConnection {
                    target: target.clone(),
                    events: events_rx,
                    shutdown: None,
                    worker: None,
                });
                return;
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let worker = Worker {
            transport: self.transport.clone(),
            url,
            policy: self.policy,
            events: events_tx,
            shutdown: shutdown_rx,
        };

        tracing::debug!("Starting connection worker for {}", target);
        self.active = Some(ActiveConnection {
            target: target.clone(),
            events: events_rx,
            shutdown: Some(shutdown_tx),
            worker: Some(tokio::spawn(worker.run())),
        });
    }

    /// Wait for the next event and invoke its callback.
    ///
    /// Returns `None` when no connection is active or its worker has stopped.
    /// Cancel-safe: dropping the future loses no event.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        let event = self.active.as_mut()?.events.recv().await;

        match event {
            Some(event) => {
                self.handlers.dispatch(&event);
                Some(event)
            }
            None => {
                self.active = None;
                None
            }
        }
    }

    /// Close the active connection and cancel any pending reconnect.
    ///
    /// Idempotent, and invokes no callback.
    pub fn disconnect(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        tracing::debug!("Disconnecting from {}", active.target);
        if let Some(shutdown) = active.shutdown.take() {
            // The worker may already have stopped on its own
            let _ = shutdown.send(());
        }
        active.events.close();
        drop(active.worker);
    }

    /// Whether a connection (or its pending reconnect) is attached.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}
