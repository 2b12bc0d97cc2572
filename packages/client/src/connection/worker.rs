//! Connection worker task.
//!
//! One worker owns one socket at a time. It parses inbound frames, forwards
//! events into the owner's bounded queue and reconnects according to the
//! [`ReconnectPolicy`]. It stops when the owner signals shutdown or drops the
//! queue, after a terminal status, or once the reconnect cap is hit.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::{
    domain::{ConnectionOutcome, ReconnectDecision, ReconnectPolicy},
    error::ConnectionError,
    status::StatusMessage,
};

use super::{
    event::ConnectionEvent,
    transport::{Frame, StatusStream, Transport},
};

pub(super) struct Worker {
    pub transport: Arc<dyn Transport>,
    pub url: Url,
    pub policy: ReconnectPolicy,
    pub events: mpsc::Sender<ConnectionEvent>,
    pub shutdown: oneshot::Receiver<()>,
}

impl Worker {
    pub async fn run(mut self) {
        let mut attempts = 0;

        loop {
            let outcome = self.run_connection(&mut attempts).await;

            match self.policy.decide(outcome, attempts) {
                ReconnectDecision::Stop => {
                    tracing::debug!("Connection worker for {} stopped ({:?})", self.url, outcome);
                    return;
                }
                ReconnectDecision::GiveUp { attempts } => {
                    tracing::error!(
                        "Failed to reconnect to {} after {} attempts",
                        self.url,
                        attempts
                    );
                    self.emit(ConnectionEvent::Error(
                        ConnectionError::ReconnectLimitReached { attempts },
                    ))
                    .await;
                    return;
                }
                ReconnectDecision::Retry { attempt, delay } => {
                    tracing::info!(
                        "Reconnecting to {} in {} ms... (attempt {}/{})",
                        self.url,
                        delay.as_millis(),
                        attempt,
                        self.policy.max_attempts
                    );
                    let scheduled = ConnectionEvent::Reconnecting {
                        attempt,
                        max_attempts: self.policy.max_attempts,
                        delay,
                    };
                    if !self.emit(scheduled).await {
                        return;
                    }
                    tokio::select! {
                        _ = &mut self.shutdown => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempts = attempt;
                }
            }
        }
    }

    /// Open one socket and pump it until it ends.
    async fn run_connection(&mut self, attempts: &mut u32) -> ConnectionOutcome {
        tracing::info!("Connecting to {}", self.url);

        let opened = tokio::select! {
            _ = &mut self.shutdown => return ConnectionOutcome::Shutdown,
            opened = self.transport.open(&self.url) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Failed to connect to {}: {}", self.url, e);
                if !self.emit(ConnectionEvent::Error(e)).await {
                    return ConnectionOutcome::Shutdown;
                }
                return ConnectionOutcome::OpenFailed;
            }
        };

        tracing::info!("Connection to {} established", self.url);
        *attempts = 0;
        if !self.emit(ConnectionEvent::Open).await {
            stream.close().await;
            return ConnectionOutcome::Shutdown;
        }

        let outcome = self.pump(stream.as_mut()).await;
        if matches!(
            outcome,
            ConnectionOutcome::Finished | ConnectionOutcome::Shutdown
        ) {
            stream.close().await;
        }
        outcome
    }

    async fn pump(&mut self, stream: &mut dyn StatusStream) -> ConnectionOutcome {
        loop {
            let frame = tokio::select! {
                _ = &mut self.shutdown => return ConnectionOutcome::Shutdown,
                frame = stream.next_frame() => frame,
            };

            let delivered = match frame {
                Frame::Text(text) => match serde_json::from_str::<StatusMessage>(&text) {
                    Ok(message) => {
                        let terminal = message.is_terminal();
                        tracing::debug!("Status update from {}: {}", self.url, message.status);
                        if !self.emit(ConnectionEvent::Message(message)).await {
                            return ConnectionOutcome::Shutdown;
                        }
                        if terminal {
                            self.emit(ConnectionEvent::Closed { clean: true }).await;
                            return ConnectionOutcome::Finished;
                        }
                        true
                    }
                    Err(e) => {
                        tracing::warn!("Ignoring malformed status payload: {}", e);
                        self.emit(ConnectionEvent::Error(ConnectionError::MalformedPayload {
                            reason: e.to_string(),
                        }))
                        .await
                    }
                },
                Frame::Binary(len) => {
                    self.emit(ConnectionEvent::Error(ConnectionError::MalformedPayload {
                        reason: format!("unexpected binary frame ({} bytes)", len),
                    }))
                    .await
                }
                Frame::Closed => {
                    tracing::warn!("Connection to {} closed before a terminal status", self.url);
                    if !self.emit(ConnectionEvent::Closed { clean: false }).await {
                        return ConnectionOutcome::Shutdown;
                    }
                    return ConnectionOutcome::Lost;
                }
                Frame::Failed(reason) => {
                    tracing::warn!("Connection to {} failed: {}", self.url, reason);
                    if !self
                        .emit(ConnectionEvent::Error(ConnectionError::Transport(reason)))
                        .await
                        || !self.emit(ConnectionEvent::Closed { clean: false }).await
                    {
                        return ConnectionOutcome::Shutdown;
                    }
                    return ConnectionOutcome::Lost;
                }
            };

            if !delivered {
                return ConnectionOutcome::Shutdown;
            }
        }
    }

    /// Forward an event to the owner. Returns `false` once the owner is gone.
    async fn emit(&self, event: ConnectionEvent) -> bool {
        self.events.send(event).await.is_ok()
    }
}
