//! Server execution logic.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, patch, post},
};
use genwatch_shared::time::{Clock, SystemClock};
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::trace::TraceLayer;

use crate::store::AssignmentStore;

use super::{
    handler::{
        assignment_progress, confirm_chat_message, generate_application, generate_code,
        get_assignment, get_chat_messages, health_check, improve_chat_message, list_assignments,
        project_progress, start_generation, trigger_bidding,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Stub assignment backend
///
/// Serves the REST endpoints over an in-memory store and replays scripted
/// generation runs on the progress channels.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(AssignmentStore::seeded(Utc::now()), Duration::from_secs(1), None);
/// server.run("127.0.0.1".to_string(), 8000).await?;
/// ```
pub struct Server {
    store: AssignmentStore,
    step_delay: Duration,
    token: Option<String>,
    clock: Arc<dyn Clock>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `store` - Initial assignments
    /// * `step_delay` - Pause between two replayed progress updates
    /// * `token` - Bearer token required by the REST endpoints; `None` accepts any request
    pub fn new(store: AssignmentStore, step_delay: Duration, token: Option<String>) -> Self {
        Self {
            store,
            step_delay,
            token,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to timestamp created assignments and chat messages
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Routes of the backend, sharing one state
    pub fn into_router(self) -> Router {
        let state = Arc::new(AppState {
            store: Mutex::new(self.store),
            step_delay: self.step_delay,
            token: self.token,
            clock: self.clock,
        });

        Router::new()
            // Progress channels
            .route("/assignments/{id}/generation/", get(assignment_progress))
            .route("/projects/{id}/progress/", get(project_progress))
            // REST API
            .route("/api/health", get(health_check))
            .route("/api/assignments/assignments/", get(list_assignments))
            .route("/api/assignments/assignments/{id}/", get(get_assignment))
            .route("/api/assignments/{id}/chat/messages/", get(get_chat_messages))
            .route(
                "/api/assignments/{id}/chat/improve/",
                post(improve_chat_message),
            )
            .route(
                "/api/assignments/{id}/chat/messages/{message_id}/",
                patch(confirm_chat_message),
            )
            .route("/api/assignments/trigger-bidding/", post(trigger_bidding))
            .route("/api/agents/generate/", post(start_generation))
            .route("/api/containers/generate", post(generate_code))
            .route(
                "/api/containers/generate-application",
                post(generate_application),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Serve on an already bound listener until the process stops.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        axum::serve(listener, self.into_router()).await
    }

    /// Run the backend
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8000)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("genwatch stub backend listening on {}", local_addr);
        tracing::info!("REST API: http://{}/api/", local_addr);
        tracing::info!(
            "Progress: ws://{}/assignments/{{id}}/generation/",
            local_addr
        );
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
