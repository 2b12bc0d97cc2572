//! Progress channel handlers.
//!
//! Each subscriber gets its own replay of a scripted generation run. The
//! socket is closed by the server once the terminal status has been sent.

use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use genwatch_shared::dto::GenerationStatus;

use crate::{
    progress::{ProgressUpdate, failed_run, successful_run},
    ui::state::AppState,
};

const FAILURE_REASON: &str = "Tests failed during review";

/// `GET /assignments/{id}/generation/`
pub async fn assignment_progress(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, StatusCode> {
    let run = {
        let store = state.store.lock().await;
        let Some(assignment) = store.get(id) else {
            tracing::warn!("Progress requested for unknown assignment {}", id);
            return Err(StatusCode::NOT_FOUND);
        };
        if assignment.generation_status == GenerationStatus::Failed {
            failed_run(FAILURE_REASON)
        } else {
            successful_run()
        }
    };

    tracing::info!("Subscriber connected to assignment {}", id);
    Ok(ws.on_upgrade(move |socket| async move {
        let outcome = replay(socket, &state, run, &format!("assignment {}", id)).await;
        if let Some(status) = outcome {
            state.store.lock().await.set_generation_status(id, status);
        }
    }))
}

/// `GET /projects/{id}/progress/`
pub async fn project_progress(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    tracing::info!("Subscriber connected to project {}", id);
    ws.on_upgrade(move |socket| async move {
        replay(socket, &state, successful_run(), &format!("project {}", id)).await;
    })
}

/// Send `run` to the subscriber, one update per step delay, then close.
///
/// Returns the final generation status when the whole run was delivered.
async fn replay(
    mut socket: WebSocket,
    state: &AppState,
    run: Vec<ProgressUpdate>,
    label: &str,
) -> Option<GenerationStatus> {
    let mut outcome = None;

    for (i, update) in run.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(state.step_delay).await;
        }

        let json = match serde_json::to_string(update) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to encode progress update: {}", e);
                return None;
            }
        };
        if let Err(e) = socket.send(Message::Text(json.into())).await {
            tracing::info!("Subscriber of {} went away: {}", label, e);
            return None;
        }
        tracing::debug!("Sent '{}' to subscriber of {}", update.status, label);

        if update.is_terminal() {
            outcome = Some(if update.status == "completed" {
                GenerationStatus::Completed
            } else {
                GenerationStatus::Failed
            });
            break;
        }
    }

    if let Err(e) = socket.send(Message::Close(None)).await {
        tracing::debug!("Failed to send close frame to {}: {}", label, e);
    }
    tracing::info!("Replay for {} finished", label);
    outcome
}
