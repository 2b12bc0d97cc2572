//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use genwatch_shared::dto::{
    AppGenerationRequest, AppGenerationResponse, Assignment, BiddingResponse, ChatMessage,
    ChatMessages, CodeGenerationRequest, CodeGenerationResponse, ConfirmMessage, GenerateRequest,
    GenerateResponse, ImproveRequest, ImprovedMessage,
};

use crate::{
    assistant::{self, AssistantError},
    store::{ListFilter, StoreError},
    ui::state::AppState,
};

/// Error reply with a JSON `{"error": ...}` body
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({"error": self.message})),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiFailure {
    fn from(e: StoreError) -> Self {
        let status = if e.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_REQUEST
        };
        Self::new(status, e.to_string())
    }
}

impl From<AssistantError> for ApiFailure {
    fn from(e: AssistantError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, e.to_string())
    }
}

/// Reject the request unless it carries the configured bearer token.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiFailure> {
    let Some(expected) = &state.token else {
        return Ok(());
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if provided == Some(expected.as_str()) {
        Ok(())
    } else {
        tracing::warn!("Rejected request with missing or wrong bearer token");
        Err(ApiFailure::new(StatusCode::UNAUTHORIZED, "Invalid token"))
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of assignments
pub async fn list_assignments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<Assignment>>, ApiFailure> {
    authorize(&state, &headers)?;
    let assignments = state.store.lock().await.list(&filter);
    tracing::debug!("Listing {} assignments ({:?})", assignments.len(), filter);
    Ok(Json(assignments))
}

/// Get assignment detail by ID
pub async fn get_assignment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Assignment>, ApiFailure> {
    authorize(&state, &headers)?;
    state
        .store
        .lock()
        .await
        .get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Assignment not found"))
}

/// Get chat messages of an assignment
pub async fn get_chat_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<ChatMessages>, ApiFailure> {
    authorize(&state, &headers)?;
    let messages = state
        .store
        .lock()
        .await
        .chat(id)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Assignment not found"))?;
    Ok(Json(ChatMessages { messages }))
}

/// Create an assignment and start its generation
pub async fn start_generation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiFailure> {
    authorize(&state, &headers)?;
    let subject = request.subject.clone();

    match state.store.lock().await.create(request, state.clock.now()) {
        Ok(id) => {
            tracing::info!("Assignment {} created for '{}'", id, subject);
            Ok((
                StatusCode::CREATED,
                Json(GenerateResponse {
                    success: true,
                    assignment_id: Some(id),
                    error: None,
                }),
            ))
        }
        Err(e) => {
            tracing::warn!("Rejected generation request: {}", e);
            Ok((
                StatusCode::BAD_REQUEST,
                Json(GenerateResponse {
                    success: false,
                    assignment_id: None,
                    error: Some(e.to_string()),
                }),
            ))
        }
    }
}

/// Draft a chat message and return a suggested rewrite
pub async fn improve_chat_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Form(request): Form<ImproveRequest>,
) -> Result<Json<ImprovedMessage>, ApiFailure> {
    authorize(&state, &headers)?;
    let draft = state
        .store
        .lock()
        .await
        .draft_message(id, &request.message)?;
    tracing::info!("Drafted message {} for assignment {}", draft.message_id, id);
    Ok(Json(draft))
}

/// Post the final version of a drafted chat message
pub async fn confirm_chat_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, message_id)): Path<(u64, u64)>,
    Json(request): Json<ConfirmMessage>,
) -> Result<Json<ChatMessage>, ApiFailure> {
    authorize(&state, &headers)?;
    let message = state.store.lock().await.confirm_message(
        id,
        message_id,
        &request.final_version,
        state.clock.now(),
    )?;
    tracing::info!("Message {} posted to assignment {}", message_id, id);
    Ok(Json(message))
}

/// Generate and run a code snippet
pub async fn generate_code(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CodeGenerationRequest>,
) -> Result<Json<CodeGenerationResponse>, ApiFailure> {
    authorize(&state, &headers)?;
    let response = assistant::generate_code(&request)?;
    tracing::info!("Generated {:?} snippet", request.language);
    Ok(Json(response))
}

/// Scaffold an application for a technology stack
pub async fn generate_application(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AppGenerationRequest>,
) -> Result<Json<AppGenerationResponse>, ApiFailure> {
    authorize(&state, &headers)?;
    let response = assistant::generate_application(&request)?;
    tracing::info!(
        "Generated application with {} files and {} services",
        response.files.len(),
        response.services.len()
    );
    Ok(Json(response))
}

/// Open the unassigned assignments for bidding
pub async fn trigger_bidding(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<BiddingResponse>, ApiFailure> {
    authorize(&state, &headers)?;
    let open = state.store.lock().await.open_for_bidding();
    tracing::info!("Bidding triggered for {} assignments", open);
    Ok(Json(BiddingResponse {
        message: format!(
            "Bidding started for {} open assignment{}",
            open,
            if open == 1 { "" } else { "s" }
        ),
    }))
}
