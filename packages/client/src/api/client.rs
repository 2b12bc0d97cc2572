//! REST client for the assignment API.

use genwatch_shared::dto::{
    AppGenerationRequest, AppGenerationResponse, Assignment, BiddingResponse, ChatMessage,
    ChatMessages, CodeGenerationRequest, CodeGenerationResponse, ConfirmMessage, GenerateRequest,
    GenerateResponse, ImproveRequest, ImprovedMessage,
};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::error::ApiError;

/// Filters of the assignment list endpoint. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

/// Client of the assignment REST API.
///
/// Every request carries the bearer token exactly as given; the client never
/// inspects it.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /api/assignments/assignments/`
    pub async fn list_assignments(&self, query: &ListQuery) -> Result<Vec<Assignment>, ApiError> {
        let url = self.endpoint("api/assignments/assignments/")?;
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        parse_json(response).await
    }

    /// `GET /api/assignments/assignments/{id}/`
    pub async fn get_assignment(&self, id: u64) -> Result<Assignment, ApiError> {
        let url = self.endpoint(&format!("api/assignments/assignments/{}/", id))?;
        tracing::debug!("GET {}", url);

        let response = self.http.get(url).bearer_auth(&self.token).send().await?;
        parse_json(response).await
    }

    /// `POST /api/agents/generate/`
    ///
    /// Returns the id of the assignment whose generation was started.
    pub async fn start_generation(&self, request: &GenerateRequest) -> Result<u64, ApiError> {
        let url = self.endpoint("api/agents/generate/")?;
        tracing::debug!("POST {} (subject: {})", url, request.subject);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        let reply: GenerateResponse = parse_json(response).await?;

        match (reply.success, reply.assignment_id) {
            (true, Some(id)) => {
                tracing::info!("Generation started for assignment {}", id);
                Ok(id)
            }
            (true, None) => Err(ApiError::Rejected(
                "server did not return an assignment id".to_string(),
            )),
            (false, _) => Err(ApiError::Rejected(
                reply
                    .error
                    .unwrap_or_else(|| "Failed to create assignment".to_string()),
            )),
        }
    }

    /// `GET /api/assignments/{id}/chat/messages/`
    pub async fn chat_messages(&self, id: u64) -> Result<Vec<ChatMessage>, ApiError> {
        let url = self.endpoint(&format!("api/assignments/{}/chat/messages/", id))?;
        tracing::debug!("GET {}", url);

        let response = self.http.get(url).bearer_auth(&self.token).send().await?;
        let body: ChatMessages = parse_json(response).await?;
        Ok(body.messages)
    }

    /// `POST /api/assignments/{id}/chat/improve/`
    ///
    /// Drafts `text` and returns the suggested rewrite. Nothing is posted to
    /// the chat until [`Self::confirm_message`] is called.
    pub async fn improve_message(&self, id: u64, text: &str) -> Result<ImprovedMessage, ApiError> {
        let url = self.endpoint(&format!("api/assignments/{}/chat/improve/", id))?;
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .form(&ImproveRequest {
                message: text.to_string(),
            })
            .send()
            .await?;
        parse_json(response).await
    }

    /// `PATCH /api/assignments/{id}/chat/messages/{message_id}/`
    pub async fn confirm_message(
        &self,
        id: u64,
        message_id: u64,
        final_version: &str,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!(
            "api/assignments/{}/chat/messages/{}/",
            id, message_id
        ))?;
        tracing::debug!("PATCH {}", url);

        let response = self
            .http
            .patch(url)
            .bearer_auth(&self.token)
            .json(&ConfirmMessage {
                final_version: final_version.to_string(),
            })
            .send()
            .await?;
        expect_success(response).await
    }

    /// `POST /api/containers/generate`
    pub async fn generate_code(
        &self,
        request: &CodeGenerationRequest,
    ) -> Result<CodeGenerationResponse, ApiError> {
        let url = self.endpoint("api/containers/generate")?;
        tracing::debug!("POST {} ({:?})", url, request.language);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        parse_json(response).await
    }

    /// `POST /api/containers/generate-application`
    pub async fn generate_application(
        &self,
        request: &AppGenerationRequest,
    ) -> Result<AppGenerationResponse, ApiError> {
        let url = self.endpoint("api/containers/generate-application")?;
        tracing::debug!(
            "POST {} ({} technologies)",
            url,
            request.technologies.len()
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        parse_json(response).await
    }

    /// `POST /api/assignments/trigger-bidding/`
    ///
    /// Returns the server's confirmation message.
    pub async fn trigger_bidding(&self) -> Result<String, ApiError> {
        let url = self.endpoint("api/assignments/trigger-bidding/")?;
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let reply: BiddingResponse = parse_json(response).await?;
        Ok(reply.message)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }
}

/// Decode a successful JSON body, or turn an error status into `ApiError::Status`.
async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body: error_text(&body),
    })
}

/// Accept any success status and ignore the body.
async fn expect_success(response: reqwest::Response) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body: error_text(&body),
    })
}

/// Prefer the `error` field of a JSON error body, fall back to the raw text.
fn error_text(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Form, Json, Router,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        routing::{get, patch, post},
    };
    use genwatch_shared::dto::{
        AssignmentType, CodeLanguage, GenerationStatus, Technology, TechnologyRole,
    };
    use serde_json::json;

    use super::*;

    #[derive(Clone, Default)]
    struct Seen {
        authorization: Arc<Mutex<Vec<String>>>,
        queries: Arc<Mutex<Vec<String>>>,
        bodies: Arc<Mutex<Vec<String>>>,
    }

    fn remember(seen: &Seen, headers: &HeaderMap) {
        let value = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        seen.authorization.lock().unwrap().push(value);
    }

    async fn list(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Query(query): Query<std::collections::HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        remember(&seen, &headers);
        let mut pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        pairs.sort();
        seen.queries.lock().unwrap().push(pairs.join("&"));
        Json(json!([
            {"id": 1, "subject": "Graphs", "generation_status": "in_progress"},
            {"id": 2, "subject": "Essay", "assignment_type": "A"}
        ]))
    }

    async fn detail(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Path(id): Path<u64>,
    ) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
        remember(&seen, &headers);
        if id == 404 {
            return Err((
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Assignment not found"})),
            ));
        }
        Ok(Json(json!({"id": id, "subject": "Graphs"})))
    }

    async fn generate(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(request): Json<GenerateRequest>,
    ) -> Json<serde_json::Value> {
        remember(&seen, &headers);
        if request.subject.is_empty() {
            return Json(json!({"success": false, "error": "Subject is required"}));
        }
        Json(json!({"success": true, "assignment_id": 77}))
    }

    async fn messages(State(seen): State<Seen>, headers: HeaderMap) -> Json<serde_json::Value> {
        remember(&seen, &headers);
        Json(json!({"messages": [{"id": 1, "sender": "client", "content": "Hi"}]}))
    }

    async fn improve(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Path(id): Path<u64>,
        Form(request): Form<ImproveRequest>,
    ) -> Json<serde_json::Value> {
        remember(&seen, &headers);
        seen.bodies.lock().unwrap().push(request.message.clone());
        Json(json!({
            "message_id": 31,
            "original": request.message,
            "improved": "Could you share the report?",
            "can_deliver": id != 2,
            "delivery_status": {"message": "Deposit pending"}
        }))
    }

    async fn confirm(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Path((id, message_id)): Path<(u64, u64)>,
        Json(request): Json<ConfirmMessage>,
    ) -> Result<StatusCode, (StatusCode, Json<serde_json::Value>)> {
        remember(&seen, &headers);
        if message_id != 31 {
            return Err((
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Message draft not found"})),
            ));
        }
        seen.bodies
            .lock()
            .unwrap()
            .push(format!("{}:{}", id, request.final_version));
        Ok(StatusCode::OK)
    }

    async fn code(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(request): Json<CodeGenerationRequest>,
    ) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
        remember(&seen, &headers);
        if request.instructions.is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Instructions are required"})),
            ));
        }
        let language = serde_json::to_value(request.language).unwrap();
        Ok(Json(json!({
            "code": format!("// {}", language.as_str().unwrap()),
            "output": "42\n"
        })))
    }

    async fn application(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(request): Json<AppGenerationRequest>,
    ) -> Json<serde_json::Value> {
        remember(&seen, &headers);
        Json(json!({
            "files": {"README.md": request.instructions},
            "message": "Application generated",
            "validation_errors": ["Missing database"],
            "services": {"web": {"url": "http://localhost:3000", "status": "running"}}
        }))
    }

    async fn bidding(State(seen): State<Seen>, headers: HeaderMap) -> Json<serde_json::Value> {
        remember(&seen, &headers);
        Json(json!({"message": "Bidding started"}))
    }

    async fn serve() -> (ApiClient, Seen) {
        let seen = Seen::default();
        let app = Router::new()
            .route("/api/assignments/assignments/", get(list))
            .route("/api/assignments/assignments/{id}/", get(detail))
            .route("/api/agents/generate/", post(generate))
            .route("/api/assignments/{id}/chat/messages/", get(messages))
            .route("/api/assignments/{id}/chat/improve/", post(improve))
            .route(
                "/api/assignments/{id}/chat/messages/{message_id}/",
                patch(confirm),
            )
            .route("/api/containers/generate", post(code))
            .route("/api/containers/generate-application", post(application))
            .route("/api/assignments/trigger-bidding/", post(bidding))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = ApiClient::new(&format!("http://{}", addr), "secret-token").unwrap();
        (client, seen)
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        // テスト項目: ベース URL のパスを保ったままエンドポイントが組み立てられる
        // given (前提条件):
        let client = ApiClient::new("https://example.com/backend", "t").unwrap();

        // when (操作):
        let url = client.endpoint("api/agents/generate/").unwrap();

        // then (期待する結果):
        assert_eq!(url.as_str(), "https://example.com/backend/api/agents/generate/");
    }

    #[test]
    fn test_error_text_prefers_error_field() {
        // テスト項目: エラーボディの error フィールドが優先される
        // given (前提条件):

        // when (操作):

        // then (期待する結果):
        assert_eq!(error_text(r#"{"error":"nope"}"#), "nope");
        assert_eq!(error_text("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_list_assignments_forwards_token_and_filters() {
        // テスト項目: 一覧取得で Bearer トークンと検索条件が送られる
        // given (前提条件):
        let (client, seen) = serve().await;
        let query = ListQuery {
            filter: Some("generating".to_string()),
            search: None,
            sort: Some("deadline".to_string()),
        };

        // when (操作):
        let assignments = client.list_assignments(&query).await.unwrap();

        // then (期待する結果):
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].generation_status, GenerationStatus::InProgress);
        assert_eq!(assignments[1].assignment_type, Some(AssignmentType::Academic));
        assert_eq!(
            *seen.authorization.lock().unwrap(),
            vec!["Bearer secret-token".to_string()]
        );
        assert_eq!(
            *seen.queries.lock().unwrap(),
            vec!["filter=generating&sort=deadline".to_string()]
        );
    }

    #[tokio::test]
    async fn test_get_assignment_maps_error_status() {
        // テスト項目: エラーステータスは ApiError::Status として返される
        // given (前提条件):
        let (client, _) = serve().await;

        // when (操作):
        let found = client.get_assignment(5).await.unwrap();
        let missing = client.get_assignment(404).await;

        // then (期待する結果):
        assert_eq!(found.id, 5);
        match missing {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "Assignment not found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_generation_success_and_rejection() {
        // テスト項目: 生成開始の成功時は ID を返し、success=false は Rejected になる
        // given (前提条件):
        let (client, _) = serve().await;
        let mut request = GenerateRequest {
            subject: "Graphs".to_string(),
            description: "Implement Dijkstra".to_string(),
            assignment_type: AssignmentType::Programming,
        };

        // when (操作):
        let started = client.start_generation(&request).await.unwrap();
        request.subject.clear();
        let rejected = client.start_generation(&request).await;

        // then (期待する結果):
        assert_eq!(started, 77);
        assert!(matches!(rejected, Err(ApiError::Rejected(reason)) if reason == "Subject is required"));
    }

    #[tokio::test]
    async fn test_chat_messages_unwraps_envelope() {
        // テスト項目: チャットメッセージは messages フィールドから取り出される
        // given (前提条件):
        let (client, _) = serve().await;

        // when (操作):
        let messages = client.chat_messages(1).await.unwrap();

        // then (期待する結果):
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Hi");
    }

    #[tokio::test]
    async fn test_improve_message_sends_form() {
        // テスト項目: 改善依頼はフォームで送られ、提案と配信可否が返される
        // given (前提条件):
        let (client, seen) = serve().await;

        // when (操作):
        let deliverable = client.improve_message(1, "send report pls").await.unwrap();
        let blocked = client.improve_message(2, "hi").await.unwrap();

        // then (期待する結果):
        assert_eq!(deliverable.message_id, 31);
        assert_eq!(deliverable.original, "send report pls");
        assert_eq!(deliverable.improved, "Could you share the report?");
        assert!(deliverable.can_deliver);
        assert!(!blocked.can_deliver);
        assert_eq!(
            blocked.delivery_status.map(|status| status.message),
            Some("Deposit pending".to_string())
        );
        assert_eq!(
            *seen.bodies.lock().unwrap(),
            vec!["send report pls".to_string(), "hi".to_string()]
        );
    }

    #[tokio::test]
    async fn test_confirm_message_patches_final_version() {
        // テスト項目: 確定で最終版が送られ、未知の下書きはエラーになる
        // given (前提条件):
        let (client, seen) = serve().await;

        // when (操作):
        let confirmed = client.confirm_message(7, 31, "Final text").await;
        let missing = client.confirm_message(7, 99, "Final text").await;

        // then (期待する結果):
        assert!(confirmed.is_ok());
        assert_eq!(*seen.bodies.lock().unwrap(), vec!["7:Final text".to_string()]);
        assert!(
            matches!(missing, Err(ApiError::Status { status: 404, ref body }) if body == "Message draft not found")
        );
        assert_eq!(seen.authorization.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_generate_code_returns_code_and_output() {
        // テスト項目: コード生成で言語が送られ、コードと実行結果が返る。エラーは error フィールドから取られる
        // given (前提条件):
        let (client, _) = serve().await;
        let mut request = CodeGenerationRequest {
            instructions: "Print the answer".to_string(),
            language: CodeLanguage::Javascript,
        };

        // when (操作):
        let generated = client.generate_code(&request).await.unwrap();
        request.instructions.clear();
        let rejected = client.generate_code(&request).await;

        // then (期待する結果):
        assert_eq!(generated.code, "// javascript");
        assert_eq!(generated.output, "42\n");
        assert!(
            matches!(rejected, Err(ApiError::Status { status: 400, ref body }) if body == "Instructions are required")
        );
    }

    #[tokio::test]
    async fn test_generate_application_decodes_files_and_services() {
        // テスト項目: アプリ生成の結果からファイル、検証エラー、サービスが取り出される
        // given (前提条件):
        let (client, _) = serve().await;
        let request = AppGenerationRequest {
            instructions: "Todo app".to_string(),
            technologies: vec![Technology {
                role: TechnologyRole::Frontend,
                name: "React".to_string(),
                version: "18".to_string(),
            }],
        };

        // when (操作):
        let response = client.generate_application(&request).await.unwrap();

        // then (期待する結果):
        assert_eq!(response.files["README.md"], "Todo app");
        assert_eq!(
            response.validation_errors,
            Some(vec!["Missing database".to_string()])
        );
        assert!(response.services["web"].is_running());
    }

    #[tokio::test]
    async fn test_trigger_bidding_returns_message() {
        // テスト項目: 入札開始でサーバーのメッセージが返り、トークンが送られる
        // given (前提条件):
        let (client, seen) = serve().await;

        // when (操作):
        let message = client.trigger_bidding().await.unwrap();

        // then (期待する結果):
        assert_eq!(message, "Bidding started");
        assert_eq!(
            *seen.authorization.lock().unwrap(),
            vec!["Bearer secret-token".to_string()]
        );
    }
}
