//! Integration tests against the stub backend over real sockets.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use genwatch_client::{
    ApiError, ConnectionManager, ConnectionPhase, ConnectionTarget, ProgressSession,
    ReconnectPolicy, ViewState,
    api::{
        ApiClient, AppGenerationRequest, AssignmentType, CodeGenerationRequest, CodeLanguage,
        GenerateRequest, GenerationStatus, ListQuery, Technology,
    },
    runner::{self, MessageChoice},
};
use genwatch_server::{AssignmentStore, Server};
use tokio::{net::TcpListener, task::JoinHandle, time::timeout};

const TOKEN: &str = "integration-token";

/// Helper struct to manage the in-process backend
struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    /// Start a backend on a free port with seeded data
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to read local address");
        let server = Server::new(
            AssignmentStore::seeded(Utc::now()),
            Duration::from_millis(20),
            Some(TOKEN.to_string()),
        );
        let handle = tokio::spawn(server.serve(listener));

        TestServer { addr, handle }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn api(&self) -> ApiClient {
        ApiClient::new(&self.base_url(), TOKEN).expect("Failed to build API client")
    }

    fn session(&self, target: ConnectionTarget, max_attempts: u32) -> ProgressSession {
        let manager = ConnectionManager::websocket(ReconnectPolicy::new(
            Duration::from_millis(20),
            max_attempts,
        ));
        ProgressSession::start(target, manager)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn settle(session: &mut ProgressSession) -> ViewState {
    timeout(Duration::from_secs(10), session.run())
        .await
        .expect("Session did not settle in time")
}

#[tokio::test]
async fn test_watch_assignment_until_completed() {
    // テスト項目: 実際の WebSocket 経由で analyzing から completed までを受信して完了する
    // given (前提条件):
    let server = TestServer::start().await;
    let mut session = server.session(ConnectionTarget::assignment(1u64, server.base_url()), 5);
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = statuses.clone();
    session
        .manager_mut()
        .on_message(move |message| sink.lock().unwrap().push(message.status.clone()));
    let completed = Arc::new(Mutex::new(false));
    let flag = completed.clone();
    session.on_complete(move |_| *flag.lock().unwrap() = true);
    let mut snapshots = session.subscribe();
    let steps = Arc::new(Mutex::new(Vec::new()));
    let seen_steps = steps.clone();
    let watcher = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            seen_steps.lock().unwrap().push(snapshots.borrow_and_update().step_index);
        }
    });

    // when (操作):
    let state = settle(&mut session).await;
    drop(session);
    let _ = timeout(Duration::from_secs(1), watcher).await;

    // then (期待する結果):
    assert_eq!(state.connection_phase, ConnectionPhase::Completed);
    assert_eq!(state.step_index, 5);
    assert_eq!(state.display_message, "Assignment generated successfully");
    assert!(*completed.lock().unwrap());
    assert_eq!(
        *statuses.lock().unwrap(),
        vec!["analyzing", "planning", "generating", "reviewing", "final_review", "completed"]
    );
    let steps = steps.lock().unwrap();
    assert!(steps.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn test_watch_failed_assignment_reports_reason() {
    // テスト項目: 失敗する生成では error 状態になり、失敗理由が保持される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut session = server.session(ConnectionTarget::assignment(3u64, server.base_url()), 5);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    session.on_error(move |reason| sink.lock().unwrap().push(reason.to_string()));

    // when (操作):
    let state = settle(&mut session).await;

    // then (期待する結果):
    assert_eq!(state.connection_phase, ConnectionPhase::Error);
    assert_eq!(state.step_index, -1);
    assert_eq!(
        state.last_error.as_deref(),
        Some("Tests failed during review")
    );
    assert_eq!(
        *errors.lock().unwrap(),
        vec!["Tests failed during review".to_string()]
    );
}

#[tokio::test]
async fn test_unknown_assignment_hits_reconnect_limit() {
    // テスト項目: 接続できないチャネルでは再接続上限に達して error で止まる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut session = server.session(ConnectionTarget::assignment(99u64, server.base_url()), 2);

    // when (操作):
    let state = settle(&mut session).await;

    // then (期待する結果):
    assert_eq!(state.connection_phase, ConnectionPhase::Error);
    assert_eq!(
        state.last_error.as_deref(),
        Some("Maximum reconnection attempts (2) reached")
    );
}

#[tokio::test]
async fn test_watch_project_channel() {
    // テスト項目: プロジェクトの進捗チャネルも完了まで追跡できる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut session = server.session(ConnectionTarget::project("demo", server.base_url()), 5);

    // when (操作):
    let state = settle(&mut session).await;

    // then (期待する結果):
    assert_eq!(state.connection_phase, ConnectionPhase::Completed);
}

#[tokio::test]
async fn test_close_stops_event_delivery() {
    // テスト項目: 切断後はイベントが配送されない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut session = server.session(ConnectionTarget::assignment(1u64, server.base_url()), 5);
    let messages = Arc::new(Mutex::new(0));
    let counter = messages.clone();
    session
        .manager_mut()
        .on_message(move |_| *counter.lock().unwrap() += 1);
    while *messages.lock().unwrap() == 0 {
        assert!(timeout(Duration::from_secs(5), session.step()).await.unwrap());
    }

    // when (操作):
    session.close();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let delivered = session.step().await;

    // then (期待する結果):
    assert!(!delivered);
    assert_eq!(*messages.lock().unwrap(), 1);
    assert_eq!(session.snapshot().step_index, 0);
}

#[tokio::test]
async fn test_rest_endpoints() {
    // テスト項目: 一覧、詳細、チャットが Bearer トークン付きで取得できる
    // given (前提条件):
    let server = TestServer::start().await;
    let api = server.api();

    // when (操作):
    let all = api.list_assignments(&ListQuery::default()).await.unwrap();
    let failed = api
        .list_assignments(&ListQuery {
            filter: Some("failed".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let detail = api.get_assignment(1).await.unwrap();
    let chat = api.chat_messages(1).await.unwrap();

    // then (期待する結果):
    assert_eq!(all.len(), 3);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, 3);
    assert_eq!(detail.assignment_type, Some(AssignmentType::Programming));
    assert_eq!(detail.assignment_files.len(), 1);
    assert_eq!(chat.len(), 2);
}

#[tokio::test]
async fn test_rest_rejects_wrong_token() {
    // テスト項目: 誤ったトークンは 401 エラーになる
    // given (前提条件):
    let server = TestServer::start().await;
    let api = ApiClient::new(&server.base_url(), "wrong").unwrap();

    // when (操作):
    let result = api.get_assignment(1).await;

    // then (期待する結果):
    match result {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "Invalid token");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_then_watch() {
    // テスト項目: 生成開始した課題を追跡して完了すると、詳細にも完了が反映される
    // given (前提条件):
    let server = TestServer::start().await;
    let api = server.api();
    let request = GenerateRequest {
        subject: "Hash maps".to_string(),
        description: "Open addressing with benchmarks".to_string(),
        assignment_type: AssignmentType::Programming,
    };

    // when (操作):
    let id = api.start_generation(&request).await.unwrap();
    let mut session = server.session(ConnectionTarget::assignment(id, server.base_url()), 5);
    let state = settle(&mut session).await;

    // then (期待する結果):
    assert_eq!(id, 4);
    assert_eq!(state.connection_phase, ConnectionPhase::Completed);
    let mut recorded = None;
    for _ in 0..50 {
        let assignment = api.get_assignment(id).await.unwrap();
        if assignment.generation_status == GenerationStatus::Completed {
            recorded = Some(assignment);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let assignment = recorded.expect("generation status was not recorded");
    assert!(assignment.github_repository.is_some());
}

#[tokio::test]
async fn test_generate_rejects_empty_subject() {
    // テスト項目: 件名が空の生成リクエストはエラーメッセージ付きで拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let api = server.api();
    let request = GenerateRequest {
        subject: String::new(),
        description: "Anything".to_string(),
        assignment_type: AssignmentType::Academic,
    };

    // when (操作):
    let result = api.start_generation(&request).await;

    // then (期待する結果):
    assert!(
        matches!(result, Err(ApiError::Status { status: 400, ref body }) if body == "Subject is required")
    );
}

#[tokio::test]
async fn test_chat_send_posts_improved_version() {
    // テスト項目: 改善版を選んで送信すると、チャットに改善版が追加される
    // given (前提条件):
    let server = TestServer::start().await;
    let api = server.api();

    // when (操作):
    let sent = runner::run_chat_send(
        &api,
        1,
        "can you add   benchmarks",
        MessageChoice::UseImproved,
    )
    .await
    .unwrap();
    let chat = api.chat_messages(1).await.unwrap();

    // then (期待する結果):
    assert_eq!(sent.as_deref(), Some("Can you add benchmarks."));
    assert_eq!(chat.len(), 3);
    assert_eq!(chat[2].content, "Can you add benchmarks.");
}

#[tokio::test]
async fn test_chat_send_original_and_discard() {
    // テスト項目: 原文の送信では原文が追加され、破棄では何も追加されない
    // given (前提条件):
    let server = TestServer::start().await;
    let api = server.api();

    // when (操作):
    let original = runner::run_chat_send(&api, 3, "hello there", MessageChoice::SendOriginal)
        .await
        .unwrap();
    let discarded = runner::run_chat_send(&api, 3, "never mind", MessageChoice::Discard)
        .await
        .unwrap();
    let chat = api.chat_messages(3).await.unwrap();

    // then (期待する結果):
    assert_eq!(original.as_deref(), Some("hello there"));
    assert!(discarded.is_none());
    assert_eq!(chat.len(), 1);
    assert_eq!(chat[0].content, "hello there");
}

#[tokio::test]
async fn test_unpaid_assignment_draft_is_not_deliverable() {
    // テスト項目: 未払いの課題への下書きは配信不可として理由付きで返される
    // given (前提条件):
    let server = TestServer::start().await;
    let api = server.api();

    // when (操作):
    let draft = api.improve_message(3, "status?").await.unwrap();

    // then (期待する結果):
    assert!(!draft.can_deliver);
    assert!(draft.delivery_status.is_some());
    assert_eq!(draft.improved, "Status?");
}

#[tokio::test]
async fn test_code_generation() {
    // テスト項目: コード生成でコードと実行結果が返り、空の指示は 400 になる
    // given (前提条件):
    let server = TestServer::start().await;
    let api = server.api();
    let mut request = CodeGenerationRequest {
        instructions: "Greet the user".to_string(),
        language: CodeLanguage::Javascript,
    };

    // when (操作):
    let generated = api.generate_code(&request).await.unwrap();
    request.instructions.clear();
    let rejected = api.generate_code(&request).await;

    // then (期待する結果):
    assert!(generated.code.starts_with("// Greet the user"));
    assert_eq!(generated.output, "Hello from genwatch\n");
    assert!(
        matches!(rejected, Err(ApiError::Status { status: 400, ref body }) if body == "Instructions are required")
    );
}

#[tokio::test]
async fn test_app_generation() {
    // テスト項目: アプリ生成でファイルと起動中のサービスが返る
    // given (前提条件):
    let server = TestServer::start().await;
    let request = AppGenerationRequest {
        instructions: "Recipe book".to_string(),
        technologies: vec![
            "frontend:react:18".parse::<Technology>().unwrap(),
            "database:postgres:16".parse::<Technology>().unwrap(),
        ],
    };

    // when (操作):
    let response = runner::run_generate_app(&server.api(), &request).await.unwrap();

    // then (期待する結果):
    assert!(response.validation_errors.is_none());
    assert_eq!(response.files["frontend/Dockerfile"], "FROM react:18\n");
    assert!(response.services.values().all(|service| service.is_running()));
    assert_eq!(response.services.len(), 2);
}

#[tokio::test]
async fn test_trigger_bidding() {
    // テスト項目: 入札開始のメッセージが返る
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let message = server.api().trigger_bidding().await.unwrap();

    // then (期待する結果):
    assert_eq!(message, "Bidding started for 1 open assignment");
}

#[tokio::test]
async fn test_list_watch_follows_generating_assignment() {
    // テスト項目: 一覧の監視は生成中の課題を完了まで追跡して終わる
    // given (前提条件):
    let server = TestServer::start().await;
    let api = server.api();
    let policy = ReconnectPolicy::new(Duration::from_millis(20), 2);

    // when (操作):
    let result = timeout(
        Duration::from_secs(10),
        runner::run_list_watch(&api, &ListQuery::default(), policy),
    )
    .await
    .expect("list watch did not finish in time");

    // then (期待する結果):
    assert!(result.is_ok());
    let mut status = GenerationStatus::InProgress;
    for _ in 0..50 {
        status = api.get_assignment(1).await.unwrap().generation_status;
        if status == GenerationStatus::Completed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, GenerationStatus::Completed);
}
