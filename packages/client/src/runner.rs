//! Command execution logic of the `genwatch` binary.

use std::collections::HashMap;

use chrono::Utc;
use genwatch_shared::dto::{
    AppGenerationRequest, AppGenerationResponse, Assignment, CodeGenerationRequest,
    GenerateRequest,
};

use crate::{
    api::{ApiClient, ListQuery},
    connection::ConnectionManager,
    domain::ReconnectPolicy,
    error::CliError,
    formatter::{AssignmentFormatter, AssistantFormatter, ProgressFormatter},
    progress::{ConnectionPhase, ProgressBoard, ProgressSession, ViewState},
    target::{ConnectionTarget, ResourceId, ResourceKind},
};

/// How a progress channel is watched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub resource_kind: ResourceKind,
    pub policy: ReconnectPolicy,
    /// Retry once, as a user would, when tracking ends in the error phase
    pub retry_on_error: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            resource_kind: ResourceKind::Assignment,
            policy: ReconnectPolicy::default(),
            retry_on_error: false,
        }
    }
}

/// Watch the progress channel of one resource until it settles
///
/// # Arguments
///
/// * `base_url` - Backend base URL; the channel URL is derived from it
/// * `resource_id` - Assignment or project id
/// * `options` - Resource kind, reconnect policy and retry behaviour
///
/// # Errors
///
/// Returns `CliError::Tracking` when generation fails or the connection gives
/// up, and `CliError::Incomplete` when the channel ends without a result.
pub async fn run_watch(
    base_url: &str,
    resource_id: impl Into<ResourceId>,
    options: WatchOptions,
) -> Result<ViewState, CliError> {
    let target = ConnectionTarget::new(options.resource_kind, resource_id, base_url);
    let manager = ConnectionManager::websocket(options.policy);
    let mut session = ProgressSession::start(target, manager);

    watch_session(&mut session, options.retry_on_error).await
}

/// Drive `session`, printing every change of the view, until it settles.
pub async fn watch_session(
    session: &mut ProgressSession,
    retry_on_error: bool,
) -> Result<ViewState, CliError> {
    let mut retried = false;
    let mut last_printed: Option<ViewState> = None;

    loop {
        while !session.snapshot().connection_phase.is_settled() {
            if !session.step().await {
                break;
            }
            let state = session.snapshot();
            if last_printed.as_ref() != Some(&state) {
                println!("{}", ProgressFormatter::format_update(&state));
                last_printed = Some(state);
            }
        }

        let state = session.snapshot();
        if state.connection_phase == ConnectionPhase::Error && retry_on_error && !retried {
            tracing::warn!("Generation tracking failed, retrying once");
            retried = true;
            session.retry();
            continue;
        }

        print!("{}", ProgressFormatter::format_state(&state));
        return match state.connection_phase {
            ConnectionPhase::Completed => Ok(state),
            ConnectionPhase::Error => Err(CliError::Tracking(
                state
                    .last_error
                    .clone()
                    .unwrap_or_else(|| state.display_message.clone()),
            )),
            _ => Err(CliError::Incomplete),
        };
    }
}

/// Print the assignment list
pub async fn run_list(api: &ApiClient, query: &ListQuery) -> Result<(), CliError> {
    print_list(api, query).await?;
    Ok(())
}

/// Print the assignment list, then follow every generating assignment live
///
/// Returns once no generating assignment is left to follow.
pub async fn run_list_watch(
    api: &ApiClient,
    query: &ListQuery,
    policy: ReconnectPolicy,
) -> Result<(), CliError> {
    let mut board = ProgressBoard::websocket(api.base_url().as_str(), policy);
    watch_list(api, query, &mut board).await
}

/// Drive `board` from the listing, fetching the list again whenever one of
/// the tracked assignments completes.
pub async fn watch_list(
    api: &ApiClient,
    query: &ListQuery,
    board: &mut ProgressBoard,
) -> Result<(), CliError> {
    let assignments = print_list(api, query).await?;
    board.sync(&assignments);
    if board.is_empty() {
        println!("No generation in progress");
        return Ok(());
    }

    let mut last_printed: HashMap<u64, ViewState> = HashMap::new();
    while let Some(update) = board.next_update().await {
        if last_printed.get(&update.id) != Some(&update.state) {
            println!(
                "#{:<5} {}",
                update.id,
                ProgressFormatter::format_update(&update.state)
            );
            last_printed.insert(update.id, update.state.clone());
        }

        if update.finished && update.state.connection_phase == ConnectionPhase::Completed {
            let assignments = print_list(api, query).await?;
            board.sync(&assignments);
        }
    }
    Ok(())
}

async fn print_list(api: &ApiClient, query: &ListQuery) -> Result<Vec<Assignment>, CliError> {
    let assignments = api.list_assignments(query).await?;
    if assignments.is_empty() {
        println!("No assignments found");
    }

    let now = Utc::now();
    for assignment in &assignments {
        println!("{}", AssignmentFormatter::format_summary(assignment, now));
    }
    Ok(assignments)
}

/// Print the detail of one assignment
pub async fn run_show(api: &ApiClient, id: u64) -> Result<(), CliError> {
    let assignment = api.get_assignment(id).await?;
    print!("{}", AssignmentFormatter::format_detail(&assignment, Utc::now()));
    Ok(())
}

/// Print the chat of one assignment
pub async fn run_chat(api: &ApiClient, id: u64) -> Result<(), CliError> {
    let messages = api.chat_messages(id).await?;
    if messages.is_empty() {
        println!("No messages yet");
    }
    for message in &messages {
        println!("{}", AssignmentFormatter::format_chat_message(message));
    }
    Ok(())
}

/// What to do with a drafted chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageChoice {
    SendOriginal,
    UseImproved,
    /// Only show the suggestion; nothing is posted
    Discard,
}

/// Draft a chat message, show the suggested rewrite, then post the chosen version
///
/// Returns the text that was posted, if any.
pub async fn run_chat_send(
    api: &ApiClient,
    id: u64,
    text: &str,
    choice: MessageChoice,
) -> Result<Option<String>, CliError> {
    let draft = api.improve_message(id, text).await?;
    print!("{}", AssistantFormatter::format_improvement(&draft));

    let final_version = match choice {
        MessageChoice::SendOriginal => draft.original,
        MessageChoice::UseImproved => draft.improved,
        MessageChoice::Discard => {
            println!("Message not sent");
            return Ok(None);
        }
    };
    api.confirm_message(id, draft.message_id, &final_version).await?;
    println!("Message sent to assignment #{}", id);
    Ok(Some(final_version))
}

/// Generate a code snippet and print it with its output
pub async fn run_generate_code(
    api: &ApiClient,
    request: &CodeGenerationRequest,
) -> Result<(), CliError> {
    let response = api.generate_code(request).await?;
    print!("{}", AssistantFormatter::format_code(&response));
    Ok(())
}

/// Generate an application and print its files and services
pub async fn run_generate_app(
    api: &ApiClient,
    request: &AppGenerationRequest,
) -> Result<AppGenerationResponse, CliError> {
    let response = api.generate_application(request).await?;
    print!("{}", AssistantFormatter::format_application(&response));
    if let Some(errors) = &response.validation_errors
        && !errors.is_empty()
    {
        tracing::warn!("Application generated with {} validation errors", errors.len());
    }
    Ok(response)
}

/// Open the unassigned assignments for bidding
pub async fn run_bidding(api: &ApiClient) -> Result<(), CliError> {
    let message = api.trigger_bidding().await?;
    println!("{}", message);
    Ok(())
}

/// Start a generation run and optionally watch it
///
/// Returns the id of the created assignment.
pub async fn run_generate(
    api: &ApiClient,
    request: &GenerateRequest,
    watch: Option<WatchOptions>,
) -> Result<u64, CliError> {
    let id = api.start_generation(request).await?;
    println!("Generation started for assignment #{}", id);

    if let Some(options) = watch {
        let options = WatchOptions {
            resource_kind: ResourceKind::Assignment,
            ..options
        };
        run_watch(api.base_url().as_str(), id, options).await?;
    }
    Ok(id)
}
