//! Text formatting for terminal display.

use chrono::{DateTime, Utc};
use genwatch_shared::{
    dto::{
        AppGenerationResponse, Assignment, ChatMessage, CodeGenerationResponse, GenerationStatus,
        ImprovedMessage,
    },
    time::format_time_remaining,
};

use crate::{
    progress::{ConnectionPhase, ViewState},
    status::GenerationStep,
};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Formatter for progress snapshots
pub struct ProgressFormatter;

impl ProgressFormatter {
    /// Format a progress snapshot as a step list followed by the status line
    ///
    /// # Arguments
    ///
    /// * `state` - The snapshot to render
    ///
    /// # Returns
    ///
    /// A multi-line string with one line per generation step
    pub fn format_state(state: &ViewState) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", RULE));

        for step in GenerationStep::ALL {
            output.push_str(&format!(
                "{} {}\n",
                Self::step_marker(state, step),
                step.label()
            ));
        }

        output.push_str(&format!("{}\n", THIN_RULE));
        output.push_str(&format!(
            "[{}] {}\n",
            Self::phase_label(state.connection_phase),
            state.display_message
        ));
        if let Some(error) = &state.last_error
            && *error != state.display_message
        {
            output.push_str(&format!("last error: {}\n", error));
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }

    /// Format a one-line status update for scrolling output
    pub fn format_update(state: &ViewState) -> String {
        let position = if state.step_index < 0 {
            "-".to_string()
        } else {
            format!("{}/{}", state.step_index + 1, GenerationStep::ALL.len())
        };
        format!(
            "[{}] step {} {}",
            Self::phase_label(state.connection_phase),
            position,
            state.display_message
        )
    }

    /// Label of a connection phase
    pub fn phase_label(phase: ConnectionPhase) -> &'static str {
        match phase {
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Connected => "connected",
            ConnectionPhase::Disconnected => "disconnected",
            ConnectionPhase::Error => "error",
            ConnectionPhase::Completed => "completed",
        }
    }

    fn step_marker(state: &ViewState, step: GenerationStep) -> &'static str {
        if state.connection_phase == ConnectionPhase::Error {
            return "[!]";
        }
        let index = step.index();
        if state.connection_phase == ConnectionPhase::Completed || index < state.step_index {
            "[x]"
        } else if index == state.step_index {
            "[>]"
        } else {
            "[ ]"
        }
    }
}

/// Formatter for assignment records
pub struct AssignmentFormatter;

impl AssignmentFormatter {
    /// Format one assignment as a single summary line
    ///
    /// # Arguments
    ///
    /// * `assignment` - The assignment to summarize
    /// * `now` - Current time, used for the remaining-time label
    pub fn format_summary(assignment: &Assignment, now: DateTime<Utc>) -> String {
        let deadline = assignment
            .completion_deadline
            .map(|deadline| format_time_remaining(deadline, now))
            .unwrap_or_else(|| "no deadline".to_string());
        format!(
            "#{:<5} {:<12} {} ({})",
            assignment.id,
            Self::status_label(assignment),
            assignment.subject,
            deadline
        )
    }

    /// Format a detail block for one assignment
    pub fn format_detail(assignment: &Assignment, now: DateTime<Utc>) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", RULE));
        output.push_str(&format!("#{} {}\n", assignment.id, assignment.subject));
        if let Some(kind) = assignment.assignment_type {
            output.push_str(&format!("type: {}\n", kind.label()));
        }
        output.push_str(&format!("status: {}\n", Self::status_label(assignment)));
        if let Some(deadline) = assignment.completion_deadline {
            output.push_str(&format!(
                "deadline: {} ({})\n",
                deadline.to_rfc3339(),
                format_time_remaining(deadline, now)
            ));
        }
        if let Some(expected) = assignment.expected_delivery_time {
            output.push_str(&format!("expected delivery: {}\n", expected.to_rfc3339()));
        }
        if let Some(repository) = &assignment.github_repository {
            output.push_str(&format!("repository: {}\n", repository));
        }
        if !assignment.description.is_empty() {
            output.push_str(&format!("{}\n{}\n", THIN_RULE, assignment.description));
        }
        if !assignment.assignment_files.is_empty() {
            output.push_str(&format!("{}\nfiles:\n", THIN_RULE));
            for file in &assignment.assignment_files {
                output.push_str(&format!("  - {}\n", file.file_name));
            }
        }
        if !assignment.submissions.is_empty() {
            output.push_str(&format!("submissions: {}\n", assignment.submissions.len()));
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }

    /// Format a chat message
    pub fn format_chat_message(message: &ChatMessage) -> String {
        let sent_at = message
            .timestamp
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown time".to_string());
        format!(
            "@{}: {}\nsent at {}\n",
            message.sender, message.content, sent_at
        )
    }

    /// Short status label, in the order the list page checks them
    pub fn status_label(assignment: &Assignment) -> &'static str {
        if assignment.completed {
            "completed"
        } else if assignment.generation_status == GenerationStatus::InProgress {
            "generating"
        } else if assignment.generation_status == GenerationStatus::Failed {
            "failed"
        } else if !assignment.has_deposit_been_paid {
            "unpaid"
        } else if assignment.has_revisions {
            "revisions"
        } else {
            "open"
        }
    }
}

/// Formatter for the AI helpers: message improvement, code and app generation
pub struct AssistantFormatter;

impl AssistantFormatter {
    /// Show a drafted message next to its suggested rewrite
    pub fn format_improvement(draft: &ImprovedMessage) -> String {
        let mut output = String::new();
        output.push_str(&format!("original: {}\n", draft.original));
        output.push_str(&format!("improved: {}\n", draft.improved));
        if !draft.can_deliver {
            let reason = draft
                .delivery_status
                .as_ref()
                .map(|status| status.message.as_str())
                .unwrap_or("The message cannot be delivered yet");
            output.push_str(&format!("note: {}\n", reason));
        }
        output
    }

    /// Generated code followed by the output of running it
    pub fn format_code(response: &CodeGenerationResponse) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", RULE));
        output.push_str(&response.code);
        if !response.code.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&format!("{}\noutput:\n", THIN_RULE));
        output.push_str(if response.output.is_empty() {
            "(no output)\n"
        } else {
            response.output.as_str()
        });
        if !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }

    /// Summary of a generated application: validation errors, files, services
    pub fn format_application(response: &AppGenerationResponse) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", RULE));
        if !response.message.is_empty() {
            output.push_str(&format!("{}\n", response.message));
        }
        if let Some(errors) = &response.validation_errors
            && !errors.is_empty()
        {
            output.push_str(&format!("{}\nvalidation errors:\n", THIN_RULE));
            for error in errors {
                output.push_str(&format!("[!] {}\n", error));
            }
        }
        if !response.files.is_empty() {
            output.push_str(&format!("{}\nfiles:\n", THIN_RULE));
            for (path, content) in &response.files {
                output.push_str(&format!("  - {} ({} lines)\n", path, content.lines().count()));
            }
        }
        if !response.services.is_empty() {
            output.push_str(&format!("{}\nservices:\n", THIN_RULE));
            for (name, service) in &response.services {
                let marker = if service.is_running() { "[x]" } else { "[!]" };
                output.push_str(&format!(
                    "{} {} {} ({})\n",
                    marker, name, service.url, service.status
                ));
            }
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }
}
