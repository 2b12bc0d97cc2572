//! Status messages and the mapping from status tokens to progress steps.
//!
//! Everything here is pure: the same message always maps to the same step and
//! display text.

use serde::{Deserialize, Serialize};

/// Fallback display text when neither a message nor a known detailed status is present
pub const FALLBACK_MESSAGE: &str = "Processing...";

/// Step index reported for failure tokens
pub const FAILED_STEP_INDEX: i32 = -1;

/// One status update received on the progress channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
}

impl StatusMessage {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            detailed_status: None,
            message: None,
            error_details: None,
        }
    }

    pub fn with_detailed_status(mut self, detailed_status: impl Into<String>) -> Self {
        self.detailed_status = Some(detailed_status.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, error_details: serde_json::Value) -> Self {
        self.error_details = Some(error_details);
        self
    }

    /// Whether this status ends the live channel.
    pub fn is_terminal(&self) -> bool {
        is_completed(&self.status) || is_failure(&self.status)
    }

    /// Human-readable reason for a failure status.
    ///
    /// Prefers the explicit message, then the error details, then a generic text.
    pub fn failure_reason(&self) -> String {
        if let Some(message) = non_empty(self.message.as_deref()) {
            return message.to_string();
        }
        match &self.error_details {
            Some(serde_json::Value::String(details)) if !details.trim().is_empty() => {
                details.clone()
            }
            Some(serde_json::Value::String(_) | serde_json::Value::Null) | None => {
                "Generation failed".to_string()
            }
            Some(details) => details.to_string(),
        }
    }
}

/// The six steps of a generation run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GenerationStep {
    Analyzing,
    Planning,
    Generating,
    Reviewing,
    FinalReview,
    Completed,
}

impl GenerationStep {
    pub const ALL: [GenerationStep; 6] = [
        GenerationStep::Analyzing,
        GenerationStep::Planning,
        GenerationStep::Generating,
        GenerationStep::Reviewing,
        GenerationStep::FinalReview,
        GenerationStep::Completed,
    ];

    /// Index of the last step
    pub const LAST_INDEX: i32 = 5;

    pub fn index(&self) -> i32 {
        match self {
            GenerationStep::Analyzing => 0,
            GenerationStep::Planning => 1,
            GenerationStep::Generating => 2,
            GenerationStep::Reviewing => 3,
            GenerationStep::FinalReview => 4,
            GenerationStep::Completed => 5,
        }
    }

    /// Label shown in step indicators
    pub fn label(&self) -> &'static str {
        match self {
            GenerationStep::Analyzing => "Analyzing Requirements",
            GenerationStep::Planning => "Generating Plan",
            GenerationStep::Generating => "Creating Project",
            GenerationStep::Reviewing => "Reviewing",
            GenerationStep::FinalReview => "Final Verification",
            GenerationStep::Completed => "Pushing to GitHub",
        }
    }

    /// Exact-match lookup of a status token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "analyzing" => Some(GenerationStep::Analyzing),
            "planning" => Some(GenerationStep::Planning),
            "generating" => Some(GenerationStep::Generating),
            "reviewing" => Some(GenerationStep::Reviewing),
            "final_review" => Some(GenerationStep::FinalReview),
            "completed" => Some(GenerationStep::Completed),
            _ => None,
        }
    }
}

/// Classification of a status token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Step(GenerationStep),
    Failed,
}

/// Result of mapping a status message for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMapping {
    pub step_index: i32,
    pub display_message: String,
}

/// Whether `status` is the successful terminal token.
pub fn is_completed(status: &str) -> bool {
    status == "completed"
}

/// Whether `status` belongs to the failure set.
///
/// The set is `error`, `failed`, and every token containing `failed`. Only the
/// token is inspected, never the free-text message.
pub fn is_failure(status: &str) -> bool {
    matches!(status, "error" | "failed") || status.contains("failed")
}

/// Classify a status token.
///
/// Known tokens map to their step; failure tokens map to `Failed`; any other
/// token is treated as the initial step.
pub fn classify(status: &str) -> StatusClass {
    if let Some(step) = GenerationStep::from_token(status) {
        return StatusClass::Step(step);
    }
    if is_failure(status) {
        return StatusClass::Failed;
    }
    StatusClass::Step(GenerationStep::Analyzing)
}

/// Step index of a status token, `-1` for failure tokens.
pub fn step_index(status: &str) -> i32 {
    match classify(status) {
        StatusClass::Step(step) => step.index(),
        StatusClass::Failed => FAILED_STEP_INDEX,
    }
}

/// Canned display text for a detailed status token.
pub fn detailed_status_message(detailed_status: &str) -> Option<&'static str> {
    let message = match detailed_status {
        "parsing_requirements" => "Parsing assignment requirements...",
        "extracting_features" => "Extracting required features...",
        "creating_plan" => "Drafting the implementation plan...",
        "setting_up_project" => "Setting up the project structure...",
        "writing_code" => "Writing source files...",
        "running_tests" => "Running tests...",
        "fixing_issues" => "Fixing issues found during review...",
        "final_verification" => "Running final verification...",
        "creating_repository" => "Creating GitHub repository...",
        "pushing_to_github" => "Pushing to GitHub...",
        _ => return None,
    };
    Some(message)
}

/// Pick the display text for a status update.
///
/// An explicit non-blank message wins, then the canned text of the detailed
/// status, then [`FALLBACK_MESSAGE`].
pub fn display_message(detailed_status: Option<&str>, message: Option<&str>) -> String {
    if let Some(message) = non_empty(message) {
        return message.to_string();
    }
    detailed_status
        .and_then(detailed_status_message)
        .unwrap_or(FALLBACK_MESSAGE)
        .to_string()
}

/// Map a full status message to its step index and display text.
pub fn map_status(message: &StatusMessage) -> StatusMapping {
    StatusMapping {
        step_index: step_index(&message.status),
        display_message: display_message(
            message.detailed_status.as_deref(),
            message.message.as_deref(),
        ),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
