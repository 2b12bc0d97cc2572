//! Scripted generation runs replayed over the progress channels.

use serde::Serialize;

/// One status frame as sent to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl ProgressUpdate {
    fn step(status: &'static str, detailed_status: &'static str) -> Self {
        Self {
            status,
            detailed_status: Some(detailed_status),
            message: None,
            error_details: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status == "completed" || self.status == "failed"
    }
}

/// A full successful run, from analysis to completion
pub fn successful_run() -> Vec<ProgressUpdate> {
    vec![
        ProgressUpdate::step("analyzing", "parsing_requirements"),
        ProgressUpdate::step("planning", "creating_plan"),
        ProgressUpdate::step("generating", "writing_code"),
        ProgressUpdate::step("reviewing", "running_tests"),
        ProgressUpdate::step("final_review", "final_verification"),
        ProgressUpdate {
            message: Some("Assignment generated successfully".to_string()),
            ..ProgressUpdate::step("completed", "pushing_to_github")
        },
    ]
}

/// A run that fails during review with `reason`
pub fn failed_run(reason: &str) -> Vec<ProgressUpdate> {
    vec![
        ProgressUpdate::step("analyzing", "parsing_requirements"),
        ProgressUpdate::step("planning", "creating_plan"),
        ProgressUpdate::step("generating", "writing_code"),
        ProgressUpdate::step("reviewing", "running_tests"),
        ProgressUpdate {
            status: "failed",
            detailed_status: None,
            message: None,
            error_details: Some(reason.to_string()),
        },
    ]
}
