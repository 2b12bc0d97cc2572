//! Data Transfer Objects of the assignment REST API.
//!
//! Field names follow the backend's JSON. Optional fields default so that
//! partial records from older backends still decode.

use std::{collections::BTreeMap, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentType {
    /// Programming assignment
    #[serde(rename = "P")]
    Programming,
    /// Academic writing assignment
    #[serde(rename = "A")]
    Academic,
}

impl AssignmentType {
    pub fn label(&self) -> &'static str {
        match self {
            AssignmentType::Programming => "Programming Assignment",
            AssignmentType::Academic => "Academic Writing Assignment",
        }
    }
}

/// Progress of the generation pipeline for an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentFile {
    pub id: u64,
    pub file_name: String,
    #[serde(default)]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: u64,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// An assignment as returned by the list and detail endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: u64,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignment_type: Option<AssignmentType>,
    #[serde(default)]
    pub generation_status: GenerationStatus,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub has_revisions: bool,
    #[serde(default)]
    pub has_deposit_been_paid: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expected_delivery_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub github_repository: Option<String>,
    #[serde(default)]
    pub assignment_files: Vec<AssignmentFile>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

/// One message of an assignment's chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Body of the chat messages endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatMessages {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Body of the generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub subject: String,
    pub description: String,
    pub assignment_type: AssignmentType,
}

/// Reply to the generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(default)]
    pub assignment_id: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Form body of the chat improvement endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImproveRequest {
    pub message: String,
}

/// Why a message cannot be delivered yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub message: String,
}

/// A drafted chat message together with its suggested rewrite.
///
/// The draft stays pending until it is confirmed with a final version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovedMessage {
    pub message_id: u64,
    pub original: String,
    pub improved: String,
    #[serde(default = "can_deliver_default")]
    pub can_deliver: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_status: Option<DeliveryStatus>,
}

fn can_deliver_default() -> bool {
    true
}

/// Body of the chat confirmation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmMessage {
    pub final_version: String,
}

/// Language of a generated code snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    #[default]
    Python,
    Javascript,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeGenerationRequest {
    pub instructions: String,
    pub language: CodeLanguage,
}

/// Generated code and the output of running it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeGenerationResponse {
    pub code: String,
    #[serde(default)]
    pub output: String,
}

/// Layer of an application stack a technology belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechnologyRole {
    Frontend,
    Backend,
    Database,
    Infrastructure,
    Other,
}

impl TechnologyRole {
    pub fn label(&self) -> &'static str {
        match self {
            TechnologyRole::Frontend => "frontend",
            TechnologyRole::Backend => "backend",
            TechnologyRole::Database => "database",
            TechnologyRole::Infrastructure => "infrastructure",
            TechnologyRole::Other => "other",
        }
    }
}

impl FromStr for TechnologyRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "frontend" => Ok(TechnologyRole::Frontend),
            "backend" => Ok(TechnologyRole::Backend),
            "database" => Ok(TechnologyRole::Database),
            "infrastructure" => Ok(TechnologyRole::Infrastructure),
            "other" => Ok(TechnologyRole::Other),
            other => Err(format!("unknown technology role '{}'", other)),
        }
    }
}

/// One entry of the technology stack of a generated application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub role: TechnologyRole,
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Parses `role:name[:version]`, e.g. `backend:python:3.12`.
impl FromStr for Technology {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(3, ':');
        let role = parts.next().unwrap_or_default().parse()?;
        let name = parts.next().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(format!("'{}' is missing a technology name", value));
        }
        Ok(Technology {
            role,
            name: name.to_string(),
            version: parts.next().map(str::trim).unwrap_or_default().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppGenerationRequest {
    pub instructions: String,
    pub technologies: Vec<Technology>,
}

/// A service started for a generated application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub url: String,
    pub status: String,
}

impl ServiceInfo {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// Files, validation result and services of a generated application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppGenerationResponse {
    /// File contents keyed by path
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<String>>,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceInfo>,
}

/// Reply to the bidding trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiddingResponse {
    pub message: String,
}
