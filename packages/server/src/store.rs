//! In-memory assignment store.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use genwatch_shared::dto::{
    Assignment, AssignmentFile, AssignmentType, ChatMessage, DeliveryStatus, GenerateRequest,
    GenerationStatus, ImprovedMessage,
};
use serde::Deserialize;

use crate::assistant;

const UNPAID_DELIVERY_NOTICE: &str =
    "Messages are delivered once the deposit for this assignment has been paid";

/// Query parameters of the assignment list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilter {
    pub filter: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Subject is required")]
    EmptySubject,
    #[error("Description is required")]
    EmptyDescription,
    #[error("Assignment not found")]
    AssignmentNotFound,
    #[error("Message is required")]
    EmptyMessage,
    #[error("Message draft not found")]
    DraftNotFound,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::AssignmentNotFound | StoreError::DraftNotFound)
    }
}

/// A chat message waiting for its final version
#[derive(Debug)]
struct Draft {
    assignment_id: u64,
}

/// Assignments and their chats, keyed by assignment id
#[derive(Debug, Default)]
pub struct AssignmentStore {
    assignments: BTreeMap<u64, Assignment>,
    chats: HashMap<u64, Vec<ChatMessage>>,
    drafts: HashMap<u64, Draft>,
    next_id: u64,
    next_message_id: u64,
}

impl AssignmentStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_message_id: 1,
            ..Default::default()
        }
    }

    /// Store with a handful of demo assignments in different states.
    ///
    /// Assignment 3 is marked as failed, so watching it replays a failing run.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let mut store = Self::new();

        let graphs = store.insert(Assignment {
            id: 0,
            subject: "Graph algorithms".to_string(),
            description: "Implement Dijkstra and A* with benchmarks".to_string(),
            assignment_type: Some(AssignmentType::Programming),
            generation_status: GenerationStatus::InProgress,
            completed: false,
            has_revisions: false,
            has_deposit_been_paid: true,
            timestamp: Some(now - TimeDelta::days(2)),
            completion_deadline: Some(now + TimeDelta::days(3)),
            expected_delivery_time: Some(now + TimeDelta::days(2)),
            github_repository: None,
            assignment_files: vec![AssignmentFile {
                id: 1,
                file_name: "requirements.pdf".to_string(),
                file_url: Some("/media/requirements.pdf".to_string()),
            }],
            submissions: vec![],
        });
        store.post_message(
            graphs,
            "client",
            "Please include a README",
            now - TimeDelta::hours(30),
        );
        store.post_message(
            graphs,
            "support",
            "Noted, it will be part of the repository",
            now - TimeDelta::hours(29),
        );

        store.insert(Assignment {
            id: 0,
            subject: "Essay on memory safety".to_string(),
            description: "2000 words comparing ownership models".to_string(),
            assignment_type: Some(AssignmentType::Academic),
            generation_status: GenerationStatus::Completed,
            completed: true,
            has_revisions: false,
            has_deposit_been_paid: true,
            timestamp: Some(now - TimeDelta::days(10)),
            completion_deadline: Some(now - TimeDelta::days(1)),
            expected_delivery_time: None,
            github_repository: None,
            assignment_files: vec![],
            submissions: vec![],
        });

        store.insert(Assignment {
            id: 0,
            subject: "Compiler front end".to_string(),
            description: "Lexer and parser for a small language".to_string(),
            assignment_type: Some(AssignmentType::Programming),
            generation_status: GenerationStatus::Failed,
            completed: false,
            has_revisions: true,
            has_deposit_been_paid: false,
            timestamp: Some(now - TimeDelta::days(1)),
            completion_deadline: Some(now + TimeDelta::hours(12)),
            expected_delivery_time: None,
            github_repository: None,
            assignment_files: vec![],
            submissions: vec![],
        });

        store
    }

    /// Insert an assignment under the next free id and return that id.
    pub fn insert(&mut self, mut assignment: Assignment) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        assignment.id = id;
        self.assignments.insert(id, assignment);
        id
    }

    pub fn get(&self, id: u64) -> Option<&Assignment> {
        self.assignments.get(&id)
    }

    /// Assignments matching `filter`, in the requested order
    pub fn list(&self, filter: &ListFilter) -> Vec<Assignment> {
        let search = filter.search.as_deref().map(str::to_lowercase);
        let mut assignments: Vec<Assignment> = self
            .assignments
            .values()
            .filter(|a| matches_filter(a, filter.filter.as_deref()))
            .filter(|a| match &search {
                Some(needle) => {
                    a.subject.to_lowercase().contains(needle)
                        || a.description.to_lowercase().contains(needle)
                }
                None => true,
            })
            .cloned()
            .collect();

        match filter.sort.as_deref() {
            // Assignments without a deadline go last
            Some("deadline") => assignments
                .sort_by_key(|a| (a.completion_deadline.is_none(), a.completion_deadline)),
            Some("newest") => assignments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            _ => {}
        }
        assignments
    }

    /// Chat of an assignment, or `None` when the assignment does not exist
    pub fn chat(&self, id: u64) -> Option<Vec<ChatMessage>> {
        self.assignments.get(&id)?;
        Some(self.chats.get(&id).cloned().unwrap_or_default())
    }

    /// Draft a chat message and suggest an improved wording.
    ///
    /// The draft is only added to the chat once [`Self::confirm_message`]
    /// picks its final version.
    pub fn draft_message(&mut self, id: u64, text: &str) -> Result<ImprovedMessage, StoreError> {
        let assignment = self
            .assignments
            .get(&id)
            .ok_or(StoreError::AssignmentNotFound)?;
        if text.trim().is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        let can_deliver = assignment.has_deposit_been_paid;
        let message_id = self.next_message_id;
        self.next_message_id += 1;
        self.drafts.insert(message_id, Draft { assignment_id: id });

        Ok(ImprovedMessage {
            message_id,
            original: text.to_string(),
            improved: assistant::improve_message(text),
            can_deliver,
            delivery_status: (!can_deliver).then(|| DeliveryStatus {
                message: UNPAID_DELIVERY_NOTICE.to_string(),
            }),
        })
    }

    /// Post the final version of a drafted message to the chat.
    pub fn confirm_message(
        &mut self,
        id: u64,
        message_id: u64,
        final_version: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage, StoreError> {
        match self.drafts.get(&message_id) {
            Some(draft) if draft.assignment_id == id => {}
            _ => return Err(StoreError::DraftNotFound),
        }
        if final_version.trim().is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        self.drafts.remove(&message_id);
        let message = ChatMessage {
            id: message_id,
            sender: "client".to_string(),
            content: final_version.to_string(),
            timestamp: Some(now),
        };
        self.chats.entry(id).or_default().push(message.clone());
        Ok(message)
    }

    /// Assignments that can be offered to writers: not completed and not generating.
    pub fn open_for_bidding(&self) -> usize {
        self.assignments
            .values()
            .filter(|a| !a.completed && a.generation_status != GenerationStatus::InProgress)
            .count()
    }

    fn post_message(&mut self, id: u64, sender: &str, content: &str, timestamp: DateTime<Utc>) {
        let message_id = self.next_message_id;
        self.next_message_id += 1;
        self.chats.entry(id).or_default().push(ChatMessage {
            id: message_id,
            sender: sender.to_string(),
            content: content.to_string(),
            timestamp: Some(timestamp),
        });
    }

    /// Create an assignment whose generation is in progress.
    pub fn create(
        &mut self,
        request: GenerateRequest,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        if request.subject.trim().is_empty() {
            return Err(StoreError::EmptySubject);
        }
        if request.description.trim().is_empty() {
            return Err(StoreError::EmptyDescription);
        }

        Ok(self.insert(Assignment {
            id: 0,
            subject: request.subject,
            description: request.description,
            assignment_type: Some(request.assignment_type),
            generation_status: GenerationStatus::InProgress,
            completed: false,
            has_revisions: false,
            has_deposit_been_paid: false,
            timestamp: Some(now),
            completion_deadline: Some(now + TimeDelta::days(7)),
            expected_delivery_time: None,
            github_repository: None,
            assignment_files: vec![],
            submissions: vec![],
        }))
    }

    /// Record the outcome of a generation run.
    pub fn set_generation_status(&mut self, id: u64, status: GenerationStatus) {
        if let Some(assignment) = self.assignments.get_mut(&id) {
            assignment.generation_status = status;
            if status == GenerationStatus::Completed && assignment.github_repository.is_none() {
                assignment.github_repository =
                    Some(format!("https://github.com/genwatch-demo/assignment-{}", id));
            }
        }
    }
}

fn matches_filter(assignment: &Assignment, filter: Option<&str>) -> bool {
    match filter {
        Some("completed") => assignment.completed,
        Some("generating") => assignment.generation_status == GenerationStatus::InProgress,
        Some("failed") => assignment.generation_status == GenerationStatus::Failed,
        Some("unpaid") => !assignment.has_deposit_been_paid,
        Some("revisions") => assignment.has_revisions,
        _ => true,
    }
}
