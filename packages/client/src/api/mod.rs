//! Client of the assignment REST API.

mod client;

pub use client::{ApiClient, ListQuery};
pub use genwatch_shared::dto::{
    AppGenerationRequest, AppGenerationResponse, Assignment, AssignmentType, ChatMessage,
    CodeGenerationRequest, CodeGenerationResponse, CodeLanguage, GenerateRequest,
    GenerationStatus, ImprovedMessage, Technology, TechnologyRole,
};
