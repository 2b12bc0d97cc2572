mod http;
mod websocket;

pub use http::{
    confirm_chat_message, generate_application, generate_code, get_assignment, get_chat_messages,
    health_check, improve_chat_message, list_assignments, start_generation, trigger_bidding,
};
pub use websocket::{assignment_progress, project_progress};
