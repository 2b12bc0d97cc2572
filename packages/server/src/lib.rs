//! Stub assignment backend.
//!
//! Serves the assignment REST API from an in-memory store and replays scripted
//! generation runs on the live progress channels. Used for local development of
//! the genwatch client and by its integration tests.

pub mod assistant;
pub mod progress;
pub mod store;
pub mod ui;

pub use store::AssignmentStore;
pub use ui::Server;
