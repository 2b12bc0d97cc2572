//! Client for live assignment generation progress.
//!
//! - [`connection`]: WebSocket connection manager with a bounded reconnect policy
//! - [`status`]: mapping of raw status tokens to pipeline steps and display text
//! - [`progress`]: the progress view state machine and the session driving it
//! - [`api`]: REST client of the assignment backend
//!
//! The `genwatch` binary built on top of these lives in `src/bin/genwatch.rs`.

pub mod api;
pub mod connection;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod progress;
pub mod runner;
pub mod status;
pub mod target;

pub use connection::{ConnectionEvent, ConnectionManager};
pub use domain::ReconnectPolicy;
pub use error::{ApiError, CliError, ConnectionError};
pub use progress::{ConnectionPhase, ProgressBoard, ProgressSession, ViewState};
pub use status::StatusMessage;
pub use target::ConnectionTarget;
