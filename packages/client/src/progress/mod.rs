//! Progress tracking: the view state machine, the session that drives it,
//! and the board that runs one session per generating assignment.

mod board;
mod machine;
mod session;

pub use board::{BoardUpdate, ProgressBoard};
pub use machine::{
    CONNECTING_MESSAGE, ConnectionPhase, Effect, ProgressMachine, RECONNECTING_MESSAGE, ViewState,
};
pub use session::ProgressSession;
