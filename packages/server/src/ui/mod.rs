//! HTTP and WebSocket surface of the stub backend.

mod handler;
mod server;
mod signal;
mod state;

pub use server::Server;
