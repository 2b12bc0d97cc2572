//! Stub assignment backend for genwatch.
//!
//! Serves the assignment REST API and replays scripted generation progress
//! over WebSocket.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin genwatch-server
//! cargo run --bin genwatch-server -- --port 9000 --step-delay-ms 500 --token secret
//! ```

use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use genwatch_server::{AssignmentStore, Server};
use genwatch_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "genwatch-server")]
#[command(about = "Stub assignment backend with scripted generation progress", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8000")]
    port: u16,

    /// Pause between two progress updates, in milliseconds
    #[arg(long, default_value = "1000")]
    step_delay_ms: u64,

    /// Bearer token required by the REST endpoints
    #[arg(long, env = "GENWATCH_TOKEN")]
    token: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let store = AssignmentStore::seeded(Utc::now());
    let server = Server::new(
        store,
        Duration::from_millis(args.step_delay_ms),
        args.token,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
