//! Command line client for assignment generation progress.
//!
//! Watches the live progress channel of an assignment or project, and wraps
//! the REST endpoints needed around it.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin genwatch -- --base-url http://127.0.0.1:8000 watch 1
//! cargo run --bin genwatch -- list --filter generating --watch
//! cargo run --bin genwatch -- generate --subject "Graphs" --description "Dijkstra" --type P --watch
//! cargo run --bin genwatch -- chat send 1 "can you add a README" --use-improved
//! cargo run --bin genwatch -- app "Todo list" --tech frontend:react:18 --tech backend:python
//! ```

use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use genwatch_client::{
    api::{
        ApiClient, AppGenerationRequest, AssignmentType, CodeGenerationRequest, CodeLanguage,
        GenerateRequest, ListQuery, Technology,
    },
    domain::{DEFAULT_MAX_RECONNECT_ATTEMPTS, ReconnectPolicy},
    error::CliError,
    runner::{self, MessageChoice, WatchOptions},
    target::ResourceKind,
};
use genwatch_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "genwatch")]
#[command(about = "Track assignment generation progress over WebSocket", long_about = None)]
struct Args {
    /// Backend base URL; the progress channel uses ws:// or wss:// accordingly
    #[arg(
        short = 'u',
        long,
        env = "GENWATCH_BASE_URL",
        default_value = "http://127.0.0.1:8000"
    )]
    base_url: String,

    /// Bearer token sent with REST requests
    #[arg(short = 't', long, env = "GENWATCH_TOKEN", default_value = "")]
    token: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch generation progress until it completes or fails
    Watch {
        /// Assignment id, or project id with --project
        id: String,

        /// Watch a project channel instead of an assignment
        #[arg(long)]
        project: bool,

        #[command(flatten)]
        watch: WatchArgs,
    },
    /// List assignments
    List {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        sort: Option<String>,
        /// Follow every generating assignment until none is left
        #[arg(long)]
        watch: bool,

        #[command(flatten)]
        reconnect: ReconnectArgs,
    },
    /// Show one assignment
    Show { id: u64 },
    /// Read or write the chat of one assignment
    Chat {
        #[command(subcommand)]
        action: ChatCommand,
    },
    /// Start generating a new assignment
    Generate {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        description: String,
        #[arg(long = "type", value_enum, default_value = "p")]
        assignment_type: TypeArg,
        /// Watch the progress after starting
        #[arg(long)]
        watch: bool,

        #[command(flatten)]
        watch_args: WatchArgs,
    },
    /// Generate a code snippet and run it
    Code {
        instructions: String,
        #[arg(long, value_enum, default_value = "python")]
        language: LanguageArg,
    },
    /// Generate an application for a technology stack
    App {
        instructions: String,
        /// Stack entry as role:name[:version]; roles are frontend, backend,
        /// database, infrastructure and other
        #[arg(long = "tech", required = true)]
        technologies: Vec<Technology>,
    },
    /// Open the unassigned assignments for bidding
    Bid,
}

#[derive(Subcommand, Debug)]
enum ChatCommand {
    /// Show the messages
    Show { id: u64 },
    /// Draft a message, show the suggested rewrite and send it
    Send {
        id: u64,
        text: String,
        /// Send the suggested rewrite instead of the original text
        #[arg(long, conflicts_with = "discard")]
        use_improved: bool,
        /// Only show the suggestion without sending anything
        #[arg(long)]
        discard: bool,
    },
}

#[derive(ClapArgs, Debug)]
struct ReconnectArgs {
    /// Delay before each reconnection attempt, in milliseconds
    #[arg(long, default_value = "3000")]
    reconnect_interval_ms: u64,

    /// Reconnection attempts after the connection is lost
    #[arg(long, default_value_t = DEFAULT_MAX_RECONNECT_ATTEMPTS)]
    max_reconnect_attempts: u32,
}

impl ReconnectArgs {
    fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect_interval_ms),
            self.max_reconnect_attempts,
        )
    }
}

#[derive(ClapArgs, Debug)]
struct WatchArgs {
    #[command(flatten)]
    reconnect: ReconnectArgs,

    /// Retry once when generation tracking ends in an error
    #[arg(long)]
    retry_on_error: bool,
}

impl WatchArgs {
    fn options(&self, resource_kind: ResourceKind) -> WatchOptions {
        WatchOptions {
            resource_kind,
            policy: self.reconnect.policy(),
            retry_on_error: self.retry_on_error,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LanguageArg {
    Python,
    Javascript,
}

impl From<LanguageArg> for CodeLanguage {
    fn from(value: LanguageArg) -> Self {
        match value {
            LanguageArg::Python => CodeLanguage::Python,
            LanguageArg::Javascript => CodeLanguage::Javascript,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TypeArg {
    /// Programming assignment
    #[value(name = "p", alias = "P")]
    Programming,
    /// Academic writing assignment
    #[value(name = "a", alias = "A")]
    Academic,
}

impl From<TypeArg> for AssignmentType {
    fn from(value: TypeArg) -> Self {
        match value {
            TypeArg::Programming => AssignmentType::Programming,
            TypeArg::Academic => AssignmentType::Academic,
        }
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Watch { id, project, watch } => {
            let kind = if project {
                ResourceKind::Project
            } else {
                ResourceKind::Assignment
            };
            runner::run_watch(&args.base_url, id, watch.options(kind)).await?;
        }
        Command::List {
            filter,
            search,
            sort,
            watch,
            reconnect,
        } => {
            let api = ApiClient::new(&args.base_url, args.token)?;
            let query = ListQuery {
                filter,
                search,
                sort,
            };
            if watch {
                runner::run_list_watch(&api, &query, reconnect.policy()).await?;
            } else {
                runner::run_list(&api, &query).await?;
            }
        }
        Command::Show { id } => {
            let api = ApiClient::new(&args.base_url, args.token)?;
            runner::run_show(&api, id).await?;
        }
        Command::Chat { action } => {
            let api = ApiClient::new(&args.base_url, args.token)?;
            match action {
                ChatCommand::Show { id } => runner::run_chat(&api, id).await?,
                ChatCommand::Send {
                    id,
                    text,
                    use_improved,
                    discard,
                } => {
                    let choice = if discard {
                        MessageChoice::Discard
                    } else if use_improved {
                        MessageChoice::UseImproved
                    } else {
                        MessageChoice::SendOriginal
                    };
                    runner::run_chat_send(&api, id, &text, choice).await?;
                }
            }
        }
        Command::Generate {
            subject,
            description,
            assignment_type,
            watch,
            watch_args,
        } => {
            let api = ApiClient::new(&args.base_url, args.token)?;
            let request = GenerateRequest {
                subject,
                description,
                assignment_type: assignment_type.into(),
            };
            let watch = watch.then(|| watch_args.options(ResourceKind::Assignment));
            runner::run_generate(&api, &request, watch).await?;
        }
        Command::Code {
            instructions,
            language,
        } => {
            let api = ApiClient::new(&args.base_url, args.token)?;
            let request = CodeGenerationRequest {
                instructions,
                language: language.into(),
            };
            runner::run_generate_code(&api, &request).await?;
        }
        Command::App {
            instructions,
            technologies,
        } => {
            let api = ApiClient::new(&args.base_url, args.token)?;
            let request = AppGenerationRequest {
                instructions,
                technologies,
            };
            runner::run_generate_app(&api, &request).await?;
        }
        Command::Bid => {
            let api = ApiClient::new(&args.base_url, args.token)?;
            runner::run_bidding(&api).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("genwatch error: {}", e);
        std::process::exit(1);
    }
}
