//! Knowbridge CLI: the main entry point.
//!
//! Commands:
//! - `chat`   : interactive session against the remote book agent
//! - `agent`  : interactive or single-message chat with the local responder
//! - `search` : query the knowledge base directly
//! - `auth`   : check that an identity token can be obtained
//! - `serve`  : start the HTTP gateway

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "knowbridge",
    about = "Knowbridge: talk to a remote knowledge agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.knowbridge/config.toml)
    #[arg(long, global = true, env = "KNOWBRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the remote book agent
    Chat,

    /// Chat with the local knowledge-augmented responder
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Continue an existing thread
        #[arg(short, long)]
        thread: Option<String>,
    },

    /// Search the knowledge base
    Search {
        query: String,

        /// Maximum passages to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Obtain an identity token for the book agent
    Auth,

    /// Start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chat => commands::chat::run(config).await?,
        Commands::Agent { message, thread } => commands::agent::run(config, message, thread).await?,
        Commands::Search { query, limit } => commands::search::run(config, query, limit).await?,
        Commands::Auth => commands::auth::run(config).await?,
        Commands::Serve { port } => commands::serve::run(config, port).await?,
    }

    Ok(())
}
