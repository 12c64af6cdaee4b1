use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcp_deep_thinking::{
    cli::{execute_command, SessionCommands},
    config::{Config, LogFormat},
    server::{AppState, McpServer},
    storage::SqliteStorage,
};

/// MCP server for sequential and interleaved thinking sessions
#[derive(Parser, Debug)]
#[command(name = "mcp-deep-thinking")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Runs the stdio MCP server when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect stored thinking sessions
    #[command(subcommand)]
    Sessions(SessionCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    let state = Arc::new(AppState::new(config, Arc::new(storage)));

    if let Some(Command::Sessions(command)) = args.command {
        let result = execute_command(command, &state.engine).await;
        if result.exit_code == 0 {
            print!("{}", result.message);
        } else {
            eprintln!("{}", result.message);
        }
        std::process::exit(result.exit_code);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "MCP Deep Thinking Server starting..."
    );

    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Install the tracing subscriber. Output goes to stderr; stdout carries
/// the MCP protocol.
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
