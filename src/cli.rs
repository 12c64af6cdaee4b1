//! CLI commands for inspecting stored thinking sessions.
//!
//! These run against the same database as the server and print plain text
//! to stdout.

use clap::Subcommand;

use crate::models::{SessionStatistics, SessionStatus, ThinkingSession};
use crate::thinking::ThinkingEngine;
use crate::visualization;

const RULE: &str =
    "═══════════════════════════════════════════════════════════════════════════════\n";

/// Session inspection subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommands {
    /// List sessions, most recently updated first
    List {
        /// Filter by status: active, completed, archived
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of sessions to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show a session and its thought tree
    Show {
        /// Session identifier
        id: String,
    },

    /// Show aggregate statistics for a session
    Stats {
        /// Session identifier
        id: String,
    },

    /// Delete a session
    Delete {
        /// Session identifier
        id: String,
    },
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    pub message: String,
}

impl CliResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a session CLI command.
pub async fn execute_command(command: SessionCommands, engine: &ThinkingEngine) -> CliResult {
    match command {
        SessionCommands::List { status, limit } => execute_list(engine, status, limit).await,
        SessionCommands::Show { id } => execute_show(engine, &id).await,
        SessionCommands::Stats { id } => execute_stats(engine, &id).await,
        SessionCommands::Delete { id } => execute_delete(engine, &id).await,
    }
}

async fn execute_list(engine: &ThinkingEngine, status: Option<String>, limit: usize) -> CliResult {
    let status = match status.as_deref().map(str::parse::<SessionStatus>).transpose() {
        Ok(status) => status,
        Err(e) => return CliResult::error(e),
    };

    let sessions = match engine.list_sessions(status, limit.max(1)).await {
        Ok(sessions) => sessions,
        Err(e) => return CliResult::error(format!("Failed to list sessions: {}", e)),
    };

    let mut output = String::new();
    output.push_str("\nThinking Sessions\n");
    output.push_str(RULE);
    output.push('\n');

    if sessions.is_empty() {
        output.push_str("No sessions found.\n");
        return CliResult::success(output);
    }

    output.push_str(&format!("Showing {} session(s):\n\n", sessions.len()));
    for summary in sessions {
        output.push_str(&format!(
            "{} | {:<9} | {:>3} thoughts | {:>3} tool calls | {}\n",
            summary.updated_at.format("%Y-%m-%d %H:%M:%S"),
            summary.status.to_string(),
            summary.thought_count,
            summary.tool_call_count,
            summary.session_id
        ));
        output.push_str(&format!("    {}\n", summary.name));
    }

    CliResult::success(output)
}

async fn execute_show(engine: &ThinkingEngine, id: &str) -> CliResult {
    match engine.get_session(id).await {
        Ok(session) => CliResult::success(format_session(&session)),
        Err(e) => CliResult::error(e.to_string()),
    }
}

async fn execute_stats(engine: &ThinkingEngine, id: &str) -> CliResult {
    match engine.get_session_statistics(id).await {
        Ok(stats) => CliResult::success(format_statistics(id, &stats)),
        Err(e) => CliResult::error(e.to_string()),
    }
}

async fn execute_delete(engine: &ThinkingEngine, id: &str) -> CliResult {
    match engine.delete_session(id).await {
        Ok(true) => CliResult::success(format!("Deleted session {}\n", id)),
        Ok(false) => CliResult::error(format!("Session not found: {}", id)),
        Err(e) => CliResult::error(format!("Failed to delete session: {}", e)),
    }
}

fn format_session(session: &ThinkingSession) -> String {
    let mut output = String::new();
    output.push_str(&format!("\nSession {}\n", session.session_id));
    output.push_str(RULE);
    output.push('\n');
    output.push_str(&format!("Name:        {}\n", session.name));
    if !session.description.is_empty() {
        output.push_str(&format!("Description: {}\n", session.description));
    }
    output.push_str(&format!("Status:      {}\n", session.status));
    output.push_str(&format!(
        "Created:     {}\n",
        session.created_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!(
        "Updated:     {}\n",
        session.updated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!(
        "Thoughts:    {}   Tool calls: {}\n\n",
        session.thought_count(),
        session.tool_call_history.len()
    ));
    output.push_str(&visualization::to_tree(session));
    output.push('\n');
    output
}

fn format_statistics(id: &str, stats: &SessionStatistics) -> String {
    let mut output = String::new();
    output.push_str(&format!("\nStatistics for {}\n", id));
    output.push_str(RULE);
    output.push('\n');
    output.push_str(&format!("Thoughts:            {}\n", stats.total_thoughts));
    output.push_str(&format!(
        "Avg thought length:  {:.1} chars\n",
        stats.avg_thought_length
    ));
    output.push_str(&format!("Tool calls:          {}\n", stats.total_tool_calls));
    output.push_str(&format!(
        "  succeeded / failed / cached: {} / {} / {}\n",
        stats.successful_tool_calls, stats.failed_tool_calls, stats.cached_tool_calls
    ));
    if let Some(rate) = stats.success_rate() {
        output.push_str(&format!("  success rate:      {:.1}%\n", rate));
    }
    output.push_str(&format!(
        "Execution time:      {:.1} ms total, {:.1} ms avg\n",
        stats.total_execution_time_ms, stats.avg_execution_time_ms
    ));
    output.push_str(&format!(
        "Phases:              thinking {} | tool_call {} | analysis {}\n",
        stats.phase_distribution.thinking,
        stats.phase_distribution.tool_call,
        stats.phase_distribution.analysis
    ));
    output
}
