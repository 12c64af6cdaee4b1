//! # MCP Deep Thinking Server
//!
//! A Model Context Protocol (MCP) server that records step-by-step reasoning
//! sessions, interleaving thoughts with the tool calls made along the way.
//!
//! ## Features
//!
//! - **Thought kinds**: regular, revision, branch, comparison, reverse and
//!   hypothetical steps
//! - **Execution phases**: thinking, tool call and analysis, inferred from the
//!   tool data attached to a step
//! - **Tool-call tracking**: calls correlated with results by `call_id` or
//!   position, with per-step and per-session quotas
//! - **Dynamic planning**: the planned step count grows on request up to a
//!   configured ceiling
//! - **Tool result cache**: LRU cache keyed by tool name and canonical
//!   arguments
//! - **Visualization**: Mermaid, ASCII and tree renderings of a session
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → McpServer (stdio JSON-RPC) → ThinkingEngine → Storage
//!                                                 ↓            ↓
//!                                          ToolCallManager   SQLite
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mcp_deep_thinking::{AppState, Config, McpServer};
//! use mcp_deep_thinking::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let state = Arc::new(AppState::new(config, Arc::new(storage)));
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

/// LRU cache of tool results.
pub mod cache;
/// Session inspection commands.
pub mod cli;
/// Configuration management for the MCP server.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Sessions, thoughts and tool call records.
pub mod models;
/// MCP server implementation and request handling.
pub mod server;
/// Session persistence.
pub mod storage;
/// Step validation, quotas, phases and correlation.
pub mod thinking;
/// Session renderers.
pub mod visualization;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
pub use thinking::ThinkingEngine;
