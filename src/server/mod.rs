//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cache::ToolCallManager;
use crate::config::Config;
use crate::storage::Storage;
use crate::thinking::ThinkingEngine;

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Thinking engine over the session store.
    pub engine: ThinkingEngine,
    /// Tool result cache, also fed by the engine.
    pub cache: Arc<Mutex<ToolCallManager>>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        let cache = Arc::new(Mutex::new(ToolCallManager::new(&config.cache)));
        let engine =
            ThinkingEngine::new(storage, config.thinking.clone()).with_cache(Arc::clone(&cache));

        tracing::info!(
            max_thoughts = config.thinking.max_thoughts,
            max_tool_calls = config.thinking.max_tool_calls,
            max_tool_calls_per_thought = config.thinking.max_tool_calls_per_thought,
            cache_size = config.cache.cache_size,
            "AppState initialized"
        );

        Self {
            config,
            engine,
            cache,
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
