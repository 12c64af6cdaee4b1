//! Config environment variable tests
//!
//! Config::from_env() also loads a .env file via dotenvy when one exists, so
//! these tests set every variable they assert on.
//!
//! Tests use #[serial] to prevent races on the shared process environment.

use std::env;
use std::sync::Arc;

use mcp_deep_thinking::config::{Config, LogFormat, ThinkingConfig};
use mcp_deep_thinking::storage::SqliteStorage;
use mcp_deep_thinking::thinking::ThinkingEngine;
use serial_test::serial;

const THINKING_VARS: [&str; 4] = [
    "MAX_THOUGHTS",
    "THOUGHTS_INCREMENT",
    "MAX_TOOL_CALLS",
    "MAX_TOOL_CALLS_PER_THOUGHT",
];

fn clear_thinking_vars() {
    for var in THINKING_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_thinking_defaults() {
    clear_thinking_vars();

    let config = ThinkingConfig::from_env().unwrap();
    assert_eq!(config, ThinkingConfig::default());
    assert_eq!(config.max_thoughts, 50);
    assert_eq!(config.thoughts_increment, 10);
}

#[test]
#[serial]
fn test_thinking_overrides() {
    env::set_var("MAX_THOUGHTS", "80");
    env::set_var("THOUGHTS_INCREMENT", "5");
    env::set_var("MAX_TOOL_CALLS", "200");
    env::set_var("MAX_TOOL_CALLS_PER_THOUGHT", "4");

    let config = Config::from_env().unwrap();
    assert_eq!(config.thinking.max_thoughts, 80);
    assert_eq!(config.thinking.thoughts_increment, 5);
    assert_eq!(config.thinking.max_tool_calls, 200);
    assert_eq!(config.thinking.max_tool_calls_per_thought, 4);

    clear_thinking_vars();
}

#[test]
#[serial]
fn test_zero_limit_is_rejected() {
    env::set_var("MAX_TOOL_CALLS_PER_THOUGHT", "0");

    let result = Config::from_env();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("MAX_TOOL_CALLS_PER_THOUGHT"));

    clear_thinking_vars();
}

#[test]
#[serial]
fn test_invalid_number_uses_default() {
    env::set_var("MAX_THOUGHTS", "lots");
    env::set_var("DATABASE_MAX_CONNECTIONS", "not-a-number");

    let config = Config::from_env().unwrap();
    assert_eq!(config.thinking.max_thoughts, 50);
    assert_eq!(config.database.max_connections, 5);

    env::remove_var("MAX_THOUGHTS");
    env::remove_var("DATABASE_MAX_CONNECTIONS");
}

#[test]
#[serial]
fn test_cache_overrides_and_validation() {
    env::set_var("TOOL_CACHE_SIZE", "7");
    env::set_var("TOOL_CACHE_MAX_CALLS", "9");

    let config = Config::from_env().unwrap();
    assert_eq!(config.cache.cache_size, 7);
    assert_eq!(config.cache.max_calls, 9);

    env::set_var("TOOL_CACHE_SIZE", "0");
    assert!(Config::from_env().is_err());

    env::remove_var("TOOL_CACHE_SIZE");
    env::remove_var("TOOL_CACHE_MAX_CALLS");
}

#[test]
#[serial]
fn test_database_and_logging_overrides() {
    env::set_var("DATABASE_PATH", "/custom/thinking.db");
    env::set_var("LOG_FORMAT", "JSON");
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    assert_eq!(config.database.path.to_str().unwrap(), "/custom/thinking.db");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "debug");

    env::remove_var("DATABASE_PATH");
    env::remove_var("LOG_FORMAT");
    env::remove_var("LOG_LEVEL");
}

#[tokio::test]
#[serial]
async fn test_engine_reload_reads_environment() {
    clear_thinking_vars();
    let storage = SqliteStorage::new_in_memory().await.unwrap();
    let engine = ThinkingEngine::new(Arc::new(storage), ThinkingConfig::default());

    env::set_var("MAX_THOUGHTS", "12");
    let reloaded = engine.reload().await.unwrap();
    assert_eq!(reloaded.max_thoughts, 12);
    assert_eq!(engine.config().await.max_thoughts, 12);

    env::set_var("MAX_THOUGHTS", "0");
    assert!(engine.reload().await.is_err());
    assert_eq!(engine.config().await.max_thoughts, 12);

    clear_thinking_vars();
}
