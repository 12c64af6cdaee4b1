//! Integration tests for MCP protocol handling
//!
//! Feeds newline-delimited JSON-RPC through `McpServer::serve` and checks the
//! response stream, the way an MCP client would see it.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use mcp_deep_thinking::config::{
    CacheConfig, Config, DatabaseConfig, LogFormat, LoggingConfig, ThinkingConfig,
};
use mcp_deep_thinking::storage::SqliteStorage;
use mcp_deep_thinking::{AppState, McpServer};

fn test_config() -> Config {
    Config {
        database: DatabaseConfig {
            path: PathBuf::from(":memory:"),
            max_connections: 1,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        },
        thinking: ThinkingConfig::default(),
        cache: CacheConfig::default(),
    }
}

async fn create_server() -> McpServer {
    let storage = SqliteStorage::new_in_memory().await.unwrap();
    McpServer::new(Arc::new(AppState::new(test_config(), Arc::new(storage))))
}

/// Run `messages` through the server and return the parsed responses.
async fn exchange(server: &McpServer, messages: &[Value]) -> Vec<Value> {
    let input: String = messages.iter().map(|m| format!("{}\n", m)).collect();
    let mut output: Vec<u8> = Vec::new();
    server.serve(input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("Failed to parse JSON-RPC response"))
        .collect()
}

/// Verify JSON-RPC 2.0 response structure
fn assert_valid_jsonrpc_response(response: &Value) {
    assert_eq!(response["jsonrpc"], "2.0", "Invalid JSON-RPC version");
    assert!(
        response.get("result").is_some() ^ response.get("error").is_some(),
        "Response must have exactly one of result or error"
    );
}

fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

fn tool_text(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[cfg(test)]
mod handshake_tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_handshake() {
        let server = create_server().await;
        let responses = exchange(
            &server,
            &[
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "initialize",
                    "params": {
                        "protocolVersion": "2024-11-05",
                        "capabilities": {},
                        "clientInfo": {"name": "test-client", "version": "1.0.0"}
                    }
                }),
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
                json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            ],
        )
        .await;

        assert_eq!(responses.len(), 2, "notifications must not be answered");
        for response in &responses {
            assert_valid_jsonrpc_response(response);
        }

        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "mcp-deep-thinking");

        let tools = responses[1]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 12);
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn test_errors_keep_the_stream_alive() {
        let server = create_server().await;
        let input = "not json\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n";
        let mut output: Vec<u8> = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["id"], 9);
    }
}

#[cfg(test)]
mod thinking_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_interleaved_session_over_the_wire() {
        let server = create_server().await;
        let session = "wire-session";

        let responses = exchange(
            &server,
            &[
                tool_call(
                    1,
                    "sequential_thinking",
                    json!({
                        "thought": "I need the current version",
                        "thoughtNumber": 1,
                        "totalThoughts": 3,
                        "nextThoughtNeeded": true,
                        "session_id": session,
                        "toolCalls": [{"name": "fetch", "arguments": {"url": "https://example.com"}}]
                    }),
                ),
                tool_call(
                    2,
                    "sequential_thinking",
                    json!({
                        "thought": "Version 2 is out; compare it to version 1",
                        "thoughtNumber": 2,
                        "totalThoughts": 3,
                        "nextThoughtNeeded": true,
                        "session_id": session,
                        "comparisonItems": ["v1", "v2"],
                        "comparisonDimensions": ["speed"]
                    }),
                ),
                tool_call(
                    3,
                    "sequential_thinking",
                    json!({
                        "thought": "Upgrade",
                        "thoughtNumber": 3,
                        "totalThoughts": 3,
                        "nextThoughtNeeded": false,
                        "session_id": session
                    }),
                ),
                tool_call(4, "get_session_statistics", json!({"session_id": session})),
                tool_call(5, "visualize_session", json!({"session_id": session, "format": "ascii"})),
                tool_call(6, "resume_session", json!({"session_id": session})),
            ],
        )
        .await;

        assert_eq!(responses.len(), 6);
        for response in &responses {
            assert_valid_jsonrpc_response(response);
            assert!(response["result"].get("isError").is_none(), "{}", response);
        }

        let first = tool_text(&responses[0]);
        assert_eq!(first["phase"], "tool_call");
        assert_eq!(first["tool_calls"][0]["status"], "pending");

        let second = tool_text(&responses[1]);
        assert_eq!(second["thought_type"], "comparison");

        let third = tool_text(&responses[2]);
        assert_eq!(third["session_status"], "completed");

        let stats = tool_text(&responses[3]);
        assert_eq!(stats["statistics"]["total_thoughts"], 3);
        assert_eq!(stats["thought_types"]["comparison"], 1);
        assert_eq!(stats["thought_types"]["regular"], 2);

        let ascii = tool_text(&responses[4]);
        assert!(ascii["visualization"].as_str().unwrap().contains("Thoughts: 3"));

        let resume = tool_text(&responses[5]);
        assert_eq!(resume["resumable"], false);
    }

    #[tokio::test]
    async fn test_missing_required_field_is_tool_error() {
        let server = create_server().await;
        let responses = exchange(
            &server,
            &[tool_call(
                1,
                "sequential_thinking",
                json!({"thought": "no numbers", "nextThoughtNeeded": true}),
            )],
        )
        .await;

        assert_valid_jsonrpc_response(&responses[0]);
        assert_eq!(responses[0]["result"]["isError"], true);
        assert!(responses[0]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Invalid parameters for sequential_thinking"));
    }
}
