//! MCP protocol implementation for JSON-RPC 2.0 communication.
//!
//! Messages are newline-delimited JSON on stdin/stdout. Logging must never
//! write to stdout.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use super::{handle_tool_call, SharedState};
use crate::error::{McpError, McpResult};

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// MCP protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "mcp-deep-thinking";

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    /// Request identifier, `null` when the request could not be read.
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC error codes used by this server.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP server information returned during initialization.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// MCP server capabilities advertised to clients.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Result of the MCP initialize handshake.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: Capabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// MCP tool definition with JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl Tool {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item within a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ToolResultContent {
    fn text(text: String) -> Self {
        Self {
            content_type: "text".to_string(),
            text,
        }
    }
}

/// Result of a tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// MCP Server running over stdio.
pub struct McpServer {
    state: SharedState,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run the server on the process's stdin and stdout.
    pub async fn run(&self) -> std::io::Result<()> {
        info!("MCP Deep Thinking Server starting...");
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serve requests from `reader` until EOF, writing one response line per
    /// request to `writer`.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            if let Some(response) = self.handle_line(trimmed).await {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                error!(error = %e, "Failed to parse request");
                Some(JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" | "notifications/initialized" => {
                debug!("Received initialized notification");
                None
            }
            "notifications/cancelled" => {
                debug!("Received cancelled notification");
                None
            }
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(request.id, json!({}))),
            method if is_notification => {
                debug!(method = %method, "Unknown notification, ignoring");
                None
            }
            method => {
                warn!(method = %method, "Unknown method");
                Some(JsonRpcResponse::error(
                    request.id,
                    error_codes::METHOD_NOT_FOUND,
                    format!("Method not found: {}", method),
                ))
            }
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(
                    id,
                    error_codes::INTERNAL_ERROR,
                    format!("Internal error: {}", e),
                )
            }
        }
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        debug!("Handling tools/list request");
        JsonRpcResponse::success(id, json!({ "tools": tool_definitions() }))
    }

    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params = match parse_tool_call_params(params) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Rejected malformed tools/call");
                return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, e.to_string());
            }
        };

        info!(tool = %params.name, "Handling tool call");

        let tool_result = match handle_tool_call(&self.state, &params.name, params.arguments).await
        {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                    error!(error = %e, "Failed to serialize tool result");
                    format!("{{\"error\": \"Serialization failed: {}\"}}", e)
                });
                ToolCallResult {
                    content: vec![ToolResultContent::text(text)],
                    is_error: None,
                }
            }
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool call failed");
                ToolCallResult {
                    content: vec![ToolResultContent::text(format!("Error: {}", e))],
                    is_error: Some(true),
                }
            }
        };

        match serde_json::to_value(tool_result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(
                    id,
                    error_codes::INTERNAL_ERROR,
                    format!("Internal error: {}", e),
                )
            }
        }
    }
}

fn parse_tool_call_params(params: Option<Value>) -> McpResult<ToolCallParams> {
    let params = params.ok_or_else(|| McpError::InvalidRequest {
        message: "tools/call requires params".to_string(),
    })?;
    serde_json::from_value(params).map_err(|e| McpError::InvalidRequest {
        message: format!("malformed tools/call params: {}", e),
    })
}

/// Every tool this server exposes, in `tools/list` order.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        get_sequential_thinking_tool(),
        get_create_session_tool(),
        get_get_session_tool(),
        get_list_sessions_tool(),
        get_delete_session_tool(),
        get_update_session_status_tool(),
        get_resume_session_tool(),
        get_tool_call_history_tool(),
        get_session_statistics_tool(),
        get_visualize_session_tool(),
        get_tool_cache_lookup_tool(),
        get_tool_cache_stats_tool(),
    ]
}

fn session_id_property() -> Value {
    json!({
        "type": "string",
        "description": "Session identifier"
    })
}

fn get_sequential_thinking_tool() -> Tool {
    Tool::new(
        "sequential_thinking",
        "Record one step of an interleaved thinking process. Steps may revise or branch from \
         earlier steps, compare options, reason backwards or explore hypotheticals, and carry \
         the tool calls issued in that step together with their results. Quota overruns are \
         reported as a rejected step and nothing is recorded.",
        json!({
            "type": "object",
            "properties": {
                "thought": {
                    "type": "string",
                    "description": "The reasoning text of this step"
                },
                "nextThoughtNeeded": {
                    "type": "boolean",
                    "description": "Whether another step will follow; false completes the session"
                },
                "thoughtNumber": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Position of this step, starting at 1"
                },
                "totalThoughts": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Planned number of steps"
                },
                "session_id": {
                    "type": "string",
                    "description": "Target session, created on first use (default: \"default\")"
                },
                "isRevision": {
                    "type": "boolean",
                    "description": "This step revises an earlier one"
                },
                "revisesThought": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Step being revised (requires isRevision)"
                },
                "branchFromThought": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Step this branch starts from"
                },
                "branchId": {
                    "type": "string",
                    "description": "Branch label (requires branchFromThought)"
                },
                "needsMoreThoughts": {
                    "type": "boolean",
                    "description": "Extend the planned total when this is the last planned step"
                },
                "comparisonItems": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Options being compared (at least two)"
                },
                "comparisonDimensions": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Criteria used for the comparison"
                },
                "comparisonResult": {
                    "type": "string",
                    "description": "Outcome of the comparison"
                },
                "reverseFrom": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Step the backward reasoning starts from"
                },
                "reverseTarget": {
                    "type": "string",
                    "description": "Goal being reasoned back from"
                },
                "reverseSteps": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Backward reasoning steps"
                },
                "hypotheticalCondition": {
                    "type": "string",
                    "description": "The 'what if' condition"
                },
                "hypotheticalImpact": {
                    "type": "string",
                    "description": "Expected impact of the condition"
                },
                "hypotheticalProbability": {
                    "type": "string",
                    "description": "Estimated likelihood"
                },
                "phase": {
                    "type": "string",
                    "enum": ["thinking", "tool_call", "analysis"],
                    "description": "Execution phase; inferred from tool data when omitted"
                },
                "toolCalls": {
                    "type": "array",
                    "description": "Tool calls issued by this step",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "arguments": {"type": "object"},
                            "call_id": {"type": "string"}
                        },
                        "required": ["name"]
                    }
                },
                "toolResults": {
                    "type": "array",
                    "description": "Results for this step's tool calls, matched by call_id or position",
                    "items": {
                        "type": "object",
                        "properties": {
                            "call_id": {"type": "string"},
                            "success": {"type": "boolean"},
                            "result": {},
                            "error": {},
                            "execution_time_ms": {"type": "number"},
                            "from_cache": {"type": "boolean"}
                        }
                    }
                }
            },
            "required": ["thought", "nextThoughtNeeded", "thoughtNumber", "totalThoughts"]
        }),
    )
}

fn get_create_session_tool() -> Tool {
    Tool::new(
        "create_session",
        "Create a named thinking session.",
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Session name (1-100 characters)"
                },
                "description": {
                    "type": "string",
                    "description": "Optional description"
                },
                "metadata": {
                    "type": ["object", "string"],
                    "description": "Metadata object, or a JSON string encoding one"
                },
                "session_id": {
                    "type": "string",
                    "description": "Explicit identifier; a UUID is generated when omitted"
                }
            },
            "required": ["name"]
        }),
    )
}

fn get_get_session_tool() -> Tool {
    Tool::new(
        "get_session",
        "Get a session with all of its thoughts and tool calls.",
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property()
            },
            "required": ["session_id"]
        }),
    )
}

fn get_list_sessions_tool() -> Tool {
    Tool::new(
        "list_sessions",
        "List session summaries, most recently updated first.",
        json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["active", "completed", "archived"],
                    "description": "Only sessions with this status"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of sessions (default: 20)"
                }
            }
        }),
    )
}

fn get_delete_session_tool() -> Tool {
    Tool::new(
        "delete_session",
        "Delete a session and everything recorded in it.",
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property()
            },
            "required": ["session_id"]
        }),
    )
}

fn get_update_session_status_tool() -> Tool {
    Tool::new(
        "update_session_status",
        "Set a session's status to active, completed or archived.",
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "status": {
                    "type": "string",
                    "enum": ["active", "completed", "archived"]
                }
            },
            "required": ["session_id", "status"]
        }),
    )
}

fn get_resume_session_tool() -> Tool {
    Tool::new(
        "resume_session",
        "Get what is needed to continue a session: last thought, planned total and the next \
         thought number. Completed sessions are reported as not resumable.",
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property()
            },
            "required": ["session_id"]
        }),
    )
}

fn get_tool_call_history_tool() -> Tool {
    Tool::new(
        "get_tool_call_history",
        "Get the tool calls recorded in a session in call order.",
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "thought_number": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Only calls issued by this thought"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of records (default: 50)"
                }
            },
            "required": ["session_id"]
        }),
    )
}

fn get_session_statistics_tool() -> Tool {
    Tool::new(
        "get_session_statistics",
        "Get aggregate statistics for a session: thought counts, tool call outcomes, \
         execution time, phase and thought-type distribution.",
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property()
            },
            "required": ["session_id"]
        }),
    )
}

fn get_visualize_session_tool() -> Tool {
    Tool::new(
        "visualize_session",
        "Render a session as a Mermaid flowchart, an ASCII flow or a tree.",
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "format": {
                    "type": "string",
                    "enum": ["mermaid", "ascii", "tree"],
                    "description": "Output format (default: mermaid)"
                }
            },
            "required": ["session_id"]
        }),
    )
}

fn get_tool_cache_lookup_tool() -> Tool {
    Tool::new(
        "tool_cache_lookup",
        "Look up a cached result for a tool called with the given arguments.",
        json!({
            "type": "object",
            "properties": {
                "tool_name": {
                    "type": "string",
                    "description": "Tool name"
                },
                "arguments": {
                    "type": "object",
                    "description": "Call arguments (key order does not matter)"
                }
            },
            "required": ["tool_name"]
        }),
    )
}

fn get_tool_cache_stats_tool() -> Tool {
    Tool::new(
        "tool_cache_stats",
        "Get tool cache statistics: calls, failures, hits, misses and capacity.",
        json!({
            "type": "object",
            "properties": {}
        }),
    )
}
