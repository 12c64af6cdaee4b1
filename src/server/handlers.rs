use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use super::SharedState;
use crate::error::{McpError, McpResult};
use crate::models::{SessionStatistics, SessionStatus};
use crate::thinking::ThoughtStepRequest;
use crate::visualization::{self, VisualizationFormat};

/// Default page size for `list_sessions`.
pub const DEFAULT_SESSION_LIMIT: usize = 20;

/// Default page size for `get_tool_call_history`.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "sequential_thinking" => handle_sequential_thinking(state, arguments).await,
        // Session management
        "create_session" => handle_create_session(state, arguments).await,
        "get_session" => handle_get_session(state, arguments).await,
        "list_sessions" => handle_list_sessions(state, arguments).await,
        "delete_session" => handle_delete_session(state, arguments).await,
        "update_session_status" => handle_update_session_status(state, arguments).await,
        "resume_session" => handle_resume_session(state, arguments).await,
        // Reporting
        "get_tool_call_history" => handle_tool_call_history(state, arguments).await,
        "get_session_statistics" => handle_session_statistics(state, arguments).await,
        "visualize_session" => handle_visualize_session(state, arguments).await,
        // Tool cache
        "tool_cache_lookup" => handle_cache_lookup(state, arguments).await,
        "tool_cache_stats" => handle_cache_stats(state).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct SessionIdParams {
    session_id: String,
}

async fn handle_sequential_thinking(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    execute_handler("sequential_thinking", arguments, |params: ThoughtStepRequest| {
        state.engine.submit_thought_step(params)
    })
    .await
}

async fn handle_create_session(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct CreateParams {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        metadata: Option<Value>,
        #[serde(default)]
        session_id: Option<String>,
    }

    let params: CreateParams = parse_arguments("create_session", arguments)?;
    let metadata = params.metadata.map(parse_metadata).transpose()?;

    let session = state
        .engine
        .create_session(
            &params.name,
            params.description,
            metadata,
            params.session_id.as_deref(),
        )
        .await?;

    Ok(json!({
        "session_id": session.session_id,
        "name": session.name,
        "description": session.description,
        "status": session.status,
        "metadata": session.metadata,
        "created_at": session.created_at,
    }))
}

/// Accept metadata as an object or as a JSON string encoding one.
fn parse_metadata(value: Value) -> McpResult<Map<String, Value>> {
    let invalid = |message: String| McpError::InvalidParameters {
        tool_name: "create_session".to_string(),
        message,
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::String(raw) if raw.trim().is_empty() => Ok(Map::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(invalid("metadata must encode a JSON object".to_string())),
            Err(e) => Err(invalid(format!("metadata is not valid JSON: {}", e))),
        },
        _ => Err(invalid(
            "metadata must be an object or a JSON string".to_string(),
        )),
    }
}

async fn handle_get_session(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionIdParams = parse_arguments("get_session", arguments)?;
    let session = state.engine.get_session(&params.session_id).await?;
    serde_json::to_value(session).map_err(McpError::Json)
}

async fn handle_list_sessions(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(Default, Deserialize)]
    struct ListParams {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    }

    let params: ListParams = match arguments {
        Some(Value::Null) | None => ListParams::default(),
        args => parse_arguments("list_sessions", args)?,
    };
    let status = params
        .status
        .as_deref()
        .map(|s| parse_status("list_sessions", s))
        .transpose()?;
    let limit = params.limit.unwrap_or(DEFAULT_SESSION_LIMIT).max(1);

    let sessions = state.engine.list_sessions(status, limit).await?;
    Ok(json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

async fn handle_delete_session(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionIdParams = parse_arguments("delete_session", arguments)?;
    let deleted = state.engine.delete_session(&params.session_id).await?;

    let message = if deleted {
        format!("Session {} deleted", params.session_id)
    } else {
        format!("Session {} not found", params.session_id)
    };
    Ok(json!({
        "session_id": params.session_id,
        "deleted": deleted,
        "message": message,
    }))
}

async fn handle_update_session_status(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct StatusParams {
        session_id: String,
        status: String,
    }

    let params: StatusParams = parse_arguments("update_session_status", arguments)?;
    let status = parse_status("update_session_status", &params.status)?;
    let session = state
        .engine
        .update_session_status(&params.session_id, status)
        .await?;
    serde_json::to_value(session.summary()).map_err(McpError::Json)
}

async fn handle_resume_session(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionIdParams = parse_arguments("resume_session", arguments)?;
    let info = state.engine.resume_session(&params.session_id).await?;
    serde_json::to_value(info).map_err(McpError::Json)
}

async fn handle_tool_call_history(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct HistoryParams {
        session_id: String,
        #[serde(default)]
        thought_number: Option<u32>,
        #[serde(default)]
        limit: Option<usize>,
    }

    let params: HistoryParams = parse_arguments("get_tool_call_history", arguments)?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).max(1);
    let records = state
        .engine
        .get_tool_call_history(&params.session_id, params.thought_number, limit)
        .await?;

    Ok(json!({
        "session_id": params.session_id,
        "thought_number": params.thought_number,
        "count": records.len(),
        "tool_calls": records,
    }))
}

/// Statistics plus the derived figures callers usually want next to them.
#[derive(Debug, Serialize)]
struct StatisticsReport {
    session_id: String,
    status: SessionStatus,
    statistics: SessionStatistics,
    /// Percentage of successful tool calls, absent when none were made.
    success_rate: Option<f64>,
    thought_types: BTreeMap<String, usize>,
}

async fn handle_session_statistics(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    let params: SessionIdParams = parse_arguments("get_session_statistics", arguments)?;
    let session = state.engine.get_session(&params.session_id).await?;
    let statistics = state.engine.get_session_statistics(&params.session_id).await?;

    let mut thought_types = BTreeMap::new();
    for thought in &session.thoughts {
        *thought_types
            .entry(thought.kind.type_name().to_string())
            .or_insert(0) += 1;
    }

    let report = StatisticsReport {
        session_id: session.session_id,
        status: session.status,
        success_rate: statistics.success_rate(),
        statistics,
        thought_types,
    };
    serde_json::to_value(report).map_err(McpError::Json)
}

async fn handle_visualize_session(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct VisualizeParams {
        session_id: String,
        #[serde(default)]
        format: Option<String>,
    }

    let params: VisualizeParams = parse_arguments("visualize_session", arguments)?;
    let format = match params.format.as_deref() {
        Some(raw) => raw
            .parse::<VisualizationFormat>()
            .map_err(|message| McpError::InvalidParameters {
                tool_name: "visualize_session".to_string(),
                message,
            })?,
        None => VisualizationFormat::default(),
    };

    let session = state.engine.get_session(&params.session_id).await?;
    Ok(json!({
        "session_id": session.session_id,
        "format": format,
        "visualization": visualization::render(&session, format),
    }))
}

async fn handle_cache_lookup(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct LookupParams {
        tool_name: String,
        #[serde(default)]
        arguments: Map<String, Value>,
    }

    let params: LookupParams = parse_arguments("tool_cache_lookup", arguments)?;
    let mut cache = state.cache.lock().await;
    let cached = cache.lookup(&params.tool_name, &params.arguments);

    Ok(json!({
        "tool_name": params.tool_name,
        "hit": cached.is_some(),
        "result": cached,
        "cache_entries": cache.cache_len(),
    }))
}

async fn handle_cache_stats(state: &SharedState) -> McpResult<Value> {
    let report = state.cache.lock().await.report();
    serde_json::to_value(report).map_err(McpError::Json)
}

// ============================================================================
// Helper functions
// ============================================================================

fn parse_status(tool_name: &str, raw: &str) -> McpResult<SessionStatus> {
    raw.parse::<SessionStatus>()
        .map_err(|message| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message,
        })
}

/// Helper to parse arguments with consistent error handling
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

/// Parse typed parameters, run the operation, serialize its result.
async fn execute_handler<P, R, E, F, Fut>(
    tool_name: &str,
    arguments: Option<Value>,
    operation: F,
) -> McpResult<Value>
where
    P: serde::de::DeserializeOwned,
    R: Serialize,
    E: std::fmt::Display,
    F: FnOnce(P) -> Fut,
    Fut: std::future::Future<Output = Result<R, E>>,
{
    let params: P = parse_arguments(tool_name, arguments)?;

    let result = operation(params)
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    serde_json::to_value(result).map_err(McpError::Json)
}
