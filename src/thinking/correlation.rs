//! Matching a step's tool calls to their results.
//!
//! Payloads arrive as loose JSON. Calls accept `name` or `tool_name`,
//! `arguments` or `args`, and an optional `call_id`. Results carry
//! `call_id`, `success`, `result`, `error`, `execution_time_ms` and
//! `from_cache`. Malformed results are tolerated; they just never match.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ThinkingError, ThinkingResult};
use crate::models::{
    ToolCallData, ToolCallError, ToolCallRecord, ToolResultData, MAX_TOOL_NAME_CHARS,
};

const UNKNOWN_TOOL: &str = "unknown";

/// Build one record per call, in call order.
///
/// A result whose `call_id` equals the call's id always wins. Otherwise
/// the result at the same position is used, if there is one. Matched
/// records are `completed`; the rest stay `pending`.
pub fn correlate(
    thought_number: u32,
    tool_calls: &[Value],
    tool_results: &[Value],
) -> ThinkingResult<Vec<ToolCallRecord>> {
    let by_id: HashMap<&str, &Value> = tool_results
        .iter()
        .filter_map(|r| string_field(r, "call_id").map(|id| (id, r)))
        .collect();

    tool_calls
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let call = parse_call(raw)?;
            let (matched, how) = match by_id.get(call.call_id.as_str()) {
                Some(result) => (Some(*result), "call_id"),
                None => (tool_results.get(index), "position"),
            };

            let record = ToolCallRecord::new(thought_number, call);
            Ok(match matched {
                Some(payload) => {
                    let result = parse_result(payload, &record.call_data.call_id);
                    debug!(
                        thought_number,
                        tool = %record.call_data.tool_name,
                        call_id = %record.call_data.call_id,
                        matched_by = how,
                        "Tool result correlated"
                    );
                    record.with_result(result)
                }
                None => record,
            })
        })
        .collect()
}

/// Parse one tool call payload.
pub fn parse_call(raw: &Value) -> ThinkingResult<ToolCallData> {
    let tool_name = string_field(raw, "name")
        .or_else(|| string_field(raw, "tool_name"))
        .unwrap_or(UNKNOWN_TOOL)
        .trim()
        .to_string();
    if tool_name.is_empty() {
        return Err(ThinkingError::validation("tool_name", "cannot be empty"));
    }
    if tool_name.chars().count() > MAX_TOOL_NAME_CHARS {
        return Err(ThinkingError::validation(
            "tool_name",
            format!("must be at most {} characters", MAX_TOOL_NAME_CHARS),
        ));
    }

    let arguments = raw
        .get("arguments")
        .or_else(|| raw.get("args"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let call = ToolCallData::new(tool_name, arguments);
    Ok(match string_field(raw, "call_id") {
        Some(id) => call.with_call_id(id),
        None => call,
    })
}

/// Parse one tool result payload, falling back to `call_id` when it carries none.
pub fn parse_result(raw: &Value, call_id: &str) -> ToolResultData {
    let mut result = ToolResultData::new(string_field(raw, "call_id").unwrap_or(call_id))
        .with_success(raw.get("success").and_then(Value::as_bool).unwrap_or(true))
        .with_result(raw.get("result").cloned().unwrap_or(Value::Null))
        .with_from_cache(raw.get("from_cache").and_then(Value::as_bool).unwrap_or(false));

    if let Some(ms) = raw.get("execution_time_ms").and_then(Value::as_f64) {
        result = result.with_execution_time(ms);
    }
    result.error = raw.get("error").and_then(parse_error);
    result
}

fn parse_error(raw: &Value) -> Option<ToolCallError> {
    match raw {
        Value::Null => None,
        Value::String(message) => Some(ToolCallError {
            error_type: "Error".to_string(),
            error_message: message.clone(),
            error_code: None,
            stack_trace: None,
        }),
        Value::Object(fields) => Some(ToolCallError {
            error_type: text(fields, &["error_type", "type"]).unwrap_or_else(|| "Error".to_string()),
            error_message: text(fields, &["error_message", "message"]).unwrap_or_default(),
            error_code: text(fields, &["error_code", "code"]),
            stack_trace: text(fields, &["stack_trace", "stack"]),
        }),
        other => Some(ToolCallError {
            error_type: "Error".to_string(),
            error_message: other.to_string(),
            error_code: None,
            stack_trace: None,
        }),
    }
}

fn text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    })
}

fn string_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
