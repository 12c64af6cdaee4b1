//! Tool invocation requests, results, and the records pairing them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Maximum number of characters in a tool name.
pub const MAX_TOOL_NAME_CHARS: usize = 100;

/// A single tool invocation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallData {
    /// Identifier used to correlate the call with its result.
    pub call_id: String,
    /// Name of the invoked tool.
    pub tool_name: String,
    /// Invocation arguments.
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// When the call was issued.
    pub timestamp: DateTime<Utc>,
}

impl ToolCallData {
    /// Create a call with a freshly generated call id
    pub fn new(tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            call_id: Uuid::new_v4().to_string(),
            tool_name: tool_name.into(),
            arguments,
            timestamp: Utc::now(),
        }
    }

    /// Use a caller-supplied call id
    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }
}

/// Structured error reported by a failed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallError {
    /// Error category.
    pub error_type: String,
    /// Error description.
    pub error_message: String,
    /// Optional machine-readable code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Optional stack trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultData {
    /// The call this result answers.
    pub call_id: String,
    /// Whether the tool succeeded.
    pub success: bool,
    /// Tool output.
    #[serde(default)]
    pub result: Value,
    /// Failure details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolCallError>,
    /// Execution time in milliseconds (non-negative).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    /// Whether the result was served from the cache.
    #[serde(default)]
    pub from_cache: bool,
    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
}

impl ToolResultData {
    /// Create a successful, empty result for a call
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            success: true,
            result: Value::Null,
            error: None,
            execution_time_ms: None,
            from_cache: false,
            timestamp: Utc::now(),
        }
    }

    /// Set the tool output
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    /// Set the success flag
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    /// Attach an error and mark the result unsuccessful
    pub fn with_error(mut self, error: ToolCallError) -> Self {
        self.success = false;
        self.error = Some(error);
        self
    }

    /// Set the execution time; negative or non-finite values are dropped.
    pub fn with_execution_time(mut self, ms: f64) -> Self {
        self.execution_time_ms = (ms.is_finite() && ms >= 0.0).then_some(ms);
        self
    }

    /// Set the cache flag
    pub fn with_from_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = from_cache;
        self
    }
}

/// Lifecycle status of a tool call record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// Issued, no result yet.
    #[default]
    Pending,
    /// Currently executing.
    Running,
    /// Finished with a result.
    Completed,
    /// Finished with an error.
    Failed,
    /// Did not finish in time.
    Timeout,
    /// Abandoned by the caller.
    Cancelled,
}

impl ToolCallStatus {
    /// Whether the status is final.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ToolCallStatus::Completed
                | ToolCallStatus::Failed
                | ToolCallStatus::Timeout
                | ToolCallStatus::Cancelled
        )
    }

    /// Symbol used in rendered output.
    pub fn symbol(&self) -> &'static str {
        match self {
            ToolCallStatus::Pending => "⏳",
            ToolCallStatus::Running => "🔄",
            ToolCallStatus::Completed => "✅",
            ToolCallStatus::Failed => "❌",
            ToolCallStatus::Timeout => "⏱️",
            ToolCallStatus::Cancelled => "🚫",
        }
    }
}

impl std::fmt::Display for ToolCallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolCallStatus::Pending => write!(f, "pending"),
            ToolCallStatus::Running => write!(f, "running"),
            ToolCallStatus::Completed => write!(f, "completed"),
            ToolCallStatus::Failed => write!(f, "failed"),
            ToolCallStatus::Timeout => write!(f, "timeout"),
            ToolCallStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for ToolCallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ToolCallStatus::Pending),
            "running" => Ok(ToolCallStatus::Running),
            "completed" => Ok(ToolCallStatus::Completed),
            "failed" => Ok(ToolCallStatus::Failed),
            "timeout" => Ok(ToolCallStatus::Timeout),
            "cancelled" => Ok(ToolCallStatus::Cancelled),
            _ => Err(format!("Unknown tool call status: {}", s)),
        }
    }
}

/// Durable pairing of a tool call with its (possibly absent) result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Unique record identifier.
    pub record_id: String,
    /// The thought that issued the call.
    pub thought_number: u32,
    /// The call request.
    pub call_data: ToolCallData,
    /// The result, once known.
    pub result_data: Option<ToolResultData>,
    /// Record status.
    pub status: ToolCallStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ToolCallRecord {
    /// Create a pending record for a call
    pub fn new(thought_number: u32, call_data: ToolCallData) -> Self {
        let now = Utc::now();
        Self {
            record_id: Uuid::new_v4().to_string(),
            thought_number,
            call_data,
            result_data: None,
            status: ToolCallStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a result and mark the record completed
    pub fn with_result(mut self, result: ToolResultData) -> Self {
        self.set_result(result, ToolCallStatus::Completed);
        self
    }

    /// Attach a result with an explicit status
    pub fn set_result(&mut self, result: ToolResultData, status: ToolCallStatus) {
        self.result_data = Some(result);
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Whether the record reached a terminal status.
    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    /// Completed with a result that reports success.
    pub fn is_successful(&self) -> bool {
        self.status == ToolCallStatus::Completed
            && self.result_data.as_ref().is_some_and(|r| r.success)
    }

    /// Whether the result came from the cache.
    pub fn is_cached(&self) -> bool {
        self.result_data.as_ref().is_some_and(|r| r.from_cache)
    }
}
