use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Thinking error: {0}")]
    Thinking(#[from] ThinkingError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Errors raised while validating or recording a thought step.
///
/// Quota *warnings* are not represented here: they are returned as
/// [`crate::thinking::ThoughtStepResult::Rejected`] values.
#[derive(Debug, Error)]
pub enum ThinkingError {
    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Out of range: {field} - {message}")]
    Range { field: String, message: String },

    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ThinkingError {
    /// Shorthand for a field validation failure.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ThinkingError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an out-of-range numeric input.
    pub fn range(field: impl Into<String>, message: impl Into<String>) -> Self {
        ThinkingError::Range {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

impl From<ThinkingError> for McpError {
    fn from(err: ThinkingError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for thinking engine operations
pub type ThinkingResult<T> = Result<T, ThinkingError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "MAX_THOUGHTS must be at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration error: MAX_THOUGHTS must be at least 1"
        );

        let err: AppError = McpError::UnknownTool {
            tool_name: "summon_oracle".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "MCP protocol error: Unknown tool: summon_oracle"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Connection {
            message: "failed to connect".to_string(),
        };
        assert_eq!(err.to_string(), "Database connection failed: failed to connect");

        let err = StorageError::Serialization {
            message: "bad json".to_string(),
        };
        assert_eq!(err.to_string(), "Serialization failed: bad json");

        let err = StorageError::Migration {
            message: "version mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "Migration failed: version mismatch");
    }

    #[test]
    fn test_thinking_error_display() {
        let err = ThinkingError::validation("content", "cannot be empty");
        assert_eq!(err.to_string(), "Validation failed: content - cannot be empty");

        let err = ThinkingError::range("thought_number", "must be >= 1, got 0");
        assert_eq!(
            err.to_string(),
            "Out of range: thought_number - must be >= 1, got 0"
        );

        let err = ThinkingError::QuotaExceeded {
            message: "total_thoughts (60) exceeds the limit (50)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Quota exceeded: total_thoughts (60) exceeds the limit (50)"
        );

        let err = ThinkingError::SessionNotFound {
            session_id: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "Session not found: missing");
    }

    #[test]
    fn test_mcp_error_display() {
        let err = McpError::InvalidRequest {
            message: "bad format".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid request: bad format");

        let err = McpError::UnknownTool {
            tool_name: "nonexistent".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown tool: nonexistent");

        let err = McpError::InvalidParameters {
            tool_name: "sequential_thinking".to_string(),
            message: "missing thought".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameters for sequential_thinking: missing thought"
        );
    }

    #[test]
    fn test_thinking_error_conversion_to_app_error() {
        let err: AppError = ThinkingError::validation("content", "empty").into();
        assert!(matches!(err, AppError::Thinking(_)));
        assert!(err.to_string().contains("Validation failed"));
    }

    #[test]
    fn test_storage_error_conversion_to_thinking_error() {
        let err: ThinkingError = StorageError::Query {
            message: "locked".to_string(),
        }
        .into();
        assert!(matches!(err, ThinkingError::Storage(_)));
    }

    #[test]
    fn test_app_error_conversion_to_mcp_error() {
        let app_err = AppError::Config {
            message: "test error".to_string(),
        };
        let mcp_err: McpError = app_err.into();
        assert!(matches!(mcp_err, McpError::ExecutionFailed { .. }));
        assert!(mcp_err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_thinking_error_conversion_to_mcp_error() {
        let mcp_err: McpError = ThinkingError::range("total_thoughts", "too small").into();
        assert!(matches!(mcp_err, McpError::ExecutionFailed { .. }));
        assert!(mcp_err.to_string().contains("Out of range"));
    }
}
