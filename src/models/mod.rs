//! Domain entities: thoughts, tool calls, and sessions.

mod session;
mod thought;
mod tool_call;

pub use session::{
    validate_session_id, PhaseDistribution, SessionStatistics, SessionStatus, SessionSummary,
    ThinkingSession, ThoughtsAdjustment, TOTAL_THOUGHTS_HISTORY_KEY,
};
pub use thought::{
    truncate_chars, ExecutionPhase, Thought, ThoughtKind, MAX_BRANCH_ID_CHARS, MAX_CONTENT_CHARS,
};
pub use tool_call::{
    ToolCallData, ToolCallError, ToolCallRecord, ToolCallStatus, ToolResultData,
    MAX_TOOL_NAME_CHARS,
};
