//! The thinking session aggregate and its derived statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::thought::{ExecutionPhase, Thought};
use super::tool_call::{ToolCallRecord, ToolCallStatus};
use crate::error::{ThinkingError, ThinkingResult};

/// Metadata key holding the history of planned-step adjustments.
pub const TOTAL_THOUGHTS_HISTORY_KEY: &str = "total_thoughts_history";

const MAX_SESSION_ID_CHARS: usize = 100;
const MAX_NAME_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 2_000;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting new thoughts.
    #[default]
    Active,
    /// Finished.
    Completed,
    /// Put away.
    Archived,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "archived" => Ok(SessionStatus::Archived),
            _ => Err(format!(
                "Unknown session status: {}. Valid values: active, completed, archived",
                s
            )),
        }
    }
}

/// Number of thoughts per execution phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDistribution {
    pub thinking: usize,
    pub tool_call: usize,
    pub analysis: usize,
}

impl PhaseDistribution {
    /// Count for a single phase.
    pub fn get(&self, phase: ExecutionPhase) -> usize {
        match phase {
            ExecutionPhase::Thinking => self.thinking,
            ExecutionPhase::ToolCall => self.tool_call,
            ExecutionPhase::Analysis => self.analysis,
        }
    }

    fn increment(&mut self, phase: ExecutionPhase) {
        match phase {
            ExecutionPhase::Thinking => self.thinking += 1,
            ExecutionPhase::ToolCall => self.tool_call += 1,
            ExecutionPhase::Analysis => self.analysis += 1,
        }
    }

    /// Sum over all phases.
    pub fn total(&self) -> usize {
        self.thinking + self.tool_call + self.analysis
    }
}

/// Statistics derived from a session's thoughts and tool-call history.
///
/// Always produced by [`SessionStatistics::compute`]; never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub total_thoughts: usize,
    pub avg_thought_length: f64,
    pub total_tool_calls: usize,
    pub successful_tool_calls: usize,
    /// Records whose status is `failed` or `timeout`. A completed record with
    /// an unsuccessful result is neither successful nor failed.
    pub failed_tool_calls: usize,
    pub cached_tool_calls: usize,
    pub total_execution_time_ms: f64,
    pub avg_execution_time_ms: f64,
    pub phase_distribution: PhaseDistribution,
}

impl SessionStatistics {
    /// Recompute statistics from scratch.
    pub fn compute(thoughts: &[Thought], history: &[ToolCallRecord]) -> Self {
        let total_thoughts = thoughts.len();
        let avg_thought_length = if total_thoughts == 0 {
            0.0
        } else {
            let chars: usize = thoughts.iter().map(|t| t.content.chars().count()).sum();
            chars as f64 / total_thoughts as f64
        };

        let mut phase_distribution = PhaseDistribution::default();
        for thought in thoughts {
            phase_distribution.increment(thought.phase);
        }

        let total_tool_calls = history.len();
        let total_execution_time_ms: f64 = history
            .iter()
            .filter_map(|r| r.result_data.as_ref())
            .filter_map(|r| r.execution_time_ms)
            .sum();
        let avg_execution_time_ms = if total_tool_calls == 0 {
            0.0
        } else {
            total_execution_time_ms / total_tool_calls as f64
        };

        Self {
            total_thoughts,
            avg_thought_length,
            total_tool_calls,
            successful_tool_calls: history.iter().filter(|r| r.is_successful()).count(),
            failed_tool_calls: history
                .iter()
                .filter(|r| matches!(r.status, ToolCallStatus::Failed | ToolCallStatus::Timeout))
                .count(),
            cached_tool_calls: history.iter().filter(|r| r.is_cached()).count(),
            total_execution_time_ms,
            avg_execution_time_ms,
            phase_distribution,
        }
    }

    /// Percentage of successful tool calls, if any were made.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total_tool_calls > 0)
            .then(|| self.successful_tool_calls as f64 / self.total_tool_calls as f64 * 100.0)
    }
}

/// One dynamic extension of a session's planned step count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtsAdjustment {
    pub original_total: u32,
    pub new_total: u32,
    pub thought_number: u32,
    pub timestamp: DateTime<Utc>,
}

/// Listing view of a session without its thoughts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub name: String,
    pub description: String,
    pub status: SessionStatus,
    pub thought_count: usize,
    pub tool_call_count: usize,
    pub latest_thought_number: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reasoning episode: the ordered thoughts and tool calls of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingSession {
    pub session_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: SessionStatus,
    /// Thoughts in append order.
    #[serde(default)]
    pub thoughts: Vec<Thought>,
    /// Tool call records across all thoughts, in append order.
    #[serde(default)]
    pub tool_call_history: Vec<ToolCallRecord>,
    #[serde(default)]
    pub statistics: SessionStatistics,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ThinkingSession {
    /// Create a session with a generated id.
    pub fn new(name: impl AsRef<str>) -> ThinkingResult<Self> {
        let name = validate_name(name.as_ref())?;
        let now = Utc::now();
        Ok(Self {
            session_id: Uuid::new_v4().to_string(),
            name,
            description: String::new(),
            status: SessionStatus::Active,
            thoughts: Vec::new(),
            tool_call_history: Vec::new(),
            statistics: SessionStatistics::default(),
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Use a caller-supplied session id
    pub fn with_id(mut self, session_id: &str) -> ThinkingResult<Self> {
        self.session_id = validate_session_id(session_id)?;
        Ok(self)
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> ThinkingResult<Self> {
        let description = description.into();
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ThinkingError::validation(
                "description",
                format!("must be at most {} characters", MAX_DESCRIPTION_CHARS),
            ));
        }
        self.description = description;
        Ok(self)
    }

    /// Set the metadata bag
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Append a thought. Thought numbers are not required to be unique.
    pub fn add_thought(&mut self, thought: Thought) {
        self.thoughts.push(thought);
        self.touch();
    }

    /// Remove the first thought with the given number.
    pub fn remove_thought(&mut self, thought_number: u32) -> bool {
        match self
            .thoughts
            .iter()
            .position(|t| t.thought_number == thought_number)
        {
            Some(index) => {
                self.thoughts.remove(index);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// First thought with the given number.
    pub fn get_thought(&self, thought_number: u32) -> Option<&Thought> {
        self.thoughts
            .iter()
            .find(|t| t.thought_number == thought_number)
    }

    /// The most recently appended thought.
    pub fn latest_thought(&self) -> Option<&Thought> {
        self.thoughts.last()
    }

    pub fn thought_count(&self) -> usize {
        self.thoughts.len()
    }

    /// Append a tool call record.
    pub fn add_tool_call_record(&mut self, record: ToolCallRecord) {
        self.tool_call_history.push(record);
        self.touch();
    }

    /// Records issued by a given thought, in call order.
    pub fn tool_calls_for_thought(&self, thought_number: u32) -> Vec<&ToolCallRecord> {
        self.tool_call_history
            .iter()
            .filter(|r| r.thought_number == thought_number)
            .collect()
    }

    /// Look up a record by id.
    pub fn get_tool_call_record(&self, record_id: &str) -> Option<&ToolCallRecord> {
        self.tool_call_history
            .iter()
            .find(|r| r.record_id == record_id)
    }

    /// Recompute statistics from the current thoughts and history.
    pub fn update_statistics(&mut self) {
        self.statistics = SessionStatistics::compute(&self.thoughts, &self.tool_call_history);
        self.touch();
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub fn is_archived(&self) -> bool {
        self.status == SessionStatus::Archived
    }

    pub fn mark_completed(&mut self) {
        self.set_status(SessionStatus::Completed);
    }

    pub fn mark_archived(&mut self) {
        self.set_status(SessionStatus::Archived);
    }

    pub fn mark_active(&mut self) {
        self.set_status(SessionStatus::Active);
    }

    /// Apply a caller-driven status transition.
    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.touch();
    }

    /// Planned-step adjustments recorded in metadata, oldest first.
    ///
    /// Entries that do not parse are skipped.
    pub fn total_thoughts_history(&self) -> Vec<ThoughtsAdjustment> {
        self.metadata
            .get(TOTAL_THOUGHTS_HISTORY_KEY)
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| serde_json::from_value(e.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append a planned-step adjustment to the metadata history.
    pub fn record_adjustment(&mut self, adjustment: &ThoughtsAdjustment) {
        let entry = serde_json::to_value(adjustment).unwrap_or(Value::Null);
        let history = self
            .metadata
            .entry(TOTAL_THOUGHTS_HISTORY_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        if !history.is_array() {
            *history = Value::Array(Vec::new());
        }
        if let Value::Array(entries) = history {
            entries.push(entry);
        }
        self.touch();
    }

    /// Listing view of the session.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
            thought_count: self.thought_count(),
            tool_call_count: self.tool_call_history.len(),
            latest_thought_number: self.latest_thought().map(|t| t.thought_number),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Validate and normalize a session id.
///
/// Any non-empty id of up to 100 characters is accepted; ids shaped like a
/// UUID must parse as one.
pub fn validate_session_id(session_id: &str) -> ThinkingResult<String> {
    let id = session_id.trim();
    if id.is_empty() {
        return Err(ThinkingError::validation("session_id", "cannot be empty"));
    }
    if id.chars().count() > MAX_SESSION_ID_CHARS {
        return Err(ThinkingError::validation(
            "session_id",
            format!("must be at most {} characters", MAX_SESSION_ID_CHARS),
        ));
    }
    if id.len() == 36 && id.contains('-') && Uuid::parse_str(id).is_err() {
        return Err(ThinkingError::validation(
            "session_id",
            format!("invalid UUID format: {}", id),
        ));
    }
    Ok(id.to_string())
}

fn validate_name(name: &str) -> ThinkingResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ThinkingError::validation("name", "cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ThinkingError::validation(
            "name",
            format!("must be at most {} characters", MAX_NAME_CHARS),
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
