use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ThinkingError, ThinkingResult};
use crate::models::{ExecutionPhase, ThoughtKind};

/// Session used when a submission names none.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Input parameters for one `sequential_thinking` step.
///
/// Field names follow the tool schema (`thoughtNumber`, `toolCalls`, ...);
/// snake_case spellings are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtStepRequest {
    /// The reasoning text of this step
    pub thought: String,
    /// Whether another step will follow
    #[serde(alias = "next_thought_needed")]
    pub next_thought_needed: bool,
    /// Position of this step, starting at 1
    #[serde(alias = "thought_number")]
    pub thought_number: i64,
    /// Planned number of steps
    #[serde(alias = "total_thoughts")]
    pub total_thoughts: i64,
    /// Target session, created on first use
    #[serde(rename = "session_id", alias = "sessionId", default = "default_session_id")]
    pub session_id: String,
    #[serde(default, alias = "is_revision")]
    pub is_revision: bool,
    #[serde(default, alias = "revises_thought")]
    pub revises_thought: Option<u32>,
    #[serde(default, alias = "branch_from_thought")]
    pub branch_from_thought: Option<u32>,
    #[serde(default, alias = "branch_id")]
    pub branch_id: Option<String>,
    /// Ask for the planned total to be extended
    #[serde(default, alias = "needs_more_thoughts")]
    pub needs_more_thoughts: bool,
    #[serde(default, alias = "comparison_items")]
    pub comparison_items: Option<Vec<String>>,
    #[serde(default, alias = "comparison_dimensions")]
    pub comparison_dimensions: Option<Vec<String>>,
    #[serde(default, alias = "comparison_result")]
    pub comparison_result: Option<String>,
    #[serde(default, alias = "reverse_from")]
    pub reverse_from: Option<u32>,
    #[serde(default, alias = "reverse_target")]
    pub reverse_target: Option<String>,
    #[serde(default, alias = "reverse_steps")]
    pub reverse_steps: Option<Vec<String>>,
    #[serde(default, alias = "hypothetical_condition")]
    pub hypothetical_condition: Option<String>,
    #[serde(default, alias = "hypothetical_impact")]
    pub hypothetical_impact: Option<String>,
    #[serde(default, alias = "hypothetical_probability")]
    pub hypothetical_probability: Option<String>,
    /// Explicit execution phase; inferred from tool data when absent
    #[serde(default)]
    pub phase: Option<ExecutionPhase>,
    /// Tool calls issued by this step
    #[serde(default, alias = "tool_calls")]
    pub tool_calls: Option<Vec<Value>>,
    /// Results for this step's tool calls
    #[serde(default, alias = "tool_results")]
    pub tool_results: Option<Vec<Value>>,
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

impl ThoughtStepRequest {
    /// Create a regular step request against the default session
    pub fn new(
        thought: impl Into<String>,
        thought_number: i64,
        total_thoughts: i64,
        next_thought_needed: bool,
    ) -> Self {
        Self {
            thought: thought.into(),
            next_thought_needed,
            thought_number,
            total_thoughts,
            session_id: default_session_id(),
            is_revision: false,
            revises_thought: None,
            branch_from_thought: None,
            branch_id: None,
            needs_more_thoughts: false,
            comparison_items: None,
            comparison_dimensions: None,
            comparison_result: None,
            reverse_from: None,
            reverse_target: None,
            reverse_steps: None,
            hypothetical_condition: None,
            hypothetical_impact: None,
            hypothetical_probability: None,
            phase: None,
            tool_calls: None,
            tool_results: None,
        }
    }

    /// Set the session ID
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Mark this step as a revision of an earlier one
    pub fn with_revision(mut self, revises_thought: u32) -> Self {
        self.is_revision = true;
        self.revises_thought = Some(revises_thought);
        self
    }

    /// Branch from an earlier step
    pub fn with_branch(mut self, from: u32, branch_id: impl Into<String>) -> Self {
        self.branch_from_thought = Some(from);
        self.branch_id = Some(branch_id.into());
        self
    }

    /// Ask for more planned steps
    pub fn with_more_thoughts(mut self) -> Self {
        self.needs_more_thoughts = true;
        self
    }

    /// Force the execution phase
    pub fn with_phase(mut self, phase: ExecutionPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attach tool calls
    pub fn with_tool_calls(mut self, calls: Vec<Value>) -> Self {
        self.tool_calls = Some(calls);
        self
    }

    /// Attach tool results
    pub fn with_tool_results(mut self, results: Vec<Value>) -> Self {
        self.tool_results = Some(results);
        self
    }

    /// Resolve the thought kind from the supplied fields.
    ///
    /// Priority: revision, branch, comparison (two or more items), reverse,
    /// hypothetical, regular.
    pub fn thought_kind(&self) -> ThinkingResult<ThoughtKind> {
        if self.is_revision {
            let revises_thought = self.revises_thought.ok_or_else(|| {
                ThinkingError::validation("revisesThought", "is required when isRevision is true")
            })?;
            return Ok(ThoughtKind::Revision { revises_thought });
        }
        if self.revises_thought.is_some() {
            return Err(ThinkingError::validation(
                "revisesThought",
                "is only allowed when isRevision is true",
            ));
        }

        if let Some(branch_from_thought) = self.branch_from_thought {
            let branch_id = self.branch_id.clone().ok_or_else(|| {
                ThinkingError::validation("branchId", "is required when branchFromThought is set")
            })?;
            return Ok(ThoughtKind::Branch {
                branch_from_thought,
                branch_id,
            });
        }
        if self.branch_id.is_some() {
            return Err(ThinkingError::validation(
                "branchId",
                "is only allowed together with branchFromThought",
            ));
        }

        if let Some(items) = self.comparison_items.as_ref().filter(|items| items.len() >= 2) {
            return Ok(ThoughtKind::Comparison {
                comparison_items: items.clone(),
                comparison_dimensions: self.comparison_dimensions.clone().unwrap_or_default(),
                comparison_result: self.comparison_result.clone(),
            });
        }

        if let Some(reverse_target) = &self.reverse_target {
            return Ok(ThoughtKind::Reverse {
                reverse_from: self.reverse_from,
                reverse_target: reverse_target.clone(),
                reverse_steps: self.reverse_steps.clone().unwrap_or_default(),
            });
        }

        if let Some(hypothetical_condition) = &self.hypothetical_condition {
            return Ok(ThoughtKind::Hypothetical {
                hypothetical_condition: hypothetical_condition.clone(),
                hypothetical_impact: self.hypothetical_impact.clone(),
                hypothetical_probability: self.hypothetical_probability.clone(),
            });
        }

        Ok(ThoughtKind::Regular)
    }

    /// Attached tool calls, empty when absent.
    pub fn calls(&self) -> &[Value] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    /// Attached tool results, empty when absent.
    pub fn results(&self) -> &[Value] {
        self.tool_results.as_deref().unwrap_or_default()
    }
}
