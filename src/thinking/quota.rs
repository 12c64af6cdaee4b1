//! Step-count ceiling, dynamic extension, and tool-call quotas.

use serde::{Deserialize, Serialize};

use crate::config::ThinkingConfig;
use crate::error::{ThinkingError, ThinkingResult};

/// Which quota turned a submission away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaWarningKind {
    /// More thoughts were requested with the planned total already at the ceiling.
    ThoughtCeiling,
    /// Too many tool calls on a single step.
    ToolCallsPerThought,
    /// The session-wide tool call quota would be exceeded.
    SessionToolCalls,
}

/// Non-fatal quota rejection. The submission is dropped without writing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaWarning {
    pub kind: QuotaWarningKind,
    pub message: String,
    /// The configured limit that was hit.
    pub limit: usize,
    /// The amount the submission asked for.
    pub requested: usize,
}

impl std::fmt::Display for QuotaWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Reject a planned total above the configured ceiling.
///
/// Applies whether or not the caller asks for more thoughts.
pub fn check_total_thoughts(total_thoughts: i64, config: &ThinkingConfig) -> ThinkingResult<()> {
    if total_thoughts > i64::from(config.max_thoughts) {
        return Err(ThinkingError::QuotaExceeded {
            message: format!(
                "total_thoughts ({}) exceeds the limit ({})",
                total_thoughts, config.max_thoughts
            ),
        });
    }
    Ok(())
}

/// Compute the extended planned total for a "needs more thoughts" request.
///
/// Returns the new total, capped at the ceiling, or a warning when the
/// current total already sits at the ceiling.
pub fn extend_total_thoughts(
    total_thoughts: u32,
    config: &ThinkingConfig,
) -> Result<u32, QuotaWarning> {
    if total_thoughts >= config.max_thoughts {
        return Err(QuotaWarning {
            kind: QuotaWarningKind::ThoughtCeiling,
            message: format!(
                "Thought ceiling reached: the planned total is already at the limit of {} and cannot be increased",
                config.max_thoughts
            ),
            limit: config.max_thoughts as usize,
            requested: total_thoughts.saturating_add(config.thoughts_increment) as usize,
        });
    }
    Ok(total_thoughts
        .saturating_add(config.thoughts_increment)
        .min(config.max_thoughts))
}

/// Per-step tool call quota.
pub fn check_tool_calls_per_thought(
    requested: usize,
    config: &ThinkingConfig,
) -> Result<(), QuotaWarning> {
    if requested > config.max_tool_calls_per_thought {
        return Err(QuotaWarning {
            kind: QuotaWarningKind::ToolCallsPerThought,
            message: format!(
                "Too many tool calls for one thought: requested {} > per-thought limit {}",
                requested, config.max_tool_calls_per_thought
            ),
            limit: config.max_tool_calls_per_thought,
            requested,
        });
    }
    Ok(())
}

/// Session-wide tool call quota, checked against the calls already recorded.
pub fn check_session_tool_calls(
    current: usize,
    requested: usize,
    config: &ThinkingConfig,
) -> Result<(), QuotaWarning> {
    if current + requested > config.max_tool_calls {
        return Err(QuotaWarning {
            kind: QuotaWarningKind::SessionToolCalls,
            message: format!(
                "Session tool call quota would be exceeded: current {} + new {} > limit {}",
                current, requested, config.max_tool_calls
            ),
            limit: config.max_tool_calls,
            requested: current + requested,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ThinkingConfig {
        ThinkingConfig {
            max_thoughts: 50,
            thoughts_increment: 10,
            max_tool_calls: 5,
            max_tool_calls_per_thought: 3,
        }
    }

    #[test]
    fn test_total_thoughts_ceiling() {
        assert!(check_total_thoughts(50, &config()).is_ok());
        let err = check_total_thoughts(51, &config()).unwrap_err();
        assert!(matches!(err, ThinkingError::QuotaExceeded { .. }));
        let err = check_total_thoughts(5_000_000_000, &config()).unwrap_err();
        assert!(matches!(err, ThinkingError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_extension_is_capped() {
        assert_eq!(extend_total_thoughts(5, &config()), Ok(15));
        assert_eq!(extend_total_thoughts(45, &config()), Ok(50));
        assert_eq!(extend_total_thoughts(49, &config()), Ok(50));
    }

    #[test]
    fn test_extension_at_ceiling_warns() {
        let warning = extend_total_thoughts(50, &config()).unwrap_err();
        assert_eq!(warning.kind, QuotaWarningKind::ThoughtCeiling);
        assert!(warning.message.contains("ceiling"));
        assert_eq!(warning.limit, 50);
    }

    #[test]
    fn test_per_thought_boundary() {
        assert!(check_tool_calls_per_thought(3, &config()).is_ok());
        let warning = check_tool_calls_per_thought(4, &config()).unwrap_err();
        assert_eq!(warning.kind, QuotaWarningKind::ToolCallsPerThought);
        assert_eq!(warning.requested, 4);
    }

    #[test]
    fn test_session_quota_counts_existing_calls() {
        assert!(check_session_tool_calls(2, 3, &config()).is_ok());
        let warning = check_session_tool_calls(3, 3, &config()).unwrap_err();
        assert_eq!(warning.kind, QuotaWarningKind::SessionToolCalls);
        assert_eq!(warning.requested, 6);
        assert!(warning.to_string().contains("limit 5"));
    }
}
