//! Thought steps and their per-kind invariants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ThinkingError, ThinkingResult};

/// Maximum number of characters in a thought's content.
pub const MAX_CONTENT_CHARS: usize = 10_000;
/// Maximum number of characters in a branch identifier.
pub const MAX_BRANCH_ID_CHARS: usize = 50;
const MAX_ITEM_CHARS: usize = 500;
const MAX_DIMENSIONS: usize = 10;
const MAX_DIMENSION_CHARS: usize = 50;
const MAX_CONCLUSION_CHARS: usize = 2_000;
const MAX_REVERSE_STEPS: usize = 20;
const MAX_PROBABILITY_CHARS: usize = 50;

/// Execution phase of a thought in interleaved thinking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    /// Pure reasoning with no tool involvement.
    #[default]
    Thinking,
    /// The step issues one or more tool calls.
    ToolCall,
    /// The step analyzes tool results.
    Analysis,
}

impl ExecutionPhase {
    /// All phases in display order.
    pub const ALL: [ExecutionPhase; 3] = [
        ExecutionPhase::Thinking,
        ExecutionPhase::ToolCall,
        ExecutionPhase::Analysis,
    ];

    /// Symbol used in rendered output.
    pub fn symbol(&self) -> &'static str {
        match self {
            ExecutionPhase::Thinking => "🧠",
            ExecutionPhase::ToolCall => "🔧",
            ExecutionPhase::Analysis => "📊",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionPhase::Thinking => "Thinking",
            ExecutionPhase::ToolCall => "Tool call",
            ExecutionPhase::Analysis => "Analysis",
        }
    }
}

impl std::fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionPhase::Thinking => write!(f, "thinking"),
            ExecutionPhase::ToolCall => write!(f, "tool_call"),
            ExecutionPhase::Analysis => write!(f, "analysis"),
        }
    }
}

impl std::str::FromStr for ExecutionPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "thinking" => Ok(ExecutionPhase::Thinking),
            "tool_call" => Ok(ExecutionPhase::ToolCall),
            "analysis" => Ok(ExecutionPhase::Analysis),
            _ => Err(format!("Unknown execution phase: {}", s)),
        }
    }
}

/// The thinking mode of a step, carrying only the fields that mode uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThoughtKind {
    /// A plain sequential step.
    Regular,
    /// Revises an earlier step.
    Revision {
        /// The step being revised.
        revises_thought: u32,
    },
    /// Starts an alternative line of reasoning from an earlier step.
    Branch {
        /// The step the branch departs from.
        branch_from_thought: u32,
        /// Identifier shared by all steps of the branch.
        branch_id: String,
    },
    /// Weighs two or more options against each other.
    Comparison {
        /// The options being compared.
        comparison_items: Vec<String>,
        /// Dimensions the options are compared on.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        comparison_dimensions: Vec<String>,
        /// The conclusion of the comparison.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comparison_result: Option<String>,
    },
    /// Works backwards from a conclusion to its preconditions.
    Reverse {
        /// The step the reverse reasoning starts from.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reverse_from: Option<u32>,
        /// What is being derived backwards.
        reverse_target: String,
        /// The backward steps taken.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        reverse_steps: Vec<String>,
    },
    /// Explores the consequences of an assumption.
    Hypothetical {
        /// The assumed condition.
        hypothetical_condition: String,
        /// Impact of the condition.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hypothetical_impact: Option<String>,
        /// Likelihood assessment.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hypothetical_probability: Option<String>,
    },
}

impl ThoughtKind {
    /// Stable tag of the kind, matching its serialized `type`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ThoughtKind::Regular => "regular",
            ThoughtKind::Revision { .. } => "revision",
            ThoughtKind::Branch { .. } => "branch",
            ThoughtKind::Comparison { .. } => "comparison",
            ThoughtKind::Reverse { .. } => "reverse",
            ThoughtKind::Hypothetical { .. } => "hypothetical",
        }
    }

    /// Human readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            ThoughtKind::Regular => "Regular thought",
            ThoughtKind::Revision { .. } => "Revision",
            ThoughtKind::Branch { .. } => "Branch",
            ThoughtKind::Comparison { .. } => "Comparison",
            ThoughtKind::Reverse { .. } => "Reverse thinking",
            ThoughtKind::Hypothetical { .. } => "Hypothetical",
        }
    }

    /// Symbol used in rendered output.
    pub fn symbol(&self) -> &'static str {
        match self {
            ThoughtKind::Regular => "💭",
            ThoughtKind::Revision { .. } => "🔄",
            ThoughtKind::Branch { .. } => "🌿",
            ThoughtKind::Comparison { .. } => "⚖️",
            ThoughtKind::Reverse { .. } => "🔙",
            ThoughtKind::Hypothetical { .. } => "🤔",
        }
    }
}

/// A single step in a session's reasoning trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    /// Caller-supplied sequence position, starting at 1.
    pub thought_number: u32,
    /// The reasoning text.
    pub content: String,
    /// Thinking mode and its payload.
    #[serde(flatten)]
    pub kind: ThoughtKind,
    /// Execution phase of the step.
    #[serde(default)]
    pub phase: ExecutionPhase,
    /// Record ids of the tool calls issued by this step, in call order.
    #[serde(default)]
    pub tool_calls: Vec<String>,
    /// When the step was created.
    pub timestamp: DateTime<Utc>,
}

impl Thought {
    /// Create a validated thought.
    pub fn new(
        thought_number: u32,
        content: impl Into<String>,
        kind: ThoughtKind,
    ) -> ThinkingResult<Self> {
        let thought = Self {
            thought_number,
            content: content.into(),
            kind,
            phase: ExecutionPhase::default(),
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
        };
        thought.validate()?;
        Ok(thought)
    }

    /// Create a validated regular thought.
    pub fn regular(thought_number: u32, content: impl Into<String>) -> ThinkingResult<Self> {
        Self::new(thought_number, content, ThoughtKind::Regular)
    }

    /// Set the execution phase
    pub fn with_phase(mut self, phase: ExecutionPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Check field bounds and the cross-field rules of the thought's kind.
    pub fn validate(&self) -> ThinkingResult<()> {
        if self.thought_number < 1 {
            return Err(ThinkingError::range(
                "thought_number",
                format!("must be >= 1, got {}", self.thought_number),
            ));
        }
        check_text("content", &self.content, MAX_CONTENT_CHARS)?;

        let number = self.thought_number;
        match &self.kind {
            ThoughtKind::Regular => {}
            ThoughtKind::Revision { revises_thought } => {
                check_earlier("revises_thought", *revises_thought, number)?;
            }
            ThoughtKind::Branch {
                branch_from_thought,
                branch_id,
            } => {
                check_earlier("branch_from_thought", *branch_from_thought, number)?;
                check_text("branch_id", branch_id, MAX_BRANCH_ID_CHARS)?;
            }
            ThoughtKind::Comparison {
                comparison_items,
                comparison_dimensions,
                comparison_result,
            } => {
                if comparison_items.len() < 2 {
                    return Err(ThinkingError::validation(
                        "comparison_items",
                        format!(
                            "a comparison needs at least 2 items, got {}",
                            comparison_items.len()
                        ),
                    ));
                }
                for item in comparison_items {
                    check_text("comparison_items", item, MAX_ITEM_CHARS)?;
                }
                if comparison_dimensions.len() > MAX_DIMENSIONS {
                    return Err(ThinkingError::validation(
                        "comparison_dimensions",
                        format!("at most {} dimensions are allowed", MAX_DIMENSIONS),
                    ));
                }
                for dimension in comparison_dimensions {
                    check_text("comparison_dimensions", dimension, MAX_DIMENSION_CHARS)?;
                }
                if let Some(result) = comparison_result {
                    check_text("comparison_result", result, MAX_CONCLUSION_CHARS)?;
                }
            }
            ThoughtKind::Reverse {
                reverse_from,
                reverse_target,
                reverse_steps,
            } => {
                check_text("reverse_target", reverse_target, MAX_ITEM_CHARS)?;
                if let Some(from) = reverse_from {
                    check_earlier("reverse_from", *from, number)?;
                }
                if reverse_steps.len() > MAX_REVERSE_STEPS {
                    return Err(ThinkingError::validation(
                        "reverse_steps",
                        format!("at most {} steps are allowed", MAX_REVERSE_STEPS),
                    ));
                }
                for step in reverse_steps {
                    check_text("reverse_steps", step, MAX_ITEM_CHARS)?;
                }
            }
            ThoughtKind::Hypothetical {
                hypothetical_condition,
                hypothetical_impact,
                hypothetical_probability,
            } => {
                check_text("hypothetical_condition", hypothetical_condition, MAX_ITEM_CHARS)?;
                if let Some(impact) = hypothetical_impact {
                    check_text("hypothetical_impact", impact, MAX_CONCLUSION_CHARS)?;
                }
                if let Some(probability) = hypothetical_probability {
                    check_text(
                        "hypothetical_probability",
                        probability,
                        MAX_PROBABILITY_CHARS,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Whether this step revises an earlier one.
    pub fn is_revision(&self) -> bool {
        matches!(self.kind, ThoughtKind::Revision { .. })
    }

    /// The step this one revises, if it is a revision.
    pub fn revises_thought(&self) -> Option<u32> {
        match self.kind {
            ThoughtKind::Revision { revises_thought } => Some(revises_thought),
            _ => None,
        }
    }

    /// The step this branch departs from, if it is a branch.
    pub fn branch_from_thought(&self) -> Option<u32> {
        match self.kind {
            ThoughtKind::Branch {
                branch_from_thought,
                ..
            } => Some(branch_from_thought),
            _ => None,
        }
    }

    /// The branch identifier, if it is a branch.
    pub fn branch_id(&self) -> Option<&str> {
        match &self.kind {
            ThoughtKind::Branch { branch_id, .. } => Some(branch_id),
            _ => None,
        }
    }

    /// Content shortened to `max_chars` characters, with an ellipsis when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        truncate_chars(&self.content, max_chars)
    }
}

/// Shorten `text` to at most `max_chars` characters, ending in "..." when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn check_text(field: &str, value: &str, max_chars: usize) -> ThinkingResult<()> {
    if value.trim().is_empty() {
        return Err(ThinkingError::validation(field, "cannot be empty"));
    }
    let len = value.chars().count();
    if len > max_chars {
        return Err(ThinkingError::validation(
            field,
            format!("must be at most {} characters, got {}", max_chars, len),
        ));
    }
    Ok(())
}

fn check_earlier(field: &str, target: u32, thought_number: u32) -> ThinkingResult<()> {
    if target < 1 {
        return Err(ThinkingError::validation(field, "must be >= 1"));
    }
    if target >= thought_number {
        return Err(ThinkingError::validation(
            field,
            format!(
                "({}) must be less than thought_number ({})",
                target, thought_number
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_regular_thought() {
        let thought = Thought::regular(1, "First step").unwrap();
        assert_eq!(thought.kind.type_name(), "regular");
        assert_eq!(thought.phase, ExecutionPhase::Thinking);
        assert!(thought.tool_calls.is_empty());
        assert!(!thought.is_revision());
    }

    #[test]
    fn test_zero_thought_number_rejected() {
        let err = Thought::regular(0, "x").unwrap_err();
        assert!(matches!(err, ThinkingError::Range { .. }));
    }

    #[test]
    fn test_empty_and_oversized_content_rejected() {
        assert!(matches!(
            Thought::regular(1, "   ").unwrap_err(),
            ThinkingError::Validation { .. }
        ));
        let long = "a".repeat(MAX_CONTENT_CHARS + 1);
        assert!(Thought::regular(1, long).is_err());
        assert!(Thought::regular(1, "a".repeat(MAX_CONTENT_CHARS)).is_ok());
    }

    #[test]
    fn test_revision_requires_earlier_target() {
        let ok = Thought::new(3, "rethink", ThoughtKind::Revision { revises_thought: 2 });
        assert!(ok.unwrap().is_revision());

        let same = Thought::new(3, "rethink", ThoughtKind::Revision { revises_thought: 3 });
        assert!(same.is_err());

        let later = Thought::new(3, "rethink", ThoughtKind::Revision { revises_thought: 4 });
        assert!(later.is_err());
    }

    #[test]
    fn test_branch_requires_earlier_origin_and_id() {
        let kind = |from: u32, id: &str| ThoughtKind::Branch {
            branch_from_thought: from,
            branch_id: id.to_string(),
        };
        let thought = Thought::new(4, "alt", kind(2, "branch-a")).unwrap();
        assert_eq!(thought.branch_from_thought(), Some(2));
        assert_eq!(thought.branch_id(), Some("branch-a"));

        assert!(Thought::new(4, "alt", kind(4, "branch-a")).is_err());
        assert!(Thought::new(4, "alt", kind(2, "")).is_err());
        assert!(Thought::new(4, "alt", kind(2, &"b".repeat(51))).is_err());
    }

    #[test]
    fn test_comparison_needs_two_items() {
        let kind = |items: Vec<&str>| ThoughtKind::Comparison {
            comparison_items: items.into_iter().map(String::from).collect(),
            comparison_dimensions: vec!["cost".to_string()],
            comparison_result: None,
        };
        assert!(Thought::new(1, "compare", kind(vec!["A"])).is_err());
        assert!(Thought::new(1, "compare", kind(vec!["A", "B"])).is_ok());
        assert!(Thought::new(1, "compare", kind(vec!["A", " "])).is_err());
    }

    #[test]
    fn test_comparison_dimension_limit() {
        let kind = ThoughtKind::Comparison {
            comparison_items: vec!["A".to_string(), "B".to_string()],
            comparison_dimensions: (0..11).map(|i| format!("d{}", i)).collect(),
            comparison_result: None,
        };
        assert!(Thought::new(1, "compare", kind).is_err());
    }

    #[test]
    fn test_reverse_rules() {
        let kind = |from: Option<u32>, target: &str| ThoughtKind::Reverse {
            reverse_from: from,
            reverse_target: target.to_string(),
            reverse_steps: vec![],
        };
        assert!(Thought::new(3, "back", kind(None, "goal")).is_ok());
        assert!(Thought::new(3, "back", kind(Some(2), "goal")).is_ok());
        assert!(Thought::new(3, "back", kind(Some(3), "goal")).is_err());
        assert!(Thought::new(3, "back", kind(None, "")).is_err());
    }

    #[test]
    fn test_hypothetical_requires_condition() {
        let kind = |condition: &str| ThoughtKind::Hypothetical {
            hypothetical_condition: condition.to_string(),
            hypothetical_impact: Some("large".to_string()),
            hypothetical_probability: Some("low".to_string()),
        };
        assert!(Thought::new(1, "what if", kind("budget halves")).is_ok());
        assert!(Thought::new(1, "what if", kind("  ")).is_err());
    }

    #[test]
    fn test_serialization_is_flat_with_type_tag() {
        let thought = Thought::new(
            2,
            "alt",
            ThoughtKind::Branch {
                branch_from_thought: 1,
                branch_id: "b1".to_string(),
            },
        )
        .unwrap()
        .with_phase(ExecutionPhase::ToolCall);

        let value = serde_json::to_value(&thought).unwrap();
        assert_eq!(value["type"], json!("branch"));
        assert_eq!(value["branch_from_thought"], json!(1));
        assert_eq!(value["branch_id"], json!("b1"));
        assert_eq!(value["phase"], json!("tool_call"));

        let back: Thought = serde_json::from_value(value).unwrap();
        assert_eq!(back, thought);
    }

    #[test]
    fn test_phase_parse_and_display() {
        for phase in ExecutionPhase::ALL {
            let parsed: ExecutionPhase = phase.to_string().parse().unwrap();
            assert_eq!(parsed, phase);
        }
        assert!("planning".parse::<ExecutionPhase>().is_err());
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghijk", 8), "abcde...");
        assert_eq!(truncate_chars("思考思考思考", 5), "思考...");
    }
}
