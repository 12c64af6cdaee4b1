//! Execution phase inference and the interleaved-thinking state machine.

use serde_json::Value;

use crate::models::ExecutionPhase;

const ANALYSIS_KEYWORDS: &[&str] = &[
    "分析结果",
    "工具返回",
    "根据结果",
    "结果显示",
    "返回了",
    "执行完毕",
    "analyze result",
    "tool returned",
    "based on result",
];

const TOOL_CALL_KEYWORDS: &[&str] = &[
    "调用工具",
    "执行工具",
    "使用工具",
    "需要调用",
    "需要执行",
    "call tool",
    "invoke tool",
];

/// Infer the phase of a step from its attached tool data.
///
/// Results take priority over calls. Empty lists count as absent.
pub fn infer_phase(tool_calls: Option<&[Value]>, tool_results: Option<&[Value]>) -> ExecutionPhase {
    if tool_results.is_some_and(|r| !r.is_empty()) {
        ExecutionPhase::Analysis
    } else if tool_calls.is_some_and(|c| !c.is_empty()) {
        ExecutionPhase::ToolCall
    } else {
        ExecutionPhase::Thinking
    }
}

/// Keyword heuristic over a step's content.
///
/// Analysis keywords win over tool-call keywords.
pub fn infer_phase_from_content(content: &str) -> ExecutionPhase {
    let lower = content.to_lowercase();
    if ANALYSIS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ExecutionPhase::Analysis
    } else if TOOL_CALL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ExecutionPhase::ToolCall
    } else {
        ExecutionPhase::Thinking
    }
}

/// Whether `next` may follow `current`.
///
/// A tool call must be analyzed before thinking or calling again.
pub fn validate_phase_transition(current: ExecutionPhase, next: ExecutionPhase) -> bool {
    use ExecutionPhase::*;
    match current {
        Thinking => matches!(next, Thinking | ToolCall),
        ToolCall => matches!(next, Analysis),
        Analysis => true,
    }
}

/// Phases reachable from `current`.
pub fn allowed_transitions(current: ExecutionPhase) -> Vec<ExecutionPhase> {
    ExecutionPhase::ALL
        .into_iter()
        .filter(|next| validate_phase_transition(current, *next))
        .collect()
}

pub fn phase_description(phase: ExecutionPhase) -> &'static str {
    match phase {
        ExecutionPhase::Thinking => "Pure reasoning without tool involvement",
        ExecutionPhase::ToolCall => "Calling external tools to gather information or act",
        ExecutionPhase::Analysis => "Analyzing tool results and integrating them",
    }
}
