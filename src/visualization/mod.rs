//! Text renderings of a session: Mermaid flowchart, ASCII flow and tree.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::{truncate_chars, ThinkingSession, Thought, ThoughtKind, ToolCallRecord};

const MERMAID_LABEL_CHARS: usize = 30;
const ASCII_CONTENT_CHARS: usize = 60;
const TREE_CONTENT_CHARS: usize = 50;

const MERMAID_CLASSES: &[(&str, &str)] = &[
    ("regular", "fill:#e3f2fd,stroke:#1565c0,color:#0d47a1"),
    ("revision", "fill:#fff3e0,stroke:#ef6c00,color:#e65100"),
    ("branch", "fill:#e8f5e9,stroke:#2e7d32,color:#1b5e20"),
    ("comparison", "fill:#f3e5f5,stroke:#6a1b9a,color:#4a148c"),
    ("reverse", "fill:#fce4ec,stroke:#ad1457,color:#880e4f"),
    ("hypothetical", "fill:#fffde7,stroke:#f9a825,color:#f57f17"),
    ("tool_call", "fill:#eceff1,stroke:#455a64,color:#263238"),
];

/// Output format of [`render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationFormat {
    #[default]
    Mermaid,
    Ascii,
    Tree,
}

impl std::fmt::Display for VisualizationFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisualizationFormat::Mermaid => write!(f, "mermaid"),
            VisualizationFormat::Ascii => write!(f, "ascii"),
            VisualizationFormat::Tree => write!(f, "tree"),
        }
    }
}

impl std::str::FromStr for VisualizationFormat {
    type Err = String;

    /// Accepts `mmd` for Mermaid and `text` for ASCII.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mermaid" | "mmd" => Ok(VisualizationFormat::Mermaid),
            "ascii" | "text" => Ok(VisualizationFormat::Ascii),
            "tree" => Ok(VisualizationFormat::Tree),
            _ => Err(format!(
                "Unknown visualization format: {}. Valid values: mermaid, ascii, tree",
                s
            )),
        }
    }
}

/// Render a session in the given format.
pub fn render(session: &ThinkingSession, format: VisualizationFormat) -> String {
    match format {
        VisualizationFormat::Mermaid => to_mermaid(session),
        VisualizationFormat::Ascii => to_ascii(session),
        VisualizationFormat::Tree => to_tree(session),
    }
}

/// Mermaid flowchart.
///
/// Nodes are `T{n}`, suffixed with the sanitized branch id for branch
/// steps. Consecutive steps are joined with `-->`; branches hang off their
/// origin with a dotted edge and revisions point back at their target.
pub fn to_mermaid(session: &ThinkingSession) -> String {
    let mut out = String::from("graph TD\n");

    if session.thoughts.is_empty() {
        out.push_str("    EMPTY[\"Session has no thoughts yet\"]\n");
        push_class_defs(&mut out);
        return out;
    }

    let mut node_ids: HashMap<u32, String> = HashMap::new();
    let mut edges: Vec<String> = Vec::new();
    let mut previous: Option<String> = None;

    for thought in &session.thoughts {
        let id = node_id(thought);
        let _ = writeln!(
            out,
            "    {}[\"{}\"]:::{}",
            id,
            escape_mermaid(&mermaid_label(thought)),
            thought.kind.type_name()
        );

        match &thought.kind {
            ThoughtKind::Branch {
                branch_from_thought,
                ..
            } => {
                let origin = node_ids
                    .get(branch_from_thought)
                    .cloned()
                    .unwrap_or_else(|| format!("T{}", branch_from_thought));
                edges.push(format!("    {} -.->|branch| {}", origin, id));
            }
            ThoughtKind::Revision { revises_thought } => {
                if let Some(prev) = &previous {
                    edges.push(format!("    {} --> {}", prev, id));
                }
                let target = node_ids
                    .get(revises_thought)
                    .cloned()
                    .unwrap_or_else(|| format!("T{}", revises_thought));
                edges.push(format!("    {} -.->|revises| {}", id, target));
            }
            _ => {
                if let Some(prev) = &previous {
                    edges.push(format!("    {} --> {}", prev, id));
                }
            }
        }

        for (index, record) in records_of(session, thought).into_iter().enumerate() {
            let tool_id = format!("{}_TOOL{}", id, index + 1);
            let _ = writeln!(
                out,
                "    {}[[\"🔧 {} {}\"]]:::tool_call",
                tool_id,
                escape_mermaid(&record.call_data.tool_name),
                record.status.symbol()
            );
            edges.push(format!("    {} -.->|calls| {}", id, tool_id));
        }

        node_ids.entry(thought.thought_number).or_insert_with(|| id.clone());
        previous = Some(id);
    }

    for edge in edges {
        out.push_str(&edge);
        out.push('\n');
    }
    push_class_defs(&mut out);
    out
}

/// Top-down ASCII flow with one box per step.
pub fn to_ascii(session: &ThinkingSession) -> String {
    let mut out = header(session);

    if session.thoughts.is_empty() {
        out.push_str("(no thoughts yet)\n");
        return out;
    }

    let last = session.thoughts.len() - 1;
    for (index, thought) in session.thoughts.iter().enumerate() {
        let _ = writeln!(
            out,
            "┌─ {} Step {}{} [{} {}]",
            thought.kind.symbol(),
            thought.thought_number,
            relation_note(thought),
            thought.phase.symbol(),
            thought.phase.label()
        );
        let _ = writeln!(out, "│  {}", thought.preview(ASCII_CONTENT_CHARS));
        for record in records_of(session, thought) {
            let _ = writeln!(
                out,
                "│  🔧 {} {} {}",
                record.call_data.tool_name,
                record.status.symbol(),
                record.status
            );
        }
        out.push_str("└─\n");
        if index < last {
            out.push_str("   │\n   ▼\n");
        }
    }
    out
}

/// Tree view with tool calls nested under their step.
pub fn to_tree(session: &ThinkingSession) -> String {
    let mut out = format!("📋 {} ({})\n", session.name, session.session_id);

    if session.thoughts.is_empty() {
        out.push_str("└── (no thoughts yet)\n");
        return out;
    }

    let last = session.thoughts.len() - 1;
    for (index, thought) in session.thoughts.iter().enumerate() {
        let (branch, indent) = if index == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let _ = writeln!(
            out,
            "{}{} Step {}{} {}: {}",
            branch,
            thought.kind.symbol(),
            thought.thought_number,
            relation_note(thought),
            thought.phase.symbol(),
            thought.preview(TREE_CONTENT_CHARS)
        );

        let records = records_of(session, thought);
        let last_record = records.len().saturating_sub(1);
        for (i, record) in records.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}{}🔧 {} ({})",
                indent,
                if i == last_record { "└── " } else { "├── " },
                record.call_data.tool_name,
                record.status
            );
        }
    }
    out
}

fn header(session: &ThinkingSession) -> String {
    format!(
        "Session: {} ({})\nStatus: {} | Thoughts: {} | Tool calls: {}\n\n",
        session.name,
        session.session_id,
        session.status,
        session.thought_count(),
        session.tool_call_history.len()
    )
}

fn node_id(thought: &Thought) -> String {
    match thought.branch_id() {
        Some(branch_id) => format!("T{}_{}", thought.thought_number, sanitize_id(branch_id)),
        None => format!("T{}", thought.thought_number),
    }
}

/// Mermaid node ids only allow word characters.
fn sanitize_id(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn mermaid_label(thought: &Thought) -> String {
    format!(
        "{} Step {}{}: {}",
        thought.kind.symbol(),
        thought.thought_number,
        relation_note(thought),
        thought.preview(MERMAID_LABEL_CHARS)
    )
}

fn relation_note(thought: &Thought) -> String {
    match &thought.kind {
        ThoughtKind::Revision { revises_thought } => format!(" (revises {})", revises_thought),
        ThoughtKind::Branch {
            branch_from_thought,
            branch_id,
        } => format!(" (branch {} from {})", branch_id, branch_from_thought),
        ThoughtKind::Comparison {
            comparison_items, ..
        } => format!(" (compares {})", truncate_chars(&comparison_items.join(" vs "), 40)),
        ThoughtKind::Reverse { reverse_target, .. } => {
            format!(" (back from {})", truncate_chars(reverse_target, 30))
        }
        ThoughtKind::Hypothetical {
            hypothetical_condition,
            ..
        } => format!(" (if {})", truncate_chars(hypothetical_condition, 30)),
        ThoughtKind::Regular => String::new(),
    }
}

fn escape_mermaid(text: &str) -> String {
    text.replace('"', "#quot;").replace('\n', " ")
}

fn records_of<'a>(session: &'a ThinkingSession, thought: &Thought) -> Vec<&'a ToolCallRecord> {
    thought
        .tool_calls
        .iter()
        .filter_map(|id| session.get_tool_call_record(id))
        .collect()
}

fn push_class_defs(out: &mut String) {
    for (class, style) in MERMAID_CLASSES {
        let _ = writeln!(out, "    classDef {} {}", class, style);
    }
}
