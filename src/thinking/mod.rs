//! The thinking engine: quotas, phases, tool-call correlation and step
//! recording.
//!
//! [`ThinkingEngine::submit_thought_step`] runs every check before touching
//! the session, so a rejected or failed step never leaves partial state.

pub mod correlation;
mod engine;
pub mod phase;
pub mod quota;
mod request;

pub use engine::{
    LastThought, ResumeInfo, StepRejection, StepSummary, ThinkingEngine, ThoughtStepResult,
    ToolCallSummary,
};
pub use quota::{QuotaWarning, QuotaWarningKind};
pub use request::{ThoughtStepRequest, DEFAULT_SESSION_ID};
