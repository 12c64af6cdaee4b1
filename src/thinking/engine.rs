use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::correlation::correlate;
use super::phase::infer_phase;
use super::quota::{self, QuotaWarning};
use super::request::ThoughtStepRequest;
use crate::cache::ToolCallManager;
use crate::config::ThinkingConfig;
use crate::error::{AppResult, ThinkingError, ThinkingResult};
use crate::models::{
    validate_session_id, ExecutionPhase, SessionStatistics, SessionStatus,
    SessionSummary, ThinkingSession, Thought, ThoughtsAdjustment, ToolCallRecord, ToolCallStatus,
};
use crate::storage::Storage;

const AUTO_SESSION_PREFIX: &str = "Session-";
const AUTO_SESSION_DESCRIPTION: &str = "Automatically created thinking session";
const RESUME_PREVIEW_CHARS: usize = 100;

/// One tool call as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallSummary {
    pub record_id: String,
    pub call_id: String,
    pub tool_name: String,
    pub status: ToolCallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
}

impl From<&ToolCallRecord> for ToolCallSummary {
    fn from(record: &ToolCallRecord) -> Self {
        Self {
            record_id: record.record_id.clone(),
            call_id: record.call_data.call_id.clone(),
            tool_name: record.call_data.tool_name.clone(),
            status: record.status,
            success: record.result_data.as_ref().map(|r| r.success),
            execution_time_ms: record.result_data.as_ref().and_then(|r| r.execution_time_ms),
        }
    }
}

/// A recorded step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub session_id: String,
    pub session_created: bool,
    pub thought_number: u32,
    /// Planned total after any extension.
    pub total_thoughts: u32,
    pub thought_type: String,
    pub phase: ExecutionPhase,
    pub next_thought_needed: bool,
    pub session_status: SessionStatus,
    pub thought_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<ThoughtsAdjustment>,
    pub tool_calls: Vec<ToolCallSummary>,
    pub statistics: SessionStatistics,
}

/// A step turned away by a quota. Nothing was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRejection {
    pub session_id: String,
    pub thought_number: u32,
    pub total_thoughts: u32,
    /// Thoughts stored in the session, unchanged by this submission.
    pub thought_count: usize,
    pub tool_call_count: usize,
    pub warning: QuotaWarning,
}

/// Outcome of a step submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ThoughtStepResult {
    Recorded(StepSummary),
    Rejected(StepRejection),
}

impl ThoughtStepResult {
    pub fn is_recorded(&self) -> bool {
        matches!(self, ThoughtStepResult::Recorded(_))
    }

    pub fn summary(&self) -> Option<&StepSummary> {
        match self {
            ThoughtStepResult::Recorded(summary) => Some(summary),
            ThoughtStepResult::Rejected(_) => None,
        }
    }

    pub fn warning(&self) -> Option<&QuotaWarning> {
        match self {
            ThoughtStepResult::Recorded(_) => None,
            ThoughtStepResult::Rejected(rejection) => Some(&rejection.warning),
        }
    }
}

/// Context for picking a session back up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeInfo {
    pub session_id: String,
    pub name: String,
    pub description: String,
    pub status: SessionStatus,
    /// False when the session is completed and cannot be continued.
    pub resumable: bool,
    pub message: String,
    pub thought_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_thought: Option<LastThought>,
    /// Planned total from the latest adjustment, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_total_thoughts: Option<u32>,
    pub adjustment_count: usize,
    pub next_thought_number: u32,
}

/// Short view of a session's latest thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastThought {
    pub thought_number: u32,
    pub preview: String,
    pub thought_type: String,
    pub phase: ExecutionPhase,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Validates, correlates and records thought steps against a [`Storage`].
pub struct ThinkingEngine {
    storage: Arc<dyn Storage>,
    config: RwLock<ThinkingConfig>,
    cache: Option<Arc<Mutex<ToolCallManager>>>,
}

impl ThinkingEngine {
    /// Create an engine over the given store and quotas
    pub fn new(storage: Arc<dyn Storage>, config: ThinkingConfig) -> Self {
        Self {
            storage,
            config: RwLock::new(config),
            cache: None,
        }
    }

    /// Feed correlated results into a shared tool cache
    pub fn with_cache(mut self, cache: Arc<Mutex<ToolCallManager>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Current quotas.
    pub async fn config(&self) -> ThinkingConfig {
        self.config.read().await.clone()
    }

    /// Replace the quotas used by later submissions.
    pub async fn set_config(&self, config: ThinkingConfig) -> AppResult<()> {
        config.validate()?;
        *self.config.write().await = config;
        Ok(())
    }

    /// Re-read the quotas from the environment.
    pub async fn reload(&self) -> AppResult<ThinkingConfig> {
        let config = ThinkingConfig::from_env()?;
        *self.config.write().await = config.clone();
        info!(
            max_thoughts = config.max_thoughts,
            max_tool_calls = config.max_tool_calls,
            "Thinking quotas reloaded"
        );
        Ok(config)
    }

    /// Validate and record one thought step.
    ///
    /// Range, validation and hard quota failures are errors. Soft quota
    /// overages come back as [`ThoughtStepResult::Rejected`]. Either way a
    /// failed submission leaves the store untouched.
    pub async fn submit_thought_step(
        &self,
        request: ThoughtStepRequest,
    ) -> ThinkingResult<ThoughtStepResult> {
        let config = self.config().await;

        if request.thought_number < 1 {
            return Err(ThinkingError::range(
                "thought_number",
                format!("must be >= 1, got {}", request.thought_number),
            ));
        }
        if request.total_thoughts < request.thought_number {
            return Err(ThinkingError::range(
                "total_thoughts",
                format!(
                    "({}) must be >= thought_number ({})",
                    request.total_thoughts, request.thought_number
                ),
            ));
        }
        if request.thought.trim().is_empty() {
            return Err(ThinkingError::validation("thought", "cannot be empty"));
        }
        quota::check_total_thoughts(request.total_thoughts, &config)?;

        // bounded by max_thoughts from here on
        let thought_number = u32::try_from(request.thought_number).map_err(|_| {
            ThinkingError::range("thought_number", format!("too large: {}", request.thought_number))
        })?;
        let total_thoughts = u32::try_from(request.total_thoughts).map_err(|_| {
            ThinkingError::range("total_thoughts", format!("too large: {}", request.total_thoughts))
        })?;

        let session_id = validate_session_id(&request.session_id)?;
        let (mut session, session_created) = match self.storage.get_session(&session_id).await? {
            Some(session) => (session, false),
            None => (auto_session(&session_id)?, true),
        };

        let reject = |session: &ThinkingSession, warning: QuotaWarning| {
            warn!(
                session_id = %session.session_id,
                thought_number,
                kind = ?warning.kind,
                "{}", warning.message
            );
            ThoughtStepResult::Rejected(StepRejection {
                session_id: session.session_id.clone(),
                thought_number,
                total_thoughts,
                thought_count: session.thought_count(),
                tool_call_count: session.tool_call_history.len(),
                warning,
            })
        };

        let mut adjustment = None;
        let mut planned_total = total_thoughts;
        if request.needs_more_thoughts {
            match quota::extend_total_thoughts(total_thoughts, &config) {
                Ok(new_total) => {
                    adjustment = Some(ThoughtsAdjustment {
                        original_total: total_thoughts,
                        new_total,
                        thought_number,
                        timestamp: Utc::now(),
                    });
                    planned_total = new_total;
                }
                Err(warning) => return Ok(reject(&session, warning)),
            }
        }

        let calls = request.calls();
        if !calls.is_empty() {
            let checked = quota::check_tool_calls_per_thought(calls.len(), &config).and_then(
                |_| {
                    quota::check_session_tool_calls(
                        session.tool_call_history.len(),
                        calls.len(),
                        &config,
                    )
                },
            );
            if let Err(warning) = checked {
                return Ok(reject(&session, warning));
            }
        }

        let phase = request
            .phase
            .unwrap_or_else(|| infer_phase(request.tool_calls.as_deref(), request.tool_results.as_deref()));
        let mut thought = Thought::new(thought_number, request.thought.clone(), request.thought_kind()?)?
            .with_phase(phase);
        let records = correlate(thought_number, calls, request.results())?;
        thought.tool_calls = records.iter().map(|r| r.record_id.clone()).collect();

        // all checks passed; mutate and persist
        if let Some(adjustment) = &adjustment {
            session.record_adjustment(adjustment);
            info!(
                session_id = %session.session_id,
                original_total = adjustment.original_total,
                new_total = adjustment.new_total,
                "Planned thoughts extended"
            );
        }
        let thought_type = thought.kind.type_name().to_string();
        session.add_thought(thought);
        for record in &records {
            session.add_tool_call_record(record.clone());
        }
        session.update_statistics();
        if !request.next_thought_needed {
            session.mark_completed();
        }
        self.storage.put_session(&session).await?;

        self.feed_cache(&records).await;

        info!(
            session_id = %session.session_id,
            thought_number,
            thought_type = %thought_type,
            phase = %phase,
            tool_calls = records.len(),
            "Thought recorded"
        );

        Ok(ThoughtStepResult::Recorded(StepSummary {
            session_id: session.session_id.clone(),
            session_created,
            thought_number,
            total_thoughts: planned_total,
            thought_type,
            phase,
            next_thought_needed: request.next_thought_needed,
            session_status: session.status,
            thought_count: session.thought_count(),
            adjustment,
            tool_calls: records.iter().map(ToolCallSummary::from).collect(),
            statistics: session.statistics.clone(),
        }))
    }

    async fn feed_cache(&self, records: &[ToolCallRecord]) {
        let Some(cache) = &self.cache else {
            return;
        };
        let mut manager = cache.lock().await;
        for record in records {
            let Some(result) = &record.result_data else {
                continue;
            };
            if record.status != ToolCallStatus::Completed || result.from_cache {
                continue;
            }
            if !manager.can_execute() {
                debug!(
                    tool = %record.call_data.tool_name,
                    call_id = %record.call_data.call_id,
                    "Tool cache call quota exhausted, skipping"
                );
                continue;
            }
            manager.register_call();
            manager.record_result(result);
            if result.success {
                manager.cache_result(&record.call_data, result.clone());
            }
        }
        debug!(cached = manager.cache_len(), "Tool cache updated");
    }

    /// Create a session explicitly.
    pub async fn create_session(
        &self,
        name: &str,
        description: Option<String>,
        metadata: Option<Map<String, Value>>,
        session_id: Option<&str>,
    ) -> ThinkingResult<ThinkingSession> {
        let mut session = ThinkingSession::new(name)?;
        if let Some(id) = session_id {
            session = session.with_id(id)?;
            if self.storage.get_session(&session.session_id).await?.is_some() {
                return Err(ThinkingError::validation(
                    "session_id",
                    format!("session {} already exists", session.session_id),
                ));
            }
        }
        if let Some(description) = description {
            session = session.with_description(description)?;
        }
        if let Some(metadata) = metadata {
            session = session.with_metadata(metadata);
        }

        self.storage.put_session(&session).await?;
        info!(session_id = %session.session_id, name = %session.name, "Session created");
        Ok(session)
    }

    /// Load a session or fail with `SessionNotFound`.
    pub async fn get_session(&self, session_id: &str) -> ThinkingResult<ThinkingSession> {
        self.storage
            .get_session(session_id)
            .await?
            .ok_or_else(|| ThinkingError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    pub async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
        limit: usize,
    ) -> ThinkingResult<Vec<SessionSummary>> {
        Ok(self.storage.list_sessions(status, limit).await?)
    }

    /// Delete a session. Returns `false` if it did not exist.
    pub async fn delete_session(&self, session_id: &str) -> ThinkingResult<bool> {
        let deleted = self.storage.delete_session(session_id).await?;
        if deleted {
            info!(session_id = %session_id, "Session deleted");
        }
        Ok(deleted)
    }

    /// Apply a caller-driven status change.
    pub async fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> ThinkingResult<ThinkingSession> {
        let mut session = self.get_session(session_id).await?;
        session.set_status(status);
        self.storage.put_session(&session).await?;
        info!(session_id = %session_id, status = %status, "Session status updated");
        Ok(session)
    }

    /// Context for continuing a session where it left off.
    pub async fn resume_session(&self, session_id: &str) -> ThinkingResult<ResumeInfo> {
        let session = self.get_session(session_id).await?;
        let history = session.total_thoughts_history();
        let resumable = !session.is_completed();

        let last_thought = session.latest_thought().map(|t| LastThought {
            thought_number: t.thought_number,
            preview: t.preview(RESUME_PREVIEW_CHARS),
            thought_type: t.kind.type_name().to_string(),
            phase: t.phase,
            timestamp: t.timestamp,
        });
        let next_thought_number = u32::try_from(session.thought_count())
            .unwrap_or(u32::MAX)
            .saturating_add(1);

        let message = if !resumable {
            "Session is completed and cannot be continued; create a new session to keep thinking"
                .to_string()
        } else if last_thought.is_none() {
            "Session has no thoughts yet; start with sequential_thinking".to_string()
        } else {
            format!(
                "Continue with sequential_thinking using thoughtNumber {} and this session_id",
                next_thought_number
            )
        };

        Ok(ResumeInfo {
            session_id: session.session_id.clone(),
            name: session.name.clone(),
            description: session.description.clone(),
            status: session.status,
            resumable,
            message,
            thought_count: session.thought_count(),
            last_thought,
            current_total_thoughts: history.last().map(|a| a.new_total),
            adjustment_count: history.len(),
            next_thought_number,
        })
    }

    /// Statistics recomputed from the stored session.
    pub async fn get_session_statistics(&self, session_id: &str) -> ThinkingResult<SessionStatistics> {
        let session = self.get_session(session_id).await?;
        Ok(SessionStatistics::compute(&session.thoughts, &session.tool_call_history))
    }

    /// Tool call records, optionally for one thought, first `limit` in call order.
    pub async fn get_tool_call_history(
        &self,
        session_id: &str,
        thought_number: Option<u32>,
        limit: usize,
    ) -> ThinkingResult<Vec<ToolCallRecord>> {
        let session = self.get_session(session_id).await?;
        Ok(session
            .tool_call_history
            .into_iter()
            .filter(|r| thought_number.map_or(true, |n| r.thought_number == n))
            .take(limit)
            .collect())
    }
}

fn auto_session(session_id: &str) -> ThinkingResult<ThinkingSession> {
    let short: String = session_id.chars().take(8).collect();
    let mut metadata = Map::new();
    metadata.insert("session_type".to_string(), json!("sequential_thinking"));
    Ok(ThinkingSession::new(format!("{}{}", AUTO_SESSION_PREFIX, short))?
        .with_id(session_id)?
        .with_description(AUTO_SESSION_DESCRIPTION)?
        .with_metadata(metadata))
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
