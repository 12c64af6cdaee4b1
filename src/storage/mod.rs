//! Storage layer for thinking session persistence.
//!
//! The engine only sees the [`Storage`] trait; [`SqliteStorage`] is the
//! production implementation.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{SessionStatus, SessionSummary, ThinkingSession};

/// Persistence operations for thinking sessions.
///
/// A session is always stored and loaded as a whole. Writers replace the
/// stored aggregate; the last write wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load a session by ID.
    async fn get_session(&self, session_id: &str) -> StorageResult<Option<ThinkingSession>>;
    /// Insert or replace a session. Returns `true` once the write is durable.
    async fn put_session(&self, session: &ThinkingSession) -> StorageResult<bool>;
    /// Delete a session. Returns `false` if it did not exist.
    async fn delete_session(&self, session_id: &str) -> StorageResult<bool>;
    /// Summaries of stored sessions, most recently updated first.
    async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
        limit: usize,
    ) -> StorageResult<Vec<SessionSummary>>;
}
