use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::Storage;
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::models::{SessionStatus, SessionSummary, ThinkingSession};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// In-memory database on a single connection, for tests and dry runs.
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        // every pooled connection would get its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get_session(&self, session_id: &str) -> StorageResult<Option<ThinkingSession>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, data
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ThinkingSession::try_from).transpose()
    }

    async fn put_session(&self, session: &ThinkingSession) -> StorageResult<bool> {
        let data = serde_json::to_string(session).map_err(|e| StorageError::Serialization {
            message: format!("Failed to serialize session {}: {}", session.session_id, e),
        })?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO sessions (id, name, status, thought_count, created_at, updated_at, data)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                thought_count = excluded.thought_count,
                updated_at = excluded.updated_at,
                data = excluded.data
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.name)
        .bind(session.status.to_string())
        .bind(session.thought_count() as i64)
        .bind(timestamp(&session.created_at))
        .bind(timestamp(&session.updated_at))
        .bind(&data)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(
            session_id = %session.session_id,
            thoughts = session.thought_count(),
            "Session stored"
        );
        Ok(true)
    }

    async fn delete_session(&self, session_id: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
        limit: usize,
    ) -> StorageResult<Vec<SessionSummary>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<SessionRow> = match status {
            Some(status) => {
                sqlx::query_as(
                    r#"
                    SELECT id, data
                    FROM sessions
                    WHERE status = ?
                    ORDER BY updated_at DESC
                    LIMIT ?
                    "#,
                )
                .bind(status.to_string())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, data
                    FROM sessions
                    ORDER BY updated_at DESC
                    LIMIT ?
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .filter_map(|row| match ThinkingSession::try_from(row) {
                Ok(session) => Some(session.summary()),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable session row");
                    None
                }
            })
            .collect())
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn timestamp(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// Internal row type for SQLx mapping
#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    data: String,
}

impl TryFrom<SessionRow> for ThinkingSession {
    type Error = StorageError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        serde_json::from_str(&row.data).map_err(|e| StorageError::Serialization {
            message: format!("Failed to deserialize session {}: {}", row.id, e),
        })
    }
}
