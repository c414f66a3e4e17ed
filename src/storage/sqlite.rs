use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::Storage;
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::model::{
    Assessment, InvestigationMessage, InvestigationSignal, InvestigationThread, MessageRole,
    Relation,
};

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
            .create_if_missing(true)
            .foreign_keys(true);

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

    /// In-memory database for tests and throwaway renders.
    ///
    /// Limited to one connection: every SQLite memory connection is its own
    /// database.
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
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

fn to_json_list(values: &[String]) -> StorageResult<String> {
    serde_json::to_string(values).map_err(|e| StorageError::Query {
        message: format!("Failed to encode list column: {}", e),
    })
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_thread(&self, thread: &InvestigationThread) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO threads (id, title, initial_hypothesis, investigative_axes,
                current_assessment, confidence_score, blind_spots, scope, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&thread.id)
        .bind(&thread.title)
        .bind(&thread.initial_hypothesis)
        .bind(to_json_list(&thread.investigative_axes)?)
        .bind(thread.current_assessment.map(|a| a.to_string()))
        .bind(thread.confidence_score)
        .bind(to_json_list(&thread.blind_spots)?)
        .bind(&thread.scope)
        .bind(Utc::now().to_rfc3339())
        .bind(thread.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(thread_id = %thread.id, "Thread created");
        Ok(())
    }

    async fn get_thread(&self, id: &str) -> StorageResult<Option<InvestigationThread>> {
        let row: Option<ThreadRow> = sqlx::query_as(
            r#"
            SELECT id, title, initial_hypothesis, investigative_axes, current_assessment,
                confidence_score, blind_spots, scope, updated_at
            FROM threads
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn update_thread(&self, thread: &InvestigationThread) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE threads
            SET title = ?, initial_hypothesis = ?, investigative_axes = ?, current_assessment = ?,
                confidence_score = ?, blind_spots = ?, scope = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&thread.title)
        .bind(&thread.initial_hypothesis)
        .bind(to_json_list(&thread.investigative_axes)?)
        .bind(thread.current_assessment.map(|a| a.to_string()))
        .bind(thread.confidence_score)
        .bind(to_json_list(&thread.blind_spots)?)
        .bind(&thread.scope)
        .bind(thread.updated_at.to_rfc3339())
        .bind(&thread.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::ThreadNotFound {
                thread_id: thread.id.clone(),
            });
        }

        Ok(())
    }

    async fn list_threads(&self) -> StorageResult<Vec<InvestigationThread>> {
        let rows: Vec<ThreadRow> = sqlx::query_as(
            r#"
            SELECT id, title, initial_hypothesis, investigative_axes, current_assessment,
                confidence_score, blind_spots, scope, updated_at
            FROM threads
            ORDER BY updated_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn delete_thread(&self, id: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_signal(
        &self,
        thread_id: &str,
        signal: &InvestigationSignal,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO signals (thread_id, id, signal_type, source, summary, url, date,
                impact_on_hypothesis, confidence, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(thread_id)
        .bind(&signal.id)
        .bind(&signal.signal_type)
        .bind(&signal.source)
        .bind(&signal.summary)
        .bind(&signal.url)
        .bind(&signal.date)
        .bind(signal.impact_on_hypothesis.to_string())
        .bind(signal.confidence)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::DuplicateSignal {
                    signal_id: signal.id.clone(),
                })
            }
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(StorageError::ThreadNotFound {
                    thread_id: thread_id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_thread_signals(&self, thread_id: &str) -> StorageResult<Vec<InvestigationSignal>> {
        let rows: Vec<SignalRow> = sqlx::query_as(
            r#"
            SELECT id, signal_type, source, summary, url, date, impact_on_hypothesis, confidence
            FROM signals
            WHERE thread_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn count_thread_signals(&self, thread_id: &str) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM signals WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn append_message(&self, message: &InvestigationMessage) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (id, thread_id, role, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.thread_id)
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::DuplicateMessage {
                    message_id: message.id.clone(),
                })
            }
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(StorageError::ThreadNotFound {
                    thread_id: message.thread_id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_thread_messages(
        &self,
        thread_id: &str,
    ) -> StorageResult<Vec<InvestigationMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, thread_id, role, content, created_at
            FROM messages
            WHERE thread_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

// Internal row types for SQLx mapping

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_json_list(value: &str) -> Vec<String> {
    serde_json::from_str(value).unwrap_or_default()
}

#[derive(sqlx::FromRow)]
struct ThreadRow {
    id: String,
    title: String,
    initial_hypothesis: String,
    investigative_axes: String,
    current_assessment: Option<String>,
    confidence_score: Option<f64>,
    blind_spots: String,
    scope: Option<String>,
    updated_at: String,
}

impl From<ThreadRow> for InvestigationThread {
    fn from(row: ThreadRow) -> Self {
        Self {
            current_assessment: row
                .current_assessment
                .and_then(|s| Assessment::from_str(&s).ok()),
            investigative_axes: parse_json_list(&row.investigative_axes),
            blind_spots: parse_json_list(&row.blind_spots),
            updated_at: parse_timestamp(&row.updated_at),
            id: row.id,
            title: row.title,
            initial_hypothesis: row.initial_hypothesis,
            confidence_score: row.confidence_score,
            scope: row.scope,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SignalRow {
    id: String,
    signal_type: String,
    source: String,
    summary: String,
    url: Option<String>,
    date: Option<String>,
    impact_on_hypothesis: String,
    confidence: Option<f64>,
}

impl From<SignalRow> for InvestigationSignal {
    fn from(row: SignalRow) -> Self {
        let impact_on_hypothesis = Relation::from_str(&row.impact_on_hypothesis).unwrap_or_else(|_| {
            warn!(signal_id = %row.id, value = %row.impact_on_hypothesis, "Unknown stored impact, using neutral");
            Relation::Neutral
        });

        Self {
            id: row.id,
            signal_type: row.signal_type,
            source: row.source,
            summary: row.summary,
            url: row.url,
            date: row.date,
            impact_on_hypothesis,
            confidence: row.confidence,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    thread_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl From<MessageRow> for InvestigationMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            thread_id: row.thread_id,
            role: MessageRole::from_str(&row.role).unwrap_or(MessageRole::Assistant),
            content: row.content,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}
