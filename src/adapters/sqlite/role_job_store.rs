//! SQLite implementation of RoleJobStore.
//!
//! The `role_jobs` table is the contract with the downstream role worker, so
//! column names and encodings are fixed: `discord_user_id` holds the subject,
//! `action` is `grant`/`revoke`, `created_at_utc` is RFC 3339 UTC text and
//! `done` is 0/1.

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::domain::foundation::{RoleJobId, SubjectId, Timestamp, ValidationError};
use crate::domain::role_job::{NewRoleJob, RoleAction, RoleJob};
use crate::ports::{EnqueueResult, JobStoreError, RoleJobStore};

const JOB_COLUMNS: &str =
    "id, discord_user_id, action, reason, created_at_utc, done, stripe_event_id";

/// SQLite implementation of the RoleJobStore port.
#[derive(Debug, Clone)]
pub struct SqliteRoleJobStore {
    pool: SqlitePool,
}

impl SqliteRoleJobStore {
    /// Opens (creating if missing) the database described by `config`.
    ///
    /// Uses WAL journaling so the worker can read while the endpoint writes.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, JobStoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| JobStoreError::Unavailable(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout());

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(|e| JobStoreError::Unavailable(format!("Failed to open database: {}", e)))?;

        Ok(Self { pool })
    }

    /// Closes the pool, waiting for in-flight statements.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Creates the table and idempotency index if they do not exist.
    ///
    /// Safe to call on every startup. A table created before event-id
    /// deduplication existed gains the `stripe_event_id` column.
    pub async fn ensure_schema(&self) -> Result<(), JobStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS role_jobs (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                discord_user_id TEXT    NOT NULL,
                action          TEXT    NOT NULL,
                reason          TEXT,
                created_at_utc  TEXT    NOT NULL,
                done            INTEGER NOT NULL DEFAULT 0,
                stripe_event_id TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| schema_error("create role_jobs", e))?;

        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('role_jobs')")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| schema_error("inspect role_jobs", e))?;

        if !columns.iter().any(|c| c == "stripe_event_id") {
            tracing::info!("Adding stripe_event_id column to existing role_jobs table");
            sqlx::query("ALTER TABLE role_jobs ADD COLUMN stripe_event_id TEXT")
                .execute(&self.pool)
                .await
                .map_err(|e| schema_error("add stripe_event_id", e))?;
        }

        // NULLs never collide, so jobs without an event id are unaffected
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_role_jobs_stripe_event_id \
             ON role_jobs (stripe_event_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| schema_error("create event id index", e))?;

        Ok(())
    }

    async fn fetch_by_event_id(&self, event_id: &str) -> Result<Option<RoleJobRow>, JobStoreError> {
        sqlx::query_as(&format!(
            "SELECT {} FROM role_jobs WHERE stripe_event_id = ?1",
            JOB_COLUMNS
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unavailable("find role job", e))
    }
}

/// Database row representation of a role job.
#[derive(Debug, sqlx::FromRow)]
struct RoleJobRow {
    id: i64,
    discord_user_id: String,
    action: String,
    reason: Option<String>,
    created_at_utc: String,
    done: bool,
    stripe_event_id: Option<String>,
}

impl TryFrom<RoleJobRow> for RoleJob {
    type Error = JobStoreError;

    fn try_from(row: RoleJobRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |e: ValidationError| JobStoreError::Corrupt(format!("row {}: {}", id, e));

        Ok(RoleJob {
            id: RoleJobId::from_i64(id),
            subject_id: SubjectId::new(row.discord_user_id).map_err(corrupt)?,
            action: RoleAction::from_str(&row.action).map_err(corrupt)?,
            reason: row.reason,
            created_at: parse_created_at(&row.created_at_utc).map_err(corrupt)?,
            done: row.done,
            event_id: row.stripe_event_id,
        })
    }
}

/// Parses `created_at_utc`. Older rows may hold a naive ISO 8601 string, read as UTC.
fn parse_created_at(raw: &str) -> Result<Timestamp, ValidationError> {
    Timestamp::parse_rfc3339(raw).or_else(|e| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Timestamp::from_datetime(Utc.from_utc_datetime(&naive)))
            .map_err(|_| e)
    })
}

fn unavailable(op: &str, e: sqlx::Error) -> JobStoreError {
    JobStoreError::Unavailable(format!("Failed to {}: {}", op, e))
}

fn schema_error(step: &str, e: sqlx::Error) -> JobStoreError {
    JobStoreError::Unavailable(format!("Schema setup failed ({}): {}", step, e))
}

#[async_trait]
impl RoleJobStore for SqliteRoleJobStore {
    async fn enqueue(&self, job: NewRoleJob) -> Result<EnqueueResult, JobStoreError> {
        let created_at = Timestamp::now();

        let inserted: Option<RoleJobRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO role_jobs (discord_user_id, action, reason, created_at_utc, done, stripe_event_id)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            ON CONFLICT (stripe_event_id) DO NOTHING
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job.subject_id.as_str())
        .bind(job.action.as_str())
        .bind(&job.reason)
        .bind(created_at.to_rfc3339())
        .bind(&job.event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unavailable("enqueue role job", e))?;

        if let Some(row) = inserted {
            return Ok(EnqueueResult::Created(RoleJob::try_from(row)?));
        }

        // Nothing inserted means the event id is already on record
        let event_id = job.event_id.as_deref().ok_or_else(|| {
            JobStoreError::Corrupt("insert without event id produced no row".to_string())
        })?;
        let prior = self.fetch_by_event_id(event_id).await?.ok_or_else(|| {
            JobStoreError::Corrupt(format!("conflicting job for event {} not found", event_id))
        })?;

        Ok(EnqueueResult::Duplicate(RoleJob::try_from(prior)?))
    }

    async fn mark_done(&self, id: RoleJobId) -> Result<(), JobStoreError> {
        let result = sqlx::query("UPDATE role_jobs SET done = 1 WHERE id = ?1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| unavailable("mark role job done", e))?;

        if result.rows_affected() == 0 {
            return Err(JobStoreError::NotFound(id));
        }

        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<RoleJob>, JobStoreError> {
        let rows: Vec<RoleJobRow> = sqlx::query_as(&format!(
            "SELECT {} FROM role_jobs WHERE done = 0 ORDER BY id ASC",
            JOB_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| unavailable("list pending role jobs", e))?;

        // An undecodable row must not hide the rest of the queue from the worker
        let jobs = rows
            .into_iter()
            .filter_map(|row| match RoleJob::try_from(row) {
                Ok(job) => Some(job),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable pending role job");
                    None
                }
            })
            .collect();

        Ok(jobs)
    }

    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<RoleJob>, JobStoreError> {
        self.fetch_by_event_id(event_id)
            .await?
            .map(RoleJob::try_from)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    async fn open(dir: &TempDir) -> SqliteRoleJobStore {
        let config = DatabaseConfig::for_path(dir.path().join("payments.db"));
        let store = SqliteRoleJobStore::connect(&config).await.unwrap();
        store.ensure_schema().await.unwrap();
        store
    }

    fn grant(subject: &str) -> NewRoleJob {
        NewRoleJob::new(
            SubjectId::new(subject).unwrap(),
            RoleAction::Grant,
            "checkout.session.completed",
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Enqueue
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn enqueue_assigns_id_and_stores_pending_job() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        let result = store.enqueue(grant("u123").for_event("evt_1")).await.unwrap();

        assert!(result.is_created());
        let job = result.job();
        assert_eq!(job.subject_id.as_str(), "u123");
        assert_eq!(job.action, RoleAction::Grant);
        assert_eq!(job.reason.as_deref(), Some("checkout.session.completed"));
        assert_eq!(job.event_id.as_deref(), Some("evt_1"));
        assert!(!job.done);

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending, vec![job.clone()]);
    }

    #[tokio::test]
    async fn enqueue_same_event_twice_returns_prior_job() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        let first = store.enqueue(grant("u123").for_event("evt_1")).await.unwrap();
        let second = store.enqueue(grant("u123").for_event("evt_1")).await.unwrap();

        assert!(first.is_created());
        assert!(!second.is_created());
        assert_eq!(first.job(), second.job());
        assert_eq!(store.list_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn jobs_without_event_id_are_never_deduplicated() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        assert!(store.enqueue(grant("u1")).await.unwrap().is_created());
        assert!(store.enqueue(grant("u1")).await.unwrap().is_created());

        assert_eq!(store.list_pending().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn created_at_is_stored_as_rfc3339_utc() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store.enqueue(grant("u1")).await.unwrap();

        let raw: String = sqlx::query_scalar("SELECT created_at_utc FROM role_jobs")
            .fetch_one(&store.pool)
            .await
            .unwrap();

        assert!(raw.ends_with('Z'), "expected UTC suffix in {}", raw);
        assert!(Timestamp::parse_rfc3339(&raw).is_ok());
    }

    #[tokio::test]
    async fn concurrent_enqueues_all_land_with_distinct_ids() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open(&dir).await);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .enqueue(grant(&format!("u{}", i)).for_event(format!("evt_{}", i)))
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_created());
        }

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 20);
        let mut ids: Vec<_> = pending.iter().map(|j| j.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn concurrent_redeliveries_create_exactly_one_job() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open(&dir).await);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.enqueue(grant("u1").for_event("evt_dup")).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_created() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.list_pending().await.unwrap().len(), 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Consumer Operations
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn list_pending_returns_jobs_in_creation_order() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        for subject in ["a", "b", "c"] {
            store.enqueue(grant(subject)).await.unwrap();
        }

        let subjects: Vec<_> = store
            .list_pending()
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.subject_id.to_string())
            .collect();
        assert_eq!(subjects, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn mark_done_removes_job_from_pending_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        let first = store.enqueue(grant("a")).await.unwrap().into_job();
        let second = store.enqueue(grant("b")).await.unwrap().into_job();

        store.mark_done(first.id).await.unwrap();
        store.mark_done(first.id).await.unwrap();

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
    }

    #[tokio::test]
    async fn mark_done_unknown_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        let result = store.mark_done(RoleJobId::from_i64(999)).await;

        assert!(matches!(result, Err(JobStoreError::NotFound(id)) if id.as_i64() == 999));
    }

    #[tokio::test]
    async fn find_by_event_id_sees_done_jobs_too() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        let job = store
            .enqueue(grant("u1").for_event("evt_9"))
            .await
            .unwrap()
            .into_job();
        store.mark_done(job.id).await.unwrap();

        let found = store.find_by_event_id("evt_9").await.unwrap().unwrap();
        assert!(found.done);
        assert!(store.find_by_event_id("evt_missing").await.unwrap().is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Durability & Schema
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn jobs_survive_reopening_the_database() {
        let dir = TempDir::new().unwrap();
        let job = {
            let store = open(&dir).await;
            let job = store.enqueue(grant("u123").for_event("evt_1")).await.unwrap().into_job();
            store.close().await;
            job
        };

        let reopened = open(&dir).await;

        assert_eq!(reopened.list_pending().await.unwrap(), vec![job]);
        assert!(!reopened.enqueue(grant("u123").for_event("evt_1")).await.unwrap().is_created());
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();
    }

    #[tokio::test]
    async fn ensure_schema_upgrades_table_without_event_id_column() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::for_path(dir.path().join("payments.db"));
        let store = SqliteRoleJobStore::connect(&config).await.unwrap();
        sqlx::query(
            "CREATE TABLE role_jobs (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             discord_user_id TEXT NOT NULL, action TEXT NOT NULL, reason TEXT, \
             created_at_utc TEXT NOT NULL, done INTEGER NOT NULL DEFAULT 0)",
        )
        .execute(&store.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO role_jobs (discord_user_id, action, reason, created_at_utc) \
             VALUES ('old', 'grant', NULL, '2024-01-01T00:00:00Z')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        store.ensure_schema().await.unwrap();

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].subject_id.as_str(), "old");
        assert_eq!(pending[0].event_id, None);
        assert!(store.enqueue(grant("new").for_event("evt_1")).await.unwrap().is_created());
    }

    #[tokio::test]
    async fn undecodable_rows_are_skipped_and_healthy_rows_still_listed() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        sqlx::query(
            "INSERT INTO role_jobs (discord_user_id, action, created_at_utc) \
             VALUES (' ', 'grant', '2024-01-01T00:00:00Z'), \
                    ('u1', 'promote', '2024-01-01T00:00:00Z')",
        )
        .execute(&store.pool)
        .await
        .unwrap();
        store.enqueue(grant("u123").for_event("evt_1")).await.unwrap();

        let pending = store.list_pending().await.unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].subject_id.as_str(), "u123");
        // The skipped row can still be cleared by id
        store.mark_done(RoleJobId::from_i64(1)).await.unwrap();
    }

    #[tokio::test]
    async fn legacy_table_with_blank_subject_and_naive_timestamp_still_drains() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::for_path(dir.path().join("payments.db"));
        let store = SqliteRoleJobStore::connect(&config).await.unwrap();
        sqlx::query(
            "CREATE TABLE role_jobs (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             discord_user_id TEXT NOT NULL, action TEXT NOT NULL, reason TEXT, \
             created_at_utc TEXT NOT NULL, done INTEGER NOT NULL DEFAULT 0)",
        )
        .execute(&store.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO role_jobs (discord_user_id, action, reason, created_at_utc) \
             VALUES (' ', 'grant', 'checkout.session.completed', '2024-01-01T10:00:00.123456'), \
                    ('legacy', 'grant', 'checkout.session.completed', '2024-01-01T10:00:01.000001')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        store.ensure_schema().await.unwrap();
        store.enqueue(grant("u123").for_event("evt_1")).await.unwrap();

        let subjects: Vec<_> = store
            .list_pending()
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.subject_id.to_string())
            .collect();
        assert_eq!(subjects, vec!["legacy", "u123"]);
    }

    #[test]
    fn created_at_accepts_naive_iso_as_utc() {
        let ts = parse_created_at("2024-01-15T10:30:00.123456").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-15T10:30:00.123456Z");
        assert!(parse_created_at("yesterday").is_err());
    }
}
