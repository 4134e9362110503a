// src/store/sqlite.rs
//! SQLite-backed store.
//!
//! `url` carries a UNIQUE constraint, and insert-if-absent is a single
//! `INSERT OR IGNORE` whose affected-row count is the answer. No
//! read-then-write pair is ever issued, so concurrent inserts of the same
//! URL from several adapters or processes yield exactly one `true`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::info;

use super::{JobStore, StoreError, StoreResult};
use crate::types::{PersistedJob, Posting, StoreStats};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &str) -> StoreResult<Self> {
        if let Some(dir) = std::path::Path::new(path).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| StoreError::Unavailable(format!("create {}: {e}", dir.display())))?;
            }
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        let store = Self { pool };
        store.run_migrations().await?;
        info!(target: "gate", path, "sqlite store ready");
        Ok(store)
    }

    /// Ephemeral database. One connection, since every in-memory connection
    /// would otherwise see its own empty database.
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT NOT NULL DEFAULT '',
                url TEXT UNIQUE NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                source TEXT NOT NULL,
                posted_date TEXT,
                scraped_at TEXT NOT NULL,
                notified BOOLEAN NOT NULL DEFAULT FALSE
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_notified ON jobs(notified);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct JobRow {
    id: i64,
    title: String,
    company: String,
    location: String,
    url: String,
    description: String,
    source: String,
    posted_date: Option<String>,
    scraped_at: String,
    notified: bool,
}

impl JobRow {
    fn into_job(self) -> StoreResult<PersistedJob> {
        let scraped_at = DateTime::parse_from_rfc3339(&self.scraped_at)
            .map_err(|e| StoreError::Corrupt {
                url: self.url.clone(),
                reason: format!("scraped_at: {e}"),
            })?
            .with_timezone(&Utc);
        // Rows written by older versions may carry free-form dates.
        let posted_date = self
            .posted_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        Ok(PersistedJob {
            id: self.id,
            title: self.title,
            company: self.company,
            location: self.location,
            url: self.url,
            description: self.description,
            source: self.source,
            posted_date,
            scraped_at,
            notified: self.notified,
        })
    }
}

const SELECT_JOB: &str = "SELECT id, title, company, location, url, description, source, posted_date, scraped_at, notified FROM jobs";

#[async_trait]
impl JobStore for SqliteStore {
    async fn insert_if_absent(&self, posting: &Posting) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO jobs (title, company, location, url, description, source, posted_date, scraped_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.location)
        .bind(&posting.url)
        .bind(&posting.description)
        .bind(&posting.source)
        .bind(posting.posted_date.format("%Y-%m-%d").to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_by_key(&self, url: &str) -> StoreResult<Option<PersistedJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOB} WHERE url = ?"))
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        row.map(JobRow::into_job).transpose()
    }

    async fn mark_notified(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE jobs SET notified = TRUE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn list_unnotified(&self) -> StoreResult<Vec<PersistedJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOB} WHERE notified = FALSE ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let (total, notified): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN notified THEN 1 ELSE 0 END), 0) FROM jobs",
        )
        .fetch_one(&self.pool)
        .await?;
        let total = total.max(0) as u64;
        let notified = notified.max(0) as u64;
        Ok(StoreStats {
            total,
            notified,
            pending: total.saturating_sub(notified),
        })
    }
}
