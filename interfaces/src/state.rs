use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::defs::SeenRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already present for {url}")]
    DuplicateKey { url: String },

    #[error("dedup store I/O error: {0}")]
    Io(#[from] sqlx::Error),
}

/// Durable set of item identities that have already been attempted.
///
/// Implementations must accept concurrent `insert` calls for distinct keys.
/// Each insert is its own commit: once it returns `Ok`, the item stays seen
/// even if the process dies immediately afterwards.
#[async_trait]
pub trait DedupStore: Send + Sync {
    async fn exists(&self, url: &str) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::DuplicateKey`] when `record.url` is already stored.
    async fn insert(&self, record: &SeenRecord) -> Result<(), StoreError>;

    /// Flush and release the underlying handle.
    async fn close(&self);
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS seen (
        url TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        published_at TEXT NOT NULL,
        summary TEXT NOT NULL,
        seen_at TEXT NOT NULL
    )
"#;

/// SQLite-backed [`DedupStore`]. One file, one `seen` table keyed by url.
pub struct SqliteDedupStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteDedupStore {
    /// Open (creating if needed) the store at `path` with room for
    /// `max_writers` concurrent connections.
    pub async fn open(path: impl AsRef<Path>, max_writers: u32) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_writers.max(1))
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        info!(path = %path.display(), "Opened dedup store");
        Ok(Self { pool, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, url: &str) -> Result<Option<SeenRecord>, StoreError> {
        let row = sqlx::query("SELECT url, title, published_at, summary FROM seen WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(SeenRecord {
                url: row.try_get("url")?,
                title: row.try_get("title")?,
                published_at: row.try_get("published_at")?,
                summary: row.try_get("summary")?,
            })),
            None => Ok(None),
        }
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM seen")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as u64)
    }
}

#[async_trait]
impl DedupStore for SqliteDedupStore {
    async fn exists(&self, url: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM seen WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn insert(&self, record: &SeenRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO seen (url, title, published_at, summary, seen_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.url)
        .bind(&record.title)
        .bind(&record.published_at)
        .bind(&record.summary)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(url = %record.url, "Recorded item as seen");
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateKey {
                    url: record.url.clone(),
                })
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!(path = %self.path.display(), "Closed dedup store");
    }
}
