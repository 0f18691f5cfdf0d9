//! SQLite-backed page store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::{StoreError, StoreErrorKind};
use crate::page::{Page, SearchMatch};
use crate::search::Needle;
use crate::store::PageStore;

const BACKEND: &str = "Sqlite";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS pages (
    path TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS pages_created_at ON pages (created_at);
";

/// Row as stored; `created_at` is microseconds since the Unix epoch.
#[derive(sqlx::FromRow)]
struct PageRow {
    path: String,
    content: String,
    created_at: i64,
}

impl TryFrom<PageRow> for Page {
    type Error = StoreError;

    fn try_from(row: PageRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::from_timestamp_micros(row.created_at).ok_or_else(|| {
            StoreError::new(StoreErrorKind::Corrupt)
                .with_backend(BACKEND)
                .with_key(row.path.clone())
        })?;
        Ok(Self {
            key: row.path,
            content: row.content,
            created_at,
        })
    }
}

fn sqlite_error(err: sqlx::Error) -> StoreError {
    StoreError::from(err).with_backend(BACKEND)
}

/// [`PageStore`] persisted in a single SQLite table.
///
/// ```text
/// pages(path TEXT PRIMARY KEY, content TEXT, created_at INTEGER)
/// ```
///
/// Search pre-filters with `LIKE` (ASCII case-insensitive) and then
/// re-checks every candidate with full Unicode folding, so non-ASCII letters
/// only match when their case agrees with the query.
#[derive(Clone, Debug)]
pub struct SqlitePageStore {
    pool: SqlitePool,
}

impl SqlitePageStore {
    /// Open (creating if missing) the database at `url` and apply the schema.
    ///
    /// # Arguments
    ///
    /// * `url` - `sqlx` SQLite URL (e.g., `sqlite://pages.db?mode=rwc`)
    /// * `max_connections` - Pool size
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(sqlite_error)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(sqlite_error)?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database on a single pinned connection.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(sqlite_error)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(sqlite_error)?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(sqlite_error)?;
        tracing::debug!("page store schema ready");
        Ok(Self { pool })
    }

    /// Close the pool, waiting for in-flight statements.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Current time truncated to the stored microsecond precision.
fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

#[async_trait]
impl PageStore for SqlitePageStore {
    async fn get(&self, key: &str) -> Result<Option<Page>, StoreError> {
        let row: Option<PageRow> =
            sqlx::query_as("SELECT path, content, created_at FROM pages WHERE path = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| sqlite_error(e).with_key(key))?;
        row.map(Page::try_from).transpose()
    }

    async fn upsert(&self, key: &str, content: &str) -> Result<Page, StoreError> {
        let row: PageRow = sqlx::query_as(
            "INSERT INTO pages (path, content, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (path) DO UPDATE
             SET content = excluded.content, created_at = excluded.created_at
             RETURNING path, content, created_at",
        )
        .bind(key)
        .bind(content)
        .bind(now_micros())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| sqlite_error(e).with_key(key))?;
        Page::try_from(row)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM pages WHERE path = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| sqlite_error(e).with_key(key))?;
        Ok(())
    }

    async fn search_by_substring(&self, query: &str) -> Result<Vec<SearchMatch>, StoreError> {
        let needle = Needle::new(query);

        // Case folding happens in Rust: SQLite's LIKE only folds ASCII.
        let rows: Vec<PageRow> = if needle.is_empty() {
            sqlx::query_as(
                "SELECT path, '' AS content, created_at FROM pages
                 ORDER BY created_at DESC, rowid DESC",
            )
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as(
                "SELECT path, content, created_at FROM pages
                 ORDER BY created_at DESC, rowid DESC",
            )
            .fetch_all(&self.pool)
            .await
        }
        .map_err(sqlite_error)?;

        Ok(rows
            .iter()
            .filter_map(|row| needle.match_page(&row.path, &row.content))
            .collect())
    }

    async fn list_group(&self, group: &str) -> Result<Vec<Page>, StoreError> {
        let prefix = format!("{group}/");
        let rows: Vec<PageRow> = sqlx::query_as(
            "SELECT path, content, created_at FROM pages
             WHERE substr(path, 1, length(?1)) = ?1
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(&prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlite_error)?;
        rows.into_iter().map(Page::try_from).collect()
    }
}
