//! Durable translation cache backed by SQLite (sqlx).
//!
//! Entries live in a generic `cache_entries` key/value table that other
//! subsystems may share; translation rows are recognised by their key prefix.
//! Expiry is evaluated lazily on read, with `purge_expired` for housekeeping.

use super::{CacheEntry, Fingerprint, TranslationCache, CACHE_NAMESPACE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (or create) the cache database at `database_url`,
    /// e.g. `sqlite://polyglot-cache.db`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context(format!("Invalid cache database URL: {}", database_url))?
            .create_if_missing(true);
        Self::connect_with(options, database_url).await
    }

    /// Open (or create) the cache database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect_with(options, &path.display().to_string()).await
    }

    async fn connect_with(options: SqliteConnectOptions, label: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context(format!("Failed to open cache database at {}", label))?;

        let cache = Self::from_pool(pool).await?;
        info!("Translation cache ready at {}", label);
        Ok(cache)
    }

    /// Wrap an existing pool, creating the table if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .context("Failed to create cache_entries table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_cache_entries_expires_at ON cache_entries (expires_at)",
        )
        .execute(&pool)
        .await
        .context("Failed to create cache_entries index")?;

        Ok(Self { pool })
    }

    /// Delete every expired row, translation or not.
    pub async fn purge_expired(&self) -> Result<u64> {
        let now = Utc::now().timestamp_millis();
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to purge expired cache entries")?;
        Ok(result.rows_affected())
    }

    /// Number of translation rows currently stored (expired included).
    pub async fn translation_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cache_entries WHERE substr(cache_key, 1, ?2) = ?1",
        )
        .bind(CACHE_NAMESPACE)
        .bind(CACHE_NAMESPACE.len() as i64)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count cache entries")?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl TranslationCache for SqliteCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<String>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT value, expires_at FROM cache_entries WHERE cache_key = ?1")
                .bind(fingerprint.as_key())
                .fetch_optional(&self.pool)
                .await
                .context("Failed to read cache entry")?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at > Utc::now().timestamp_millis() {
            return Ok(Some(value));
        }

        // Only remove the row we saw; a concurrent put may have refreshed it.
        sqlx::query("DELETE FROM cache_entries WHERE cache_key = ?1 AND expires_at = ?2")
            .bind(fingerprint.as_key())
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .context("Failed to evict expired cache entry")?;
        debug!("Evicted expired cache entry {}", fingerprint);

        Ok(None)
    }

    async fn put(&self, fingerprint: &Fingerprint, value: &str, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, ttl);

        sqlx::query(
            "INSERT INTO cache_entries (cache_key, value, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (cache_key) DO UPDATE SET
                value = excluded.value,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
        )
        .bind(fingerprint.as_key())
        .bind(&entry.value)
        .bind(entry.created_at.timestamp_millis())
        .bind(entry.expires_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to store cache entry")?;

        Ok(())
    }

    async fn invalidate_all(&self) -> Result<u64> {
        // Single statement, so readers see either all rows or none.
        let result =
            sqlx::query("DELETE FROM cache_entries WHERE substr(cache_key, 1, ?2) = ?1")
                .bind(CACHE_NAMESPACE)
                .bind(CACHE_NAMESPACE.len() as i64)
                .execute(&self.pool)
                .await
                .context("Failed to clear translation cache")?;
        Ok(result.rows_affected())
    }
}
