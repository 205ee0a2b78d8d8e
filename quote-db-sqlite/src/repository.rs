use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use quote_core::{KeyValueStore, RepositoryError};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::debug;

/// [`KeyValueStore`] backed by a single `kv_store` table.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database at `database_url`, creating the file if needed.
    ///
    /// Accepts a sqlx URL (`sqlite:quotes.db`), a bare file path or
    /// `:memory:`. An in-memory database lives on a single connection that
    /// is never recycled, otherwise its contents would vanish with it.
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let in_memory = is_in_memory(database_url);
        let options = if database_url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(database_url)
                .map_err(|e| RepositoryError::Configuration(e.to_string()))?
        } else if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| RepositoryError::Configuration(e.to_string()))?
        } else {
            SqliteConnectOptions::new().filename(database_url)
        }
        .create_if_missing(true);

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| {
                RepositoryError::Connection(format!(
                    "Failed to connect to database '{}': {}",
                    database_url, e
                ))
            })?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to run migrations: {}", e)))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let text: String = row
            .try_get("value")
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| RepositoryError::Serialization(format!("key '{}': {}", key, e)))
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), RepositoryError> {
        let text = serde_json::to_string(value)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(&text)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        debug!(key, bytes = text.len(), "stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }
}
