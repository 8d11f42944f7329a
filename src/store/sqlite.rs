use async_trait::async_trait;
use serde_json::Value;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tracing::warn;

use super::{DocumentStore, StoreResult};

/// Documents as rows of a single `documents` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        // one connection keeps `sqlite::memory:` a single database
        let max_connections = if url.contains(":memory:") { 1 } else { 16 };
        let db_pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Self::from_pool(db_pool).await
    }

    pub async fn from_pool(db_pool: SqlitePool) -> StoreResult<Self> {
        sqlx::query("CREATE TABLE IF NOT EXISTS documents (key TEXT PRIMARY KEY, body TEXT NOT NULL)")
            .execute(&db_pool)
            .await?;
        Ok(Self { db_pool })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT body FROM documents WHERE key=?")
            .bind(key)
            .fetch_optional(&self.db_pool)
            .await?;

        let Some((body,)) = row else {
            return Ok(None);
        };

        match serde_json::from_str(&body) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                warn!(key, error = %e, "unreadable document, starting empty");
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, doc: &Value) -> StoreResult<()> {
        sqlx::query("INSERT INTO documents (key,body) VALUES (?,?) ON CONFLICT(key) DO UPDATE SET body=excluded.body")
            .bind(key)
            .bind(serde_json::to_string(doc)?)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }
}
