//! Durable documents: whole-value load, whole-value overwrite.

mod file;
mod memory;
mod sqlite;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const USERS_KEY: &str = "users";
pub const HISTORY_KEY: &str = "chat_history";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("invalid document key: {0}")]
    InvalidKey(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `None` when the document was never written or cannot be read back.
    async fn load(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Replaces the whole document. Readers never observe a partial write.
    async fn save(&self, key: &str, doc: &Value) -> StoreResult<()>;
}
