use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentStore, StoreError, StoreResult};

/// Documents that live as long as the process. Writes can be switched off
/// to simulate a broken disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Value>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.docs.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, doc: &Value) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("writes disabled")));
        }
        self.docs.write().await.insert(key.to_owned(), doc.clone());
        Ok(())
    }
}
