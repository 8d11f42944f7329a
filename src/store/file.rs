use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tracing::warn;

use super::{DocumentStore, StoreError, StoreResult};

/// One pretty-printed JSON file per key, e.g. `users.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable document, starting empty");
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, doc: &Value) -> StoreResult<()> {
        let path = self.path_for(key)?;
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
        }

        let tmp = temp_path(&path);
        fs::write(&tmp, serde_json::to_vec_pretty(doc)?).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
