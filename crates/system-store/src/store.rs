use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Durable key → JSON document capability.
#[async_trait]
pub trait SystemStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Upsert: inserts or replaces the value under `key`.
    async fn put(&self, key: &str, value: Value) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// File-backed system store: one JSON document on disk, loaded on open and
/// rewritten on every mutation. Mutations are serialized by an async mutex.
pub struct FileSystemStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl FileSystemStore {
    /// Open (or create) the store at `path`. A corrupted file is logged and
    /// replaced with an empty store on the next write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(err) => {
                    log::warn!("System store corrupted at {}: {err}", path.display());
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        log::debug!("Opened system store at {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl SystemStore for FileSystemStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.persist(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::open(temp_dir.path().join("system.json"))
            .await
            .unwrap();

        assert_eq!(store.get("hs_code_metadata_columns").await.unwrap(), None);

        let value = json!({"columns": [{"name": "productcode", "nullable": true}]});
        store.put("hs_code_metadata_columns", value.clone()).await.unwrap();
        assert_eq!(store.get("hs_code_metadata_columns").await.unwrap(), Some(value));

        store.delete("hs_code_metadata_columns").await.unwrap();
        assert_eq!(store.get("hs_code_metadata_columns").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_is_upsert() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::open(temp_dir.path().join("system.json"))
            .await
            .unwrap();

        store.put("key", json!(1)).await.unwrap();
        store.put("key", json!(2)).await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn contents_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("system.json");

        {
            let store = FileSystemStore::open(&path).await.unwrap();
            store.put("key", json!({"a": 1})).await.unwrap();
        }

        let reopened = FileSystemStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("key").await.unwrap(), Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn corrupted_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("system.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = FileSystemStore::open(&path).await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), None);
    }
}
