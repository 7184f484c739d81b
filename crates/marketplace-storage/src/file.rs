//! File-backed durable store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{KeyValueStore, StorageError, StorageResult};

/// Durable key-value store kept in a single JSON object file.
///
/// The whole map is loaded on [`FileStore::open`]. Every write rewrites the
/// file through a sibling temp file and a rename, so a crash mid-write
/// leaves either the old or the new contents on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`.
    ///
    /// A missing file is an empty store. The file is created on first write.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let store = FileStore::open("data/cart.json").await?;
    /// ```
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => serde_json::from_str::<HashMap<String, String>>(&content).map_err(
                |e| StorageError::Corrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                },
            )?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "opened file store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, entries: &HashMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string(entries)?;
        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Sibling temp file for `path`, e.g. `cart.json` -> `cart.json.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        let previous = entries.insert(key.to_string(), value);

        if let Err(e) = self.flush(&entries).await {
            // Keep memory in line with what is on disk.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.flush(&entries).await {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store.json")).await.unwrap();

        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        store.set("k", "[1,2,3]".to_string()).await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("[1,2,3]"));
    }

    #[tokio::test]
    async fn test_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        store.set("a", "1".to_string()).await.unwrap();
        store.set("b", "2".to_string()).await.unwrap();
        store.remove("a").await.unwrap();

        let reopened = FileStore::open(&path).await.unwrap();
        assert!(reopened.get("a").await.unwrap().is_none());
        assert_eq!(reopened.get("b").await.unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        assert_eq!(temp_path(Path::new("data/cart.json")), PathBuf::from("data/cart.json.tmp"));
        assert_ne!(temp_path(Path::new("cart.json")), temp_path(Path::new("cart.toml")));
    }

    #[tokio::test]
    async fn test_sibling_stores_with_same_stem() {
        let dir = tempfile::tempdir().unwrap();
        let json = FileStore::open(dir.path().join("cart.json")).await.unwrap();
        let toml = FileStore::open(dir.path().join("cart.toml")).await.unwrap();

        let (a, b) = tokio::join!(
            json.set("k", "json".to_string()),
            toml.set("k", "toml".to_string())
        );
        a.unwrap();
        b.unwrap();

        let json = FileStore::open(dir.path().join("cart.json")).await.unwrap();
        let toml = FileStore::open(dir.path().join("cart.toml")).await.unwrap();
        assert_eq!(json.get("k").await.unwrap().as_deref(), Some("json"));
        assert_eq!(toml.get("k").await.unwrap().as_deref(), Some("toml"));
        assert!(!dir.path().join("cart.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileStore::open(&path).await;
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("sub");
        let store = FileStore::open(parent.join("store.json")).await.unwrap();

        // Parent is now a regular file, so creating the directory fails.
        std::fs::write(&parent, "").unwrap();
        assert!(store.set("k", "v".to_string()).await.is_err());
        assert!(store.get("k").await.unwrap().is_none());
    }
}
