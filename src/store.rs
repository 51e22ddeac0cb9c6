//! Key-value persistence service.
//!
//! An in-memory JSON document with optional file durability: every write
//! replaces the whole backing file through a temp-file rename, so a failed
//! write can never leave a half-written store behind.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct Store {
    path: Option<PathBuf>,
    entries: Mutex<serde_json::Map<String, Value>>,
}

impl Store {
    /// Volatile store with no backing file (tests, dry runs).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(serde_json::Map::new()),
        }
    }

    /// Open a file-backed store, loading the existing document if present.
    /// An unreadable or malformed file is treated as "no data".
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<serde_json::Map<String, Value>>(&bytes) {
                Ok(entries) => {
                    debug!("Loaded store from {:?} ({} keys)", path, entries.len());
                    entries
                }
                Err(e) => {
                    warn!("Store file {:?} is malformed ({}), starting empty", path, e);
                    serde_json::Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => serde_json::Map::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read store file {:?}", path))
            }
        };

        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    /// Fetch the requested keys. Missing keys are simply absent from the
    /// returned map.
    pub async fn get(&self, keys: &[&str]) -> HashMap<String, Value> {
        let entries = self.entries.lock().unwrap();
        keys.iter()
            .filter_map(|key| {
                entries
                    .get(*key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect()
    }

    /// Fetch a single key.
    pub async fn get_one(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Merge the given entries into the store and persist.
    pub async fn set(&self, updates: HashMap<String, Value>) -> Result<()> {
        let snapshot = {
            let mut entries = self.entries.lock().unwrap();
            for (key, value) in updates {
                entries.insert(key, value);
            }
            entries.clone()
        };

        self.save(&snapshot).await
    }

    /// Convenience single-key write.
    pub async fn set_one(&self, key: &str, value: Value) -> Result<()> {
        self.set(HashMap::from([(key.to_string(), value)])).await
    }

    async fn save(&self, snapshot: &serde_json::Map<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(snapshot).context("failed to serialize store")?;

        // Whole-file replacement: write a sibling temp file, then rename
        // over the store so readers never observe a partial document.
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .with_context(|| format!("failed to write store temp file {:?}", tmp_path))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .with_context(|| format!("failed to replace store file {:?}", path))?;

        debug!("Persisted store to {:?} ({} bytes)", path, bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_returns_only_present_keys() {
        let store = Store::in_memory();
        store.set_one("alpha", json!(1)).await.unwrap();

        let result = store.get(&["alpha", "missing"]).await;
        assert_eq!(result.len(), 1);
        assert_eq!(result["alpha"], json!(1));
    }

    #[tokio::test]
    async fn test_set_merges_without_dropping_other_keys() {
        let store = Store::in_memory();
        store.set_one("keep", json!("kept")).await.unwrap();
        store
            .set(HashMap::from([
                ("a".to_string(), json!(1)),
                ("b".to_string(), json!(2)),
            ]))
            .await
            .unwrap();

        assert_eq!(store.get_one("keep").await, Some(json!("kept")));
        assert_eq!(store.get_one("a").await, Some(json!(1)));
        assert_eq!(store.get_one("b").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_file_backed_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = Store::open(&path).await.unwrap();
            store.set_one("knownWords", json!(["cat", "sat"])).await.unwrap();
        }

        let reopened = Store::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_one("knownWords").await,
            Some(json!(["cat", "sat"]))
        );
    }

    #[tokio::test]
    async fn test_malformed_store_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, b"not json at all").await.unwrap();

        let store = Store::open(&path).await.unwrap();
        assert!(store.get_one("anything").await.is_none());
    }
}
