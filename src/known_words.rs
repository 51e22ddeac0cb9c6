//! User vocabulary management.
//!
//! The known-word set is loaded once at session start, mutated through
//! add/remove/import, and persisted after every mutation. The detection
//! pipeline never goes through this type; it reads a snapshot straight from
//! the store so a flush always sees the latest persisted set.

use crate::store::Store;
use anyhow::Result;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

pub const KNOWN_WORDS_KEY: &str = "knownWords";

/// Read the current known-word snapshot. Missing or malformed data is an
/// empty set.
pub async fn load_snapshot(store: &Store) -> HashSet<String> {
    match store.get_one(KNOWN_WORDS_KEY).await {
        Some(value) => serde_json::from_value(value).unwrap_or_default(),
        None => HashSet::new(),
    }
}

/// Session-level handle over the user's known words.
pub struct KnownWords {
    store: Arc<Store>,
    words: HashSet<String>,
}

impl KnownWords {
    pub async fn load(store: Arc<Store>) -> Self {
        let words = load_snapshot(&store).await;
        Self { store, words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Mark a word as known and persist.
    pub async fn add(&mut self, word: &str) -> Result<()> {
        self.words.insert(word.to_lowercase());
        self.persist().await
    }

    /// Unmark a word and persist.
    pub async fn remove(&mut self, word: &str) -> Result<()> {
        self.words.remove(&word.to_lowercase());
        self.persist().await
    }

    /// Merge a batch of words (lowercased) and persist once.
    pub async fn import<I, S>(&mut self, words: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            self.words.insert(word.as_ref().to_lowercase());
        }
        self.persist().await
    }

    /// Sorted copy of the set, for export or display.
    pub fn export(&self) -> Vec<String> {
        let mut words: Vec<String> = self.words.iter().cloned().collect();
        words.sort();
        words
    }

    async fn persist(&self) -> Result<()> {
        self.store
            .set_one(KNOWN_WORDS_KEY, json!(self.export()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_lowercases_and_persists() {
        let store = Arc::new(Store::in_memory());
        let mut known = KnownWords::load(Arc::clone(&store)).await;

        known.add("Cat").await.unwrap();

        assert!(known.contains("cat"));
        assert!(known.contains("CAT"));

        let snapshot = load_snapshot(&store).await;
        assert!(snapshot.contains("cat"));
    }

    #[tokio::test]
    async fn test_remove_persists_immediately() {
        let store = Arc::new(Store::in_memory());
        let mut known = KnownWords::load(Arc::clone(&store)).await;

        known.import(["cat", "sat"]).await.unwrap();
        known.remove("cat").await.unwrap();

        let snapshot = load_snapshot(&store).await;
        assert!(!snapshot.contains("cat"));
        assert!(snapshot.contains("sat"));
    }

    #[tokio::test]
    async fn test_import_merges_with_existing_words() {
        let store = Arc::new(Store::in_memory());
        let mut known = KnownWords::load(Arc::clone(&store)).await;

        known.add("existing").await.unwrap();
        known.import(["New", "WORDS"]).await.unwrap();

        assert_eq!(known.export(), vec!["existing", "new", "words"]);
    }

    #[tokio::test]
    async fn test_load_survives_malformed_stored_value() {
        let store = Arc::new(Store::in_memory());
        store
            .set_one(KNOWN_WORDS_KEY, json!({"not": "an array"}))
            .await
            .unwrap();

        let known = KnownWords::load(store).await;
        assert!(known.is_empty());
    }
}
