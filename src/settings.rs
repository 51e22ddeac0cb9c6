//! Persisted app settings and scheduler configuration.

use crate::store::Store;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SETTINGS_KEY: &str = "settings";
/// Standalone store key for the annotation service API key, kept separate
/// from the settings document so other tools can read/write just the key.
pub const API_KEY_KEY: &str = "openaiApiKey";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default = "default_annotation_model")]
    pub annotation_model: String,
    #[serde(default = "default_annotation_base_url")]
    pub annotation_base_url: String,
}

fn default_annotation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_annotation_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            annotation_model: default_annotation_model(),
            annotation_base_url: default_annotation_base_url(),
        }
    }
}

/// Read settings from the store, falling back to defaults when the document
/// is missing or fails to parse.
pub async fn get_settings(store: &Store) -> AppSettings {
    match store.get_one(SETTINGS_KEY).await {
        Some(value) => serde_json::from_value(value).unwrap_or_default(),
        None => AppSettings::default(),
    }
}

pub async fn write_settings(store: &Store, settings: &AppSettings) -> Result<()> {
    store
        .set_one(SETTINGS_KEY, serde_json::to_value(settings)?)
        .await
}

pub async fn get_api_key(store: &Store) -> Option<String> {
    store
        .get_one(API_KEY_KEY)
        .await
        .and_then(|value| value.as_str().map(str::to_string))
        .filter(|key| !key.is_empty())
}

pub async fn set_api_key(store: &Store, api_key: &str) -> Result<()> {
    store
        .set_one(API_KEY_KEY, serde_json::Value::String(api_key.to_string()))
        .await
}

/// Fixed scheduler parameters for the segment buffer and flush pipeline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Buffer size that triggers an immediate flush.
    pub flush_threshold: usize,
    /// Debounce delay armed on the first buffered segment.
    pub debounce: Duration,
    /// Maximum number of top-ranked unknown words sent for annotation.
    pub annotation_limit: usize,
    /// A flush is skipped when the prior cached segment count is at least
    /// this percentage of the new batch's segment count.
    pub redundancy_percent: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flush_threshold: 10,
            debounce: Duration::from_millis(1000),
            annotation_limit: 50,
            redundancy_percent: 90,
        }
    }
}
