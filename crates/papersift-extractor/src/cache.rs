//! Persistent response cache
//!
//! Raw LLM responses are stored in a single JSON object keyed by
//! [`CacheKey`](papersift_domain::CacheKey) hex digests. Every new entry is
//! flushed to disk before `set` returns; the file is rewritten through a
//! temporary sibling and renamed into place so a crash never leaves a
//! half-written cache.

use crate::error::ExtractorError;
use papersift_domain::CacheKey;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mapping from cache key to raw response text
#[derive(Debug, Default)]
pub struct ResponseCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl ResponseCache {
    /// Open the cache at `path`, loading existing entries if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ExtractorError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    ExtractorError::Cache(format!(
                        "Failed to read cache {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!("Loaded {} cached responses from {}", entries.len(), path.display());
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// Cache that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a response
    pub fn get(&self, key: &CacheKey) -> Option<&str> {
        self.entries.get(key.as_str()).map(String::as_str)
    }

    /// Whether `key` has an entry
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store a response and persist the cache
    ///
    /// Entries are write-once: an existing key keeps its response and a
    /// conflicting value is only logged. Returns `true` if a new entry was
    /// added. The in-memory entry survives a failed write.
    pub fn set(&mut self, key: &CacheKey, response: &str) -> Result<bool, ExtractorError> {
        if let Some(existing) = self.entries.get(key.as_str()) {
            if existing != response {
                warn!("Cache entry {} already set; keeping existing response", key);
            }
            return Ok(false);
        }

        self.entries
            .insert(key.as_str().to_string(), response.to_string());
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<(), ExtractorError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ExtractorError::Cache(format!(
                        "Failed to create cache directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|e| {
            ExtractorError::Cache(format!("Failed to write cache {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, path).map_err(|e| {
            ExtractorError::Cache(format!("Failed to replace cache {}: {}", path.display(), e))
        })?;
        Ok(())
    }
}
