//! Content-addressed cache keys

use crate::query::ExtractionQuery;
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic digest of a document's text and the query asked of it
///
/// Every input is length-prefixed before hashing so that moving bytes
/// between the text and the instruction always changes the key.
///
/// # Examples
///
/// ```
/// use papersift_domain::{CacheKey, ExtractionQuery};
///
/// let query = ExtractionQuery::new("extract", ["a"]);
/// let k1 = CacheKey::compute("document text", &query);
/// let k2 = CacheKey::compute("document text", &query);
/// assert_eq!(k1, k2);
/// assert_eq!(k1.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for `text` under `query`
    pub fn compute(text: &str, query: &ExtractionQuery) -> Self {
        let mut hasher = Sha256::new();
        update_framed(&mut hasher, text.as_bytes());
        update_framed(&mut hasher, query.instruction().as_bytes());
        hasher.update((query.field_count() as u64).to_le_bytes());
        for name in query.field_names() {
            update_framed(&mut hasher, name.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap an existing hex digest, e.g. one read back from disk
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The lowercase hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn update_framed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
