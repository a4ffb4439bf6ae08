use std::{collections::HashMap, sync::Mutex};

use log::trace;

use crate::error::SableError;

use super::{CacheKey, CacheStore};

/// An in-process cache store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, (String, Vec<u8>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn store(&self, key: &CacheKey, content_hash: &str, bytes: &[u8]) -> Result<(), SableError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SableError::Cache("memory store lock poisoned".to_string()))?;
        entries.insert(key.clone(), (content_hash.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn retrieve(&self, key: &CacheKey, content_hash: &str) -> Option<Vec<u8>> {
        let entries = self.entries.lock().ok()?;
        let (hash, bytes) = entries.get(key)?;
        if hash != content_hash {
            trace!(key:? = key; "memory cache entry is stale");
            return None;
        }
        Some(bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_guards_entries() {
        let store = MemoryStore::new();
        let key = ("memory".to_string(), "a.scss".to_string());
        store.store(&key, "h1", b"css").expect("stores");

        assert_eq!(store.retrieve(&key, "h1").as_deref(), Some(&b"css"[..]));
        assert_eq!(store.retrieve(&key, "h2"), None);
        assert_eq!(store.len(), 1);
    }
}
