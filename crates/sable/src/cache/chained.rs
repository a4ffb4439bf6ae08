use log::{trace, warn};

use crate::error::SableError;

use super::{CacheKey, CacheStore};

/// Tries a list of stores in order.
///
/// Writes go to every store. A hit in a later store is copied into every
/// store before it, so the faster stores at the front fill up over time.
#[derive(Debug, Default)]
pub struct ChainedStore {
    stores: Vec<Box<dyn CacheStore>>,
}

impl ChainedStore {
    pub fn new(stores: Vec<Box<dyn CacheStore>>) -> Self {
        Self { stores }
    }

    pub fn with_store(mut self, store: impl CacheStore + 'static) -> Self {
        self.stores.push(Box::new(store));
        self
    }
}

impl CacheStore for ChainedStore {
    fn store(&self, key: &CacheKey, content_hash: &str, bytes: &[u8]) -> Result<(), SableError> {
        for store in &self.stores {
            store.store(key, content_hash, bytes)?;
        }
        Ok(())
    }

    fn retrieve(&self, key: &CacheKey, content_hash: &str) -> Option<Vec<u8>> {
        for (index, store) in self.stores.iter().enumerate() {
            let Some(bytes) = store.retrieve(key, content_hash) else {
                continue;
            };
            trace!(key:? = key, store = index; "chained cache hit");
            for earlier in &self.stores[..index] {
                if let Err(err) = earlier.store(key, content_hash, &bytes) {
                    warn!(key:? = key, err:% = err; "could not copy cache entry");
                }
            }
            return Some(bytes);
        }
        None
    }
}
