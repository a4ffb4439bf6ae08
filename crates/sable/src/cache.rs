//! Caching of compiled stylesheets.
//!
//! A [`CacheStore`] is a key/value store for opaque bytes, guarded by a
//! content hash: an entry stored under one hash is never returned for
//! another. The compiler stores a serialized [`Artifact`] per source and
//! reuses it while the content hash matches and none of the artifact's
//! dependencies changed since it was compiled.

mod chained;
mod filesystem;
mod memory;

use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{config::Options, error::SableError, importer::SourceId};

pub use chained::ChainedStore;
pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;

/// Identifies a cached stylesheet: a namespace (such as the importer's
/// root) and a name within it.
pub type CacheKey = (String, String);

/// A store for compiled stylesheets.
pub trait CacheStore: fmt::Debug {
    /// Store `bytes` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be written. Callers treat this as
    /// non-fatal.
    fn store(&self, key: &CacheKey, content_hash: &str, bytes: &[u8]) -> Result<(), SableError>;

    /// The bytes stored under `key`, if they were stored with
    /// `content_hash`.
    ///
    /// Anything that prevents reading a valid entry is a miss.
    fn retrieve(&self, key: &CacheKey, content_hash: &str) -> Option<Vec<u8>>;
}

/// Hash of everything that determines the output for `source`.
pub(crate) fn content_hash(source: &str, options: &Options) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0]);
    hasher.update(
        format!(
            "{}|{}|{}|{}",
            options.style(),
            options.syntax(),
            options.line_comments(),
            env!("CARGO_PKG_VERSION")
        )
        .as_bytes(),
    );
    hex::encode(hasher.finalize())
}

/// A compiled stylesheet as kept in a cache store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Artifact {
    pub css: String,
    /// Milliseconds since the Unix epoch.
    pub compiled_at: u64,
    pub dependencies: Vec<SourceId>,
}

impl Artifact {
    pub fn new(css: String, dependencies: Vec<SourceId>, compiled_at: SystemTime) -> Self {
        let millis = compiled_at
            .duration_since(UNIX_EPOCH)
            .map(|d| {
                // Rounded up, so a file written before `compiled_at` never
                // looks newer than the artifact.
                let millis = d.as_millis() + u128::from(d.subsec_nanos() % 1_000_000 != 0);
                u64::try_from(millis).unwrap_or(u64::MAX)
            })
            .unwrap_or(0);
        Self {
            css,
            compiled_at: millis,
            dependencies,
        }
    }

    pub fn compiled_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.compiled_at)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SableError> {
        serde_json::to_vec(self).map_err(|err| SableError::Cache(err.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SableError> {
        serde_json::from_slice(bytes).map_err(|err| SableError::Cache(err.to_string()))
    }
}
