use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, trace, warn};
use sha2::{Digest, Sha256};

use crate::error::SableError;

use super::{CacheKey, CacheStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A cache store keeping one file per entry under a directory.
///
/// Each file starts with two header lines, the version of the compiler
/// that wrote it and the content hash, followed by the payload.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        let namespace = hex::encode(Sha256::digest(key.0.as_bytes()));
        let name = key.1.replace(['/', '\\', ':'], "_");
        self.dir.join(namespace).join(format!("{name}c"))
    }
}

/// Split an entry into its version, content hash and payload.
fn split_entry(bytes: &[u8]) -> Option<(&str, &str, &[u8])> {
    let mut parts = bytes.splitn(3, |&b| b == b'\n');
    let version = std::str::from_utf8(parts.next()?).ok()?;
    let hash = std::str::from_utf8(parts.next()?).ok()?;
    let payload = parts.next()?;
    Some((version, hash, payload))
}

impl CacheStore for FilesystemStore {
    fn store(&self, key: &CacheKey, content_hash: &str, bytes: &[u8]) -> Result<(), SableError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut entry = Vec::with_capacity(VERSION.len() + content_hash.len() + bytes.len() + 2);
        entry.extend_from_slice(VERSION.as_bytes());
        entry.push(b'\n');
        entry.extend_from_slice(content_hash.as_bytes());
        entry.push(b'\n');
        entry.extend_from_slice(bytes);
        fs::write(&path, entry)?;
        trace!(path:? = path; "cache entry written");
        Ok(())
    }

    fn retrieve(&self, key: &CacheKey, content_hash: &str) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path:? = path, err:% = err; "could not read cache entry");
                return None;
            }
        };
        let Some((version, hash, payload)) = split_entry(&bytes) else {
            warn!(path:? = path; "cache entry has no valid header");
            return None;
        };
        if version != VERSION {
            warn!(path:? = path, version; "cache entry written by another version");
            return None;
        }
        if hash != content_hash {
            debug!(path:? = path; "cache entry is stale");
            return None;
        }
        Some(payload.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CacheKey {
        ("/project".to_string(), "styles/main.scss".to_string())
    }

    #[test]
    fn test_store_and_retrieve() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FilesystemStore::new(dir.path());
        store.store(&key(), "abc", b"payload\nwith lines").expect("stores");

        assert_eq!(
            store.retrieve(&key(), "abc").as_deref(),
            Some(&b"payload\nwith lines"[..])
        );
        assert_eq!(store.retrieve(&key(), "other"), None);
        assert_eq!(
            store.retrieve(&("/project".to_string(), "x.scss".to_string()), "abc"),
            None
        );
    }

    #[test]
    fn test_corrupt_entries_are_misses() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FilesystemStore::new(dir.path());
        store.store(&key(), "abc", b"payload").expect("stores");

        let path = store.path_for(&key());
        fs::write(&path, b"0.0.0-old\nabc\npayload").expect("overwrite");
        assert_eq!(store.retrieve(&key(), "abc"), None);

        fs::write(&path, b"garbage").expect("overwrite");
        assert_eq!(store.retrieve(&key(), "abc"), None);
    }
}
