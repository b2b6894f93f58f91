//! JSON document store
//!
//! Documents are addressed by slash-separated keys relative to a root, e.g.
//! `present.json` or `result/26027期_预测概率.json`.

use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::domain::extract_period_number;
use crate::error::{PoolcastError, Result};

pub trait DocumentStore: Send + Sync {
    /// Read a document. `Ok(None)` when the key does not exist.
    fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Write a document, creating parent namespaces as needed
    fn write(&self, key: &str, document: &Value) -> Result<()>;

    /// Keys directly under `prefix` (empty string = root)
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Human-readable location of a key, for logs and report metadata
    fn locate(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Highest period number among `{prefix}/{number}{suffix}` keys
pub fn highest_local_period<S: DocumentStore + ?Sized>(
    store: &S,
    prefix: &str,
    suffix: &str,
) -> Result<Option<u64>> {
    let highest = store
        .list(prefix)?
        .iter()
        .filter_map(|key| {
            let name = key.rsplit('/').next().unwrap_or(key);
            let head = name.strip_suffix(suffix)?;
            if head.is_empty() || !head.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            Some(extract_period_number(Some(head)))
        })
        .filter(|n| *n > 0)
        .max();

    Ok(highest)
}

/// Filesystem-backed store writing pretty-printed UTF-8 JSON
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl DocumentStore for FsDocumentStore {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Invalid UTF-8 surfaces as a decode error, same as malformed JSON
        let value = serde_json::from_slice(&bytes)?;
        Ok(Some(value))
    }

    fn write(&self, key: &str, document: &Value) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(document)?;
        std::fs::write(&path, content)?;
        debug!(path = %path.display(), "wrote document");
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.path_for(prefix);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            keys.push(join_key(prefix, &name));
        }
        keys.sort();
        Ok(keys)
    }

    fn locate(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}

/// In-process store, used by tests and dry runs
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    docs: Mutex<BTreeMap<String, Value>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, key: &str, document: Value) -> Self {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(key.to_string(), document);
        }
        self
    }

    fn docs(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>> {
        self.docs
            .lock()
            .map_err(|_| PoolcastError::Internal("document store lock poisoned".into()))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.docs()?.get(key).cloned())
    }

    fn write(&self, key: &str, document: &Value) -> Result<()> {
        self.docs()?.insert(key.to_string(), document.clone());
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.trim_matches('/');
        let keys = self
            .docs()?
            .keys()
            .filter(|key| match key.rsplit_once('/') {
                Some((dir, _)) => dir == prefix,
                None => prefix.is_empty(),
            })
            .cloned()
            .collect();
        Ok(keys)
    }
}

fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
