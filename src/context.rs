//! Shared execution context
//!
//! A thread-safe, insertion-ordered key/value store created once per
//! top-level execution and passed by reference through the whole
//! composition tree. Individual operations are atomic; there is no
//! cross-key transactional guarantee, so sibling parallel branches must
//! not assume read-after-write ordering across keys unless they
//! coordinate themselves.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

/// Insertion-ordered `String -> Value` store shared across a composition
#[derive(Debug, Default)]
pub struct Context {
    entries: RwLock<IndexMap<String, Value>>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cloned value by key
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    /// Insert or overwrite a value. A new key takes the next insertion
    /// slot; overwriting keeps the key's original position.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Remove a key, returning its value. The insertion order of the
    /// remaining keys is preserved.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.write().shift_remove(key)
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Snapshot of the keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Snapshot of all entries in insertion order
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
