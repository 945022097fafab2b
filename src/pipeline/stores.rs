//! Result store interface and in-memory implementation.

use std::collections::HashMap;

use dashmap::DashMap;
use serde_json::Value;

use crate::core::errors::{PipelineError, Result};

/// Where component outputs are saved during a run.
pub trait ResultStore: Send + Sync {
    /// Save `value` under `key`. With `overwrite` set to false, a second
    /// add for the same key is rejected with
    /// [`PipelineError::DuplicateResult`].
    fn add(&self, key: &str, value: Value, overwrite: bool) -> Result<()>;

    /// Retrieve the value for `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Snapshot of everything currently stored.
    fn all(&self) -> HashMap<String, Value>;

    /// Remove everything from the store.
    fn empty(&self);
}

/// Simple in-memory store backed by a concurrent map, keyed by component
/// name.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: DashMap<String, Value>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for InMemoryStore {
    fn add(&self, key: &str, value: Value, overwrite: bool) -> Result<()> {
        if !overwrite && self.data.contains_key(key) {
            return Err(PipelineError::DuplicateResult(key.to_string()));
        }
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    fn all(&self) -> HashMap<String, Value> {
        self.data
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn empty(&self) {
        self.data.clear();
    }
}
