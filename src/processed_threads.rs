pub mod store;

use log::info;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::error::{PipelineError, Result};
use store::KeyValueStore;

pub const THREAD_ID_SET: &str = "read_threads";

/// Threads that already got their reply. Only grows.
pub struct ProcessedThreads<S: KeyValueStore> {
    store: S,
    thread_ids: BTreeSet<String>,
}

impl<S: KeyValueStore> ProcessedThreads<S> {
    /// Reads the set from the store, creating and syncing an empty one on first run.
    pub fn load(mut store: S) -> Result<Self> {
        let thread_ids = match store.get(THREAD_ID_SET) {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                PipelineError::Store(format!("{} is not a list of thread ids: {}", THREAD_ID_SET, e))
            })?,
            None => {
                info!("No processed threads recorded yet, starting empty");
                store.set(THREAD_ID_SET, Value::Array(Vec::new()));
                store.sync()?;
                BTreeSet::new()
            }
        };
        Ok(Self { store, thread_ids })
    }

    pub fn is_processed(&self, thread_id: &str) -> bool {
        self.thread_ids.contains(thread_id)
    }

    /// Returns only once the new set is synced.
    pub fn mark_processed(&mut self, thread_id: &str) -> Result<()> {
        if !self.thread_ids.insert(thread_id.to_string()) {
            return Ok(());
        }
        let ids = self.thread_ids.iter().cloned().map(Value::String).collect();
        self.store.set(THREAD_ID_SET, Value::Array(ids));
        self.store.sync()
    }

    pub fn len(&self) -> usize {
        self.thread_ids.len()
    }
}
