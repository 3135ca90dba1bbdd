//! In-memory ordered store
//!
//! BTreeMap-based store with RwLock for concurrency.

use std::collections::BTreeMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::Result;

use super::{BatchOp, KeyRange, KvStore};

/// Volatile ordered key-value store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<Vec<u8>, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: Bytes) -> Result<()> {
        self.data.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        // One write guard for the whole batch keeps it atomic for readers
        let mut data = self.data.write();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan(&self, range: &KeyRange) -> Result<Vec<(Bytes, Bytes)>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let data = self.data.read();
        let iter = data
            .range::<[u8], _>(range.as_slices())
            .map(|(k, v)| (Bytes::copy_from_slice(k), v.clone()));
        Ok(match range.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        })
    }

    fn destroy(&self) -> Result<()> {
        self.data.write().clear();
        Ok(())
    }
}
