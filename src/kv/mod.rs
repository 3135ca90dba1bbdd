//! Key-value store abstraction
//!
//! The ordered key-value capability the storage layer is built on.
//!
//! ## Responsibilities
//! - Point reads and writes on byte keys
//! - Atomic multi-operation batches
//! - Range scans in ascending byte order
//! - Release (`close`) and removal (`destroy`) of the underlying data
//!
//! ## Implementations
//! - [`MemoryStore`]: `BTreeMap` behind a `RwLock`, for tests and callers that
//!   multiplex their own stores
//! - [`LogStore`]: path-backed store, WAL replayed into an ordered index
//! - [`PrefixedStore`]: one named namespace inside a shared store

mod log_store;
mod memory;
mod prefixed;
mod wal;

use std::ops::Bound;

use bytes::Bytes;

use crate::error::Result;

pub use log_store::LogStore;
pub use memory::MemoryStore;
pub use prefixed::PrefixedStore;
pub use wal::{RecoveryResult, WalOp, WalRecord};

/// A single mutation inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Bytes },
    Delete { key: Vec<u8> },
}

impl BatchOp {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Bytes>) -> Self {
        BatchOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOp::Delete { key: key.into() }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

/// Bounds of a range scan, plus an optional cap on returned entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Bound<Vec<u8>>,
    pub end: Bound<Vec<u8>>,
    pub limit: Option<usize>,
}

impl KeyRange {
    pub fn new(start: Bound<Vec<u8>>, end: Bound<Vec<u8>>) -> Self {
        Self {
            start,
            end,
            limit: None,
        }
    }

    /// Every key in the store
    pub fn all() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// Return at most `limit` entries
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True if `key` falls inside the bounds (ignores the limit)
    pub fn contains(&self, key: &[u8]) -> bool {
        let above_start = match &self.start {
            Bound::Included(s) => key >= s.as_slice(),
            Bound::Excluded(s) => key > s.as_slice(),
            Bound::Unbounded => true,
        };
        let below_end = match &self.end {
            Bound::Included(e) => key <= e.as_slice(),
            Bound::Excluded(e) => key < e.as_slice(),
            Bound::Unbounded => true,
        };
        above_start && below_end
    }

    /// True if no key can satisfy the bounds, or the limit is zero
    pub fn is_empty(&self) -> bool {
        if self.limit == Some(0) {
            return true;
        }
        match (&self.start, &self.end) {
            (Bound::Included(s), Bound::Included(e)) => s > e,
            (Bound::Included(s), Bound::Excluded(e))
            | (Bound::Excluded(s), Bound::Included(e))
            | (Bound::Excluded(s), Bound::Excluded(e)) => s >= e,
            _ => false,
        }
    }

    /// Borrowed bounds, in the shape `BTreeMap::range` expects
    pub(crate) fn as_slices(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        (borrow_bound(&self.start), borrow_bound(&self.end))
    }
}

fn borrow_bound(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(k) => Bound::Included(k.as_slice()),
        Bound::Excluded(k) => Bound::Excluded(k.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

/// Ordered key-value store
///
/// All methods take `&self`; implementations provide their own interior
/// locking. Scans return entries in ascending byte order of their keys.
pub trait KvStore: Send + Sync {
    /// Read one value. `Ok(None)` means the key is absent.
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>>;

    fn put(&self, key: &[u8], value: Bytes) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Apply every operation or none of them.
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<()>;

    /// Entries inside `range`, ascending by key.
    fn scan(&self, range: &KeyRange) -> Result<Vec<(Bytes, Bytes)>>;

    /// Delete every key inside `range` as one batch.
    fn delete_range(&self, range: &KeyRange) -> Result<()> {
        let ops: Vec<BatchOp> = self
            .scan(range)?
            .into_iter()
            .map(|(key, _)| BatchOp::delete(key.to_vec()))
            .collect();
        if ops.is_empty() {
            return Ok(());
        }
        self.write_batch(ops)
    }

    /// Release the handle. Must be safe to call more than once.
    fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Release the handle and remove its persisted data.
    fn destroy(&self) -> Result<()> {
        self.close()
    }
}
