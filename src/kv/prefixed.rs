//! Namespaced view of a shared store.
//!
//! Keys are stored as `!{name}!{key}`. Names may not contain `!`, so the
//! closing delimiter makes every namespace a disjoint key interval and no
//! key from one name can sort into another.

use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{HyperError, Result};

use super::{BatchOp, KeyRange, KvStore};

const SEPARATOR: u8 = b'!';

/// One named partition of a shared [`KvStore`]
pub struct PrefixedStore {
    root: Arc<dyn KvStore>,
    name: String,
    prefix: Vec<u8>,
}

impl PrefixedStore {
    pub fn new(root: Arc<dyn KvStore>, name: &str) -> Result<Self> {
        if name.is_empty() || name.as_bytes().contains(&SEPARATOR) {
            return Err(HyperError::Config(format!(
                "invalid sub-store name {:?}: must be non-empty and free of '!'",
                name
            )));
        }

        let mut prefix = Vec::with_capacity(name.len() + 2);
        prefix.push(SEPARATOR);
        prefix.extend_from_slice(name.as_bytes());
        prefix.push(SEPARATOR);

        Ok(Self {
            root,
            name: name.to_string(),
            prefix,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn outer_key(&self, key: &[u8]) -> Vec<u8> {
        let mut outer = Vec::with_capacity(self.prefix.len() + key.len());
        outer.extend_from_slice(&self.prefix);
        outer.extend_from_slice(key);
        outer
    }

    /// First key past the namespace: the prefix with its last byte bumped.
    fn upper_fence(&self) -> Vec<u8> {
        let mut fence = self.prefix.clone();
        if let Some(last) = fence.last_mut() {
            *last += 1;
        }
        fence
    }

    fn outer_range(&self, range: &KeyRange) -> KeyRange {
        let start = match &range.start {
            Bound::Included(k) => Bound::Included(self.outer_key(k)),
            Bound::Excluded(k) => Bound::Excluded(self.outer_key(k)),
            Bound::Unbounded => Bound::Included(self.prefix.clone()),
        };
        let end = match &range.end {
            Bound::Included(k) => Bound::Included(self.outer_key(k)),
            Bound::Excluded(k) => Bound::Excluded(self.outer_key(k)),
            Bound::Unbounded => Bound::Excluded(self.upper_fence()),
        };
        KeyRange {
            start,
            end,
            limit: range.limit,
        }
    }
}

impl KvStore for PrefixedStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.root.get(&self.outer_key(key))
    }

    fn put(&self, key: &[u8], value: Bytes) -> Result<()> {
        self.root.put(&self.outer_key(key), value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.root.delete(&self.outer_key(key))
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        let ops = ops
            .into_iter()
            .map(|op| match op {
                BatchOp::Put { key, value } => BatchOp::Put {
                    key: self.outer_key(&key),
                    value,
                },
                BatchOp::Delete { key } => BatchOp::Delete {
                    key: self.outer_key(&key),
                },
            })
            .collect();
        self.root.write_batch(ops)
    }

    fn scan(&self, range: &KeyRange) -> Result<Vec<(Bytes, Bytes)>> {
        let prefix_len = self.prefix.len();
        let entries = self.root.scan(&self.outer_range(range))?;
        Ok(entries
            .into_iter()
            .map(|(k, v)| (k.slice(prefix_len..), v))
            .collect())
    }

    // The root is owned and closed by whoever created it.
    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        self.delete_range(&KeyRange::all())
    }
}

impl std::fmt::Debug for PrefixedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixedStore").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn pair(root: &Arc<dyn KvStore>) -> (PrefixedStore, PrefixedStore) {
        (
            PrefixedStore::new(Arc::clone(root), "tree").unwrap(),
            PrefixedStore::new(Arc::clone(root), "tree2").unwrap(),
        )
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let root: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let (a, b) = pair(&root);

        a.put(b"00", Bytes::from_static(b"from a")).unwrap();
        b.put(b"00", Bytes::from_static(b"from b")).unwrap();

        assert_eq!(a.get(b"00").unwrap(), Some(Bytes::from_static(b"from a")));
        assert_eq!(b.get(b"00").unwrap(), Some(Bytes::from_static(b"from b")));
        assert_eq!(a.scan(&KeyRange::all()).unwrap().len(), 1);
        assert_eq!(b.scan(&KeyRange::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_scan_strips_prefix() {
        let root: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let store = PrefixedStore::new(Arc::clone(&root), "data").unwrap();
        store.put(b"01", Bytes::from_static(b"x")).unwrap();

        let entries = store.scan(&KeyRange::all()).unwrap();
        assert_eq!(entries[0].0, Bytes::from_static(b"01"));
        assert!(root.get(b"!data!01").unwrap().is_some());
    }

    #[test]
    fn test_destroy_only_touches_own_namespace() {
        let root: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let (a, b) = pair(&root);
        a.put(b"00", Bytes::from_static(b"a")).unwrap();
        b.put(b"00", Bytes::from_static(b"b")).unwrap();

        a.destroy().unwrap();
        assert!(a.scan(&KeyRange::all()).unwrap().is_empty());
        assert_eq!(b.get(b"00").unwrap(), Some(Bytes::from_static(b"b")));
    }

    #[test]
    fn test_rejects_separator_in_name() {
        let root: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        assert!(PrefixedStore::new(Arc::clone(&root), "a!b").is_err());
        assert!(PrefixedStore::new(root, "").is_err());
    }
}
