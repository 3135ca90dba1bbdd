//! Tests for the path-backed LogStore and its namespaced views

use std::fs::OpenOptions;
use std::io::Write;
use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;
use hyperkv::config::SyncStrategy;
use hyperkv::{BatchOp, HyperError, KeyRange, KvStore, LogStore, PrefixedStore};
use tempfile::TempDir;

fn open(dir: &TempDir) -> LogStore {
    LogStore::open(dir.path(), SyncStrategy::EveryWrite).unwrap()
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_writes_survive_reopen() {
    let temp = TempDir::new().unwrap();

    {
        let store = open(&temp);
        store.put(b"a", Bytes::from_static(b"1")).unwrap();
        store.put(b"b", Bytes::from_static(b"2")).unwrap();
        store.delete(b"a").unwrap();
        store
            .write_batch(vec![
                BatchOp::put(b"c".to_vec(), &b"3"[..]),
                BatchOp::delete(b"b".to_vec()),
            ])
            .unwrap();
        store.close().unwrap();
    }

    let store = open(&temp);
    assert_eq!(store.get(b"a").unwrap(), None);
    assert_eq!(store.get(b"b").unwrap(), None);
    assert_eq!(store.get(b"c").unwrap(), Some(Bytes::from_static(b"3")));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_drop_releases_lock() {
    let temp = TempDir::new().unwrap();

    {
        let store = open(&temp);
        store.put(b"k", Bytes::from_static(b"v")).unwrap();
    }

    let store = open(&temp);
    assert_eq!(store.get(b"k").unwrap(), Some(Bytes::from_static(b"v")));
}

#[test]
fn test_second_open_is_locked() {
    let temp = TempDir::new().unwrap();

    let _first = open(&temp);
    let err = LogStore::open(temp.path(), SyncStrategy::EveryWrite).unwrap_err();
    assert!(matches!(err, HyperError::Locked(_)));
}

#[test]
fn test_torn_tail_is_truncated() {
    let temp = TempDir::new().unwrap();

    {
        let store = open(&temp);
        store.put(b"good", Bytes::from_static(b"record")).unwrap();
        store.close().unwrap();
    }

    // Half a frame header and some garbage
    let mut wal = OpenOptions::new()
        .append(true)
        .open(temp.path().join("wal.log"))
        .unwrap();
    wal.write_all(&[0, 0, 0, 99, 0xDE, 0xAD]).unwrap();
    drop(wal);

    let store = open(&temp);
    assert_eq!(store.get(b"good").unwrap(), Some(Bytes::from_static(b"record")));

    // New writes land after the cut and replay cleanly
    store.put(b"next", Bytes::from_static(b"ok")).unwrap();
    store.close().unwrap();

    let store = open(&temp);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_compact_keeps_live_keys() {
    let temp = TempDir::new().unwrap();
    let wal_path = temp.path().join("wal.log");

    let store = open(&temp);
    for i in 0..50u8 {
        store.put(&[i], Bytes::from(vec![i; 16])).unwrap();
        store.put(&[i], Bytes::from(vec![i; 32])).unwrap();
    }
    for i in 0..25u8 {
        store.delete(&[i]).unwrap();
    }
    let before = std::fs::metadata(&wal_path).unwrap().len();

    store.compact().unwrap();

    let after = std::fs::metadata(&wal_path).unwrap().len();
    assert!(after < before);

    store.put(&[200], Bytes::from_static(b"post")).unwrap();
    store.close().unwrap();

    let store = open(&temp);
    assert_eq!(store.len(), 26);
    assert_eq!(store.get(&[30]).unwrap(), Some(Bytes::from(vec![30u8; 32])));
    assert_eq!(store.get(&[200]).unwrap(), Some(Bytes::from_static(b"post")));
}

#[test]
fn test_closed_store_rejects_operations() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp);

    store.close().unwrap();
    store.close().unwrap();

    assert!(matches!(store.get(b"x"), Err(HyperError::Closed)));
    assert!(matches!(store.put(b"x", Bytes::new()), Err(HyperError::Closed)));
    assert!(matches!(store.scan(&KeyRange::all()), Err(HyperError::Closed)));
    assert!(!temp.path().join("LOCK").exists());
}

#[test]
fn test_scan_bounds_and_limit() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp);
    for key in [b"a", b"b", b"c", b"d"] {
        store.put(key, Bytes::copy_from_slice(key)).unwrap();
    }

    let range = KeyRange::new(Bound::Excluded(b"a".to_vec()), Bound::Included(b"d".to_vec()))
        .with_limit(2);
    let keys: Vec<Bytes> = store.scan(&range).unwrap().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![Bytes::from_static(b"b"), Bytes::from_static(b"c")]);
}

// =============================================================================
// Namespaces
// =============================================================================

#[test]
fn test_prefixed_views_are_isolated() {
    let temp = TempDir::new().unwrap();
    let root: Arc<dyn KvStore> = Arc::new(open(&temp));

    let tree = PrefixedStore::new(Arc::clone(&root), "tree").unwrap();
    let data = PrefixedStore::new(Arc::clone(&root), "data").unwrap();

    tree.put(b"01", Bytes::from_static(b"node")).unwrap();
    data.put(b"01", Bytes::from_static(b"block")).unwrap();

    assert_eq!(tree.get(b"01").unwrap(), Some(Bytes::from_static(b"node")));
    assert_eq!(data.get(b"01").unwrap(), Some(Bytes::from_static(b"block")));
    assert_eq!(root.get(b"!tree!01").unwrap(), Some(Bytes::from_static(b"node")));

    data.destroy().unwrap();
    assert_eq!(data.get(b"01").unwrap(), None);
    assert_eq!(tree.scan(&KeyRange::all()).unwrap().len(), 1);
}
