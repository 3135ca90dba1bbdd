//! Tests for signature storage and forward search

mod common;

use bytes::Bytes;
use hyperkv::keys;
use hyperkv::{HyperError, KvStore, SignatureAt};

use common::open_memory_storage;

fn sig(fill: u8) -> Bytes {
    Bytes::from(vec![fill; 64])
}

#[test]
fn test_put_get_signature() {
    let (storage, registry) = open_memory_storage();

    storage.put_signature(0, sig(1)).unwrap();
    storage.put_signature(2, sig(3)).unwrap();

    assert_eq!(storage.get_signature(0).unwrap(), sig(1));
    assert_eq!(storage.get_signature(2).unwrap(), sig(3));

    // Signature 0 sits behind the header
    let raw = registry.get("signatures").get(&keys::encode(1)).unwrap();
    assert_eq!(raw, Some(sig(1)));
}

#[test]
fn test_missing_and_blank_signatures() {
    let (storage, _registry) = open_memory_storage();

    storage.put_signature(4, Bytes::from(vec![0u8; 64])).unwrap();

    assert!(matches!(
        storage.get_signature(4),
        Err(HyperError::SignatureNotFound { index: 4 })
    ));
    assert!(matches!(
        storage.get_signature(5),
        Err(HyperError::SignatureNotFound { index: 5 })
    ));
}

#[test]
fn test_next_signature_exact_hit() {
    let (storage, _registry) = open_memory_storage();

    storage.put_signature(3, sig(9)).unwrap();

    assert_eq!(
        storage.next_signature(3).unwrap(),
        SignatureAt {
            index: 3,
            signature: sig(9)
        }
    );
}

#[test]
fn test_next_signature_skips_gaps_and_blanks() {
    let (storage, _registry) = open_memory_storage();

    storage.put_signature(1, sig(1)).unwrap();
    storage.put_signature(4, Bytes::from(vec![0u8; 64])).unwrap();
    storage.put_signature(5, Bytes::new()).unwrap();
    storage.put_signature(7, sig(7)).unwrap();

    let found = storage.next_signature(2).unwrap();
    assert_eq!(found.index, 7);
    assert_eq!(found.signature, sig(7));
}

#[test]
fn test_next_signature_past_long_blank_run() {
    let (storage, _registry) = open_memory_storage();

    // More blanks than one scan step returns
    for i in 0..200u64 {
        storage.put_signature(i, Bytes::from(vec![0u8; 64])).unwrap();
    }
    storage.put_signature(260, sig(2)).unwrap();

    let found = storage.next_signature(0).unwrap();
    assert_eq!(found.index, 260);
}

#[test]
fn test_next_signature_exhausted() {
    let (storage, _registry) = open_memory_storage();

    storage.put_signature(1, sig(1)).unwrap();

    assert!(matches!(
        storage.next_signature(2),
        Err(HyperError::SignatureNotFound { index: 2 })
    ));
    assert_eq!(storage.next_signature(0).unwrap().index, 1);
}

#[test]
fn test_delete_signatures_is_inclusive() {
    let (storage, _registry) = open_memory_storage();

    for i in 0..6u64 {
        storage.put_signature(i, sig(i as u8 + 1)).unwrap();
    }

    storage.delete_signatures(1, 3).unwrap();

    assert!(storage.get_signature(0).is_ok());
    for i in 1..=3 {
        assert!(storage.get_signature(i).unwrap_err().is_not_found());
    }
    assert!(storage.get_signature(4).is_ok());
    assert_eq!(storage.next_signature(1).unwrap().index, 4);
}

#[test]
fn test_delete_signatures_keeps_header() {
    let (storage, registry) = open_memory_storage();

    storage.put_signature(0, sig(5)).unwrap();
    storage.delete_signatures(0, 0).unwrap();

    let header = registry
        .get("signatures")
        .get(&keys::encode(keys::HEADER_SLOT))
        .unwrap();
    assert!(header.is_some());
    assert!(storage.get_signature(0).is_err());
}
