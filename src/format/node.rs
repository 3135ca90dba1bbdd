//! Tree node record
//!
//! 40 bytes: 32-byte hash followed by the subtree byte size as u64 BE.
//! An all-zero record (zero hash, zero size) marks an absent node.

use crate::error::{HyperError, Result};

pub const HASH_SIZE: usize = 32;

pub const NODE_SIZE: usize = HASH_SIZE + 8;

/// Stored for `None` entries of a node batch
pub const BLANK_NODE: [u8; NODE_SIZE] = [0u8; NODE_SIZE];

/// A Merkle tree node as handed over by the log engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub index: u64,
    pub hash: [u8; HASH_SIZE],
    pub size: u64,
}

impl Node {
    pub fn new(index: u64, hash: [u8; HASH_SIZE], size: u64) -> Self {
        Self { index, hash, size }
    }

    /// True for the zero-hash, zero-size sentinel
    pub fn is_blank(&self) -> bool {
        self.size == 0 && is_blank(&self.hash)
    }

    pub fn to_bytes(&self) -> [u8; NODE_SIZE] {
        encode_node(&self.hash, self.size)
    }
}

pub fn encode_node(hash: &[u8; HASH_SIZE], size: u64) -> [u8; NODE_SIZE] {
    let mut buf = [0u8; NODE_SIZE];
    buf[..HASH_SIZE].copy_from_slice(hash);
    buf[HASH_SIZE..].copy_from_slice(&size.to_be_bytes());
    buf
}

/// Decode a stored node. `Ok(None)` is the absent sentinel.
pub fn decode_node(buf: &[u8]) -> Result<Option<([u8; HASH_SIZE], u64)>> {
    if buf.len() < NODE_SIZE {
        return Err(HyperError::Corruption(format!(
            "tree node is {} bytes, expected {}",
            buf.len(),
            NODE_SIZE
        )));
    }

    let mut hash = [0u8; HASH_SIZE];
    hash.copy_from_slice(&buf[..HASH_SIZE]);
    let mut size = [0u8; 8];
    size.copy_from_slice(&buf[HASH_SIZE..NODE_SIZE]);
    let size = u64::from_be_bytes(size);

    if size == 0 && is_blank(&hash) {
        return Ok(None);
    }
    Ok(Some((hash, size)))
}

/// True if every byte is zero (also true for an empty slice)
pub fn is_blank(buf: &[u8]) -> bool {
    buf.iter().all(|&b| b == 0)
}
