//! Key encoding
//!
//! Indices are packed with a lexicographic integer encoding and then written
//! as lowercase hex, so byte-wise key order equals numeric index order:
//!
//! ```text
//! n < 251            [n]
//! x = n - 251 < 2^8  [251, x]
//! x < 2^16           [252, x:u16 BE]
//! x < 2^24           [253, x:u24 BE]
//! x < 2^32           [254, x:u32 BE]
//! otherwise          [255, x:u64 BE]
//! ```
//!
//! Every fixed-width store reserves slot 0 for its header, so record `i`
//! lives at slot `i + HEADER_OFFSET`.

use std::ops::Bound;

use crate::error::{HyperError, Result};
use crate::kv::KeyRange;

/// Slot holding the 32-byte header in the tree, signature and bitfield stores.
pub const HEADER_SLOT: u64 = 0;

/// Distance between a record index and its slot in a headered store.
pub const HEADER_OFFSET: u64 = 1;

/// Slot used by the single-value `key` and `secret_key` stores.
pub const KEY_SLOT: u64 = 0;

/// Largest value stored inline in the tag byte.
const INLINE_MAX: u64 = 251;

/// Slot of record `index` in a store with a header at slot 0.
pub fn record_slot(index: u64) -> Result<u64> {
    advance(index, HEADER_OFFSET)
}

/// `index + delta`, or [`HyperError::IndexOverflow`] past `u64::MAX`.
pub fn advance(index: u64, delta: u64) -> Result<u64> {
    index
        .checked_add(delta)
        .ok_or(HyperError::IndexOverflow { index, delta })
}

/// Pack an integer into its order-preserving binary form.
pub fn pack(n: u64) -> Vec<u8> {
    if n < INLINE_MAX {
        return vec![n as u8];
    }

    let x = n - INLINE_MAX;
    let (tag, width) = if x < 1 << 8 {
        (251u8, 1)
    } else if x < 1 << 16 {
        (252, 2)
    } else if x < 1 << 24 {
        (253, 3)
    } else if x < 1 << 32 {
        (254, 4)
    } else {
        (255, 8)
    };

    let mut out = Vec::with_capacity(1 + width);
    out.push(tag);
    out.extend_from_slice(&x.to_be_bytes()[8 - width..]);
    out
}

/// Inverse of [`pack`]. Rejects truncated and non-canonical inputs.
pub fn unpack(bytes: &[u8]) -> Option<u64> {
    let (&tag, rest) = bytes.split_first()?;
    if (tag as u64) < INLINE_MAX {
        return rest.is_empty().then_some(tag as u64);
    }

    let (width, floor) = match tag {
        251 => (1, 0u64),
        252 => (2, 1 << 8),
        253 => (3, 1 << 16),
        254 => (4, 1 << 24),
        _ => (8, 1 << 32),
    };
    if rest.len() != width {
        return None;
    }

    let mut buf = [0u8; 8];
    buf[8 - width..].copy_from_slice(rest);
    let x = u64::from_be_bytes(buf);
    if x < floor {
        return None;
    }
    x.checked_add(INLINE_MAX)
}

/// External key for an index.
pub fn encode(n: u64) -> Vec<u8> {
    hex::encode(pack(n)).into_bytes()
}

/// Index for an external key.
pub fn decode(key: &[u8]) -> Result<u64> {
    let packed = hex::decode(key)
        .map_err(|e| HyperError::Corruption(format!("key is not hex: {}", e)))?;
    unpack(&packed).ok_or_else(|| {
        HyperError::Corruption(format!("key {:?} is not a packed integer", packed))
    })
}

// =============================================================================
// Index Ranges
// =============================================================================

/// Keys for slots `[start, end)`.
pub fn slot_range(start: u64, end: u64) -> KeyRange {
    KeyRange::new(Bound::Included(encode(start)), Bound::Excluded(encode(end)))
}

/// Keys for slots `[start, end]`.
pub fn slot_range_inclusive(start: u64, end: u64) -> KeyRange {
    KeyRange::new(Bound::Included(encode(start)), Bound::Included(encode(end)))
}

/// Keys for every slot from `start` upward.
pub fn slots_from(start: u64) -> KeyRange {
    KeyRange::new(Bound::Included(encode(start)), Bound::Unbounded)
}
