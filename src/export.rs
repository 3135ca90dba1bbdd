//! Legacy flat-file streams
//!
//! Each headered store maps onto the byte stream the sparse-file layout
//! used: the 32-byte header, then every slot at a fixed width. Missing slots
//! read back as zeros. The data store is the plain concatenation of its
//! blocks in index order, and the key stores are their single value.

use bytes::Bytes;

use crate::error::{HyperError, Result};
use crate::format::{Header, HEADER_SIZE, NODE_SIZE, SIGNATURE_SIZE};
use crate::keys::{self, HEADER_SLOT};
use crate::kv::{BatchOp, KeyRange};
use crate::storage::{Storage, StoreName};

/// Byte stream for one sub-store of an open storage.
pub fn read_all(storage: &Storage, name: StoreName) -> Result<Vec<u8>> {
    let entries = storage.sub_store(name)?.scan(&KeyRange::all())?;

    match name {
        StoreName::Key | StoreName::SecretKey | StoreName::Data => {
            Ok(entries.into_iter().flat_map(|(_, value)| value).collect())
        }
        StoreName::Tree => flatten(&entries, NODE_SIZE),
        StoreName::Signatures => flatten(&entries, SIGNATURE_SIZE as usize),
        StoreName::Bitfield => {
            let header = entries
                .first()
                .filter(|(key, _)| keys::decode(key).ok() == Some(HEADER_SLOT))
                .ok_or_else(|| HyperError::InvalidHeader("bitfield header missing".into()))?;
            let page_size = Header::parse(&header.1)?.block_size;
            flatten(&entries, page_size as usize)
        }
    }
}

/// Load a legacy stream into one sub-store as a single batch.
///
/// All-zero slots are skipped. The data store is rejected because its
/// stream carries no block boundaries.
pub fn write_all(storage: &Storage, name: StoreName, stream: &[u8]) -> Result<()> {
    let slot_size = match name {
        StoreName::Key | StoreName::SecretKey => {
            return storage
                .sub_store(name)?
                .put(&keys::encode(HEADER_SLOT), Bytes::copy_from_slice(stream));
        }
        StoreName::Data => {
            return Err(HyperError::Config(
                "data streams have no block boundaries and cannot be imported".into(),
            ));
        }
        StoreName::Tree => NODE_SIZE,
        StoreName::Signatures => SIGNATURE_SIZE as usize,
        StoreName::Bitfield => Header::parse(stream)?.block_size as usize,
    };
    if stream.len() < HEADER_SIZE {
        return Err(HyperError::InvalidHeader(format!(
            "stream shorter than a header: {} bytes",
            stream.len()
        )));
    }
    if slot_size == 0 {
        return Err(HyperError::InvalidHeader("zero slot size".into()));
    }
    Header::parse(&stream[..HEADER_SIZE])?;

    let mut ops = vec![BatchOp::put(
        keys::encode(HEADER_SLOT),
        Bytes::copy_from_slice(&stream[..HEADER_SIZE]),
    )];
    for (i, slot) in stream[HEADER_SIZE..].chunks(slot_size).enumerate() {
        if slot.iter().all(|&b| b == 0) {
            continue;
        }
        ops.push(BatchOp::put(
            keys::encode(keys::record_slot(i as u64)?),
            Bytes::copy_from_slice(slot),
        ));
    }

    tracing::debug!(store = %name, slots = ops.len() - 1, "imported legacy stream");
    storage.sub_store(name)?.write_batch(ops)
}

/// Largest stream [`read_all`] will build.
pub const MAX_STREAM_SIZE: u64 = 1 << 32;

/// Place each slot at `HEADER_SIZE + (slot - 1) * slot_size`.
fn flatten(entries: &[(Bytes, Bytes)], slot_size: usize) -> Result<Vec<u8>> {
    let last = match entries.last() {
        Some((key, _)) => keys::decode(key)?,
        None => return Ok(Vec::new()),
    };
    let size = (slot_size as u64)
        .checked_mul(last)
        .and_then(|body| body.checked_add(HEADER_SIZE as u64))
        .unwrap_or(u64::MAX);
    let too_large = HyperError::StreamTooLarge {
        size,
        limit: MAX_STREAM_SIZE,
    };
    if size > MAX_STREAM_SIZE {
        return Err(too_large);
    }
    let mut out = vec![0u8; usize::try_from(size).map_err(|_| too_large)?];

    for (key, value) in entries {
        let slot = keys::decode(key)?;
        let (offset, width) = if slot == HEADER_SLOT {
            (0, HEADER_SIZE)
        } else {
            (HEADER_SIZE + (slot as usize - 1) * slot_size, slot_size)
        };
        let len = value.len().min(width);
        out[offset..offset + len].copy_from_slice(&value[..len]);
    }
    Ok(out)
}
