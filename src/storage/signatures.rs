use std::ops::Bound;

use bytes::Bytes;

use super::{note_failure, Storage, StoreName};
use crate::error::{HyperError, Result};
use crate::format::is_blank;
use crate::keys::{self, HEADER_OFFSET};
use crate::kv::KeyRange;

/// Entries fetched per scan step while looking for the next signature
const SCAN_CHUNK: usize = 64;

/// A signature together with the index it was found at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureAt {
    pub index: u64,
    pub signature: Bytes,
}

impl Storage {
    pub fn put_signature(&self, index: u64, signature: impl Into<Bytes>) -> Result<()> {
        tracing::trace!(index, "put signature");
        let slot = keys::record_slot(index)?;
        self.sub_store(StoreName::Signatures)?
            .put(&keys::encode(slot), signature.into())
    }

    /// Read the signature at `index`; absent and all-zero both mean not found.
    pub fn get_signature(&self, index: u64) -> Result<Bytes> {
        let slot = keys::record_slot(index)?;
        let found = self
            .sub_store(StoreName::Signatures)?
            .get(&keys::encode(slot))
            .map_err(|e| {
                note_failure(StoreName::Signatures, index, &e);
                e
            })?;

        match found {
            Some(signature) if !is_blank(&signature) => Ok(signature),
            _ => Err(HyperError::SignatureNotFound { index }),
        }
    }

    /// First non-blank signature at an index `>= index`.
    pub fn next_signature(&self, index: u64) -> Result<SignatureAt> {
        let store = self.sub_store(StoreName::Signatures)?;
        let mut start = Bound::Included(keys::encode(keys::record_slot(index)?));

        loop {
            let range = KeyRange::new(start, Bound::Unbounded).with_limit(SCAN_CHUNK);
            let entries = store.scan(&range)?;

            if let Some((key, signature)) = entries.iter().find(|(_, sig)| !is_blank(sig)) {
                let slot = keys::decode(key)?;
                return Ok(SignatureAt {
                    index: slot - HEADER_OFFSET,
                    signature: signature.clone(),
                });
            }

            match entries.last() {
                Some((key, _)) if entries.len() == SCAN_CHUNK => {
                    start = Bound::Excluded(key.to_vec());
                }
                _ => return Err(HyperError::SignatureNotFound { index }),
            }
        }
    }

    /// Delete signatures `start..=end`.
    pub fn delete_signatures(&self, start: u64, end: u64) -> Result<()> {
        let range =
            keys::slot_range_inclusive(keys::record_slot(start)?, keys::record_slot(end)?);
        if range.is_empty() {
            return Ok(());
        }
        tracing::debug!(start, end, "delete signatures");
        self.sub_store(StoreName::Signatures)?.delete_range(&range)
    }
}
