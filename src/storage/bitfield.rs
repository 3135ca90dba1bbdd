//! Bitfield pages.
//!
//! The page size lives in the stored header, not in the configuration:
//! a store created with one page size keeps it on every later open.

use bytes::Bytes;

use super::{Storage, StoreName};
use crate::error::{HyperError, Result};
use crate::format::{split_pages, Header};
use crate::keys::{self, HEADER_OFFSET, HEADER_SLOT};
use crate::kv::{BatchOp, KvStore};

impl Storage {
    /// Write whole pages starting at byte `offset`.
    ///
    /// Fails with [`HyperError::PageMisaligned`] unless both `offset` and the
    /// buffer length are multiples of the stored page size.
    pub fn put_bitfield(&self, offset: u64, data: impl Into<Bytes>) -> Result<()> {
        let data = data.into();
        let store = self.sub_store(StoreName::Bitfield)?;
        let page_size = stored_page_size(&*store)?;

        let ops = split_pages(offset, &data, page_size)?
            .into_iter()
            .map(|(page, buf)| -> Result<BatchOp> {
                Ok(BatchOp::put(keys::encode(keys::record_slot(page)?), buf))
            })
            .collect::<Result<Vec<_>>>()?;
        if ops.is_empty() {
            return Ok(());
        }
        tracing::trace!(offset, pages = ops.len(), page_size, "put bitfield");
        store.write_batch(ops)
    }

    /// Delete every page, keeping the header.
    pub fn del_bitfield(&self) -> Result<()> {
        tracing::debug!("delete bitfield pages");
        self.sub_store(StoreName::Bitfield)?
            .delete_range(&keys::slots_from(HEADER_OFFSET))
    }

    /// Page size recorded in the bitfield header
    pub fn bitfield_page_size(&self) -> Result<u16> {
        stored_page_size(&*self.sub_store(StoreName::Bitfield)?)
    }
}

pub(crate) fn stored_page_size(store: &dyn KvStore) -> Result<u16> {
    let buf = store
        .get(&keys::encode(HEADER_SLOT))?
        .ok_or_else(|| HyperError::InvalidHeader("bitfield header missing".into()))?;
    Ok(Header::parse(&buf)?.block_size)
}

/// Stored pages in page order. Gaps are not filled in.
pub(crate) fn read_pages(store: &dyn KvStore) -> Result<Vec<Bytes>> {
    Ok(store
        .scan(&keys::slots_from(HEADER_OFFSET))?
        .into_iter()
        .map(|(_, page)| page)
        .collect())
}
