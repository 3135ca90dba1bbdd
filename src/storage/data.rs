//! Data blocks: raw bytes at slot `index`, no header.

use bytes::Bytes;

use super::{note_failure, Storage, StoreName};
use crate::error::{HyperError, Result};
use crate::keys;
use crate::kv::BatchOp;

impl Storage {
    /// Store one block. An empty block is not written.
    pub fn put_data(&self, index: u64, data: impl Into<Bytes>) -> Result<()> {
        let data = data.into();
        if data.is_empty() {
            return Ok(());
        }
        tracing::trace!(index, len = data.len(), "put data");
        self.sub_store(StoreName::Data)?.put(&keys::encode(index), data)
    }

    /// Store consecutive blocks starting at `index` as one batch.
    ///
    /// Unlike [`Storage::put_data`], empty blocks in a batch are written.
    pub fn put_data_batch<I, B>(&self, index: u64, blocks: I) -> Result<()>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let ops = blocks
            .into_iter()
            .enumerate()
            .map(|(i, block)| -> Result<BatchOp> {
                Ok(BatchOp::put(keys::encode(keys::advance(index, i as u64)?), block))
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::trace!(index, count = ops.len(), "put data batch");
        self.sub_store(StoreName::Data)?.write_batch(ops)
    }

    pub fn get_data(&self, index: u64) -> Result<Bytes> {
        let store = self.sub_store(StoreName::Data)?;
        if let Some(block) = self.data_cache.as_ref().and_then(|c| c.get(index)) {
            return Ok(block);
        }

        let block = store
            .get(&keys::encode(index))
            .and_then(|found| found.ok_or(HyperError::KeyNotFound))
            .map_err(|e| {
                note_failure(StoreName::Data, index, &e);
                e
            })?;

        if let Some(cache) = &self.data_cache {
            cache.insert(index, block.clone());
        }
        Ok(block)
    }

    /// Blocks stored in `[start, start + n)`, in index order.
    ///
    /// One range scan; missing indices are skipped rather than reported.
    pub fn get_data_batch(&self, start: u64, n: u64) -> Result<Vec<Bytes>> {
        let range = keys::slot_range(start, start.saturating_add(n));
        if range.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .sub_store(StoreName::Data)?
            .scan(&range)?
            .into_iter()
            .map(|(_, block)| block)
            .collect())
    }

    /// Delete blocks `[start, end)`; `end` defaults to `start + 1`.
    pub fn clear_data(&self, start: u64, end: Option<u64>) -> Result<()> {
        let end = end.unwrap_or_else(|| start.saturating_add(1));
        let range = keys::slot_range(start, end);
        if range.is_empty() {
            return Ok(());
        }
        tracing::debug!(start, end, "clear data");
        self.sub_store(StoreName::Data)?.delete_range(&range)
    }
}
