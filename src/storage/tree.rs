use bytes::Bytes;

use super::{note_failure, Storage, StoreName};
use crate::error::{HyperError, Result};
use crate::format::{decode_node, Node, BLANK_NODE};
use crate::keys;
use crate::kv::BatchOp;

impl Storage {
    /// Write the node for `index` at slot `index + 1`.
    pub fn put_node(&self, index: u64, node: &Node) -> Result<()> {
        tracing::trace!(index, size = node.size, "put node");
        let slot = keys::record_slot(index)?;
        self.sub_store(StoreName::Tree)?
            .put(&keys::encode(slot), Bytes::copy_from_slice(&node.to_bytes()))
    }

    /// Write consecutive nodes from `index` as one batch; `None` stores the blank sentinel.
    pub fn put_node_batch(&self, index: u64, nodes: &[Option<Node>]) -> Result<()> {
        let ops = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| -> Result<BatchOp> {
                let slot = keys::record_slot(keys::advance(index, i as u64)?)?;
                let value = match node {
                    Some(node) => Bytes::copy_from_slice(&node.to_bytes()),
                    None => Bytes::from_static(&BLANK_NODE),
                };
                Ok(BatchOp::put(keys::encode(slot), value))
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::trace!(index, count = ops.len(), "put node batch");
        self.sub_store(StoreName::Tree)?.write_batch(ops)
    }

    /// Read the node at `index`.
    ///
    /// A missing slot and a blank sentinel both surface as
    /// [`HyperError::NodeNotFound`]; other backend errors pass through.
    pub fn get_node(&self, index: u64) -> Result<Node> {
        let slot = keys::record_slot(index)?;
        let store = self.sub_store(StoreName::Tree)?;
        if let Some(node) = self.tree_cache.as_ref().and_then(|c| c.get(index)) {
            return Ok(node);
        }

        let buf = store
            .get(&keys::encode(slot))
            .map_err(|e| {
                note_failure(StoreName::Tree, index, &e);
                e
            })?;

        let (hash, size) = match buf {
            Some(buf) => decode_node(&buf)?,
            None => None,
        }
        .ok_or(HyperError::NodeNotFound { index })?;

        let node = Node::new(index, hash, size);
        if let Some(cache) = &self.tree_cache {
            cache.insert(index, node);
        }
        Ok(node)
    }
}
