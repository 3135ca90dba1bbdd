//! Record formats
//!
//! Byte layouts shared with the legacy sparse-file representation: the
//! 32-byte store header, 40-byte tree nodes, and fixed-size bitfield pages.
//! Data blocks and signatures are stored as-is.

mod bitfield;
mod header;
mod node;

pub use bitfield::split_pages;
pub use header::{
    build_header, Header, StoreType, FORMAT_VERSION, HEADER_SIZE, MAGIC, SIGNATURE_ALGORITHM,
    SIGNATURE_SIZE, TREE_ALGORITHM,
};
pub use node::{decode_node, encode_node, is_blank, Node, BLANK_NODE, HASH_SIZE, NODE_SIZE};
