//! Store header
//!
//! ## Layout (32 bytes, big-endian)
//! ```text
//! ┌───────────┬──────────┬─────────────┬────────────────┬──────────┬───────────┐
//! │ Magic (3) │ Type (1) │ Version (1) │ BlockSize (2)  │ NameLen  │ Name ...  │
//! │ 05 02 57  │ 0/1/2    │ 0           │ u16            │ (1)      │ ASCII     │
//! └───────────┴──────────┴─────────────┴────────────────┴──────────┴───────────┘
//! ```
//! Bytes past the name are zero.

use crate::error::{HyperError, Result};

pub const HEADER_SIZE: usize = 32;

pub const MAGIC: [u8; 3] = [0x05, 0x02, 0x57];

pub const FORMAT_VERSION: u8 = 0;

pub const SIGNATURE_ALGORITHM: &str = "Ed25519";

pub const TREE_ALGORITHM: &str = "BLAKE2b";

/// Ed25519 signature length
pub const SIGNATURE_SIZE: u16 = 64;

/// Offset of the algorithm name length byte; the name follows it
const NAME_OFFSET: usize = 7;

const MAX_NAME_LEN: usize = HEADER_SIZE - NAME_OFFSET - 1;

/// Kind of store a header describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StoreType {
    Bitfield = 0,
    Signatures = 1,
    Tree = 2,
}

impl TryFrom<u8> for StoreType {
    type Error = HyperError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(StoreType::Bitfield),
            1 => Ok(StoreType::Signatures),
            2 => Ok(StoreType::Tree),
            other => Err(HyperError::InvalidHeader(format!("unknown store type {}", other))),
        }
    }
}

/// Decoded slot-0 header of a fixed-width store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub store_type: StoreType,
    pub version: u8,
    /// Width of every record slot after the header
    pub block_size: u16,
    pub algorithm: Option<String>,
}

impl Header {
    pub fn new(store_type: StoreType, block_size: u16, algorithm: Option<&str>) -> Self {
        Self {
            store_type,
            version: FORMAT_VERSION,
            block_size,
            algorithm: algorithm.map(str::to_string),
        }
    }

    pub fn bitfield(page_size: u16) -> Self {
        Self::new(StoreType::Bitfield, page_size, None)
    }

    pub fn signatures() -> Self {
        Self::new(StoreType::Signatures, SIGNATURE_SIZE, Some(SIGNATURE_ALGORITHM))
    }

    pub fn tree() -> Self {
        Self::new(StoreType::Tree, super::NODE_SIZE as u16, Some(TREE_ALGORITHM))
    }

    pub fn to_bytes(&self) -> Result<[u8; HEADER_SIZE]> {
        let mut buf = build_header(self.store_type, self.block_size, self.algorithm.as_deref())?;
        buf[4] = self.version;
        Ok(buf)
    }

    /// Parse a stored header; only the fixed prefix up to the name is required.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < NAME_OFFSET {
            return Err(HyperError::InvalidHeader(format!(
                "header too short: {} bytes",
                buf.len()
            )));
        }
        if buf[0..3] != MAGIC {
            return Err(HyperError::InvalidHeader(format!(
                "bad magic {:02x}{:02x}{:02x}",
                buf[0], buf[1], buf[2]
            )));
        }

        let store_type = StoreType::try_from(buf[3])?;
        let block_size = u16::from_be_bytes([buf[5], buf[6]]);

        let name_len = buf.get(NAME_OFFSET).copied().unwrap_or(0) as usize;
        let algorithm = if name_len == 0 {
            None
        } else {
            let name = buf
                .get(NAME_OFFSET + 1..NAME_OFFSET + 1 + name_len)
                .ok_or_else(|| HyperError::InvalidHeader("truncated algorithm name".into()))?;
            Some(String::from_utf8_lossy(name).into_owned())
        };

        Ok(Self {
            store_type,
            version: buf[4],
            block_size,
            algorithm,
        })
    }
}

/// Build the 32-byte header for a store.
pub fn build_header(
    store_type: StoreType,
    block_size: u16,
    algorithm: Option<&str>,
) -> Result<[u8; HEADER_SIZE]> {
    let mut buf = [0u8; HEADER_SIZE];
    buf[0..3].copy_from_slice(&MAGIC);
    buf[3] = store_type as u8;
    buf[4] = FORMAT_VERSION;
    buf[5..7].copy_from_slice(&block_size.to_be_bytes());

    if let Some(name) = algorithm {
        if !name.is_ascii() || name.len() > MAX_NAME_LEN {
            return Err(HyperError::InvalidHeader(format!(
                "algorithm name {:?} must be ASCII and at most {} bytes",
                name, MAX_NAME_LEN
            )));
        }
        buf[NAME_OFFSET] = name.len() as u8;
        buf[NAME_OFFSET + 1..NAME_OFFSET + 1 + name.len()].copy_from_slice(name.as_bytes());
    }

    Ok(buf)
}
