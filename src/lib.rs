//! # hyperkv
//!
//! Persistence for an append-only, Merkle-tree-verified log on top of an
//! ordered key-value store:
//! - Six namespaced sub-stores (`key`, `secret_key`, `tree`, `data`,
//!   `bitfield`, `signatures`) inside one physical store
//! - Order-preserving integer keys, so range scans come back in index order
//! - 32-byte headers and fixed-width records that reproduce the legacy
//!   sparse-file byte stream exactly
//! - Optional bounded read caches for tree nodes and data blocks
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Log engine (caller)                         │
//! │        indices + raw buffers, hashes, signatures             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Storage                                 │
//! │   data / tree / bitfield / signatures / keys / lifecycle     │
//! └──────┬──────────────┬──────────────────────┬────────────────┘
//!        │              │                      │
//!        ▼              ▼                      ▼
//!  ┌───────────┐  ┌───────────┐        ┌──────────────┐
//!  │ ReadCache │  │  format   │        │     keys     │
//!  │   (LRU)   │  │ hdr/node  │        │ lexint + hex │
//!  └───────────┘  └───────────┘        └──────────────┘
//!                       │
//!                       ▼
//!        ┌──────────────────────────────┐
//!        │  KvStore (6 sub-stores)      │
//!        │  PrefixedStore over LogStore │
//!        │  or caller-supplied handles  │
//!        └──────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod keys;
pub mod kv;
pub mod format;
pub mod cache;
pub mod join;
pub mod storage;
pub mod export;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HyperError, Result};
pub use config::{CacheConfig, Config, SyncStrategy};
pub use format::{Header, Node, StoreType};
pub use kv::{BatchOp, KeyRange, KvStore, LogStore, MemoryStore, PrefixedStore};
pub use storage::{OpenState, SignatureAt, Storage, StorageSource, StoreFactory, StoreName};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of hyperkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
