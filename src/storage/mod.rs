//! Storage Module
//!
//! Maps log-engine records onto six namespaced key-value sub-stores.
//!
//! ## Sub-stores
//! ```text
//! ┌────────────┬─────────────┬───────────────────────────────────────┐
//! │ Name       │ Slot 0      │ Records                               │
//! ├────────────┼─────────────┼───────────────────────────────────────┤
//! │ key        │ public key  │ -                                     │
//! │ secret_key │ secret key  │ -                                     │
//! │ tree       │ header      │ 40-byte node at index + 1             │
//! │ data       │ block 0     │ raw block at index                    │
//! │ bitfield   │ header      │ page at page index + 1                │
//! │ signatures │ header      │ 64-byte signature at index + 1        │
//! └────────────┴─────────────┴───────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! The storage handle is `Send + Sync` and takes `&self` everywhere. It does
//! not serialize conflicting writes to one index; the log engine owns that.

mod bitfield;
mod data;
mod lifecycle;
mod signatures;
mod tree;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::cache::{CacheStats, ReadCache};
use crate::config::{Config, SyncStrategy};
use crate::error::{HyperError, Result};
use crate::format::{Header, Node};
use crate::keys::{self, HEADER_SLOT};
use crate::kv::{KvStore, LogStore, PrefixedStore};

pub use lifecycle::OpenState;
pub use signatures::SignatureAt;

/// Caller-supplied mapping from sub-store name to a store handle
pub type StoreFactory = Arc<dyn Fn(&str) -> Result<Arc<dyn KvStore>> + Send + Sync>;

// =============================================================================
// Store Names
// =============================================================================

/// The six logical sub-stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreName {
    Key,
    SecretKey,
    Tree,
    Data,
    Bitfield,
    Signatures,
}

impl StoreName {
    pub const ALL: [StoreName; 6] = [
        StoreName::Key,
        StoreName::SecretKey,
        StoreName::Tree,
        StoreName::Data,
        StoreName::Bitfield,
        StoreName::Signatures,
    ];

    /// Name handed to the factory and used as the namespace prefix
    pub fn as_str(self) -> &'static str {
        match self {
            StoreName::Key => "key",
            StoreName::SecretKey => "secret_key",
            StoreName::Tree => "tree",
            StoreName::Data => "data",
            StoreName::Bitfield => "bitfield",
            StoreName::Signatures => "signatures",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for StoreName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StoreName {
    type Err = HyperError;

    fn from_str(s: &str) -> Result<Self> {
        StoreName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| HyperError::Config(format!("unknown store name {:?}", s)))
    }
}

// =============================================================================
// Storage Source
// =============================================================================

/// Where the six sub-stores come from
#[derive(Clone)]
pub enum StorageSource {
    /// One [`LogStore`] at this directory, multiplexed with [`PrefixedStore`]
    Path(PathBuf),

    /// Called once per sub-store name; the caller does the multiplexing
    Factory(StoreFactory),
}

impl StorageSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        StorageSource::Path(path.into())
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn KvStore>> + Send + Sync + 'static,
    {
        StorageSource::Factory(Arc::new(factory))
    }
}

impl From<PathBuf> for StorageSource {
    fn from(path: PathBuf) -> Self {
        StorageSource::Path(path)
    }
}

impl From<&Path> for StorageSource {
    fn from(path: &Path) -> Self {
        StorageSource::Path(path.to_path_buf())
    }
}

impl std::fmt::Debug for StorageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            StorageSource::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Live handles: the path-backed root (if any) and each created sub-store
struct Backend {
    source: StorageSource,
    sync_strategy: SyncStrategy,
    root: Option<Arc<LogStore>>,
    stores: [Option<Arc<dyn KvStore>>; 6],
}

impl Backend {
    fn create(&mut self, name: StoreName) -> Result<Arc<dyn KvStore>> {
        match &self.source {
            StorageSource::Path(path) => {
                if self.root.is_none() {
                    let root = LogStore::open(path, self.sync_strategy)?;
                    tracing::debug!(path = %path.display(), "opened root store");
                    self.root = Some(Arc::new(root));
                }
                let root = self.root.as_ref().map(Arc::clone).ok_or(HyperError::Closed)?;
                Ok(Arc::new(PrefixedStore::new(root, name.as_str())?))
            }
            StorageSource::Factory(factory) => factory(name.as_str()),
        }
    }

    fn ensure(&mut self, name: StoreName) -> Result<Arc<dyn KvStore>> {
        if let Some(store) = &self.stores[name.slot()] {
            return Ok(Arc::clone(store));
        }
        let store = self.create(name)?;
        self.stores[name.slot()] = Some(Arc::clone(&store));
        Ok(store)
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Key-value persistence for one append-only log
pub struct Storage {
    backend: Mutex<Backend>,
    tree_cache: Option<ReadCache<Node>>,
    data_cache: Option<ReadCache<Bytes>>,
    config: Config,
}

impl Storage {
    /// Create a storage handle. No sub-store is created until [`Storage::open`].
    pub fn new(source: impl Into<StorageSource>, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend: Mutex::new(Backend {
                source: source.into(),
                sync_strategy: config.sync_strategy,
                root: None,
                stores: Default::default(),
            }),
            tree_cache: ReadCache::with_capacity(config.cache.tree),
            data_cache: ReadCache::with_capacity(config.cache.data),
            config,
        })
    }

    /// Path-backed storage with the default configuration
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(StorageSource::path(path), Config::default())
    }

    /// Handle of an already created sub-store
    pub fn sub_store(&self, name: StoreName) -> Result<Arc<dyn KvStore>> {
        self.backend.lock().stores[name.slot()]
            .as_ref()
            .map(Arc::clone)
            .ok_or(HyperError::Closed)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tree_cache_stats(&self) -> Option<CacheStats> {
        self.tree_cache.as_ref().map(ReadCache::stats)
    }

    pub fn data_cache_stats(&self) -> Option<CacheStats> {
        self.data_cache.as_ref().map(ReadCache::stats)
    }

    fn ensure_store(&self, name: StoreName) -> Result<Arc<dyn KvStore>> {
        self.backend.lock().ensure(name)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = self.backend.lock();
        let open: Vec<&str> = StoreName::ALL
            .iter()
            .filter(|name| backend.stores[name.slot()].is_some())
            .map(|name| name.as_str())
            .collect();
        f.debug_struct("Storage")
            .field("source", &backend.source)
            .field("open", &open)
            .field("tree_cache", &self.tree_cache)
            .field("data_cache", &self.data_cache)
            .finish()
    }
}

// =============================================================================
// Header Slot
// =============================================================================

/// Read slot 0; write `expected` if it is empty, otherwise keep what is there.
///
/// Read errors are returned before anything is written.
pub(crate) fn validate_or_initialize(store: &dyn KvStore, expected: Header) -> Result<Header> {
    let slot = keys::encode(HEADER_SLOT);

    match store.get(&slot)? {
        Some(buf) => {
            let stored = Header::parse(&buf)?;
            if stored.store_type != expected.store_type {
                return Err(HyperError::InvalidHeader(format!(
                    "expected {:?} header, found {:?}",
                    expected.store_type, stored.store_type
                )));
            }
            tracing::debug!(
                store_type = ?stored.store_type,
                block_size = stored.block_size,
                "reusing stored header"
            );
            Ok(stored)
        }
        None => {
            store.put(&slot, Bytes::copy_from_slice(&expected.to_bytes()?))?;
            tracing::debug!(
                store_type = ?expected.store_type,
                block_size = expected.block_size,
                "wrote fresh header"
            );
            Ok(expected)
        }
    }
}

/// Log a backing-store failure that is not a plain miss
fn note_failure(store: StoreName, index: u64, err: &HyperError) {
    if !err.is_not_found() {
        tracing::warn!(store = %store, index, error = %err, "backing store read failed");
    }
}
