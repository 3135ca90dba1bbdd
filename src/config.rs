//! Configuration for hyperkv
//!
//! Centralized configuration with sensible defaults.

use crate::error::{HyperError, Result};

/// Bitfield page size used when a fresh bitfield header is written.
///
/// An existing header's stored page size always wins over this value.
pub const DEFAULT_BITFIELD_PAGE_SIZE: u16 = 3584;

/// Default number of tree nodes kept in the read cache.
pub const DEFAULT_TREE_CACHE_ENTRIES: usize = 65_536;

/// Main configuration for a storage instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Read cache sizing for tree nodes and data blocks
    pub cache: CacheConfig,

    // -------------------------------------------------------------------------
    // Format Configuration
    // -------------------------------------------------------------------------
    /// Page size written into a freshly created bitfield header
    pub bitfield_page_size: u16,

    // -------------------------------------------------------------------------
    // Path-backed Store Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the write-ahead log
    pub sync_strategy: SyncStrategy,
}

/// Per-store read cache capacities, in entries. `None` disables the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub tree: Option<usize>,
    pub data: Option<usize>,
}

impl CacheConfig {
    /// No caching for either store
    pub fn disabled() -> Self {
        Self {
            tree: None,
            data: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tree: Some(DEFAULT_TREE_CACHE_ENTRIES),
            data: None,
        }
    }
}

/// WAL sync strategy for path-backed stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced records (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            bitfield_page_size: DEFAULT_BITFIELD_PAGE_SIZE,
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.cache.tree == Some(0) {
            return Err(HyperError::Config("tree cache capacity must be > 0".into()));
        }
        if self.cache.data == Some(0) {
            return Err(HyperError::Config("data cache capacity must be > 0".into()));
        }
        if self.bitfield_page_size == 0 {
            return Err(HyperError::Config("bitfield_page_size must be > 0".into()));
        }
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(HyperError::Config("sync count must be > 0".into()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the tree-node cache capacity (`None` disables it)
    pub fn tree_cache(mut self, capacity: Option<usize>) -> Self {
        self.config.cache.tree = capacity;
        self
    }

    /// Set the data-block cache capacity (`None` disables it)
    pub fn data_cache(mut self, capacity: Option<usize>) -> Self {
        self.config.cache.data = capacity;
        self
    }

    /// Replace the whole cache configuration
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Set the page size used for fresh bitfield headers
    pub fn bitfield_page_size(mut self, size: u16) -> Self {
        self.config.bitfield_page_size = size;
        self
    }

    /// Set the WAL sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
