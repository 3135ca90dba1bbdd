//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use hyperkv::{
    BatchOp, Config, HyperError, KeyRange, KvStore, MemoryStore, Result, Storage, StorageSource,
};
use parking_lot::Mutex;

// =============================================================================
// Memory-backed Storage
// =============================================================================

/// Sub-stores handed out by a factory, kept so a test can reopen or peek.
#[derive(Default)]
pub struct Registry {
    stores: Mutex<HashMap<String, Arc<MemoryStore>>>,
    pub created: AtomicUsize,
}

impl Registry {
    pub fn get(&self, name: &str) -> Arc<MemoryStore> {
        Arc::clone(self.stores.lock().get(name).expect("sub-store was never created"))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Write a raw record into `name`, creating the sub-store if needed.
    pub fn seed(&self, name: &str, key: &[u8], value: &[u8]) {
        let store = Arc::clone(
            self.stores
                .lock()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryStore::new())),
        );
        store.put(key, Bytes::copy_from_slice(value)).unwrap();
    }

    fn get_or_create(&self, name: &str) -> Arc<MemoryStore> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Arc::clone(
            self.stores
                .lock()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryStore::new())),
        )
    }
}

pub fn memory_source(registry: &Arc<Registry>) -> StorageSource {
    let registry = Arc::clone(registry);
    StorageSource::factory(move |name| Ok(registry.get_or_create(name) as Arc<dyn KvStore>))
}

/// Storage over a fresh set of memory sub-stores, not yet opened.
pub fn memory_storage_with(config: Config) -> (Storage, Arc<Registry>) {
    let registry = Arc::new(Registry::default());
    let storage = Storage::new(memory_source(&registry), config).unwrap();
    (storage, registry)
}

/// Opened storage over memory sub-stores with the default config.
pub fn open_memory_storage() -> (Storage, Arc<Registry>) {
    let (storage, registry) = memory_storage_with(Config::default());
    storage.open().unwrap();
    (storage, registry)
}

pub fn hex_fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    let text = std::fs::read_to_string(path).unwrap();
    hex::decode(text.trim()).unwrap()
}

// =============================================================================
// Fault Injection
// =============================================================================

/// Memory store that can fail reads and counts every write it accepts.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub writes: AtomicUsize,
}

impl FaultyStore {
    pub fn failing_reads() -> Self {
        let store = Self::default();
        store.fail_reads.store(true, Ordering::SeqCst);
        store
    }

    pub fn failing_writes() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(HyperError::Corruption("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HyperError::Corruption("injected write failure".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl KvStore for FaultyStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.check_read()?;
        self.inner.get(key)
    }

    fn put(&self, key: &[u8], value: Bytes) -> Result<()> {
        self.check_write()?;
        self.inner.put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.check_write()?;
        self.inner.delete(key)
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        self.check_write()?;
        self.inner.write_batch(ops)
    }

    fn scan(&self, range: &KeyRange) -> Result<Vec<(Bytes, Bytes)>> {
        self.check_read()?;
        self.inner.scan(range)
    }
}

/// Storage whose `name` sub-store is `faulty`; the rest are memory stores.
pub fn storage_with_faulty(
    name: &'static str,
    faulty: Arc<FaultyStore>,
) -> (Storage, Arc<Registry>) {
    let registry = Arc::new(Registry::default());
    let inner = Arc::clone(&registry);
    let source = StorageSource::factory(move |requested| {
        if requested == name {
            Ok(Arc::clone(&faulty) as Arc<dyn KvStore>)
        } else {
            Ok(inner.get_or_create(requested) as Arc<dyn KvStore>)
        }
    });
    let storage = Storage::new(source, Config::default()).unwrap();
    (storage, registry)
}
