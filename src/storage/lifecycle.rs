//! Open, key material, close and destroy.

use std::sync::Arc;

use bytes::Bytes;

use super::{bitfield, validate_or_initialize, Storage, StoreName};
use crate::error::Result;
use crate::format::Header;
use crate::join::{self, Task};
use crate::keys::{self, KEY_SLOT};
use crate::kv::KvStore;

/// Everything the log engine needs to resume after [`Storage::open`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenState {
    /// Stored bitfield pages in page order
    pub bitfield: Vec<Bytes>,
    /// Page size from the bitfield header
    pub bitfield_page_size: u16,
    pub secret_key: Option<Bytes>,
    pub key: Option<Bytes>,
}

/// Partial result of one open task
enum Loaded {
    Bitfield { pages: Vec<Bytes>, page_size: u16 },
    Header,
    SecretKey(Option<Bytes>),
    Key(Option<Bytes>),
}

#[derive(Clone, Copy)]
enum Release {
    Close,
    Destroy,
}

impl Release {
    fn apply(self, store: &dyn KvStore) -> Result<()> {
        match self {
            Release::Close => store.close(),
            Release::Destroy => store.destroy(),
        }
    }
}

impl Storage {
    /// Create the sub-stores, validate or write their headers and load the
    /// bitfield and both keys.
    ///
    /// The five loads run concurrently; all of them finish before the first
    /// error (in task order) is returned. Opening an already open storage
    /// re-reads the same state.
    pub fn open(&self) -> Result<OpenState> {
        let stores = {
            let mut backend = self.backend.lock();
            let mut stores = Vec::with_capacity(StoreName::ALL.len());
            for name in StoreName::ALL {
                stores.push(backend.ensure(name)?);
            }
            stores
        };
        let store = |name: StoreName| Arc::clone(&stores[name.slot()]);

        let bitfield_store = store(StoreName::Bitfield);
        let signatures_store = store(StoreName::Signatures);
        let tree_store = store(StoreName::Tree);
        let secret_key_store = store(StoreName::SecretKey);
        let key_store = store(StoreName::Key);
        let page_size = self.config.bitfield_page_size;

        let mut tasks: Vec<Task<'_, Loaded>> = Vec::with_capacity(5);
        tasks.push(Box::new(move || -> Result<Loaded> {
            let header = validate_or_initialize(&*bitfield_store, Header::bitfield(page_size))?;
            let pages = bitfield::read_pages(&*bitfield_store)?;
            Ok(Loaded::Bitfield {
                pages,
                page_size: header.block_size,
            })
        }));
        tasks.push(Box::new(move || -> Result<Loaded> {
            validate_or_initialize(&*signatures_store, Header::signatures())?;
            Ok(Loaded::Header)
        }));
        tasks.push(Box::new(move || -> Result<Loaded> {
            validate_or_initialize(&*tree_store, Header::tree())?;
            Ok(Loaded::Header)
        }));
        tasks.push(Box::new(move || -> Result<Loaded> {
            Ok(Loaded::SecretKey(secret_key_store.get(&keys::encode(KEY_SLOT))?))
        }));
        tasks.push(Box::new(move || -> Result<Loaded> {
            Ok(Loaded::Key(key_store.get(&keys::encode(KEY_SLOT))?))
        }));

        let mut state = OpenState {
            bitfield_page_size: page_size,
            ..OpenState::default()
        };
        for loaded in join::settle_all(tasks)? {
            match loaded {
                Loaded::Bitfield { pages, page_size } => {
                    state.bitfield = pages;
                    state.bitfield_page_size = page_size;
                }
                Loaded::Header => {}
                Loaded::SecretKey(secret_key) => state.secret_key = secret_key,
                Loaded::Key(key) => state.key = key,
            }
        }

        tracing::info!(
            bitfield_pages = state.bitfield.len(),
            page_size = state.bitfield_page_size,
            has_key = state.key.is_some(),
            has_secret_key = state.secret_key.is_some(),
            "storage opened"
        );
        Ok(state)
    }

    /// Read only the public key, creating the key store if needed.
    pub fn open_key(&self) -> Result<Option<Bytes>> {
        self.ensure_store(StoreName::Key)?.get(&keys::encode(KEY_SLOT))
    }

    pub fn write_key(&self, key: impl Into<Bytes>) -> Result<()> {
        self.sub_store(StoreName::Key)?.put(&keys::encode(KEY_SLOT), key.into())
    }

    pub fn write_secret_key(&self, secret_key: impl Into<Bytes>) -> Result<()> {
        self.sub_store(StoreName::SecretKey)?
            .put(&keys::encode(KEY_SLOT), secret_key.into())
    }

    /// Close every sub-store. Safe to call more than once; later operations
    /// fail with `Closed` until the next [`Storage::open`].
    pub fn close(&self) -> Result<()> {
        self.release(Release::Close)?;
        tracing::info!("storage closed");
        Ok(())
    }

    /// Close and remove every sub-store's data.
    pub fn destroy(&self) -> Result<()> {
        self.release(Release::Destroy)?;
        tracing::info!("storage destroyed");
        Ok(())
    }

    /// Release all sub-stores concurrently, then the shared root, then drop
    /// every cached record.
    fn release(&self, mode: Release) -> Result<()> {
        let (stores, root) = {
            let mut backend = self.backend.lock();
            let stores: Vec<Arc<dyn KvStore>> =
                backend.stores.iter_mut().filter_map(Option::take).collect();
            (stores, backend.root.take())
        };

        let tasks: Vec<Task<'_, ()>> = stores
            .into_iter()
            .map(|store| Box::new(move || mode.apply(&*store)) as Task<'_, ()>)
            .collect();
        let released = join::settle_all(tasks).map(|_| ());

        let root_released = match root {
            Some(root) => mode.apply(&*root),
            None => Ok(()),
        };

        if let Some(cache) = &self.tree_cache {
            cache.clear();
        }
        if let Some(cache) = &self.data_cache {
            cache.clear();
        }
        released.and(root_released)
    }
}
