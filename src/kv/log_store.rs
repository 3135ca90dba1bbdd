//! Path-backed ordered store
//!
//! ## Directory Layout
//! ```text
//! {dir}/
//!   ├── LOCK      (exclusive ownership marker)
//!   └── wal.log   (every write, replayed on open)
//! ```
//!
//! Reads are served from an in-memory `BTreeMap` rebuilt from the log on
//! open. Writes go to the log first, then to the index.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::config::SyncStrategy;
use crate::error::{HyperError, Result};

use super::wal::{self, WalOp, WalRecord, WalWriter};
use super::{BatchOp, KeyRange, KvStore};

/// Durable ordered key-value store rooted at one directory
///
/// ## Concurrency
/// - `index`: RwLock, many concurrent readers
/// - `wal`: Mutex, serializes writers; held across the index update so the
///   index always reflects log order
pub struct LogStore {
    dir: PathBuf,
    index: RwLock<BTreeMap<Vec<u8>, Bytes>>,
    /// `None` once the store has been closed
    wal: Mutex<Option<WalWriter>>,
    sync_strategy: SyncStrategy,
}

impl LogStore {
    const WAL_FILENAME: &'static str = "wal.log";
    const LOCK_FILENAME: &'static str = "LOCK";

    /// Open or create a store at `dir`.
    ///
    /// Fails with [`HyperError::Locked`] if another handle owns the directory.
    pub fn open(dir: impl AsRef<Path>, sync_strategy: SyncStrategy) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(Self::LOCK_FILENAME))
        {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(HyperError::Locked(dir));
            }
            Err(e) => return Err(e.into()),
        }

        match Self::replay(&dir, sync_strategy) {
            Ok((index, writer)) => Ok(Self {
                dir,
                index: RwLock::new(index),
                wal: Mutex::new(Some(writer)),
                sync_strategy,
            }),
            Err(e) => {
                let _ = fs::remove_file(dir.join(Self::LOCK_FILENAME));
                Err(e)
            }
        }
    }

    fn replay(
        dir: &Path,
        sync_strategy: SyncStrategy,
    ) -> Result<(BTreeMap<Vec<u8>, Bytes>, WalWriter)> {
        let wal_path = dir.join(Self::WAL_FILENAME);
        let (records, recovery) = wal::recover(&wal_path)?;

        if recovery.records_recovered > 0 || recovery.was_truncated {
            tracing::info!(
                dir = %dir.display(),
                recovered = recovery.records_recovered,
                last_lsn = recovery.last_lsn,
                truncated = recovery.was_truncated,
                "WAL recovery"
            );
        }

        let mut index = BTreeMap::new();
        for record in records {
            apply(&mut index, record.ops);
        }

        let writer = WalWriter::open(&wal_path, sync_strategy, recovery.last_lsn + 1)?;
        Ok((index, writer))
    }

    /// Directory this store lives in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Rewrite the log so it holds exactly one record per live key.
    pub fn compact(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        let writer = wal.as_mut().ok_or(HyperError::Closed)?;
        writer.sync()?;

        let wal_path = self.dir.join(Self::WAL_FILENAME);
        let tmp_path = self.dir.join("wal.log.compact");

        let ops: Vec<WalOp> = self
            .index
            .read()
            .iter()
            .map(|(k, v)| WalOp::Put {
                key: k.clone(),
                value: v.to_vec(),
            })
            .collect();
        let live = ops.len();

        let lsn = writer.next_lsn();
        let frame = wal::encode_frame(&WalRecord { lsn, ops })?;
        fs::write(&tmp_path, frame)?;
        OpenOptions::new().write(true).open(&tmp_path)?.sync_all()?;
        fs::rename(&tmp_path, &wal_path)?;

        *wal = Some(WalWriter::open(&wal_path, self.sync_strategy, lsn + 1)?);
        tracing::debug!(dir = %self.dir.display(), live, "compacted WAL");
        Ok(())
    }

    fn log_and_apply(&self, ops: Vec<BatchOp>) -> Result<()> {
        let mut wal = self.wal.lock();
        let writer = wal.as_mut().ok_or(HyperError::Closed)?;

        let logged: Vec<WalOp> = ops
            .iter()
            .map(|op| match op {
                BatchOp::Put { key, value } => WalOp::Put {
                    key: key.clone(),
                    value: value.to_vec(),
                },
                BatchOp::Delete { key } => WalOp::Delete { key: key.clone() },
            })
            .collect();
        writer.append(logged)?;

        let mut index = self.index.write();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    index.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    index.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.wal.lock().is_none() {
            return Err(HyperError::Closed);
        }
        Ok(())
    }
}

fn apply(index: &mut BTreeMap<Vec<u8>, Bytes>, ops: Vec<WalOp>) {
    for op in ops {
        match op {
            WalOp::Put { key, value } => {
                index.insert(key, Bytes::from(value));
            }
            WalOp::Delete { key } => {
                index.remove(&key);
            }
        }
    }
}

impl KvStore for LogStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.ensure_open()?;
        Ok(self.index.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: Bytes) -> Result<()> {
        self.log_and_apply(vec![BatchOp::Put {
            key: key.to_vec(),
            value,
        }])
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.log_and_apply(vec![BatchOp::Delete { key: key.to_vec() }])
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        self.log_and_apply(ops)
    }

    fn scan(&self, range: &KeyRange) -> Result<Vec<(Bytes, Bytes)>> {
        self.ensure_open()?;
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let index = self.index.read();
        let iter = index
            .range::<[u8], _>(range.as_slices())
            .map(|(k, v)| (Bytes::copy_from_slice(k), v.clone()));
        Ok(match range.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        })
    }

    fn close(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        if let Some(mut writer) = wal.take() {
            writer.sync()?;
            match fs::remove_file(self.dir.join(Self::LOCK_FILENAME)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            tracing::debug!(dir = %self.dir.display(), "closed log store");
        }
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        self.close()?;
        self.index.write().clear();
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(dir = %self.dir.display(), "destroyed log store");
        Ok(())
    }
}

impl Drop for LogStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(dir = %self.dir.display(), error = %e, "failed to close log store on drop");
        }
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("dir", &self.dir)
            .field("entries", &self.len())
            .finish()
    }
}
