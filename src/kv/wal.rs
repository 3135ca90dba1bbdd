//! Write-ahead log for [`LogStore`](super::LogStore)
//!
//! Every write, single or batched, is one record. Replaying the records in
//! order rebuilds the store's ordered index.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ Len (4) │ CRC (4) │ bincode payload │ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2 ...                            │
//! └─────────────────────────────────────────┘
//! ```
//! Len and CRC are big-endian; CRC32 covers the payload only.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::SyncStrategy;
use crate::error::{HyperError, Result};

/// Length (4) + CRC (4)
pub const FRAME_HEADER_SIZE: usize = 8;

/// A single logged write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// Operations applied atomically by this record
    pub ops: Vec<WalOp>,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Outcome of replaying a log file
#[derive(Debug, Default)]
pub struct RecoveryResult {
    /// Number of records successfully recovered
    pub records_recovered: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether a torn or corrupt tail was cut off
    pub was_truncated: bool,
}

/// Frame a record: `[len][crc][payload]`
pub fn encode_frame(record: &WalRecord) -> Result<Vec<u8>> {
    let payload = bincode::serialize(record)?;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&crc.to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode the frame at the start of `buf`.
///
/// Returns the record and the number of bytes consumed, or `None` if the
/// frame is incomplete or fails its checksum.
pub fn decode_frame(buf: &[u8]) -> Option<(WalRecord, usize)> {
    if buf.len() < FRAME_HEADER_SIZE {
        return None;
    }
    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let crc = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);

    let end = FRAME_HEADER_SIZE.checked_add(len)?;
    let payload = buf.get(FRAME_HEADER_SIZE..end)?;
    if crc32fast::hash(payload) != crc {
        return None;
    }
    let record = bincode::deserialize(payload).ok()?;
    Some((record, end))
}

/// Read every valid record from `path`, truncating a bad tail in place.
pub fn recover(path: &Path) -> Result<(Vec<WalRecord>, RecoveryResult)> {
    let mut result = RecoveryResult::default();
    let mut records = Vec::new();

    if !path.exists() {
        return Ok((records, result));
    }

    let mut contents = Vec::new();
    File::open(path)?.read_to_end(&mut contents)?;

    let mut offset = 0;
    while offset < contents.len() {
        match decode_frame(&contents[offset..]) {
            Some((record, consumed)) => {
                result.last_lsn = record.lsn;
                result.records_recovered += 1;
                records.push(record);
                offset += consumed;
            }
            None => break,
        }
    }

    if offset < contents.len() {
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(offset as u64)?;
        file.sync_all()?;
        result.was_truncated = true;
    }

    Ok((records, result))
}

/// File operations the writer needs to append and roll back
pub trait LogFile: Write {
    fn size(&self) -> std::io::Result<u64>;
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
    fn sync(&mut self) -> std::io::Result<()>;
}

impl LogFile for File {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> std::io::Result<()> {
        self.sync_data()
    }
}

/// Appends records to the log file
///
/// A failed append is cut back off the file so later records never land
/// behind a torn frame. If that cut fails too, the writer refuses further
/// appends.
pub struct WalWriter<F: LogFile = File> {
    file: F,
    len: u64,
    failed: bool,
    next_lsn: u64,
    sync_strategy: SyncStrategy,
    unsynced: usize,
}

impl WalWriter<File> {
    /// Open or create a log file for appending
    pub fn open(path: &Path, sync_strategy: SyncStrategy, next_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::with_file(file, sync_strategy, next_lsn)
    }
}

impl<F: LogFile> WalWriter<F> {
    /// Append to an already open log file, starting at its current end
    pub fn with_file(file: F, sync_strategy: SyncStrategy, next_lsn: u64) -> Result<Self> {
        let len = file.size()?;
        Ok(Self {
            file,
            len,
            failed: false,
            next_lsn,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append one record and return its LSN
    pub fn append(&mut self, ops: Vec<WalOp>) -> Result<u64> {
        if self.failed {
            return Err(HyperError::Corruption(
                "log has a torn frame from an earlier failed append".into(),
            ));
        }

        let lsn = self.next_lsn;
        let frame = encode_frame(&WalRecord { lsn, ops })?;
        if let Err(err) = self.file.write_all(&frame) {
            match self.file.truncate(self.len) {
                Ok(()) => tracing::warn!(lsn, error = %err, "rolled back failed WAL append"),
                Err(cut) => {
                    tracing::error!(lsn, error = %cut, "could not roll back failed WAL append");
                    self.failed = true;
                }
            }
            return Err(err.into());
        }
        self.len += frame.len() as u64;
        self.next_lsn += 1;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync()?;
        self.unsynced = 0;
        Ok(())
    }

    /// LSN the next record will carry
    pub fn next_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Bytes of complete frames in the file
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
