//! Journal Writer: Append-only event journal with checksums
//!
//! # Binary Format (per entry)
//! ```text
//! [total_len: u32]
//! [sequence:  u64]
//! [timestamp: i64]   // unix milliseconds
//! [event_type_len: u16][event_type: bytes]
//! [payload_len: u32][payload: bytes]
//! [checksum: u32]  // CRC32C over sequence+timestamp+event_type+payload
//! ```

use crc32c::crc32c;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::reader::{scan_file, ScanResult};

/// Upper bound on a single entry body; anything larger is treated as corruption.
const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

/// 8 (seq) + 8 (ts) + 2 (et_len) + 4 (pl_len) + 4 (crc)
const MIN_BODY_LEN: usize = 26;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Event type too long: {0} bytes")]
    EventTypeTooLong(usize),

    #[error("Journal refuses writes after an earlier write failed")]
    Halted,
}

// ── Journal Entry ───────────────────────────────────────────────────

/// A single journal entry representing one committed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Gapless sequence number, starting at 1
    pub sequence: u64,
    /// Commit time in unix milliseconds
    pub timestamp: i64,
    /// Event name, e.g. "PurchaseCommitted"
    pub event_type: String,
    /// Bincode-serialized event payload
    pub payload: Vec<u8>,
    /// CRC32C over (sequence ++ timestamp ++ event_type ++ payload)
    pub checksum: u32,
}

impl JournalEntry {
    /// Create a new entry, computing the CRC32C checksum automatically.
    pub fn new(sequence: u64, timestamp: i64, event_type: String, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(sequence, timestamp, &event_type, &payload);
        Self {
            sequence,
            timestamp,
            event_type,
            payload,
            checksum,
        }
    }

    pub fn compute_checksum(
        sequence: u64,
        timestamp: i64,
        event_type: &str,
        payload: &[u8],
    ) -> u32 {
        let mut buf = Vec::with_capacity(8 + 8 + event_type.len() + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(event_type.as_bytes());
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    pub fn verify_checksum(&self) -> bool {
        let expected =
            Self::compute_checksum(self.sequence, self.timestamp, &self.event_type, &self.payload);
        self.checksum == expected
    }

    /// Serialize entry to the binary wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, JournalError> {
        let event_type_bytes = self.event_type.as_bytes();
        let event_type_len = u16::try_from(event_type_bytes.len())
            .map_err(|_| JournalError::EventTypeTooLong(event_type_bytes.len()))?;
        let body_len = MIN_BODY_LEN + event_type_bytes.len() + self.payload.len();
        if body_len > MAX_BODY_LEN {
            return Err(JournalError::Serialization(format!(
                "entry body of {} bytes exceeds limit",
                body_len
            )));
        }
        let payload_len = self.payload.len() as u32;

        let mut buf = Vec::with_capacity(4 + body_len);
        buf.extend_from_slice(&(body_len as u32).to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&event_type_len.to_le_bytes());
        buf.extend_from_slice(event_type_bytes);
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        Ok(buf)
    }

    /// Deserialize entry from the binary wire format.
    ///
    /// Returns `(entry, bytes_consumed)`. Corrupt or incomplete input yields
    /// an error, never a panic. The checksum is not verified here.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), JournalError> {
        let mut pos = 0usize;
        let body_len = read_u32(data, &mut pos)? as usize;

        if !(MIN_BODY_LEN..=MAX_BODY_LEN).contains(&body_len) {
            return Err(JournalError::Serialization(format!(
                "Implausible body length: {}",
                body_len
            )));
        }
        let total = 4 + body_len;
        let body = data.get(4..total).ok_or_else(|| {
            JournalError::Serialization(format!(
                "Incomplete entry: need {} bytes, have {}",
                total,
                data.len()
            ))
        })?;

        let mut pos = 0usize;
        let sequence = u64::from_le_bytes(read_array(body, &mut pos)?);
        let timestamp = i64::from_le_bytes(read_array(body, &mut pos)?);
        let event_type_len = u16::from_le_bytes(read_array(body, &mut pos)?) as usize;
        let event_type = String::from_utf8(take(body, &mut pos, event_type_len)?.to_vec())
            .map_err(|e| JournalError::Serialization(e.to_string()))?;
        let payload_len = read_u32(body, &mut pos)? as usize;
        let payload = take(body, &mut pos, payload_len)?.to_vec();
        let checksum = read_u32(body, &mut pos)?;

        if pos != body.len() {
            return Err(JournalError::Serialization(format!(
                "{} trailing bytes inside entry body",
                body.len() - pos
            )));
        }

        Ok((
            Self {
                sequence,
                timestamp,
                event_type,
                payload,
                checksum,
            },
            total,
        ))
    }
}

fn take<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], JournalError> {
    let end = pos
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            JournalError::Serialization(format!(
                "field of {} bytes at offset {} overruns {} available",
                len,
                pos,
                data.len()
            ))
        })?;
    let slice = &data[*pos..end];
    *pos = end;
    Ok(slice)
}

fn read_array<const N: usize>(data: &[u8], pos: &mut usize) -> Result<[u8; N], JournalError> {
    let slice = take(data, pos, N)?;
    <[u8; N]>::try_from(slice).map_err(|e| JournalError::Serialization(e.to_string()))
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32, JournalError> {
    Ok(u32::from_le_bytes(read_array(data, pos)?))
}

// ── Fsync Policy ────────────────────────────────────────────────────

/// Controls when `fsync` (durable write) is called.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    /// Fsync after every write.
    EveryWrite,
    /// Fsync every N writes.
    EveryN(usize),
    /// Leave it to the OS; tests and throwaway environments only.
    Never,
}

// ── Journal Writer Configuration ────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Directory holding the journal file.
    pub dir: PathBuf,
    pub fsync_policy: FsyncPolicy,
}

impl JournalConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fsync_policy: FsyncPolicy::EveryWrite,
        }
    }

    pub fn journal_path(&self) -> PathBuf {
        Self::path_in(&self.dir)
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join("journal.bin")
    }
}

// ── Journal Writer ──────────────────────────────────────────────────

/// Append-only journal writer. Entries are flushed to the OS on every
/// append; `fsync` follows the configured policy.
pub struct JournalWriter {
    config: JournalConfig,
    writer: BufWriter<File>,
    path: PathBuf,
    next_sequence: u64,
    writes_since_fsync: usize,
    /// Set when a write may have left a partial entry on disk. Appending
    /// after it would hide new entries behind a torn one.
    halted: bool,
}

impl JournalWriter {
    /// Open (or create) the journal in `config.dir`.
    ///
    /// Existing entries are scanned and returned so the caller can replay
    /// them. A torn or corrupt tail is cut off before the writer is handed
    /// back, and sequencing continues after the last valid entry.
    pub fn open(config: JournalConfig) -> Result<(Self, ScanResult), JournalError> {
        fs::create_dir_all(&config.dir)?;
        let path = config.journal_path();
        let scan = scan_file(&path)?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() != scan.valid_len {
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }

        let next_sequence = scan.last_sequence().map_or(1, |seq| seq + 1);
        Ok((
            Self {
                config,
                writer: BufWriter::new(file),
                path,
                next_sequence,
                writes_since_fsync: 0,
                halted: false,
            },
            scan,
        ))
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event; the sequence number is assigned here.
    pub fn append(
        &mut self,
        event_type: &str,
        timestamp: i64,
        payload: Vec<u8>,
    ) -> Result<JournalEntry, JournalError> {
        if self.halted {
            return Err(JournalError::Halted);
        }
        let entry = JournalEntry::new(self.next_sequence, timestamp, event_type.to_string(), payload);
        let bytes = entry.to_bytes()?;
        if let Err(e) = self.write_durably(&bytes) {
            self.halted = true;
            return Err(e);
        }
        self.next_sequence += 1;
        Ok(entry)
    }

    fn write_durably(&mut self, bytes: &[u8]) -> Result<(), JournalError> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        self.writes_since_fsync += 1;
        self.apply_fsync_policy()
    }

    /// Serialize `record` with bincode and append it.
    pub fn append_record<T: Serialize>(
        &mut self,
        event_type: &str,
        timestamp: i64,
        record: &T,
    ) -> Result<u64, JournalError> {
        let payload =
            bincode::serialize(record).map_err(|e| JournalError::Serialization(e.to_string()))?;
        self.append(event_type, timestamp, payload)
            .map(|entry| entry.sequence)
    }

    /// Force flush + fsync (used before shutdown).
    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_fsync = 0;
        Ok(())
    }

    fn apply_fsync_policy(&mut self) -> Result<(), JournalError> {
        let should_fsync = match self.config.fsync_policy {
            FsyncPolicy::EveryWrite => true,
            FsyncPolicy::EveryN(n) => self.writes_since_fsync >= n,
            FsyncPolicy::Never => false,
        };
        if should_fsync {
            self.writer.get_ref().sync_all()?;
            self.writes_since_fsync = 0;
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entry(seq: u64) -> JournalEntry {
        JournalEntry::new(
            seq,
            1_708_123_456_789 + seq as i64,
            "BalanceSet".to_string(),
            vec![1, 2, 3, 4, 5],
        )
    }

    #[test]
    fn test_journal_entry_checksum_detects_tamper() {
        let mut entry = sample_entry(1);
        assert!(entry.verify_checksum());
        entry.payload = vec![99, 98, 97];
        assert!(!entry.verify_checksum());
    }

    #[test]
    fn test_journal_entry_wire_format() {
        let entry = sample_entry(42);
        let bytes = entry.to_bytes().unwrap();
        let (decoded, consumed) = JournalEntry::from_bytes(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(entry, decoded);
    }

    #[test]
    fn test_from_bytes_rejects_short_input() {
        let bytes = sample_entry(1).to_bytes().unwrap();
        for cut in [0, 3, 10, bytes.len() - 1] {
            assert!(JournalEntry::from_bytes(&bytes[..cut]).is_err());
        }
    }

    #[test]
    fn test_from_bytes_rejects_implausible_length() {
        let mut bytes = sample_entry(1).to_bytes().unwrap();
        bytes[..4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(JournalEntry::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_writer_assigns_gapless_sequences() {
        let tmp = TempDir::new().unwrap();
        let (mut writer, scan) = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
        assert!(scan.entries.is_empty());

        for expected in 1..=5 {
            let entry = writer.append("Evt", 0, vec![expected as u8]).unwrap();
            assert_eq!(entry.sequence, expected);
        }
        assert_eq!(writer.next_sequence(), 6);
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let tmp = TempDir::new().unwrap();
        {
            let (mut writer, _) = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
            writer.append("A", 1, vec![1]).unwrap();
            writer.append("B", 2, vec![2]).unwrap();
            writer.sync().unwrap();
        }
        let (mut writer, scan) = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
        assert_eq!(scan.entries.len(), 2);
        assert_eq!(writer.append("C", 3, vec![3]).unwrap().sequence, 3);
    }

    #[test]
    fn test_reopen_truncates_torn_tail() {
        let tmp = TempDir::new().unwrap();
        let path = JournalConfig::path_in(tmp.path());
        {
            let (mut writer, _) = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
            writer.append("A", 1, vec![1]).unwrap();
            writer.append("B", 2, vec![2]).unwrap();
        }
        // Simulate a crash halfway through a third write.
        let partial = sample_entry(3).to_bytes().unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&partial[..partial.len() / 2]).unwrap();
        drop(file);

        let (mut writer, scan) = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
        assert_eq!(scan.entries.len(), 2);
        assert!(scan.corruption.is_some());
        writer.append("C", 3, vec![3]).unwrap();
        drop(writer);

        let rescan = scan_file(&path).unwrap();
        assert_eq!(rescan.entries.len(), 3);
        assert!(rescan.corruption.is_none());
        assert_eq!(rescan.entries[2].event_type, "C");
    }

    #[test]
    fn test_fsync_policy_every_n() {
        let tmp = TempDir::new().unwrap();
        let config = JournalConfig {
            fsync_policy: FsyncPolicy::EveryN(3),
            ..JournalConfig::new(tmp.path())
        };
        let (mut writer, _) = JournalWriter::open(config).unwrap();
        for _ in 0..7 {
            writer.append("Evt", 0, vec![]).unwrap();
        }
        assert_eq!(writer.writes_since_fsync, 1);
        writer.sync().unwrap();
        assert_eq!(writer.writes_since_fsync, 0);
    }
}
