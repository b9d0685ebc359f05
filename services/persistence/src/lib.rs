//! Write-ahead journal for the vending stores
//!
//! Provides append-only journal writing and sequential reading with
//! corruption detection. The ledger and session stores append one entry per
//! committed mutation before making it visible, and rebuild their state by
//! replaying the journal at start-up.
//!
//! # Guarantees
//! - Every entry carries a CRC32C checksum and a gapless sequence number
//! - Reading stops at the first torn or corrupt entry; everything before it
//!   is trusted, everything after it is discarded
//! - Reopening a journal for writing truncates a torn tail so new entries
//!   are never hidden behind garbage

pub mod journal;
pub mod reader;

pub use journal::{FsyncPolicy, JournalConfig, JournalEntry, JournalError, JournalWriter};
pub use reader::{decode_payload, scan_file, CorruptionKind, CorruptionRecord, ReaderError, ScanResult};
