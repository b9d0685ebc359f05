//! Journal Reader: Sequential scan with corruption detection
//!
//! - CRC32C checksum validation on every entry
//! - Gapless / monotonic sequence validation
//! - Stops at the first torn, corrupt or out-of-sequence entry and reports
//!   the byte offset so the writer can truncate there

use crate::journal::JournalEntry;
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot decode payload of entry seq={sequence} ({event_type}): {detail}")]
    Decode {
        sequence: u64,
        event_type: String,
        detail: String,
    },
}

// ── Corruption Log Entry ────────────────────────────────────────────

/// Where and why a scan stopped early.
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptionRecord {
    pub byte_offset: u64,
    pub kind: CorruptionKind,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CorruptionKind {
    ChecksumMismatch,
    TruncatedEntry,
    SequenceGap,
}

// ── Scan ────────────────────────────────────────────────────────────

/// Outcome of reading a journal file front to back.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Entries that passed every check, in sequence order.
    pub entries: Vec<JournalEntry>,
    /// Length of the trusted prefix of the file, in bytes.
    pub valid_len: u64,
    /// Set when the scan stopped before the end of the file.
    pub corruption: Option<CorruptionRecord>,
}

impl ScanResult {
    pub fn last_sequence(&self) -> Option<u64> {
        self.entries.last().map(|entry| entry.sequence)
    }
}

/// Read every trusted entry from `path`. A missing file is an empty journal.
pub fn scan_file(path: &Path) -> io::Result<ScanResult> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ScanResult::default()),
        Err(err) => return Err(err),
    };
    Ok(scan_bytes(&data))
}

fn scan_bytes(data: &[u8]) -> ScanResult {
    let mut result = ScanResult::default();
    let mut pos = 0usize;

    while pos < data.len() {
        let offset = pos as u64;
        let (entry, consumed) = match JournalEntry::from_bytes(&data[pos..]) {
            Ok(parsed) => parsed,
            Err(err) => {
                result.corruption = Some(CorruptionRecord {
                    byte_offset: offset,
                    kind: CorruptionKind::TruncatedEntry,
                    detail: format!("{} bytes unreadable: {}", data.len() - pos, err),
                });
                break;
            }
        };

        if !entry.verify_checksum() {
            result.corruption = Some(CorruptionRecord {
                byte_offset: offset,
                kind: CorruptionKind::ChecksumMismatch,
                detail: format!(
                    "CRC32C mismatch for seq={}, stored={:#010x}",
                    entry.sequence, entry.checksum
                ),
            });
            break;
        }

        let expected = result.last_sequence().map_or(1, |seq| seq + 1);
        if entry.sequence != expected {
            result.corruption = Some(CorruptionRecord {
                byte_offset: offset,
                kind: CorruptionKind::SequenceGap,
                detail: format!("expected seq={}, found seq={}", expected, entry.sequence),
            });
            break;
        }

        pos += consumed;
        result.valid_len = pos as u64;
        result.entries.push(entry);
    }

    result
}

/// Decode the bincode payload of `entry`.
pub fn decode_payload<T: DeserializeOwned>(entry: &JournalEntry) -> Result<T, ReaderError> {
    bincode::deserialize(&entry.payload).map_err(|e| ReaderError::Decode {
        sequence: entry.sequence,
        event_type: entry.event_type.clone(),
        detail: e.to_string(),
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{JournalConfig, JournalWriter};
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct BalanceSet {
        account: String,
        balance: u64,
    }

    fn encoded(entries: &[JournalEntry]) -> Vec<u8> {
        entries
            .iter()
            .flat_map(|e| e.to_bytes().unwrap())
            .collect()
    }

    fn entry(seq: u64) -> JournalEntry {
        JournalEntry::new(seq, seq as i64, "Evt".into(), vec![seq as u8; 4])
    }

    #[test]
    fn test_missing_file_is_empty_journal() {
        let tmp = TempDir::new().unwrap();
        let scan = scan_file(&tmp.path().join("absent.bin")).unwrap();
        assert!(scan.entries.is_empty());
        assert_eq!(scan.valid_len, 0);
        assert!(scan.corruption.is_none());
    }

    #[test]
    fn test_sequential_scan() {
        let data = encoded(&[entry(1), entry(2), entry(3)]);
        let scan = scan_bytes(&data);
        assert_eq!(scan.entries.len(), 3);
        assert_eq!(scan.valid_len, data.len() as u64);
        assert_eq!(scan.last_sequence(), Some(3));
    }

    #[test]
    fn test_checksum_mismatch_stops_scan() {
        let first = entry(1).to_bytes().unwrap();
        let mut data = encoded(&[entry(1), entry(2), entry(3)]);
        // Flip a payload byte inside the second entry.
        let flip_at = first.len() + 4 + 8 + 8 + 2 + 3 + 4;
        data[flip_at] ^= 0xFF;

        let scan = scan_bytes(&data);
        assert_eq!(scan.entries.len(), 1);
        assert_eq!(scan.valid_len, first.len() as u64);
        let corruption = scan.corruption.unwrap();
        assert_eq!(corruption.kind, CorruptionKind::ChecksumMismatch);
        assert_eq!(corruption.byte_offset, first.len() as u64);
    }

    #[test]
    fn test_sequence_gap_stops_scan() {
        let data = encoded(&[entry(1), entry(2), entry(5)]);
        let scan = scan_bytes(&data);
        assert_eq!(scan.entries.len(), 2);
        assert_eq!(scan.corruption.unwrap().kind, CorruptionKind::SequenceGap);
    }

    #[test]
    fn test_truncated_tail_keeps_prefix() {
        let mut data = encoded(&[entry(1), entry(2)]);
        let valid = data.len();
        data.extend_from_slice(&entry(3).to_bytes().unwrap()[..10]);

        let scan = scan_bytes(&data);
        assert_eq!(scan.entries.len(), 2);
        assert_eq!(scan.valid_len, valid as u64);
        assert_eq!(scan.corruption.unwrap().kind, CorruptionKind::TruncatedEntry);
    }

    #[test]
    fn test_typed_records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let record = BalanceSet {
            account: "acc-1".into(),
            balance: 85,
        };
        {
            let (mut writer, _) = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
            writer.append_record("BalanceSet", 7, &record).unwrap();
        }
        let scan = scan_file(&JournalConfig::path_in(tmp.path())).unwrap();
        let decoded: BalanceSet = decode_payload(&scan.entries[0]).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(scan.entries[0].timestamp, 7);
    }

    #[test]
    fn test_decode_error_names_entry() {
        let bad = JournalEntry::new(9, 0, "BalanceSet".into(), vec![1]);
        match decode_payload::<BalanceSet>(&bad) {
            Err(ReaderError::Decode { sequence, event_type, .. }) => {
                assert_eq!(sequence, 9);
                assert_eq!(event_type, "BalanceSet");
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn scan_never_panics_on_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..512)) {
                let scan = scan_bytes(&data);
                prop_assert!(scan.valid_len as usize <= data.len());
            }

            #[test]
            fn any_prefix_cut_keeps_whole_entries(count in 1u64..6, cut in 0usize..400) {
                let entries: Vec<_> = (1..=count).map(entry).collect();
                let data = encoded(&entries);
                let cut = cut.min(data.len());
                let scan = scan_bytes(&data[..cut]);
                prop_assert!(scan.entries.len() as u64 <= count);
                for (i, e) in scan.entries.iter().enumerate() {
                    prop_assert_eq!(e.sequence, i as u64 + 1);
                }
            }
        }
    }
}
