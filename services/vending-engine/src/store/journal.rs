//! Journal handle shared by the in-memory stores
//!
//! Callers append while holding the write guard of every record the event
//! touches, so the journal order matches the order in which the records were
//! changed in memory.

use super::StoreError;
use chrono::Utc;
use persistence::{decode_payload, FsyncPolicy, JournalConfig, JournalWriter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// Event kinds written to a store journal
pub trait JournalEvent: Serialize + DeserializeOwned {
    fn event_type(&self) -> &'static str;
}

pub struct StoreJournal {
    writer: Mutex<JournalWriter>,
}

impl StoreJournal {
    /// Open the journal in `dir` and decode every trusted event in order.
    ///
    /// A torn or corrupt tail is logged and discarded. An entry that passes
    /// its checksum but cannot be decoded is fatal: replaying around it
    /// would silently lose a committed write.
    pub fn open<E: JournalEvent>(
        dir: &Path,
        fsync_policy: FsyncPolicy,
    ) -> Result<(Self, Vec<E>), StoreError> {
        let config = JournalConfig {
            fsync_policy,
            ..JournalConfig::new(dir)
        };
        let (writer, scan) = JournalWriter::open(config)
            .map_err(|e| StoreError::Backend(format!("cannot open journal: {}", e)))?;

        if let Some(corruption) = &scan.corruption {
            warn!(
                path = %writer.path().display(),
                offset = corruption.byte_offset,
                kind = ?corruption.kind,
                detail = %corruption.detail,
                "discarding unreadable journal tail"
            );
        }

        let events = scan
            .entries
            .iter()
            .map(|entry| decode_payload::<E>(entry))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        info!(
            path = %writer.path().display(),
            events = events.len(),
            "journal opened"
        );

        Ok((
            Self {
                writer: Mutex::new(writer),
            },
            events,
        ))
    }

    /// Durably append one event. The caller must not change memory when
    /// this fails.
    pub fn record<E: JournalEvent>(&self, event: &E) -> Result<(), StoreError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Backend("journal lock poisoned".into()))?;
        writer
            .append_record(event.event_type(), Utc::now().timestamp_millis(), event)
            .map(|_| ())
            .map_err(|e| StoreError::Backend(format!("journal append failed: {}", e)))
    }
}
