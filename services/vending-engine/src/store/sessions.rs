//! Session table keyed by account
//!
//! One slot per account. The check for a live session and the insert of a
//! new one happen under the same slot guard, so two logins racing for one
//! account cannot both succeed.

use super::journal::{JournalEvent, StoreJournal};
use super::{SessionStore, StoreError};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use persistence::FsyncPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use types::ids::AccountId;
use types::session::Session;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    Opened(Session),
    Closed { account_id: AccountId, token: String },
}

impl JournalEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::Opened(_) => "SessionOpened",
            SessionEvent::Closed { .. } => "SessionClosed",
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<AccountId, Session>,
    journal: Option<StoreJournal>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session table backed by the journal in `dir`.
    ///
    /// Expiry is not journaled; records that expired while the process was
    /// down are evicted on first access or by the next purge.
    pub fn open(dir: &Path, fsync_policy: FsyncPolicy) -> Result<Self, StoreError> {
        let (journal, events) = StoreJournal::open::<SessionEvent>(dir, fsync_policy)?;
        let store = Self {
            journal: Some(journal),
            ..Self::default()
        };
        for event in events {
            match event {
                SessionEvent::Opened(session) => {
                    store.sessions.insert(session.account_id, session);
                }
                SessionEvent::Closed { account_id, token } => {
                    store
                        .sessions
                        .remove_if(&account_id, |_, session| session.matches(&token));
                }
            }
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn record(&self, event: &SessionEvent) -> Result<(), StoreError> {
        match &self.journal {
            Some(journal) => journal.record(event),
            None => Ok(()),
        }
    }

    fn closed(session: &Session) -> SessionEvent {
        SessionEvent::Closed {
            account_id: session.account_id,
            token: session.token.clone(),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, account_id: &AccountId, now: DateTime<Utc>) -> Result<Option<Session>, StoreError> {
        match self.sessions.entry(*account_id) {
            Entry::Vacant(_) => Ok(None),
            Entry::Occupied(slot) if slot.get().is_expired(now) => {
                slot.remove();
                Ok(None)
            }
            Entry::Occupied(slot) => Ok(Some(slot.get().clone())),
        }
    }

    fn insert_if_vacant(
        &self,
        session: Session,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        match self.sessions.entry(session.account_id) {
            Entry::Occupied(slot) if !slot.get().is_expired(now) => Ok(Some(slot.get().clone())),
            Entry::Occupied(mut slot) => {
                self.record(&SessionEvent::Opened(session.clone()))?;
                slot.insert(session);
                Ok(None)
            }
            Entry::Vacant(slot) => {
                self.record(&SessionEvent::Opened(session.clone()))?;
                slot.insert(session);
                Ok(None)
            }
        }
    }

    fn remove(&self, account_id: &AccountId) -> Result<Option<Session>, StoreError> {
        match self.sessions.entry(*account_id) {
            Entry::Vacant(_) => Ok(None),
            Entry::Occupied(slot) => {
                self.record(&Self::closed(slot.get()))?;
                Ok(Some(slot.remove()))
            }
        }
    }

    fn remove_if_token(&self, account_id: &AccountId, token: &str) -> Result<bool, StoreError> {
        match self.sessions.entry(*account_id) {
            Entry::Occupied(slot) if slot.get().matches(token) => {
                self.record(&Self::closed(slot.get()))?;
                slot.remove();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let expired: Vec<AccountId> = self
            .sessions
            .iter()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| *entry.key())
            .collect();

        let removed = expired
            .iter()
            .filter(|account_id| {
                self.sessions
                    .remove_if(account_id, |_, session| session.is_expired(now))
                    .is_some()
            })
            .count();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    fn session(account_id: AccountId, token: &str, now: DateTime<Utc>, ttl_secs: i64) -> Session {
        Session {
            account_id,
            token: token.into(),
            created_at: now,
            expires_at: now + TimeDelta::seconds(ttl_secs),
        }
    }

    #[test]
    fn test_second_insert_blocked_by_live_session() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let id = AccountId::new();
        assert!(store.insert_if_vacant(session(id, "t1", now, 60), now).unwrap().is_none());

        let blocking = store
            .insert_if_vacant(session(id, "t2", now, 60), now)
            .unwrap()
            .unwrap();
        assert_eq!(blocking.token, "t1");
        assert_eq!(store.get(&id, now).unwrap().unwrap().token, "t1");
    }

    #[test]
    fn test_expired_session_is_replaced() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let id = AccountId::new();
        store.insert_if_vacant(session(id, "old", now, 10), now).unwrap();

        let later = now + TimeDelta::seconds(10);
        assert!(store
            .insert_if_vacant(session(id, "new", later, 10), later)
            .unwrap()
            .is_none());
        assert_eq!(store.get(&id, later).unwrap().unwrap().token, "new");
    }

    #[test]
    fn test_get_evicts_expired() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let id = AccountId::new();
        store.insert_if_vacant(session(id, "t", now, 5), now).unwrap();
        assert!(store.get(&id, now + TimeDelta::seconds(5)).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_if_token_requires_match() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let id = AccountId::new();
        store.insert_if_vacant(session(id, "t", now, 60), now).unwrap();
        assert!(!store.remove_if_token(&id, "other").unwrap());
        assert!(store.remove_if_token(&id, "t").unwrap());
        assert!(store.get(&id, now).unwrap().is_none());
    }

    #[test]
    fn test_purge_only_expired() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let short = AccountId::new();
        let long = AccountId::new();
        store.insert_if_vacant(session(short, "s", now, 1), now).unwrap();
        store.insert_if_vacant(session(long, "l", now, 600), now).unwrap();

        let purged = store.purge_expired(now + TimeDelta::seconds(30)).unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&long, now).unwrap().is_some());
    }

    #[test]
    fn test_journal_replay() {
        let tmp = TempDir::new().unwrap();
        let now = Utc::now();
        let kept = AccountId::new();
        let closed = AccountId::new();
        {
            let store = MemorySessionStore::open(tmp.path(), FsyncPolicy::EveryWrite).unwrap();
            store.insert_if_vacant(session(kept, "k", now, 600), now).unwrap();
            store.insert_if_vacant(session(closed, "c", now, 600), now).unwrap();
            store.remove(&closed).unwrap();
        }
        let store = MemorySessionStore::open(tmp.path(), FsyncPolicy::EveryWrite).unwrap();
        assert_eq!(store.get(&kept, now).unwrap().unwrap().token, "k");
        assert!(store.get(&closed, now).unwrap().is_none());
    }
}
