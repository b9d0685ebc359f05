//! Shared fixtures for the engine integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use std::sync::{Arc, Mutex};
use types::prelude::*;
use vending_engine::{CredentialHasher, LedgerStore, MemoryLedger, SaltedSha256};

pub const PASSWORD: &str = "Str0ng!pw";

pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new() -> Arc<Self> {
        let start = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Arc::new(Self(Mutex::new(start)))
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.0.lock().unwrap() += delta;
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn hasher() -> Arc<SaltedSha256> {
    Arc::new(SaltedSha256::new(1))
}

pub fn seed_account(ledger: &MemoryLedger, email: &str, role: Role, balance: u64) -> AccountId {
    let mut account = Account::new(email, "Test User", role, hasher().hash(PASSWORD), Utc::now());
    account.set_balance(Cents::new(balance));
    let id = account.account_id;
    ledger.insert_account(account).unwrap();
    id
}

pub fn seed_item(ledger: &MemoryLedger, owner: AccountId, cost: u64, stock: u32) -> ItemId {
    let item = Item::new(owner, "Cola", Cents::new(cost), stock, Utc::now());
    let id = item.item_id;
    ledger.insert_item(item).unwrap();
    id
}
