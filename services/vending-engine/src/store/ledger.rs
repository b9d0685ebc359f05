//! In-memory ledger of accounts and items
//!
//! Records live in sharded maps with one write guard per record. A purchase
//! holds the item guard and then the account guard for the whole
//! check-journal-apply sequence, so concurrent purchases of the same item
//! serialize while purchases of different items proceed in parallel.
//!
//! Lock order: `emails` before `accounts`, `items` before `accounts`.

use super::journal::{JournalEvent, StoreJournal};
use super::{LedgerStore, PurchaseCommit, PurchaseWrite, StoreError, WriteCondition};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use persistence::FsyncPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use types::account::Account;
use types::ids::{AccountId, ItemId};
use types::item::{Item, ItemDetails};
use types::numeric::Cents;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    AccountOpened(Account),
    BalanceSet {
        account_id: AccountId,
        balance: Cents,
    },
    ItemListed(Item),
    ItemEdited {
        item_id: ItemId,
        details: ItemDetails,
    },
    ItemRemoved {
        item_id: ItemId,
    },
    PurchaseCommitted {
        account_id: AccountId,
        item_id: ItemId,
        quantity: u32,
        total_price: Cents,
    },
}

impl JournalEvent for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::AccountOpened(_) => "AccountOpened",
            LedgerEvent::BalanceSet { .. } => "BalanceSet",
            LedgerEvent::ItemListed(_) => "ItemListed",
            LedgerEvent::ItemEdited { .. } => "ItemEdited",
            LedgerEvent::ItemRemoved { .. } => "ItemRemoved",
            LedgerEvent::PurchaseCommitted { .. } => "PurchaseCommitted",
        }
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    accounts: DashMap<AccountId, Account>,
    emails: DashMap<String, AccountId>,
    items: DashMap<ItemId, Item>,
    journal: Option<StoreJournal>,
}

impl MemoryLedger {
    /// Volatile ledger; state is lost on drop.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger backed by the journal in `dir`, rebuilt from its events.
    pub fn open(dir: &Path, fsync_policy: FsyncPolicy) -> Result<Self, StoreError> {
        let (journal, events) = StoreJournal::open::<LedgerEvent>(dir, fsync_policy)?;
        let ledger = Self {
            journal: Some(journal),
            ..Self::default()
        };
        for event in events {
            ledger.replay(event)?;
        }
        debug!(
            accounts = ledger.accounts.len(),
            items = ledger.items.len(),
            "ledger replayed"
        );
        Ok(ledger)
    }

    fn record(&self, event: &LedgerEvent) -> Result<(), StoreError> {
        match &self.journal {
            Some(journal) => journal.record(event),
            None => Ok(()),
        }
    }

    /// Re-apply a journaled event. Events were validated when first
    /// written, so a failed guard here means the journal and the code
    /// disagree.
    fn replay(&self, event: LedgerEvent) -> Result<(), StoreError> {
        match event {
            LedgerEvent::AccountOpened(account) => {
                self.emails
                    .insert(account.email.clone(), account.account_id);
                self.accounts.insert(account.account_id, account);
            }
            LedgerEvent::BalanceSet {
                account_id,
                balance,
            } => {
                self.accounts
                    .get_mut(&account_id)
                    .ok_or_else(|| StoreError::not_found("Account", account_id))?
                    .set_balance(balance);
            }
            LedgerEvent::ItemListed(item) => {
                self.items.insert(item.item_id, item);
            }
            LedgerEvent::ItemEdited { item_id, details } => {
                let mut item = self
                    .items
                    .get_mut(&item_id)
                    .ok_or_else(|| StoreError::not_found("Item", item_id))?;
                details.apply_to(&mut item);
            }
            LedgerEvent::ItemRemoved { item_id } => {
                self.items.remove(&item_id);
            }
            LedgerEvent::PurchaseCommitted {
                account_id,
                item_id,
                quantity,
                total_price,
            } => {
                let mut item = self
                    .items
                    .get_mut(&item_id)
                    .ok_or_else(|| StoreError::not_found("Item", item_id))?;
                let mut account = self
                    .accounts
                    .get_mut(&account_id)
                    .ok_or_else(|| StoreError::not_found("Account", account_id))?;
                let applied = item.take_stock(quantity).is_some()
                    && account.debit(total_price).is_some();
                if !applied {
                    return Err(StoreError::Backend(format!(
                        "journaled purchase of {} x{} no longer applies",
                        item_id, quantity
                    )));
                }
            }
        }
        Ok(())
    }
}

impl LedgerStore for MemoryLedger {
    fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        match self.emails.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey { key: account.email }),
            Entry::Vacant(slot) => {
                let event = LedgerEvent::AccountOpened(account);
                self.record(&event)?;
                if let LedgerEvent::AccountOpened(account) = event {
                    slot.insert(account.account_id);
                    self.accounts.insert(account.account_id, account);
                }
                Ok(())
            }
        }
    }

    fn account(&self, account_id: &AccountId) -> Result<Account, StoreError> {
        self.accounts
            .get(account_id)
            .map(|account| account.clone())
            .ok_or_else(|| StoreError::not_found("Account", account_id))
    }

    fn account_by_email(&self, email: &str) -> Result<Account, StoreError> {
        let account_id = self
            .emails
            .get(email)
            .map(|id| *id)
            .ok_or_else(|| StoreError::not_found("Account", email))?;
        self.account(&account_id)
    }

    fn set_balance(&self, account_id: &AccountId, balance: Cents) -> Result<Account, StoreError> {
        let mut account = self
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StoreError::not_found("Account", account_id))?;
        self.record(&LedgerEvent::BalanceSet {
            account_id: *account_id,
            balance,
        })?;
        account.set_balance(balance);
        Ok(account.clone())
    }

    fn insert_item(&self, item: Item) -> Result<(), StoreError> {
        match self.items.entry(item.item_id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey {
                key: item.item_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                let event = LedgerEvent::ItemListed(item);
                self.record(&event)?;
                if let LedgerEvent::ItemListed(item) = event {
                    slot.insert(item);
                }
                Ok(())
            }
        }
    }

    fn item(&self, item_id: &ItemId) -> Result<Item, StoreError> {
        self.items
            .get(item_id)
            .map(|item| item.clone())
            .ok_or_else(|| StoreError::not_found("Item", item_id))
    }

    fn items(&self) -> Result<Vec<Item>, StoreError> {
        let mut items: Vec<Item> = self.items.iter().map(|entry| entry.clone()).collect();
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        Ok(items)
    }

    fn update_item(&self, item_id: &ItemId, details: &ItemDetails) -> Result<Item, StoreError> {
        let mut item = self
            .items
            .get_mut(item_id)
            .ok_or_else(|| StoreError::not_found("Item", item_id))?;
        self.record(&LedgerEvent::ItemEdited {
            item_id: *item_id,
            details: details.clone(),
        })?;
        details.apply_to(&mut item);
        Ok(item.clone())
    }

    fn remove_item(&self, item_id: &ItemId) -> Result<Item, StoreError> {
        match self.items.entry(*item_id) {
            Entry::Vacant(_) => Err(StoreError::not_found("Item", item_id)),
            Entry::Occupied(slot) => {
                self.record(&LedgerEvent::ItemRemoved { item_id: *item_id })?;
                Ok(slot.remove())
            }
        }
    }

    fn commit_purchase(&self, write: &PurchaseWrite) -> Result<PurchaseCommit, StoreError> {
        let mut item = self
            .items
            .get_mut(&write.item_id)
            .ok_or_else(|| StoreError::not_found("Item", write.item_id))?;
        let mut account = self
            .accounts
            .get_mut(&write.account_id)
            .ok_or_else(|| StoreError::not_found("Account", write.account_id))?;

        if !item.has_stock(write.quantity) {
            return Err(StoreError::ConditionFailed(WriteCondition::Stock {
                available: item.stock,
            }));
        }
        if account.balance < write.total_price {
            return Err(StoreError::ConditionFailed(WriteCondition::Balance {
                available: account.balance,
            }));
        }

        self.record(&LedgerEvent::PurchaseCommitted {
            account_id: write.account_id,
            item_id: write.item_id,
            quantity: write.quantity,
            total_price: write.total_price,
        })?;

        // Both guards were checked above with the locks still held.
        let stock_after = item.take_stock(write.quantity).unwrap_or(item.stock);
        let balance_after = account
            .debit(write.total_price)
            .unwrap_or(account.balance);

        Ok(PurchaseCommit {
            stock_after,
            balance_after,
        })
    }
}
