//! Store contracts for the ledger and the session table
//!
//! The engines only see these traits. `MemoryLedger` and
//! `MemorySessionStore` are the in-process implementations; both can be
//! backed by a write-ahead journal so their state survives restarts.

pub mod journal;
pub mod ledger;
pub mod sessions;

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use types::account::Account;
use types::errors::VendingError;
use types::ids::{AccountId, ItemId};
use types::item::{Item, ItemDetails};
use types::numeric::Cents;
use types::session::Session;

pub use ledger::MemoryLedger;
pub use sessions::MemorySessionStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Duplicate key: {key}")]
    DuplicateKey { key: String },

    #[error("Write condition failed: {0}")]
    ConditionFailed(WriteCondition),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Context-free translation. Engines map the errors they can explain
/// (a failed purchase guard, a duplicate email) before falling back on this.
impl From<StoreError> for VendingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => VendingError::NotFound { entity, id },
            StoreError::DuplicateKey { key } => {
                VendingError::InvalidInput(format!("{} already exists", key))
            }
            StoreError::ConditionFailed(condition) => VendingError::TransactionAborted {
                reason: condition.to_string(),
            },
            StoreError::Backend(detail) => VendingError::Internal(detail),
        }
    }
}

/// Guard that no longer held when a conditional write was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    Stock { available: u32 },
    Balance { available: Cents },
}

impl fmt::Display for WriteCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteCondition::Stock { available } => write!(f, "only {} in stock", available),
            WriteCondition::Balance { available } => write!(f, "balance is {}", available),
        }
    }
}

/// Writes of one purchase, applied together or not at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseWrite {
    pub account_id: AccountId,
    pub item_id: ItemId,
    pub quantity: u32,
    pub total_price: Cents,
}

/// State of both records right after a purchase commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseCommit {
    pub stock_after: u32,
    pub balance_after: Cents,
}

pub trait LedgerStore: Send + Sync {
    /// Insert a new account; fails with `DuplicateKey` when the email is taken.
    fn insert_account(&self, account: Account) -> Result<(), StoreError>;

    fn account(&self, account_id: &AccountId) -> Result<Account, StoreError>;

    fn account_by_email(&self, email: &str) -> Result<Account, StoreError>;

    /// Replace the balance of an account.
    fn set_balance(&self, account_id: &AccountId, balance: Cents) -> Result<Account, StoreError>;

    fn insert_item(&self, item: Item) -> Result<(), StoreError>;

    fn item(&self, item_id: &ItemId) -> Result<Item, StoreError>;

    /// All items, oldest first.
    fn items(&self) -> Result<Vec<Item>, StoreError>;

    fn update_item(&self, item_id: &ItemId, details: &ItemDetails) -> Result<Item, StoreError>;

    fn remove_item(&self, item_id: &ItemId) -> Result<Item, StoreError>;

    /// Re-check `stock >= quantity` and `balance >= total_price`, then
    /// decrement stock and debit balance as one atomic unit.
    ///
    /// A failed guard is reported as `ConditionFailed` and leaves both
    /// records untouched.
    fn commit_purchase(&self, write: &PurchaseWrite) -> Result<PurchaseCommit, StoreError>;
}

pub trait SessionStore: Send + Sync {
    /// Live session for the account. An expired record is evicted and
    /// reported as absent.
    fn get(&self, account_id: &AccountId, now: DateTime<Utc>) -> Result<Option<Session>, StoreError>;

    /// Store `session` unless the account already holds a live one.
    ///
    /// Returns the blocking session when the insert was refused. An expired
    /// record is replaced.
    fn insert_if_vacant(
        &self,
        session: Session,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError>;

    /// Remove whatever session the account holds.
    fn remove(&self, account_id: &AccountId) -> Result<Option<Session>, StoreError>;

    /// Remove the account's session only when it carries `token`.
    fn remove_if_token(&self, account_id: &AccountId, token: &str) -> Result<bool, StoreError>;

    /// Evict every expired record; returns how many were removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}
