//! Vending Engine
//!
//! Transactional core of the vending ledger: buyers spend a pre-loaded
//! balance on stocked items, and every account holds at most one live login
//! session.
//!
//! **Key Invariants:**
//! - A purchase either applies stock decrement and balance debit together or
//!   applies nothing
//! - Stock and balances never go below zero, even under concurrent purchases
//! - At most one stored session per account; a second login is rejected
//!   until the first is terminated or expires
//!
//! Stores are explicit handles passed to each service at construction. The
//! purchase engine and the session authority share no locks.

pub mod accounts;
pub mod catalog;
pub mod change;
pub mod credentials;
pub mod purchase;
pub mod session;
pub mod store;
pub mod token;

pub use accounts::{AccountProfile, AccountService, SignupRequest};
pub use catalog::{Catalog, NewItem};
pub use change::{change, make_change, ChangeBreakdown, ChangeIter, DENOMINATIONS};
pub use credentials::{CredentialHasher, SaltedSha256};
pub use purchase::PurchaseEngine;
pub use session::{IssuedSession, SessionAuthority, SessionCheck};
pub use store::{LedgerStore, MemoryLedger, MemorySessionStore, SessionStore, StoreError};
pub use token::{Claims, JwtTokens, TokenScope, TokenService};

/// Time source shared by the services
pub type SharedClock = std::sync::Arc<dyn mockable::Clock + Send + Sync>;
