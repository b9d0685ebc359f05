//! Types library for the vending ledger
//!
//! Core type definitions shared by the engine, the journal and the gateway,
//! so that every layer agrees on identifiers, money units and the error
//! taxonomy.
//!
//! # Modules
//! - `ids`: Unique identifiers (AccountId, ItemId, TokenId)
//! - `numeric`: Integer money amounts in cents
//! - `account`: Accounts, roles and balances
//! - `item`: Stocked catalogue items
//! - `session`: Login session records
//! - `receipt`: Purchase receipts
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod account;
pub mod item;
pub mod session;
pub mod receipt;
pub mod errors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::account::*;
    pub use crate::item::*;
    pub use crate::session::*;
    pub use crate::receipt::*;
    pub use crate::errors::*;
}
