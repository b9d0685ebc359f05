//! Error taxonomy for the vending ledger
//!
//! Every failure surfaced by the purchase engine, the session authority and
//! the account/catalogue services is one of these kinds. Storage errors are
//! translated at the engine boundary and never leak through.

use crate::ids::ItemId;
use crate::numeric::Cents;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VendingError {
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Cents, available: Cents },

    #[error("Stock for item {item_id} changed while the purchase was in flight")]
    ConcurrentStockConflict { item_id: ItemId },

    #[error("Transaction aborted: {reason}")]
    TransactionAborted { reason: String },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Invalid email or password")]
    InvalidCredential,

    /// The account already holds a live session. The token carried here is a
    /// termination token: it only authorizes ending the existing session.
    #[error("There is already an active session using this account")]
    ActiveSessionConflict { termination_token: String },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("An account already exists for {email}")]
    AccountExists { email: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VendingError {
    /// Machine-checkable kind
    pub fn code(&self) -> &'static str {
        match self {
            VendingError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            VendingError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            VendingError::ConcurrentStockConflict { .. } => "CONCURRENT_STOCK_CONFLICT",
            VendingError::TransactionAborted { .. } => "TRANSACTION_ABORTED",
            VendingError::Unauthorized { .. } => "UNAUTHORIZED",
            VendingError::InvalidCredential => "INVALID_CREDENTIAL",
            VendingError::ActiveSessionConflict { .. } => "ACTIVE_SESSION_CONFLICT",
            VendingError::InvalidToken => "INVALID_TOKEN",
            VendingError::ExpiredToken => "EXPIRED_TOKEN",
            VendingError::NotFound { .. } => "NOT_FOUND",
            VendingError::InvalidInput(_) => "INVALID_INPUT",
            VendingError::AccountExists { .. } => "ACCOUNT_EXISTS",
            VendingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether re-sending the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VendingError::ConcurrentStockConflict { .. } | VendingError::TransactionAborted { .. }
        )
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        VendingError::Unauthorized {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        VendingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
