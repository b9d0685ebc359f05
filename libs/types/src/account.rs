//! Account and balance types

use crate::ids::AccountId;
use crate::numeric::Cents;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role, fixed at signup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Spends a deposited balance on items
    Buyer,
    /// Lists and owns items
    Seller,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Buyer => write!(f, "buyer"),
            Role::Seller => write!(f, "seller"),
        }
    }
}

/// Account record held by the ledger
///
/// Invariant: `balance >= 0` holds by the type of `Cents`; writers go
/// through `debit`, `set_balance` or `reset_balance` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub credential_digest: String,
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Account {
    /// Create a new account with a zero balance
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        role: Role,
        credential_digest: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: AccountId::new(),
            email: email.into(),
            username: username.into(),
            role,
            credential_digest: credential_digest.into(),
            balance: Cents::ZERO,
            created_at,
            version: 0,
        }
    }

    pub fn is_buyer(&self) -> bool {
        matches!(self.role, Role::Buyer)
    }

    /// Subtract `amount` from the balance; `None` leaves the account untouched
    pub fn debit(&mut self, amount: Cents) -> Option<Cents> {
        let remaining = self.balance.checked_sub(amount)?;
        self.balance = remaining;
        self.version += 1;
        Some(remaining)
    }

    /// Replace the balance (deposit-set semantics, not additive)
    pub fn set_balance(&mut self, balance: Cents) {
        self.balance = balance;
        self.version += 1;
    }

    pub fn reset_balance(&mut self) {
        self.set_balance(Cents::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buyer() -> Account {
        Account::new("ann@example.com", "Ann", Role::Buyer, "digest", Utc::now())
    }

    #[test]
    fn test_account_creation() {
        let account = buyer();
        assert!(account.is_buyer());
        assert_eq!(account.balance, Cents::ZERO);
        assert_eq!(account.version, 0);
    }

    #[test]
    fn test_debit_within_balance() {
        let mut account = buyer();
        account.set_balance(Cents::new(100));
        assert_eq!(account.debit(Cents::new(35)), Some(Cents::new(65)));
        assert_eq!(account.balance, Cents::new(65));
        assert_eq!(account.version, 2);
    }

    #[test]
    fn test_overdraw_leaves_account_untouched() {
        let mut account = buyer();
        account.set_balance(Cents::new(10));
        assert_eq!(account.debit(Cents::new(15)), None);
        assert_eq!(account.balance, Cents::new(10));
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"seller\"");
        let role: Role = serde_json::from_str("\"buyer\"").unwrap();
        assert_eq!(role, Role::Buyer);
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }
}
