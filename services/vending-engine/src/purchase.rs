//! Purchase Engine
//!
//! One buy is: validate, pre-check, commit, compute change. The pre-checks
//! give precise errors cheaply; the store re-checks both guards inside the
//! commit, which is what actually keeps stock and balance from going
//! negative when requests race.

use crate::change::make_change;
use crate::store::{LedgerStore, PurchaseWrite, StoreError, WriteCondition};
use std::sync::Arc;
use tracing::{info, warn};
use types::errors::VendingError;
use types::ids::{AccountId, ItemId};
use types::receipt::PurchaseReceipt;

pub struct PurchaseEngine {
    ledger: Arc<dyn LedgerStore>,
}

impl PurchaseEngine {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    pub fn purchase(
        &self,
        account_id: AccountId,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<PurchaseReceipt, VendingError> {
        if quantity == 0 {
            return Err(VendingError::InvalidInput(
                "quantity must be at least 1".into(),
            ));
        }

        let account = self.ledger.account(&account_id)?;
        if !account.is_buyer() {
            return Err(VendingError::unauthorized("only buyers can purchase"));
        }
        let item = self.ledger.item(&item_id)?;

        if !item.has_stock(quantity) {
            return Err(VendingError::InsufficientStock {
                item_id,
                requested: quantity,
                available: item.stock,
            });
        }

        let total_price = item.unit_cost.checked_mul(quantity).ok_or_else(|| {
            VendingError::InvalidInput(format!("total for {} x {} overflows", quantity, item.unit_cost))
        })?;
        if account.balance < total_price {
            return Err(VendingError::InsufficientFunds {
                required: total_price,
                available: account.balance,
            });
        }

        let write = PurchaseWrite {
            account_id,
            item_id,
            quantity,
            total_price,
        };
        let commit = self
            .ledger
            .commit_purchase(&write)
            .map_err(|e| commit_error(&write, e))?;

        let breakdown = make_change(commit.balance_after);
        info!(
            %account_id,
            %item_id,
            quantity,
            total = total_price.value(),
            stock_after = commit.stock_after,
            balance_after = commit.balance_after.value(),
            "purchase committed"
        );

        Ok(PurchaseReceipt {
            item_id,
            quantity,
            total_spent: total_price,
            change: breakdown.coins,
            change_remainder: breakdown.remainder,
            remaining_balance: commit.balance_after,
        })
    }
}

fn commit_error(write: &PurchaseWrite, err: StoreError) -> VendingError {
    match err {
        StoreError::ConditionFailed(WriteCondition::Stock { available }) => {
            info!(
                item_id = %write.item_id,
                requested = write.quantity,
                available,
                "stock taken by a concurrent purchase"
            );
            VendingError::ConcurrentStockConflict {
                item_id: write.item_id,
            }
        }
        StoreError::ConditionFailed(WriteCondition::Balance { available }) => {
            VendingError::InsufficientFunds {
                required: write.total_price,
                available,
            }
        }
        other => {
            warn!(
                account_id = %write.account_id,
                item_id = %write.item_id,
                error = %other,
                "purchase aborted"
            );
            VendingError::TransactionAborted {
                reason: other.to_string(),
            }
        }
    }
}
