//! Purchase receipts (transient, never persisted)

use crate::ids::ItemId;
use crate::numeric::Cents;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub item_id: ItemId,
    pub quantity: u32,
    pub total_spent: Cents,
    /// Coins for the remaining balance, largest first
    pub change: Vec<u64>,
    /// Part of the remaining balance no coin can express
    pub change_remainder: Cents,
    pub remaining_balance: Cents,
}
