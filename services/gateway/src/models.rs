use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::ids::ItemId;
use types::numeric::Cents;
use types::receipt::PurchaseReceipt;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    /// Whether a stored session was actually removed
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TerminateResponse {
    pub terminated: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusResponse {
    pub stale: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositRequest {
    pub deposit: Cents,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub balance: Cents,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuyRequest {
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchasedItem {
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuyResponse {
    pub total_spent: Cents,
    pub purchased_item: PurchasedItem,
    pub change: Vec<u64>,
    pub change_remainder: Cents,
    pub remaining_balance: Cents,
}

impl From<PurchaseReceipt> for BuyResponse {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            total_spent: receipt.total_spent,
            purchased_item: PurchasedItem {
                item_id: receipt.item_id,
                quantity: receipt.quantity,
            },
            change: receipt.change,
            change_remainder: receipt.change_remainder,
            remaining_balance: receipt.remaining_balance,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub deleted: ItemId,
}
