//! Stocked catalogue items

use crate::ids::{AccountId, ItemId};
use crate::numeric::Cents;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Item record held by the ledger
///
/// `owner` refers to the seller account by identity only. Stock is set at
/// creation and afterwards only changes through a committed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub name: String,
    pub unit_cost: Cents,
    pub stock: u32,
    pub owner: AccountId,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Item {
    pub fn new(
        owner: AccountId,
        name: impl Into<String>,
        unit_cost: Cents,
        stock: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id: ItemId::new(),
            name: name.into(),
            unit_cost,
            stock,
            owner,
            created_at,
            version: 0,
        }
    }

    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }

    pub fn is_owned_by(&self, account_id: &AccountId) -> bool {
        &self.owner == account_id
    }

    /// Conditional decrement; `None` when `stock < quantity`
    pub fn take_stock(&mut self, quantity: u32) -> Option<u32> {
        let remaining = self.stock.checked_sub(quantity)?;
        self.stock = remaining;
        self.version += 1;
        Some(remaining)
    }
}

/// Owner-editable fields of an item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub name: Option<String>,
    pub unit_cost: Option<Cents>,
}

impl ItemDetails {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.unit_cost.is_none()
    }

    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(cost) = self.unit_cost {
            item.unit_cost = cost;
        }
        item.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cola(stock: u32) -> Item {
        Item::new(AccountId::new(), "Cola", Cents::new(25), stock, Utc::now())
    }

    #[test]
    fn test_take_stock_guards_underflow() {
        let mut item = cola(3);
        assert_eq!(item.take_stock(2), Some(1));
        assert_eq!(item.take_stock(2), None);
        assert_eq!(item.stock, 1);
        assert_eq!(item.version, 1);
    }

    #[test]
    fn test_details_apply_only_present_fields() {
        let mut item = cola(3);
        let details = ItemDetails {
            name: None,
            unit_cost: Some(Cents::new(30)),
        };
        details.apply_to(&mut item);
        assert_eq!(item.name, "Cola");
        assert_eq!(item.unit_cost, Cents::new(30));
        assert_eq!(item.stock, 3);
    }

    #[test]
    fn test_ownership() {
        let item = cola(1);
        assert!(item.is_owned_by(&item.owner.clone()));
        assert!(!item.is_owned_by(&AccountId::new()));
    }
}
