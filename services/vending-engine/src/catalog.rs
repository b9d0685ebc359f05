//! Item catalogue with seller ownership

use crate::store::LedgerStore;
use crate::SharedClock;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use types::errors::VendingError;
use types::ids::{AccountId, ItemId};
use types::item::{Item, ItemDetails};
use types::numeric::Cents;

#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub unit_cost: Cents,
    pub stock: u32,
}

pub struct Catalog {
    ledger: Arc<dyn LedgerStore>,
    clock: SharedClock,
}

impl Catalog {
    pub fn new(ledger: Arc<dyn LedgerStore>, clock: SharedClock) -> Self {
        Self { ledger, clock }
    }

    pub fn list(&self) -> Result<Vec<Item>, VendingError> {
        Ok(self.ledger.items()?)
    }

    pub fn get(&self, item_id: &ItemId) -> Result<Item, VendingError> {
        Ok(self.ledger.item(item_id)?)
    }

    pub fn create(&self, seller_id: &AccountId, new_item: NewItem) -> Result<Item, VendingError> {
        let seller = self.ledger.account(seller_id)?;
        if seller.is_buyer() {
            return Err(VendingError::unauthorized("only sellers can list items"));
        }
        let name = validate_name(&new_item.name)?;
        validate_cost(new_item.unit_cost)?;

        let item = Item::new(
            *seller_id,
            name,
            new_item.unit_cost,
            new_item.stock,
            self.clock.utc(),
        );
        self.ledger.insert_item(item.clone())?;
        info!(
            item_id = %item.item_id,
            owner = %seller_id,
            stock = item.stock,
            "item listed"
        );
        Ok(item)
    }

    /// Change name and/or unit cost. Stock is not editable.
    pub fn update(
        &self,
        owner_id: &AccountId,
        item_id: &ItemId,
        details: ItemDetails,
    ) -> Result<Item, VendingError> {
        if details.is_empty() {
            return Err(VendingError::InvalidInput("nothing to update".into()));
        }
        let details = ItemDetails {
            name: details.name.as_deref().map(validate_name).transpose()?,
            unit_cost: details.unit_cost.map(validate_cost).transpose()?,
        };

        self.owned(owner_id, item_id)?;
        let item = self.ledger.update_item(item_id, &details)?;
        info!(%item_id, "item updated");
        Ok(item)
    }

    pub fn remove(&self, owner_id: &AccountId, item_id: &ItemId) -> Result<Item, VendingError> {
        self.owned(owner_id, item_id)?;
        let item = self.ledger.remove_item(item_id)?;
        info!(%item_id, "item removed");
        Ok(item)
    }

    fn owned(&self, owner_id: &AccountId, item_id: &ItemId) -> Result<Item, VendingError> {
        let item = self.ledger.item(item_id)?;
        if !item.is_owned_by(owner_id) {
            return Err(VendingError::unauthorized("item belongs to another seller"));
        }
        Ok(item)
    }
}

fn validate_name(name: &str) -> Result<String, VendingError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(VendingError::InvalidInput("item name is empty".into()));
    }
    Ok(name.to_string())
}

fn validate_cost(cost: Cents) -> Result<Cents, VendingError> {
    if cost.is_zero() || !cost.is_coin_aligned() {
        return Err(VendingError::InvalidInput(format!(
            "unit cost {} must be a positive multiple of 5 cents",
            cost
        )));
    }
    Ok(cost)
}
