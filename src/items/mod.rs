//! Items and personal inventory

pub mod inventory;
pub mod item;

pub use inventory::{
    Inventory, InventoryPlan, PlanAction, PlanExecution, PlanFeasibility, PlanRequirement,
};
pub use item::{
    CannulaSpec, DecayState, ImplantSpec, Item, ItemCapability, ItemKind, OrganItem,
    SeveredBodypartItem,
};

use ahash::AHashMap;

use crate::core::types::ItemId;

/// Every item that exists in the world, by id
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: AHashMap<ItemId, Item>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: Item) -> ItemId {
        let id = item.id;
        self.items.insert(id, item);
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        self.items.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
