//! Personal inventory and inventory plans
//!
//! A plan names the tools a phase needs (by tag), what the surgeon must do
//! with them, and answers whether the surgeon can currently satisfy it.

use serde::{Deserialize, Serialize};

use crate::core::types::ItemId;
use crate::items::ItemStore;

/// Items a character holds in hand or carries about their person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    held: Vec<ItemId>,
    wielded: Vec<ItemId>,
    carried: Vec<ItemId>,
    /// Working hands
    pub hands: u32,
    /// Limbs able to wield a tool
    pub wielders: u32,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            held: Vec::new(),
            wielded: Vec::new(),
            carried: Vec::new(),
            hands: 2,
            wielders: 2,
        }
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held(&self) -> &[ItemId] {
        &self.held
    }

    pub fn carried(&self) -> &[ItemId] {
        &self.carried
    }

    pub fn is_wielded(&self, item: ItemId) -> bool {
        self.wielded.contains(&item)
    }

    /// Everything in the character's possession, held first
    pub fn possessions(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.held.iter().chain(self.carried.iter()).copied()
    }

    pub fn has(&self, item: ItemId) -> bool {
        self.held.contains(&item) || self.carried.contains(&item)
    }

    /// Put an item in hand; returns false if no hand is free
    pub fn hold(&mut self, item: ItemId) -> bool {
        if self.held.contains(&item) {
            return true;
        }
        if self.held.len() as u32 >= self.hands {
            return false;
        }
        self.carried.retain(|i| *i != item);
        self.held.push(item);
        true
    }

    /// Stow an item about the person
    pub fn carry(&mut self, item: ItemId) {
        self.held.retain(|i| *i != item);
        self.wielded.retain(|i| *i != item);
        if !self.carried.contains(&item) {
            self.carried.push(item);
        }
    }

    pub fn remove(&mut self, item: ItemId) -> bool {
        let before = self.held.len() + self.carried.len();
        self.held.retain(|i| *i != item);
        self.wielded.retain(|i| *i != item);
        self.carried.retain(|i| *i != item);
        before != self.held.len() + self.carried.len()
    }

    pub fn free_hands(&self) -> u32 {
        self.hands.saturating_sub(self.held.len() as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanAction {
    /// Hold in a free hand
    Hold,
    /// Wield as a tool
    Wield,
    /// Use up
    Consume,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequirement {
    pub tag: String,
    pub quantity: u32,
    pub action: PlanAction,
}

impl PlanRequirement {
    pub fn new(tag: impl Into<String>, quantity: u32, action: PlanAction) -> Self {
        Self {
            tag: tag.into(),
            quantity,
            action,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanFeasibility {
    Feasible,
    NotFeasibleMissingItems,
    NotFeasibleNotEnoughHands,
    NotFeasibleNotEnoughWielders,
}

impl PlanFeasibility {
    pub fn is_feasible(&self) -> bool {
        *self == PlanFeasibility::Feasible
    }
}

/// Items committed by an executed plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanExecution {
    pub held: Vec<ItemId>,
    pub wielded: Vec<ItemId>,
    pub consumed: Vec<ItemId>,
}

#[derive(Debug, Default)]
struct Allocation {
    hold: Vec<ItemId>,
    wield: Vec<ItemId>,
    consume: Vec<ItemId>,
}

/// Tools a phase requires
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPlan {
    pub requirements: Vec<PlanRequirement>,
}

impl InventoryPlan {
    pub fn new(requirements: Vec<PlanRequirement>) -> Self {
        Self { requirements }
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    fn allocate(&self, inventory: &Inventory, items: &ItemStore) -> Result<Allocation, PlanFeasibility> {
        let mut allocation = Allocation::default();
        let mut used: Vec<ItemId> = Vec::new();

        for requirement in &self.requirements {
            let matching: Vec<ItemId> = inventory
                .possessions()
                .filter(|id| !used.contains(id))
                .filter(|id| items.get(*id).map_or(false, |item| item.has_tag(&requirement.tag)))
                .take(requirement.quantity as usize)
                .collect();

            if (matching.len() as u32) < requirement.quantity {
                return Err(PlanFeasibility::NotFeasibleMissingItems);
            }

            used.extend(matching.iter().copied());
            match requirement.action {
                PlanAction::Hold => allocation.hold.extend(matching),
                PlanAction::Wield => allocation.wield.extend(matching),
                PlanAction::Consume => allocation.consume.extend(matching),
            }
        }

        // Held items the plan does not use still occupy hands
        let occupied = inventory
            .held()
            .iter()
            .filter(|id| !allocation.hold.contains(id) && !allocation.wield.contains(id))
            .count() as u32;
        let hands_needed = (allocation.hold.len() + allocation.wield.len()) as u32;
        if occupied + hands_needed > inventory.hands {
            return Err(PlanFeasibility::NotFeasibleNotEnoughHands);
        }
        if allocation.wield.len() as u32 > inventory.wielders {
            return Err(PlanFeasibility::NotFeasibleNotEnoughWielders);
        }

        Ok(allocation)
    }

    pub fn plan_is_feasible(&self, inventory: &Inventory, items: &ItemStore) -> PlanFeasibility {
        match self.allocate(inventory, items) {
            Ok(_) => PlanFeasibility::Feasible,
            Err(reason) => reason,
        }
    }

    /// Take every required item in hand. Call only after a feasibility check.
    pub fn execute_whole_plan(&self, inventory: &mut Inventory, items: &ItemStore) -> Option<PlanExecution> {
        let allocation = self.allocate(inventory, items).ok()?;
        for id in allocation.hold.iter().chain(allocation.wield.iter()) {
            inventory.hold(*id);
        }
        for id in &allocation.wield {
            if !inventory.wielded.contains(id) {
                inventory.wielded.push(*id);
            }
        }
        Some(PlanExecution {
            held: allocation.hold,
            wielded: allocation.wield,
            consumed: allocation.consume,
        })
    }

    /// Commit the plan: consumed items are destroyed and nothing is put back
    pub fn finalise_without_restore(execution: &PlanExecution, inventory: &mut Inventory, items: &mut ItemStore) {
        for id in &execution.consumed {
            inventory.remove(*id);
            items.remove(*id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Item;

    fn setup() -> (Inventory, ItemStore, ItemId, ItemId, ItemId) {
        let mut items = ItemStore::new();
        let scalpel = items.insert(Item::tool("a scalpel", "scalpel"));
        let forceps = items.insert(Item::tool("some forceps", "forceps"));
        let gauze = items.insert(Item::consumable("a roll of gauze", "gauze"));
        let mut inventory = Inventory::new();
        inventory.carry(scalpel);
        inventory.carry(forceps);
        inventory.carry(gauze);
        (inventory, items, scalpel, forceps, gauze)
    }

    #[test]
    fn test_missing_items() {
        let (inventory, items, ..) = setup();
        let plan = InventoryPlan::new(vec![PlanRequirement::new("saw", 1, PlanAction::Wield)]);
        assert_eq!(plan.plan_is_feasible(&inventory, &items), PlanFeasibility::NotFeasibleMissingItems);
    }

    #[test]
    fn test_not_enough_hands() {
        let (mut inventory, items, ..) = setup();
        inventory.hands = 1;
        let plan = InventoryPlan::new(vec![
            PlanRequirement::new("scalpel", 1, PlanAction::Wield),
            PlanRequirement::new("forceps", 1, PlanAction::Hold),
        ]);
        assert_eq!(plan.plan_is_feasible(&inventory, &items), PlanFeasibility::NotFeasibleNotEnoughHands);
    }

    #[test]
    fn test_not_enough_wielders() {
        let (mut inventory, items, ..) = setup();
        inventory.wielders = 0;
        let plan = InventoryPlan::new(vec![PlanRequirement::new("scalpel", 1, PlanAction::Wield)]);
        assert_eq!(plan.plan_is_feasible(&inventory, &items), PlanFeasibility::NotFeasibleNotEnoughWielders);
    }

    #[test]
    fn test_execute_and_finalise_consumes() {
        let (mut inventory, mut items, scalpel, _, gauze) = setup();
        let plan = InventoryPlan::new(vec![
            PlanRequirement::new("scalpel", 1, PlanAction::Wield),
            PlanRequirement::new("gauze", 1, PlanAction::Consume),
        ]);
        assert!(plan.plan_is_feasible(&inventory, &items).is_feasible());
        let execution = plan.execute_whole_plan(&mut inventory, &items).unwrap();
        assert!(inventory.held().contains(&scalpel));
        assert!(inventory.is_wielded(scalpel));

        InventoryPlan::finalise_without_restore(&execution, &mut inventory, &mut items);
        assert!(!inventory.has(gauze));
        assert!(items.get(gauze).is_none());
        assert!(items.get(scalpel).is_some());
    }

    #[test]
    fn test_unrelated_held_item_blocks_hands() {
        let (mut inventory, mut items, ..) = setup();
        let cannula = items.insert(Item::tool("a cannula", "cannula"));
        let other = items.insert(Item::tool("a mug", "mug"));
        inventory.hold(cannula);
        inventory.hold(other);
        let plan = InventoryPlan::new(vec![PlanRequirement::new("scalpel", 1, PlanAction::Wield)]);
        assert_eq!(plan.plan_is_feasible(&inventory, &items), PlanFeasibility::NotFeasibleNotEnoughHands);
    }
}
