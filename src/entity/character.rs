//! Characters: surgeons, patients and their corpses

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::check::CheckType;
use crate::core::types::{BodyPrototypeId, CharacterId, LocationId};
use crate::entity::body::Body;
use crate::items::inventory::Inventory;

/// Consciousness and life state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CharacterState {
    #[default]
    Awake,
    Sleeping,
    Unconscious,
    /// Awake but unable to act
    Paralysed,
    Dead,
}

/// A merit or flaw that shifts surgical difficulty by whole stages.
///
/// Positive `stages` make checks easier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merit {
    pub name: String,
    pub stages: i32,
    /// `None` applies to every procedure
    pub applies_to: Option<CheckType>,
}

impl Merit {
    pub fn new(name: impl Into<String>, stages: i32) -> Self {
        Self {
            name: name.into(),
            stages,
            applies_to: None,
        }
    }

    pub fn for_check(mut self, check_type: CheckType) -> Self {
        self.applies_to = Some(check_type);
        self
    }

    pub fn applies(&self, check_type: CheckType) -> bool {
        self.applies_to.map_or(true, |c| c == check_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub location: LocationId,
    pub state: CharacterState,
    pub body: Body,
    pub inventory: Inventory,
    pub merits: Vec<Merit>,
    pub knowledges: BTreeSet<String>,
    /// Currently walking/being carried out of the room
    pub moving: bool,
    /// Engaged in close-range combat
    pub in_melee: bool,
}

impl Character {
    pub fn new(name: impl Into<String>, prototype: BodyPrototypeId, location: LocationId) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            location,
            state: CharacterState::Awake,
            body: Body::new(prototype),
            inventory: Inventory::default(),
            merits: Vec::new(),
            knowledges: BTreeSet::new(),
            moving: false,
            in_melee: false,
        }
    }

    pub fn with_knowledge(mut self, knowledge: impl Into<String>) -> Self {
        self.knowledges.insert(knowledge.into());
        self
    }

    pub fn with_merit(mut self, merit: Merit) -> Self {
        self.merits.push(merit);
        self
    }

    pub fn with_state(mut self, state: CharacterState) -> Self {
        self.state = state;
        self
    }

    pub fn is_dead(&self) -> bool {
        self.state == CharacterState::Dead
    }

    pub fn is_conscious(&self) -> bool {
        matches!(self.state, CharacterState::Awake | CharacterState::Paralysed)
    }

    /// Check if the character can perform skilled work
    pub fn can_act(&self) -> bool {
        self.state == CharacterState::Awake
    }

    pub fn knows(&self, knowledge: &str) -> bool {
        self.knowledges.contains(knowledge)
    }

    /// Net difficulty stages from merits applicable to a check (positive = easier)
    pub fn merit_stages(&self, check_type: CheckType) -> i32 {
        self.merits
            .iter()
            .filter(|m| m.applies(check_type))
            .map(|m| m.stages)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character() -> Character {
        Character::new("Ada", BodyPrototypeId(1), LocationId(1))
    }

    #[test]
    fn test_merit_stages_filter_by_check() {
        let surgeon = character()
            .with_merit(Merit::new("Steady Hands", 1))
            .with_merit(Merit::new("Butcher", -2).for_check(CheckType::AmputationCheck));
        assert_eq!(surgeon.merit_stages(CheckType::TriageCheck), 1);
        assert_eq!(surgeon.merit_stages(CheckType::AmputationCheck), -1);
    }

    #[test]
    fn test_states() {
        let sleeper = character().with_state(CharacterState::Sleeping);
        assert!(!sleeper.is_conscious());
        assert!(!sleeper.can_act());
        let paralysed = character().with_state(CharacterState::Paralysed);
        assert!(paralysed.is_conscious());
        assert!(!paralysed.can_act());
        assert!(character().with_state(CharacterState::Dead).is_dead());
    }
}
