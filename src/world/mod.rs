//! World context - every registry the procedure engine reads or mutates
//!
//! Operations take the world explicitly; there are no global lookups for
//! prototypes, procedures or characters.

use ahash::AHashMap;
use std::sync::Arc;

use crate::anatomy::BodyPrototype;
use crate::core::config::EngineConfig;
use crate::core::error::{ProcedureError, Result};
use crate::core::types::{BodyPrototypeId, CharacterId, ItemId, LocationId, ProcedureId, Tick};
use crate::entity::Character;
use crate::items::{Item, ItemStore};
use crate::procedures::hooks::HookRegistry;
use crate::procedures::Procedure;

/// A line of in-fiction text shown to everyone in a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    pub tick: Tick,
    pub location: LocationId,
    pub text: String,
}

/// The game world as seen by the procedure engine
pub struct World {
    pub current_tick: Tick,
    pub config: EngineConfig,
    prototypes: AHashMap<BodyPrototypeId, Arc<BodyPrototype>>,
    procedures: AHashMap<ProcedureId, Arc<Procedure>>,
    characters: AHashMap<CharacterId, Character>,
    pub items: ItemStore,
    room_items: AHashMap<LocationId, Vec<ItemId>>,
    pub hooks: HookRegistry,
    narration: Vec<Narration>,
}

impl World {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            current_tick: 0,
            config,
            prototypes: AHashMap::new(),
            procedures: AHashMap::new(),
            characters: AHashMap::new(),
            items: ItemStore::new(),
            room_items: AHashMap::new(),
            hooks: HookRegistry::new(),
            narration: Vec::new(),
        }
    }

    pub fn tick(&mut self) {
        self.current_tick += 1;
    }

    // === PROTOTYPES ===

    pub fn add_prototype(&mut self, prototype: BodyPrototype) -> BodyPrototypeId {
        let id = prototype.id;
        self.prototypes.insert(id, Arc::new(prototype));
        id
    }

    pub fn prototype(&self, id: BodyPrototypeId) -> Option<Arc<BodyPrototype>> {
        self.prototypes.get(&id).cloned()
    }

    pub fn prototype_by_name(&self, name: &str) -> Option<Arc<BodyPrototype>> {
        self.prototypes
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    // === PROCEDURES ===

    pub fn add_procedure(&mut self, procedure: Procedure) -> ProcedureId {
        let id = procedure.id;
        tracing::debug!("Registered procedure {} ({})", procedure.name, id);
        self.procedures.insert(id, Arc::new(procedure));
        id
    }

    pub fn procedure(&self, id: ProcedureId) -> Result<Arc<Procedure>> {
        self.procedures
            .get(&id)
            .cloned()
            .ok_or(ProcedureError::ProcedureNotFound(id))
    }

    pub fn procedure_by_name(&self, name: &str) -> Option<Arc<Procedure>> {
        self.procedures
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Next unused procedure id
    pub fn next_procedure_id(&self) -> ProcedureId {
        ProcedureId(self.procedures.keys().map(|id| id.0).max().unwrap_or(0) + 1)
    }

    // === CHARACTERS ===

    pub fn spawn(&mut self, character: Character) -> CharacterId {
        let id = character.id;
        self.characters.insert(id, character);
        id
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    pub fn expect_character(&self, id: CharacterId) -> Result<&Character> {
        self.characters
            .get(&id)
            .ok_or(ProcedureError::CharacterNotFound(id))
    }

    pub fn expect_character_mut(&mut self, id: CharacterId) -> Result<&mut Character> {
        self.characters
            .get_mut(&id)
            .ok_or(ProcedureError::CharacterNotFound(id))
    }

    /// A character together with the item store, for committing inventory plans
    pub fn character_and_items_mut(&mut self, id: CharacterId) -> Result<(&mut Character, &mut ItemStore)> {
        let character = self
            .characters
            .get_mut(&id)
            .ok_or(ProcedureError::CharacterNotFound(id))?;
        Ok((character, &mut self.items))
    }

    pub fn character_name(&self, id: CharacterId) -> String {
        self.characters
            .get(&id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "someone".into())
    }

    // === ITEMS ===

    pub fn create_item(&mut self, item: Item) -> ItemId {
        self.items.insert(item)
    }

    pub fn items_in_room(&self, location: LocationId) -> &[ItemId] {
        self.room_items
            .get(&location)
            .map(|items| items.as_slice())
            .unwrap_or(&[])
    }

    pub fn drop_item(&mut self, location: LocationId, item: ItemId) {
        let items = self.room_items.entry(location).or_default();
        if !items.contains(&item) {
            items.push(item);
        }
    }

    pub fn take_from_room(&mut self, location: LocationId, item: ItemId) -> bool {
        match self.room_items.get_mut(&location) {
            Some(items) => {
                let before = items.len();
                items.retain(|i| *i != item);
                before != items.len()
            }
            None => false,
        }
    }

    /// Put an item in a character's hands, or on the floor at their feet.
    ///
    /// Returns true if the character ended up holding it.
    pub fn give_or_drop(&mut self, character: CharacterId, item: ItemId) -> Result<bool> {
        let holder = self.expect_character_mut(character)?;
        if holder.inventory.hold(item) {
            return Ok(true);
        }
        let location = holder.location;
        self.drop_item(location, item);
        Ok(false)
    }

    // === NARRATION ===

    pub fn narrate(&mut self, location: LocationId, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!("[{:?}] {}", location, text);
        self.narration.push(Narration {
            tick: self.current_tick,
            location,
            text,
        });
    }

    pub fn narration(&self) -> &[Narration] {
        &self.narration
    }

    pub fn drain_narration(&mut self) -> Vec<Narration> {
        std::mem::take(&mut self.narration)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
