//! Items a procedure can involve: tools, cannulas, implants, organs and
//! severed bodyparts

use serde::{Deserialize, Serialize};

use crate::core::types::{BodyPrototypeId, BodypartId, ItemId, OrganId};
use crate::entity::body::SeveredParts;

/// How far biological material has decayed, freshest first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum DecayState {
    #[default]
    Fresh,
    Recent,
    Decaying,
    Decayed,
    HeavilyDecayed,
    Skeletal,
}

impl DecayState {
    pub fn describe(&self) -> &'static str {
        match self {
            DecayState::Fresh => "fresh",
            DecayState::Recent => "recent",
            DecayState::Decaying => "decaying",
            DecayState::Decayed => "decayed",
            DecayState::HeavilyDecayed => "heavily decayed",
            DecayState::Skeletal => "skeletal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CannulaSpec {
    /// Bodypart names this cannula fits; empty fits anywhere
    pub fits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplantSpec {
    pub target_prototype: BodyPrototypeId,
    /// Parts the implant can go in; empty means any part with space
    pub target_parts: Vec<BodypartId>,
    /// Organ the implant attaches to, if any
    pub target_organ: Option<OrganId>,
    pub space: f64,
    /// `None` for unpowered devices
    pub powered: Option<bool>,
    /// Other implants can link their interface to this one
    pub interface_capable: bool,
    pub linked_interface: Option<ItemId>,
}

impl ImplantSpec {
    pub fn new(target_prototype: BodyPrototypeId, space: f64) -> Self {
        Self {
            target_prototype,
            target_parts: Vec::new(),
            target_organ: None,
            space,
            powered: None,
            interface_capable: false,
            linked_interface: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganItem {
    pub prototype: BodyPrototypeId,
    pub organ: OrganId,
    pub decay: DecayState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeveredBodypartItem {
    pub prototype: BodyPrototypeId,
    pub severed: SeveredParts,
    pub decay: DecayState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    Tool,
    Consumable,
    Cannula(CannulaSpec),
    Implant(ImplantSpec),
    Organ(OrganItem),
    SeveredBodypart(SeveredBodypartItem),
}

/// Capability a procedure can demand of a held item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCapability {
    Cannula,
    Implant,
    Organ,
    SeveredBodypart,
}

impl ItemCapability {
    pub fn describe(&self) -> &'static str {
        match self {
            ItemCapability::Cannula => "cannula",
            ItemCapability::Implant => "implant",
            ItemCapability::Organ => "organ",
            ItemCapability::SeveredBodypart => "severed bodypart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub keywords: Vec<String>,
    /// Plan tags such as "scalpel", "forceps", "sutures"
    pub tags: Vec<String>,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        let name = name.into();
        let keywords = name.split_whitespace().map(|w| w.to_lowercase()).collect();
        Self {
            id: ItemId::new(),
            name,
            keywords,
            tags: Vec::new(),
            kind,
        }
    }

    pub fn tool(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(name, ItemKind::Tool).with_tag(tag)
    }

    pub fn consumable(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(name, ItemKind::Consumable).with_tag(tag)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Keyword match: every word of the token prefixes some keyword
    pub fn matches_keyword(&self, token: &str) -> bool {
        let words: Vec<String> = token.split_whitespace().map(|w| w.to_lowercase()).collect();
        !words.is_empty()
            && words
                .iter()
                .all(|w| self.keywords.iter().any(|k| k.starts_with(w.as_str())))
    }

    pub fn has_capability(&self, capability: ItemCapability) -> bool {
        matches!(
            (capability, &self.kind),
            (ItemCapability::Cannula, ItemKind::Cannula(_))
                | (ItemCapability::Implant, ItemKind::Implant(_))
                | (ItemCapability::Organ, ItemKind::Organ(_))
                | (ItemCapability::SeveredBodypart, ItemKind::SeveredBodypart(_))
        )
    }

    pub fn implant(&self) -> Option<&ImplantSpec> {
        match &self.kind {
            ItemKind::Implant(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn implant_mut(&mut self) -> Option<&mut ImplantSpec> {
        match &mut self.kind {
            ItemKind::Implant(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn decay(&self) -> Option<DecayState> {
        match &self.kind {
            ItemKind::Organ(organ) => Some(organ.decay),
            ItemKind::SeveredBodypart(part) => Some(part.decay),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matching() {
        let item = Item::tool("a steel bone saw", "saw");
        assert!(item.matches_keyword("saw"));
        assert!(item.matches_keyword("bone sa"));
        assert!(!item.matches_keyword("scalpel"));
        assert!(!item.matches_keyword(""));
    }

    #[test]
    fn test_capabilities() {
        let cannula = Item::new("a plastic cannula", ItemKind::Cannula(CannulaSpec { fits: vec![] }));
        assert!(cannula.has_capability(ItemCapability::Cannula));
        assert!(!cannula.has_capability(ItemCapability::Implant));
        assert!(cannula.decay().is_none());
    }

    #[test]
    fn test_decay_ordering() {
        assert!(DecayState::Recent < DecayState::Decaying);
        assert!(DecayState::Fresh <= DecayState::Recent);
    }
}
