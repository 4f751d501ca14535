//! Physical body simulation
//!
//! A `Body` is the mutable state layered over a static [`BodyPrototype`]:
//! which parts are severed, which organs are gone, installed devices, wounds,
//! internal bleeding and pending surgical finalization. Procedures only change
//! a body through the methods here.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::anatomy::BodyPrototype;
use crate::check::Difficulty;
use crate::core::types::{BodyPrototypeId, BodypartId, BoneId, ItemId, OrganId, Tick};
use crate::entity::wounds::Wound;

/// A device sitting inside a bodypart (and optionally an organ)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledImplant {
    pub item: ItemId,
    pub bodypart: BodypartId,
    pub organ: Option<OrganId>,
}

/// A cannula left in place in a bodypart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledCannula {
    pub item: ItemId,
    pub bodypart: BodypartId,
}

/// Open surgical wound awaiting a stitch-up procedure.
///
/// At most one exists per bodypart; its difficulty never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizationRequirement {
    pub bodypart: BodypartId,
    pub difficulty: Difficulty,
    pub created_tick: Tick,
}

/// Everything that leaves the body when a part is severed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeveredParts {
    pub root: BodypartId,
    pub parts: Vec<BodypartId>,
    pub implants: Vec<InstalledImplant>,
    pub cannulas: Vec<InstalledCannula>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoneState {
    Fractured,
    Set,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub prototype: BodyPrototypeId,
    severed: BTreeSet<BodypartId>,
    missing_organs: BTreeSet<OrganId>,
    stabilised_organs: BTreeMap<OrganId, f64>,
    bones: BTreeMap<BoneId, BoneState>,
    implants: Vec<InstalledImplant>,
    cannulas: Vec<InstalledCannula>,
    wounds: Vec<Wound>,
    internal_bleeding: BTreeMap<BodypartId, f64>,
    finalization: Vec<FinalizationRequirement>,
}

impl Body {
    pub fn new(prototype: BodyPrototypeId) -> Self {
        Self {
            prototype,
            severed: BTreeSet::new(),
            missing_organs: BTreeSet::new(),
            stabilised_organs: BTreeMap::new(),
            bones: BTreeMap::new(),
            implants: Vec::new(),
            cannulas: Vec::new(),
            wounds: Vec::new(),
            internal_bleeding: BTreeMap::new(),
            finalization: Vec::new(),
        }
    }

    // === ANATOMY PRESENCE ===

    pub fn has_bodypart(&self, part: BodypartId) -> bool {
        !self.severed.contains(&part)
    }

    pub fn severed_parts(&self) -> impl Iterator<Item = BodypartId> + '_ {
        self.severed.iter().copied()
    }

    /// Organ is in the body: not removed and at least one containing part attached
    pub fn has_organ(&self, proto: &BodyPrototype, organ: OrganId) -> bool {
        !self.missing_organs.contains(&organ)
            && proto
                .parts_containing_organ(organ)
                .any(|(part, _)| self.has_bodypart(part.id))
    }

    pub fn has_bone(&self, proto: &BodyPrototype, bone: BoneId) -> bool {
        proto
            .parts_containing_bone(bone)
            .any(|part| self.has_bodypart(part.id))
    }

    pub fn missing_organs(&self) -> impl Iterator<Item = OrganId> + '_ {
        self.missing_organs.iter().copied()
    }

    /// A vital organ is gone
    pub fn is_missing_vital_organ(&self, proto: &BodyPrototype) -> bool {
        proto
            .organs
            .iter()
            .any(|organ| organ.vital && !self.has_organ(proto, organ.id))
    }

    // === SEVERING ===

    /// Detach a part and everything downstream of it
    pub fn sever(&mut self, proto: &BodyPrototype, part: BodypartId) -> SeveredParts {
        let parts: Vec<BodypartId> = proto
            .downstream_of(part)
            .into_iter()
            .filter(|p| self.has_bodypart(*p))
            .collect();

        for p in &parts {
            self.severed.insert(*p);
            self.internal_bleeding.remove(p);
            self.finalization.retain(|f| f.bodypart != *p);
        }
        self.wounds.retain(|w| !parts.contains(&w.bodypart));

        let (implants, kept): (Vec<_>, Vec<_>) = self
            .implants
            .drain(..)
            .partition(|i| parts.contains(&i.bodypart));
        self.implants = kept;

        let (cannulas, kept): (Vec<_>, Vec<_>) = self
            .cannulas
            .drain(..)
            .partition(|c| parts.contains(&c.bodypart));
        self.cannulas = kept;

        SeveredParts {
            root: part,
            parts,
            implants,
            cannulas,
        }
    }

    /// Reattach previously severed parts along with what they carried
    pub fn restore(&mut self, severed: &SeveredParts) {
        for p in &severed.parts {
            self.severed.remove(p);
        }
        self.implants.extend(severed.implants.iter().copied());
        self.cannulas.extend(severed.cannulas.iter().copied());
    }

    // === ORGANS ===

    /// Remove an organ; returns false if it was already gone
    pub fn remove_organ(&mut self, organ: OrganId) -> bool {
        self.stabilised_organs.remove(&organ);
        self.missing_organs.insert(organ)
    }

    pub fn restore_organ(&mut self, organ: OrganId) -> bool {
        self.missing_organs.remove(&organ)
    }

    /// Add to an organ's stabilisation bonus (organ function support)
    pub fn stabilise_organ(&mut self, organ: OrganId, bonus: f64) {
        *self.stabilised_organs.entry(organ).or_insert(0.0) += bonus;
    }

    pub fn organ_stabilisation(&self, organ: OrganId) -> f64 {
        self.stabilised_organs.get(&organ).copied().unwrap_or(0.0)
    }

    // === BONES ===

    pub fn fracture_bone(&mut self, bone: BoneId) {
        self.bones.insert(bone, BoneState::Fractured);
    }

    pub fn bone_state(&self, bone: BoneId) -> Option<BoneState> {
        self.bones.get(&bone).copied()
    }

    /// Set a fractured bone; returns false if it was not fractured
    pub fn set_bone(&mut self, bone: BoneId) -> bool {
        match self.bones.get_mut(&bone) {
            Some(state) if *state == BoneState::Fractured => {
                *state = BoneState::Set;
                true
            }
            _ => false,
        }
    }

    // === IMPLANTS & CANNULAS ===

    pub fn implants(&self) -> &[InstalledImplant] {
        &self.implants
    }

    pub fn implants_in(&self, part: BodypartId) -> impl Iterator<Item = &InstalledImplant> {
        self.implants.iter().filter(move |i| i.bodypart == part)
    }

    pub fn install_implant(&mut self, implant: InstalledImplant) {
        self.implants.push(implant);
    }

    pub fn remove_implant(&mut self, item: ItemId) -> Option<InstalledImplant> {
        let index = self.implants.iter().position(|i| i.item == item)?;
        Some(self.implants.remove(index))
    }

    pub fn cannulas(&self) -> &[InstalledCannula] {
        &self.cannulas
    }

    pub fn insert_cannula(&mut self, cannula: InstalledCannula) {
        self.cannulas.push(cannula);
    }

    pub fn remove_cannula(&mut self, item: ItemId) -> Option<InstalledCannula> {
        let index = self.cannulas.iter().position(|c| c.item == item)?;
        Some(self.cannulas.remove(index))
    }

    // === WOUNDS & BLEEDING ===

    pub fn wounds(&self) -> &[Wound] {
        &self.wounds
    }

    pub fn wounds_on(&self, part: BodypartId) -> impl Iterator<Item = &Wound> {
        self.wounds.iter().filter(move |w| w.bodypart == part)
    }

    pub fn add_wound(&mut self, wound: Wound) {
        self.wounds.push(wound);
    }

    pub fn add_internal_bleeding(&mut self, part: BodypartId, amount: f64) {
        if amount > 0.0 {
            *self.internal_bleeding.entry(part).or_insert(0.0) += amount;
        }
    }

    /// Reduce internal bleeding in a part, returns the amount stopped
    pub fn reduce_internal_bleeding(&mut self, part: BodypartId, amount: f64) -> f64 {
        let Some(current) = self.internal_bleeding.get_mut(&part) else {
            return 0.0;
        };
        let stopped = amount.min(*current);
        *current -= stopped;
        if *current <= f64::EPSILON {
            self.internal_bleeding.remove(&part);
        }
        stopped
    }

    pub fn internal_bleeding(&self, part: BodypartId) -> f64 {
        self.internal_bleeding.get(&part).copied().unwrap_or(0.0)
    }

    /// External plus internal bleed rate across the body
    pub fn total_bleeding(&self) -> f64 {
        let external: f64 = self.wounds.iter().map(|w| w.bleeding).sum();
        let internal: f64 = self.internal_bleeding.values().sum();
        external + internal
    }

    // === FINALIZATION ===

    pub fn finalization_requirement(&self, part: BodypartId) -> Option<&FinalizationRequirement> {
        self.finalization.iter().find(|f| f.bodypart == part)
    }

    pub fn finalization_requirements(&self) -> &[FinalizationRequirement] {
        &self.finalization
    }

    /// Create a requirement, or raise an existing one to at least `difficulty`
    pub fn add_or_escalate_finalization(
        &mut self,
        part: BodypartId,
        difficulty: Difficulty,
        tick: Tick,
    ) -> FinalizationRequirement {
        if let Some(existing) = self.finalization.iter_mut().find(|f| f.bodypart == part) {
            existing.difficulty = existing.difficulty.max(difficulty);
            return *existing;
        }
        let requirement = FinalizationRequirement {
            bodypart: part,
            difficulty,
            created_tick: tick,
        };
        self.finalization.push(requirement);
        requirement
    }

    /// Raise an existing requirement's difficulty by whole stages
    pub fn escalate_finalization(&mut self, part: BodypartId, stages: i32) -> Option<FinalizationRequirement> {
        let existing = self.finalization.iter_mut().find(|f| f.bodypart == part)?;
        existing.difficulty = existing.difficulty.max(existing.difficulty.stage_up(stages));
        Some(*existing)
    }

    pub fn clear_finalization(&mut self, part: BodypartId) -> Option<FinalizationRequirement> {
        let index = self.finalization.iter().position(|f| f.bodypart == part)?;
        Some(self.finalization.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::wounds::{DamageType, WoundSeverity};

    fn setup() -> (BodyPrototype, Body) {
        let proto = BodyPrototype::humanoid(BodyPrototypeId(1));
        let body = Body::new(proto.id);
        (proto, body)
    }

    #[test]
    fn test_sever_takes_downstream_parts_and_implants() {
        let (proto, mut body) = setup();
        let (forearm, _) = proto.find_bodypart("left forearm").unwrap();
        let (hand, _) = proto.find_bodypart("left hand").unwrap();
        let implant = InstalledImplant {
            item: ItemId::new(),
            bodypart: hand,
            organ: None,
        };
        body.install_implant(implant);

        let severed = body.sever(&proto, forearm);
        assert_eq!(severed.parts, vec![forearm, hand]);
        assert_eq!(severed.implants, vec![implant]);
        assert!(!body.has_bodypart(hand));
        assert!(body.implants().is_empty());

        body.restore(&severed);
        assert!(body.has_bodypart(hand));
        assert_eq!(body.implants().len(), 1);
    }

    #[test]
    fn test_head_loss_removes_brain() {
        let (proto, mut body) = setup();
        let (head, _) = proto.find_bodypart("head").unwrap();
        let (brain, _) = proto.find_organ("brain").unwrap();
        assert!(body.has_organ(&proto, brain));
        body.sever(&proto, head);
        assert!(!body.has_organ(&proto, brain));
        assert!(body.is_missing_vital_organ(&proto));
    }

    #[test]
    fn test_finalization_never_duplicates_or_decreases() {
        let (_, mut body) = setup();
        let part = BodypartId(3);
        body.add_or_escalate_finalization(part, Difficulty::Hard, 1);
        let again = body.add_or_escalate_finalization(part, Difficulty::Easy, 2);
        assert_eq!(again.difficulty, Difficulty::Hard);
        assert_eq!(again.created_tick, 1);
        assert_eq!(body.finalization_requirements().len(), 1);

        body.escalate_finalization(part, 1);
        assert_eq!(body.finalization_requirement(part).unwrap().difficulty, Difficulty::VeryHard);

        assert!(body.clear_finalization(part).is_some());
        assert!(body.clear_finalization(part).is_none());
    }

    #[test]
    fn test_internal_bleeding_reduction() {
        let (_, mut body) = setup();
        let part = BodypartId(1);
        body.add_internal_bleeding(part, 1.5);
        assert_eq!(body.reduce_internal_bleeding(part, 1.0), 1.0);
        assert!((body.internal_bleeding(part) - 0.5).abs() < 1e-9);
        assert_eq!(body.reduce_internal_bleeding(part, 2.0), 0.5);
        assert_eq!(body.internal_bleeding(part), 0.0);
    }

    #[test]
    fn test_total_bleeding_sums_wounds_and_internal() {
        let (_, mut body) = setup();
        body.add_wound(Wound::new(BodypartId(1), DamageType::Slashing, WoundSeverity::Severe, 0));
        body.add_internal_bleeding(BodypartId(2), 0.25);
        assert!((body.total_bleeding() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_set_bone_requires_fracture() {
        let (_, mut body) = setup();
        let bone = BoneId(6);
        assert!(!body.set_bone(bone));
        body.fracture_bone(bone);
        assert!(body.set_bone(bone));
        assert_eq!(body.bone_state(bone), Some(BoneState::Set));
    }
}
