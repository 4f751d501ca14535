//! Procedure kinds
//!
//! The kind is the tag that decides which target shape a procedure resolves,
//! which extra checks it makes, how its difficulty is composed and which
//! completion function runs. Leaf behaviour lives in one file per family.

mod amputation;
mod cannulation;
mod diagnosis;
mod finalisation;
mod implants;
mod organs;
mod replantation;
mod setting;
mod surgery;

pub use diagnosis::{ExaminationFindings, TriageCategory, WoundFinding};
pub use implants::parse_power_setting;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::anatomy::BodyPrototype;
use crate::check::{CheckType, Difficulty, Outcome};
use crate::core::error::{ProcedureError, Result};
use crate::core::types::ItemId;
use crate::entity::CharacterState;
use crate::items::{Item, ItemCapability};
use crate::procedures::rejection::Rejection;
use crate::procedures::target::{ResolvedTarget, TargetKind};
use crate::procedures::{Operation, ProcedureContext};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcedureKind {
    MedicalExamination,
    Triage,
    Amputation,
    Replantation,
    OrganExtraction,
    OrganTransplant,
    OrganStabilisation,
    Cannulation,
    Decannulation,
    InstallImplant,
    RemoveImplant,
    ConfigureImplantPower,
    ConfigureImplantInterface,
    TraumaControl,
    ExploratorySurgery,
    InvasiveFinalisation,
    SurgicalSetting,
}

impl ProcedureKind {
    pub fn all() -> [ProcedureKind; 17] {
        [
            ProcedureKind::MedicalExamination,
            ProcedureKind::Triage,
            ProcedureKind::Amputation,
            ProcedureKind::Replantation,
            ProcedureKind::OrganExtraction,
            ProcedureKind::OrganTransplant,
            ProcedureKind::OrganStabilisation,
            ProcedureKind::Cannulation,
            ProcedureKind::Decannulation,
            ProcedureKind::InstallImplant,
            ProcedureKind::RemoveImplant,
            ProcedureKind::ConfigureImplantPower,
            ProcedureKind::ConfigureImplantInterface,
            ProcedureKind::TraumaControl,
            ProcedureKind::ExploratorySurgery,
            ProcedureKind::InvasiveFinalisation,
            ProcedureKind::SurgicalSetting,
        ]
    }

    /// Record keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            ProcedureKind::MedicalExamination => "examination",
            ProcedureKind::Triage => "triage",
            ProcedureKind::Amputation => "amputation",
            ProcedureKind::Replantation => "replantation",
            ProcedureKind::OrganExtraction => "organextraction",
            ProcedureKind::OrganTransplant => "organtransplant",
            ProcedureKind::OrganStabilisation => "organstabilisation",
            ProcedureKind::Cannulation => "cannulation",
            ProcedureKind::Decannulation => "decannulation",
            ProcedureKind::InstallImplant => "installimplant",
            ProcedureKind::RemoveImplant => "removeimplant",
            ProcedureKind::ConfigureImplantPower => "implantpower",
            ProcedureKind::ConfigureImplantInterface => "implantinterface",
            ProcedureKind::TraumaControl => "traumacontrol",
            ProcedureKind::ExploratorySurgery => "exploratorysurgery",
            ProcedureKind::InvasiveFinalisation => "finalisation",
            ProcedureKind::SurgicalSetting => "bonesetting",
        }
    }

    pub fn default_gerund(&self) -> &'static str {
        match self {
            ProcedureKind::MedicalExamination => "examining",
            ProcedureKind::Triage => "triaging",
            ProcedureKind::Amputation => "amputating",
            ProcedureKind::Replantation => "reattaching",
            ProcedureKind::OrganExtraction => "removing",
            ProcedureKind::OrganTransplant => "transplanting",
            ProcedureKind::OrganStabilisation => "stabilising",
            ProcedureKind::Cannulation => "inserting",
            ProcedureKind::Decannulation => "removing",
            ProcedureKind::InstallImplant => "installing",
            ProcedureKind::RemoveImplant => "removing",
            ProcedureKind::ConfigureImplantPower => "adjusting the power of",
            ProcedureKind::ConfigureImplantInterface => "configuring",
            ProcedureKind::TraumaControl => "controlling the bleeding in",
            ProcedureKind::ExploratorySurgery => "exploring",
            ProcedureKind::InvasiveFinalisation => "closing the incision in",
            ProcedureKind::SurgicalSetting => "setting",
        }
    }

    pub fn check_type(&self) -> CheckType {
        match self {
            ProcedureKind::MedicalExamination => CheckType::MedicalExaminationCheck,
            ProcedureKind::Triage => CheckType::TriageCheck,
            ProcedureKind::Amputation => CheckType::AmputationCheck,
            ProcedureKind::Replantation => CheckType::ReplantationCheck,
            ProcedureKind::OrganExtraction => CheckType::OrganExtractionCheck,
            ProcedureKind::OrganTransplant => CheckType::OrganTransplantCheck,
            ProcedureKind::OrganStabilisation => CheckType::OrganStabilisationCheck,
            ProcedureKind::Cannulation => CheckType::CannulationProcedure,
            ProcedureKind::Decannulation => CheckType::DecannulationProcedure,
            ProcedureKind::InstallImplant => CheckType::InstallImplantSurgery,
            ProcedureKind::RemoveImplant => CheckType::RemoveImplantSurgery,
            ProcedureKind::ConfigureImplantPower => CheckType::ConfigureImplantPowerSurgery,
            ProcedureKind::ConfigureImplantInterface => CheckType::ConfigureImplantInterfaceSurgery,
            ProcedureKind::TraumaControl => CheckType::TraumaControlSurgery,
            ProcedureKind::ExploratorySurgery => CheckType::ExploratorySurgeryCheck,
            ProcedureKind::InvasiveFinalisation => CheckType::InvasiveProcedureFinalisation,
            ProcedureKind::SurgicalSetting => CheckType::SurgicalSetCheck,
        }
    }

    pub fn target_kind(&self) -> TargetKind {
        match self {
            ProcedureKind::MedicalExamination | ProcedureKind::Triage => TargetKind::Patient,
            ProcedureKind::Amputation
            | ProcedureKind::TraumaControl
            | ProcedureKind::ExploratorySurgery
            | ProcedureKind::InvasiveFinalisation => TargetKind::Bodypart,
            ProcedureKind::Replantation => TargetKind::HeldSeveredPart,
            ProcedureKind::OrganExtraction | ProcedureKind::OrganStabilisation => TargetKind::OrganViaBodypart,
            ProcedureKind::OrganTransplant => TargetKind::HeldOrgan,
            ProcedureKind::SurgicalSetting => TargetKind::BoneViaBodypart,
            ProcedureKind::Cannulation => TargetKind::HeldItemIntoBodypart(ItemCapability::Cannula),
            ProcedureKind::InstallImplant => TargetKind::HeldItemIntoBodypart(ItemCapability::Implant),
            ProcedureKind::Decannulation => TargetKind::InstalledCannula,
            ProcedureKind::RemoveImplant
            | ProcedureKind::ConfigureImplantPower
            | ProcedureKind::ConfigureImplantInterface => TargetKind::InstalledImplant,
        }
    }

    /// Leaves (or deepens) an open surgical wound that must be finalised
    pub fn is_invasive(&self) -> bool {
        !matches!(
            self,
            ProcedureKind::MedicalExamination
                | ProcedureKind::Triage
                | ProcedureKind::Cannulation
                | ProcedureKind::Decannulation
                | ProcedureKind::InvasiveFinalisation
        )
    }

    pub fn requires_living_patient(&self) -> bool {
        matches!(
            self,
            ProcedureKind::Triage
                | ProcedureKind::Replantation
                | ProcedureKind::OrganTransplant
                | ProcedureKind::OrganStabilisation
                | ProcedureKind::Cannulation
                | ProcedureKind::TraumaControl
                | ProcedureKind::SurgicalSetting
        )
    }

    /// Works through an incision some earlier procedure must have opened
    pub fn requires_open_wound(&self) -> bool {
        matches!(
            self,
            ProcedureKind::InstallImplant
                | ProcedureKind::RemoveImplant
                | ProcedureKind::ConfigureImplantPower
                | ProcedureKind::ConfigureImplantInterface
        )
    }
}

impl FromStr for ProcedureKind {
    type Err = ProcedureError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        ProcedureKind::all()
            .into_iter()
            .find(|kind| kind.keyword() == normalized)
            .ok_or_else(|| ProcedureError::UnknownKind(s.to_string()))
    }
}

/// What a completion did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// The core mutation happened; invasive bookkeeping follows only then
    pub took_effect: bool,
    /// Diagnostic lines for the surgeon
    pub findings: Vec<String>,
}

impl Completion {
    pub fn applied() -> Self {
        Self {
            took_effect: true,
            findings: Vec::new(),
        }
    }

    pub fn no_effect() -> Self {
        Self::default()
    }

    pub fn with_findings(mut self, findings: Vec<String>) -> Self {
        self.findings = findings;
        self
    }
}

// === DISPATCH ===

/// Kind-specific checks after the target has resolved
pub(crate) fn validate(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let kind = ctx.procedure.kind;
    if kind.requires_open_wound() {
        finalisation::require_open_wound(ctx, target)?;
    }

    match kind {
        ProcedureKind::Amputation => amputation::validate(ctx, target),
        ProcedureKind::Replantation => replantation::validate(ctx, target),
        ProcedureKind::OrganExtraction | ProcedureKind::OrganStabilisation => organs::validate_present(ctx, target),
        ProcedureKind::OrganTransplant => organs::validate_transplant(ctx, target),
        ProcedureKind::Cannulation => cannulation::validate_insert(ctx, target),
        ProcedureKind::InstallImplant => implants::validate_install(ctx, target),
        ProcedureKind::ConfigureImplantPower => implants::validate_power(ctx, target),
        ProcedureKind::ConfigureImplantInterface => implants::validate_interface(ctx, target),
        ProcedureKind::TraumaControl => surgery::validate_trauma(ctx, target),
        ProcedureKind::InvasiveFinalisation => finalisation::validate(ctx, target),
        ProcedureKind::SurgicalSetting => setting::validate(ctx, target),
        ProcedureKind::MedicalExamination
        | ProcedureKind::Triage
        | ProcedureKind::Decannulation
        | ProcedureKind::RemoveImplant
        | ProcedureKind::ExploratorySurgery => Ok(()),
    }
}

/// Base difficulty plus situational stages, before surgeon merits
pub(crate) fn difficulty(ctx: &ProcedureContext, target: &ResolvedTarget) -> Difficulty {
    let config = &ctx.world.config;
    let kind = ctx.procedure.kind;
    let patient = ctx.patient;
    let mut difficulty = ctx.procedure.base_difficulty;

    if kind.is_invasive() {
        if patient.is_dead() {
            difficulty = difficulty.stage_down(config.corpse_stages);
        } else if patient.is_conscious() {
            difficulty = difficulty.stage_up(config.conscious_patient_stages);
        }
    }

    if let Some(organ) = target.organ() {
        let stages = ctx.anatomy.organ(organ).map_or(0, |o| o.kind.sensitivity_stages());
        difficulty = difficulty.stage_up(stages);
    }
    if let Some(bone) = target.bone() {
        let stages = ctx.anatomy.bone(bone).map_or(0, |b| b.setting_stages);
        difficulty = difficulty.stage_up(stages);
    }

    match kind {
        ProcedureKind::MedicalExamination | ProcedureKind::Triage => diagnosis::difficulty(ctx, difficulty),
        ProcedureKind::InvasiveFinalisation => finalisation::difficulty(ctx, target, difficulty),
        _ => difficulty,
    }
}

/// Run the kind's core mutation
pub(crate) fn complete(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    match op.procedure.kind {
        ProcedureKind::MedicalExamination => diagnosis::complete_examination(world, op, outcome),
        ProcedureKind::Triage => diagnosis::complete_triage(world, op, outcome),
        ProcedureKind::Amputation => amputation::complete(world, op),
        ProcedureKind::Replantation => replantation::complete(world, op),
        ProcedureKind::OrganExtraction => organs::complete_extraction(world, op),
        ProcedureKind::OrganTransplant => organs::complete_transplant(world, op),
        ProcedureKind::OrganStabilisation => organs::complete_stabilisation(world, op, outcome),
        ProcedureKind::Cannulation => cannulation::complete_insert(world, op, outcome),
        ProcedureKind::Decannulation => cannulation::complete_remove(world, op),
        ProcedureKind::InstallImplant => implants::complete_install(world, op),
        ProcedureKind::RemoveImplant => implants::complete_remove(world, op),
        ProcedureKind::ConfigureImplantPower => implants::complete_power(world, op, outcome),
        ProcedureKind::ConfigureImplantInterface => implants::complete_interface(world, op, outcome),
        ProcedureKind::TraumaControl => surgery::complete_trauma(world, op, outcome),
        ProcedureKind::ExploratorySurgery => surgery::complete_exploration(world, op, outcome),
        ProcedureKind::InvasiveFinalisation => finalisation::complete(world, op, outcome),
        ProcedureKind::SurgicalSetting => setting::complete(world, op, outcome),
    }
}

/// Kind-specific damage when a procedure is cut short
pub(crate) fn interrupted(world: &mut World, op: &Operation) -> Result<()> {
    match op.procedure.kind {
        ProcedureKind::Amputation => amputation::interrupted(world, op),
        _ => Ok(()),
    }
}

// === SHARED HELPERS ===

fn anatomy_of(world: &World, op: &Operation) -> Result<Arc<BodyPrototype>> {
    let prototype = world.expect_character(op.patient)?.body.prototype;
    world
        .prototype(prototype)
        .ok_or(ProcedureError::PrototypeNotFound(prototype))
}

fn narrate_at_surgeon(world: &mut World, op: &Operation, text: impl Into<String>) -> Result<()> {
    let location = world.expect_character(op.surgeon)?.location;
    world.narrate(location, text);
    Ok(())
}

fn item_name(world: &World, item: ItemId) -> String {
    world
        .items
        .get(item)
        .map(|i| i.name.clone())
        .unwrap_or_else(|| "the item".into())
}

fn target_item(op: &Operation) -> Result<ItemId> {
    op.target.item.ok_or_else(|| ProcedureError::MissingTarget {
        procedure: op.procedure.name.clone(),
        what: "item",
    })
}

/// Take an item out of the surgeon's hands and out of the world
fn consume_from_surgeon(world: &mut World, op: &Operation, item: ItemId) -> Result<Option<Item>> {
    world.expect_character_mut(op.surgeon)?.inventory.remove(item);
    Ok(world.items.remove(item))
}

/// Kill the patient if they no longer have every vital organ
fn check_vital_loss(world: &mut World, op: &Operation, anatomy: &BodyPrototype) -> Result<()> {
    let patient = world.expect_character_mut(op.patient)?;
    if patient.is_dead() || !patient.body.is_missing_vital_organ(anatomy) {
        return Ok(());
    }
    patient.state = CharacterState::Dead;
    let text = format!("{} dies.", patient.name);
    tracing::info!("{} died on the table during {}", patient.name, op.procedure.name);
    narrate_at_surgeon(world, op, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_parse_back() {
        for kind in ProcedureKind::all() {
            assert_eq!(kind.keyword().parse::<ProcedureKind>().unwrap(), kind);
        }
        assert_eq!("Organ Extraction".parse::<ProcedureKind>().unwrap(), ProcedureKind::OrganExtraction);
        assert!("lobotomy".parse::<ProcedureKind>().is_err());
    }

    #[test]
    fn test_diagnostics_are_not_invasive() {
        assert!(!ProcedureKind::MedicalExamination.is_invasive());
        assert!(!ProcedureKind::InvasiveFinalisation.is_invasive());
        assert!(ProcedureKind::Amputation.is_invasive());
        assert!(ProcedureKind::RemoveImplant.requires_open_wound());
    }
}
