//! Procedure definitions and the feasibility contract
//!
//! A [`Procedure`] is a configured template: kind, target restrictions,
//! ordered phases and hooks. Feasibility queries and the execution path share
//! [`Procedure::feasibility`], so both always reach the same conclusion with
//! the same explanation.

pub mod hooks;
pub mod kinds;
pub mod loader;
pub mod phase;
pub mod rejection;
pub mod target;

pub use hooks::{HookContext, HookRegistry, ProcedureHooks};
pub use kinds::{Completion, ProcedureKind};
pub use loader::{load_procedures, load_procedures_str, parse_procedures, ProcedureRecord};
pub use phase::{Phase, PhaseSpecial};
pub use rejection::Rejection;
pub use target::{
    resolve_target, ProcedureArgs, ResolvedTarget, RestrictionMode, TargetKind, TargetRestriction,
};

use std::sync::Arc;

use crate::anatomy::BodyPrototype;
use crate::check::{CheckType, Difficulty, Outcome, TraitId};
use crate::core::error::{ProcedureError, Result};
use crate::core::types::{BodyPrototypeId, BodypartId, CharacterId, ProcedureId};
use crate::entity::Character;
use crate::world::World;

/// Per-procedure switches that adjust the kind's defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantFlags {
    /// Override the kind's living-patient requirement
    pub living_patient: Option<bool>,
    /// Start without a start emote
    pub quiet_start: bool,
}

impl VariantFlags {
    pub fn parse(kind: ProcedureKind, flags: &[String]) -> Result<Self> {
        let mut parsed = Self::default();
        for flag in flags {
            match flag.trim().to_lowercase().as_str() {
                "living-only" => parsed.living_patient = Some(true),
                "allow-corpse" => parsed.living_patient = Some(false),
                "quiet" => parsed.quiet_start = true,
                _ => {
                    return Err(ProcedureError::UnknownVariantFlag {
                        kind: kind.keyword().into(),
                        flag: flag.clone(),
                    })
                }
            }
        }
        Ok(parsed)
    }
}

/// A configured surgical or medical procedure
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub id: ProcedureId,
    pub name: String,
    /// Narrative verb, e.g. "amputating"
    pub gerund: String,
    pub kind: ProcedureKind,
    pub target_body: BodyPrototypeId,
    pub knowledge: Option<String>,
    pub check_trait: Option<TraitId>,
    pub base_difficulty: Difficulty,
    /// `$0` surgeon, `$1` patient, `$2` item, `$3` bodypart, `$4` organ or bone
    pub start_emote: String,
    pub phases: Vec<Phase>,
    pub restriction: TargetRestriction,
    pub flags: VariantFlags,
    pub hooks: ProcedureHooks,
}

impl Procedure {
    pub fn new(id: ProcedureId, name: impl Into<String>, kind: ProcedureKind, target_body: BodyPrototypeId) -> Self {
        Self {
            id,
            name: name.into(),
            gerund: kind.default_gerund().into(),
            kind,
            target_body,
            knowledge: None,
            check_trait: None,
            base_difficulty: Difficulty::Normal,
            start_emote: "$0 prepares to operate on $1.".into(),
            phases: Vec::new(),
            restriction: TargetRestriction::default(),
            flags: VariantFlags::default(),
            hooks: ProcedureHooks::default(),
        }
    }

    pub fn with_gerund(mut self, gerund: impl Into<String>) -> Self {
        self.gerund = gerund.into();
        self
    }

    pub fn with_knowledge(mut self, knowledge: impl Into<String>) -> Self {
        self.knowledge = Some(knowledge.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.base_difficulty = difficulty;
        self
    }

    pub fn with_start_emote(mut self, emote: impl Into<String>) -> Self {
        self.start_emote = emote.into();
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn with_restriction(mut self, restriction: TargetRestriction) -> Self {
        self.restriction = restriction;
        self
    }

    pub fn with_hooks(mut self, hooks: ProcedureHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn check_type(&self) -> CheckType {
        self.kind.check_type()
    }

    pub fn requires_living_patient(&self) -> bool {
        self.flags
            .living_patient
            .unwrap_or_else(|| self.kind.requires_living_patient())
    }

    // === CONTRACT ===

    /// Full feasibility evaluation, in the same order the engine uses
    pub fn feasibility(
        &self,
        world: &World,
        surgeon: CharacterId,
        patient: CharacterId,
        args: &ProcedureArgs,
    ) -> Feasibility {
        match self.assess(world, surgeon, patient, args) {
            Ok(target) => Feasibility::Feasible(target),
            Err(rejection) => Feasibility::Rejected(rejection),
        }
    }

    pub fn can_perform_procedure(
        &self,
        world: &World,
        surgeon: CharacterId,
        patient: CharacterId,
        args: &ProcedureArgs,
    ) -> bool {
        self.feasibility(world, surgeon, patient, args).is_feasible()
    }

    pub fn why_cannot_perform_procedure(
        &self,
        world: &World,
        surgeon: CharacterId,
        patient: CharacterId,
        args: &ProcedureArgs,
    ) -> String {
        self.feasibility(world, surgeon, patient, args).explanation()
    }

    /// Difficulty of the next check against a resolved target
    pub fn get_procedure_difficulty(&self, ctx: &ProcedureContext, target: &ResolvedTarget) -> Difficulty {
        let difficulty = kinds::difficulty(ctx, target);
        difficulty.stage_down(ctx.surgeon.merit_stages(self.check_type()))
    }

    /// "amputating Bob's left forearm"
    pub fn describe_procedure_gerund(&self, ctx: &ProcedureContext, target: &ResolvedTarget) -> String {
        let patient = &ctx.patient.name;
        let part = target.bodypart.map(|p| ctx.anatomy.bodypart_name(p)).unwrap_or("body");
        let item = target
            .item
            .and_then(|i| ctx.world.items.get(i))
            .map(|i| i.name.as_str())
            .unwrap_or("something");

        match self.kind.target_kind() {
            TargetKind::Patient => format!("{} {}", self.gerund, patient),
            TargetKind::Bodypart => format!("{} {}'s {}", self.gerund, patient, part),
            TargetKind::OrganViaBodypart | TargetKind::BoneViaBodypart => {
                let internal = match (target.organ(), target.bone()) {
                    (Some(organ), _) => ctx.anatomy.organ_name(organ),
                    (_, Some(bone)) => ctx.anatomy.bone_name(bone),
                    _ => part,
                };
                format!("{} {}'s {}", self.gerund, patient, internal)
            }
            TargetKind::HeldItemIntoBodypart(_) | TargetKind::HeldOrgan => {
                format!("{} {} into {}'s {}", self.gerund, item, patient, part)
            }
            TargetKind::HeldSeveredPart => format!("{} {} onto {}", self.gerund, item, patient),
            TargetKind::InstalledImplant | TargetKind::InstalledCannula => {
                format!("{} {} in {}'s {}", self.gerund, item, patient, part)
            }
        }
    }

    fn assess(
        &self,
        world: &World,
        surgeon: CharacterId,
        patient: CharacterId,
        args: &ProcedureArgs,
    ) -> std::result::Result<ResolvedTarget, Rejection> {
        let ctx = ProcedureContext::new(world, self, surgeon, patient)?;

        if !ctx.surgeon.can_act() {
            return Err(Rejection::SurgeonIncapable);
        }
        if let Some(knowledge) = &self.knowledge {
            if !ctx.surgeon.knows(knowledge) {
                return Err(Rejection::MissingKnowledge(self.name.clone()));
            }
        }
        if ctx.patient.body.prototype != self.target_body {
            return Err(Rejection::WrongAnatomy {
                patient: ctx.patient.name.clone(),
                procedure: self.name.clone(),
            });
        }
        if self.requires_living_patient() && ctx.patient.is_dead() {
            return Err(Rejection::PatientDead(ctx.patient.name.clone()));
        }
        if let Some(rejection) = environment_rejection(ctx.surgeon, ctx.patient) {
            return Err(rejection);
        }

        let target = resolve_target(&ctx, self.kind.target_kind(), args)?;
        kinds::validate(&ctx, &target)?;

        if let Some(plan) = self.phases.first().and_then(|p| p.plan.as_ref()) {
            let feasibility = plan.plan_is_feasible(&ctx.surgeon.inventory, &world.items);
            if !feasibility.is_feasible() {
                return Err(Rejection::Plan(feasibility));
            }
        }

        self.check_usability(&ctx, &target)?;
        Ok(target)
    }

    fn check_usability(&self, ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
        let Some(name) = &self.hooks.usability else {
            return Ok(());
        };
        let hook_ctx = ctx.hook_context(target, None, Outcome::NotTested);
        if ctx.world.hooks.test(name, &hook_ctx) != Some(false) {
            return Ok(());
        }
        let explanation = self
            .hooks
            .why_cannot
            .as_deref()
            .and_then(|why| ctx.world.hooks.text(why, &hook_ctx))
            .unwrap_or_else(|| format!("You cannot perform {} right now.", self.name));
        Err(Rejection::Hook(explanation))
    }
}

/// Result of a feasibility query
#[derive(Debug, Clone, PartialEq)]
pub enum Feasibility {
    Feasible(ResolvedTarget),
    Rejected(Rejection),
}

impl Feasibility {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Feasibility::Feasible(_))
    }

    pub fn explanation(&self) -> String {
        match self {
            Feasibility::Feasible(_) => "You can perform that procedure.".into(),
            Feasibility::Rejected(rejection) => rejection.to_string(),
        }
    }
}

/// Co-location, movement and combat checks shared by the feasibility query
/// and every phase boundary
pub fn environment_rejection(surgeon: &Character, patient: &Character) -> Option<Rejection> {
    if surgeon.moving {
        return Some(Rejection::SurgeonMoving);
    }
    if surgeon.in_melee {
        return Some(Rejection::SurgeonInMelee);
    }
    if surgeon.location != patient.location {
        return Some(Rejection::NotTogether(patient.name.clone()));
    }
    if patient.id != surgeon.id {
        if patient.moving {
            return Some(Rejection::Moving(patient.name.clone()));
        }
        if patient.in_melee {
            return Some(Rejection::InMelee(patient.name.clone()));
        }
    }
    None
}

/// Read-only view of everything a procedure evaluation looks at
pub struct ProcedureContext<'a> {
    pub world: &'a World,
    pub procedure: &'a Procedure,
    pub surgeon: &'a Character,
    pub patient: &'a Character,
    /// The patient's anatomy
    pub anatomy: Arc<BodyPrototype>,
}

impl<'a> ProcedureContext<'a> {
    pub fn new(
        world: &'a World,
        procedure: &'a Procedure,
        surgeon: CharacterId,
        patient: CharacterId,
    ) -> std::result::Result<Self, Rejection> {
        let surgeon = world
            .character(surgeon)
            .ok_or_else(|| Rejection::NotTogether("That person".into()))?;
        let patient = world
            .character(patient)
            .ok_or_else(|| Rejection::NotTogether("That person".into()))?;
        let anatomy = world
            .prototype(patient.body.prototype)
            .ok_or_else(|| Rejection::WrongAnatomy {
                patient: patient.name.clone(),
                procedure: procedure.name.clone(),
            })?;
        Ok(Self {
            world,
            procedure,
            surgeon,
            patient,
            anatomy,
        })
    }

    pub fn hook_context<'b>(
        &'b self,
        target: &'b ResolvedTarget,
        phase: Option<usize>,
        outcome: Outcome,
    ) -> HookContext<'b> {
        HookContext {
            procedure: self.procedure,
            surgeon: self.surgeon,
            patient: self.patient,
            target,
            phase,
            outcome,
        }
    }
}

/// A procedure bound to its participants and resolved target
#[derive(Debug, Clone)]
pub struct Operation {
    pub procedure: Arc<Procedure>,
    pub surgeon: CharacterId,
    pub patient: CharacterId,
    pub target: ResolvedTarget,
}

impl Operation {
    pub fn context<'a>(&'a self, world: &'a World) -> std::result::Result<ProcedureContext<'a>, Rejection> {
        ProcedureContext::new(world, &self.procedure, self.surgeon, self.patient)
    }

    /// The resolved bodypart; every bodypart-targeting kind has one
    pub fn bodypart(&self) -> Result<BodypartId> {
        self.target.bodypart.ok_or_else(|| ProcedureError::MissingTarget {
            procedure: self.procedure.name.clone(),
            what: "bodypart",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::LocationId;
    use crate::entity::CharacterState;

    fn setup() -> (World, CharacterId, CharacterId, Procedure) {
        let mut world = World::default();
        let proto = world.add_prototype(BodyPrototype::humanoid(BodyPrototypeId(1)));
        let surgeon = world.spawn(Character::new("Ada", proto, LocationId(1)).with_knowledge("Surgery"));
        let patient = world.spawn(Character::new("Bob", proto, LocationId(1)));
        let procedure = Procedure::new(ProcedureId(1), "amputate", ProcedureKind::Amputation, proto)
            .with_knowledge("Surgery")
            .with_phase(Phase::new(1, "$0 cuts into $1's $3."));
        (world, surgeon, patient, procedure)
    }

    #[test]
    fn test_knowledge_gate() {
        let (mut world, surgeon, patient, procedure) = setup();
        let args = ProcedureArgs::new().with_bodypart("left forearm");
        assert!(procedure.can_perform_procedure(&world, surgeon, patient, &args));

        world.character_mut(surgeon).unwrap().knowledges.clear();
        assert_eq!(
            procedure.why_cannot_perform_procedure(&world, surgeon, patient, &args),
            "You do not know how to perform amputate."
        );
    }

    #[test]
    fn test_environment_rejections() {
        let (mut world, surgeon, patient, procedure) = setup();
        let args = ProcedureArgs::new().with_bodypart("left forearm");

        world.character_mut(patient).unwrap().location = LocationId(2);
        assert_eq!(
            procedure.feasibility(&world, surgeon, patient, &args),
            Feasibility::Rejected(Rejection::NotTogether("Bob".into()))
        );

        world.character_mut(patient).unwrap().location = LocationId(1);
        world.character_mut(patient).unwrap().in_melee = true;
        assert_eq!(
            procedure.feasibility(&world, surgeon, patient, &args),
            Feasibility::Rejected(Rejection::InMelee("Bob".into()))
        );
    }

    #[test]
    fn test_incapable_surgeon() {
        let (mut world, surgeon, patient, procedure) = setup();
        world.character_mut(surgeon).unwrap().state = CharacterState::Unconscious;
        let args = ProcedureArgs::new().with_bodypart("left forearm");
        assert_eq!(
            procedure.feasibility(&world, surgeon, patient, &args),
            Feasibility::Rejected(Rejection::SurgeonIncapable)
        );
    }

    #[test]
    fn test_variant_flags() {
        let flags = VariantFlags::parse(
            ProcedureKind::TraumaControl,
            &["allow-corpse".to_string(), "quiet".to_string()],
        )
        .unwrap();
        assert_eq!(flags.living_patient, Some(false));
        assert!(flags.quiet_start);

        let err = VariantFlags::parse(ProcedureKind::TraumaControl, &["sparkly".to_string()]);
        assert!(matches!(err, Err(ProcedureError::UnknownVariantFlag { .. })));
    }

    #[test]
    fn test_usability_hook_explanation() {
        let (mut world, surgeon, patient, mut procedure) = setup();
        world.hooks.register_predicate("never", |_| false);
        world.hooks.register_text("sterile", |ctx| format!("{}'s tools are not sterile.", ctx.surgeon.name));
        procedure.hooks = ProcedureHooks {
            usability: Some("never".into()),
            why_cannot: Some("sterile".into()),
            ..ProcedureHooks::default()
        };
        let args = ProcedureArgs::new().with_bodypart("left forearm");
        assert_eq!(
            procedure.why_cannot_perform_procedure(&world, surgeon, patient, &args),
            "Ada's tools are not sterile."
        );
    }

    #[test]
    fn test_gerund_mentions_target() {
        let (world, surgeon, patient, procedure) = setup();
        let args = ProcedureArgs::new().with_bodypart("left forearm");
        let ctx = ProcedureContext::new(&world, &procedure, surgeon, patient).unwrap();
        let target = resolve_target(&ctx, procedure.kind.target_kind(), &args).unwrap();
        assert_eq!(
            procedure.describe_procedure_gerund(&ctx, &target),
            "amputating Bob's left forearm"
        );
    }
}
