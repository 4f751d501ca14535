//! Consequence engine
//!
//! How a procedure ended decides what happens to the patient. Completion runs
//! the kind's mutation and then, for invasive kinds, leaves an open wound and
//! any bleeding the check earned. Narrated aborts and silent terminations both
//! go through [`apply_interruption_consequences`]; they differ only in what
//! gets narrated.

use crate::check::Outcome;
use crate::core::error::{ProcedureError, Result};
use crate::core::types::BodypartId;
use crate::engine::narration::describe_operation;
use crate::procedures::kinds::{self, Completion};
use crate::procedures::Operation;
use crate::world::World;

/// Where an open wound lands: the targeted part, or the nearest attached
/// part upstream of it once the target has been taken off
pub fn finalization_site(world: &World, op: &Operation) -> Result<Option<BodypartId>> {
    let Some(mut part) = op.target.bodypart else {
        return Ok(None);
    };
    let patient = world.expect_character(op.patient)?;
    let anatomy = world
        .prototype(patient.body.prototype)
        .ok_or(ProcedureError::PrototypeNotFound(patient.body.prototype))?;

    while !patient.body.has_bodypart(part) {
        match anatomy.bodypart(part).and_then(|p| p.upstream) {
            Some(upstream) => part = upstream,
            None => return Ok(None),
        }
    }
    Ok(Some(part))
}

/// Run the completion path with the final check's outcome
pub fn complete_procedure(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let completion = kinds::complete(world, op, outcome)?;

    if op.procedure.kind.is_invasive() && completion.took_effect {
        if let Some(part) = finalization_site(world, op)? {
            let merit = world
                .expect_character(op.surgeon)?
                .merit_stages(op.procedure.check_type());
            let difficulty = world
                .config
                .completion_finalization_difficulty
                .stage_up(outcome.failures())
                .stage_down(merit);
            let bleeding = outcome.failures() as f64 * world.config.bleeding_per_failure_degree;
            let tick = world.current_tick;

            let patient = world.expect_character_mut(op.patient)?;
            let requirement = patient.body.add_or_escalate_finalization(part, difficulty, tick);
            if bleeding > 0.0 {
                patient.body.add_internal_bleeding(part, bleeding);
            }
            tracing::debug!(
                "{} left an open wound ({}) on {}",
                op.procedure.name,
                requirement.difficulty,
                patient.name
            );
        }
    }

    fire_hook(world, op, op.procedure.hooks.completion.as_deref(), outcome);
    tracing::info!(
        "{} completed with {} (effect: {})",
        op.procedure.name,
        outcome.describe(),
        completion.took_effect
    );
    Ok(completion)
}

/// Stop a procedure in view of everyone present
pub fn abort_procedure(world: &mut World, op: &Operation, reason: &str) -> Result<()> {
    let description = describe_operation(world, op);
    let surgeon = world.expect_character(op.surgeon)?;
    let (location, name) = (surgeon.location, surgeon.name.clone());
    world.narrate(location, reason);
    world.narrate(location, format!("{} stops {}.", name, description));
    tracing::warn!("{} aborted: {}", op.procedure.name, reason);
    apply_interruption_consequences(world, op)
}

/// Stop a procedure without narration
pub fn silent_abort_procedure(world: &mut World, op: &Operation) -> Result<()> {
    tracing::warn!("{} terminated silently", op.procedure.name);
    apply_interruption_consequences(world, op)
}

/// Shared by both abort paths
fn apply_interruption_consequences(world: &mut World, op: &Operation) -> Result<()> {
    kinds::interrupted(world, op)?;

    if op.procedure.kind.is_invasive() {
        if let Some(part) = finalization_site(world, op)? {
            let difficulty = world.config.abort_finalization_difficulty;
            let tick = world.current_tick;
            world
                .expect_character_mut(op.patient)?
                .body
                .add_or_escalate_finalization(part, difficulty, tick);
        }
    }

    fire_hook(world, op, op.procedure.hooks.abort.as_deref(), Outcome::NotTested);
    Ok(())
}

fn fire_hook(world: &World, op: &Operation, name: Option<&str>, outcome: Outcome) {
    let Some(name) = name else {
        return;
    };
    match op.context(world) {
        Ok(ctx) => {
            world.hooks.fire(name, &ctx.hook_context(&op.target, None, outcome));
        }
        Err(rejection) => tracing::warn!("Hook {} skipped: {}", name, rejection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anatomy::BodyPrototype;
    use crate::check::Difficulty;
    use crate::core::types::{BodyPrototypeId, CharacterId, LocationId, ProcedureId};
    use crate::entity::{Character, CharacterState, DamageType, WoundSeverity};
    use crate::procedures::{Phase, Procedure, ProcedureKind, ResolvedTarget};
    use std::sync::Arc;

    fn setup(kind: ProcedureKind, part: &str) -> (World, Operation) {
        let mut world = World::default();
        let proto = world.add_prototype(BodyPrototype::humanoid(BodyPrototypeId(1)));
        let surgeon = world.spawn(Character::new("Ada", proto, LocationId(1)));
        let patient = world.spawn(Character::new("Bob", proto, LocationId(1)).with_state(CharacterState::Unconscious));
        let anatomy = world.prototype(proto).unwrap();
        let (part, _) = anatomy.find_bodypart(part).unwrap();
        let procedure = Procedure::new(ProcedureId(1), "procedure", kind, proto).with_phase(Phase::new(1, "$0 works."));
        let op = Operation {
            procedure: Arc::new(procedure),
            surgeon,
            patient,
            target: ResolvedTarget {
                bodypart: Some(part),
                ..ResolvedTarget::default()
            },
        };
        (world, op)
    }

    fn patient(world: &World, id: CharacterId) -> &Character {
        world.character(id).unwrap()
    }

    #[test]
    fn test_amputation_wound_lands_on_stump() {
        let (mut world, op) = setup(ProcedureKind::Amputation, "left forearm");
        complete_procedure(&mut world, &op, Outcome::Pass).unwrap();

        let anatomy = world.prototype(BodyPrototypeId(1)).unwrap();
        let (upper_arm, _) = anatomy.find_bodypart("left upper arm").unwrap();
        let body = &patient(&world, op.patient).body;
        assert_eq!(body.finalization_requirements().len(), 1);
        assert_eq!(
            body.finalization_requirement(upper_arm).unwrap().difficulty,
            Difficulty::Normal
        );
    }

    #[test]
    fn test_failed_invasive_completion_bleeds_and_escalates() {
        let (mut world, op) = setup(ProcedureKind::ExploratorySurgery, "abdomen");
        complete_procedure(&mut world, &op, Outcome::Fail).unwrap();

        let part = op.target.bodypart.unwrap();
        let body = &patient(&world, op.patient).body;
        assert_eq!(body.finalization_requirement(part).unwrap().difficulty, Difficulty::VeryHard);
        assert!((body.internal_bleeding(part) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_abort_paths_apply_identical_consequences() {
        let (mut narrated, op) = setup(ProcedureKind::Amputation, "left forearm");
        let (mut silent, silent_op) = setup(ProcedureKind::Amputation, "left forearm");

        abort_procedure(&mut narrated, &op, "Bob is moving.").unwrap();
        silent_abort_procedure(&mut silent, &silent_op).unwrap();

        let a = &patient(&narrated, op.patient).body;
        let b = &patient(&silent, silent_op.patient).body;
        assert_eq!(a.finalization_requirements()[0].difficulty, Difficulty::Hard);
        assert_eq!(
            a.finalization_requirements()[0].difficulty,
            b.finalization_requirements()[0].difficulty
        );
        assert_eq!(a.wounds().len(), 1);
        assert_eq!(a.wounds()[0].damage_type, DamageType::Shearing);
        assert_eq!(a.wounds()[0].severity, WoundSeverity::Horrifying);
        assert_eq!(b.wounds().len(), 1);

        assert_eq!(narrated.narration().len(), 2);
        assert!(silent.narration().is_empty());
    }

    #[test]
    fn test_non_invasive_leaves_no_wound() {
        let (mut world, op) = setup(ProcedureKind::MedicalExamination, "abdomen");
        let op = Operation {
            target: ResolvedTarget::default(),
            ..op
        };
        complete_procedure(&mut world, &op, Outcome::MajorFail).unwrap();
        silent_abort_procedure(&mut world, &op).unwrap();
        assert!(patient(&world, op.patient).body.finalization_requirements().is_empty());
    }
}
