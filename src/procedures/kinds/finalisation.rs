//! Closing an open surgical wound
//!
//! A successful closure removes the finalization requirement and leaves a
//! surgical wound whose severity falls with each success degree. A clumsy
//! closure by a surgeon with a negative merit seeds infection; a clean one by
//! a surgeon with a positive merit leaves the wound already treated. A failed
//! closure leaves the requirement in place and makes it harder.

use super::{anatomy_of, narrate_at_surgeon, Completion};
use crate::check::{Difficulty, Outcome};
use crate::core::error::Result;
use crate::entity::{DamageType, Infection, Wound, WoundSeverity};
use crate::procedures::rejection::Rejection;
use crate::procedures::target::ResolvedTarget;
use crate::procedures::{Operation, ProcedureContext};
use crate::world::World;

/// Intensity of an infection seeded by a poor closure
const SEEDED_INFECTION_INTENSITY: f64 = 0.1;

/// For procedures that work through an incision another procedure opened
pub(super) fn require_open_wound(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let Some(part) = target.bodypart else {
        return Ok(());
    };
    if ctx.patient.body.finalization_requirement(part).is_none() {
        return Err(Rejection::Variant(format!(
            "You must first open a surgical wound on {}'s {}.",
            ctx.patient.name,
            ctx.anatomy.bodypart_name(part)
        )));
    }
    Ok(())
}

pub(super) fn validate(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let Some(part) = target.bodypart else {
        return Ok(());
    };
    if ctx.patient.body.finalization_requirement(part).is_none() {
        return Err(Rejection::Variant(format!(
            "There is no open surgical wound on {}'s {} to close.",
            ctx.patient.name,
            ctx.anatomy.bodypart_name(part)
        )));
    }
    Ok(())
}

/// Never easier than the wound left behind
pub(super) fn difficulty(ctx: &ProcedureContext, target: &ResolvedTarget, difficulty: Difficulty) -> Difficulty {
    target
        .bodypart
        .and_then(|part| ctx.patient.body.finalization_requirement(part))
        .map_or(difficulty, |requirement| difficulty.max(requirement.difficulty))
}

pub(super) fn complete(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let part = op.bodypart()?;
    let anatomy = anatomy_of(world, op)?;
    let part_name = anatomy.bodypart_name(part).to_string();
    let tick = world.current_tick;
    let base_severity = world.config.finalization_wound_severity;
    let virulence = world.config.finalization_infection_virulence;
    let merit = world
        .expect_character(op.surgeon)?
        .merit_stages(op.procedure.check_type());

    let patient = world.expect_character_mut(op.patient)?;
    let patient_name = patient.name.clone();

    if !outcome.is_pass() {
        let escalated = patient.body.escalate_finalization(part, outcome.failures().max(1));
        if let Some(requirement) = escalated {
            tracing::debug!(
                "Closure of {}'s {} failed, now {}",
                patient_name,
                part_name,
                requirement.difficulty
            );
        }
        narrate_at_surgeon(
            world,
            op,
            format!("The incision in {}'s {} remains open.", patient_name, part_name),
        )?;
        return Ok(Completion::applied());
    }

    if patient.body.clear_finalization(part).is_none() {
        return Ok(Completion::no_effect());
    }

    let severity = base_severity.shift(-outcome.successes());
    if severity > WoundSeverity::None {
        let mut wound = Wound::new(part, DamageType::Surgical, severity, tick);
        if outcome == Outcome::MinorPass && merit < 0 {
            wound = wound.with_infection(Infection {
                virulence,
                intensity: SEEDED_INFECTION_INTENSITY,
            });
        } else if outcome >= Outcome::Pass && merit > 0 {
            wound.treat();
        }
        patient.body.add_wound(wound);
    }

    narrate_at_surgeon(
        world,
        op,
        format!("The incision in {}'s {} is closed.", patient_name, part_name),
    )?;
    Ok(Completion::applied())
}
