//! Trauma control and exploratory surgery

use super::diagnosis::ExaminationFindings;
use super::{anatomy_of, narrate_at_surgeon, Completion};
use crate::check::Outcome;
use crate::core::error::Result;
use crate::procedures::rejection::Rejection;
use crate::procedures::target::ResolvedTarget;
use crate::procedures::{Operation, ProcedureContext};
use crate::world::World;

pub(super) fn validate_trauma(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let Some(part) = target.bodypart else {
        return Ok(());
    };
    if ctx.patient.body.internal_bleeding(part) <= 0.0 {
        return Err(Rejection::Variant(format!(
            "There is no internal bleeding in {}'s {} to control.",
            ctx.patient.name,
            ctx.anatomy.bodypart_name(part)
        )));
    }
    Ok(())
}

/// A major success stops the bleeding outright
pub(super) fn complete_trauma(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let part = op.bodypart()?;
    let anatomy = anatomy_of(world, op)?;
    let amount = match outcome {
        Outcome::MajorPass => f64::INFINITY,
        _ => outcome.successes() as f64 * world.config.trauma_control_per_degree,
    };

    let patient = world.expect_character_mut(op.patient)?;
    let stopped = patient.body.reduce_internal_bleeding(part, amount);
    let remaining = patient.body.internal_bleeding(part);
    let part_name = anatomy.bodypart_name(part);
    let text = match (stopped > 0.0, remaining > 0.0) {
        (true, false) => format!("The bleeding in {}'s {} has stopped.", patient.name, part_name),
        (true, true) => format!("The bleeding in {}'s {} has slowed.", patient.name, part_name),
        _ => format!("The bleeding in {}'s {} is as bad as ever.", patient.name, part_name),
    };
    narrate_at_surgeon(world, op, text)?;
    Ok(Completion::applied())
}

pub(super) fn complete_exploration(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let part = op.bodypart()?;
    let anatomy = anatomy_of(world, op)?;
    let patient = world.expect_character(op.patient)?;
    let findings = ExaminationFindings::explore(world, &anatomy, patient, part, outcome);
    let lines = findings.describe(&patient.name);
    for line in &lines {
        narrate_at_surgeon(world, op, line.clone())?;
    }
    Ok(Completion::applied().with_findings(lines))
}
