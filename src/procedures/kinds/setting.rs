//! Surgical bone setting

use super::{anatomy_of, narrate_at_surgeon, Completion};
use crate::check::Outcome;
use crate::core::error::{ProcedureError, Result};
use crate::entity::BoneState;
use crate::procedures::rejection::Rejection;
use crate::procedures::target::ResolvedTarget;
use crate::procedures::{Operation, ProcedureContext};
use crate::world::World;

pub(super) fn validate(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let Some(bone) = target.bone() else {
        return Ok(());
    };
    if ctx.patient.body.bone_state(bone) != Some(BoneState::Fractured) {
        return Err(Rejection::Variant(format!(
            "{}'s {} is not broken.",
            ctx.patient.name,
            ctx.anatomy.bone_name(bone)
        )));
    }
    Ok(())
}

pub(super) fn complete(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let bone = op.target.bone().ok_or_else(|| ProcedureError::MissingTarget {
        procedure: op.procedure.name.clone(),
        what: "bone",
    })?;
    let anatomy = anatomy_of(world, op)?;
    let patient = world.expect_character_mut(op.patient)?;

    let text = if outcome.is_pass() && patient.body.set_bone(bone) {
        format!("{}'s {} is set.", patient.name, anatomy.bone_name(bone))
    } else {
        format!("{}'s {} is still out of alignment.", patient.name, anatomy.bone_name(bone))
    };
    narrate_at_surgeon(world, op, text)?;
    Ok(Completion::applied())
}
