//! Amputation: sever a bodypart and everything downstream of it

use super::{anatomy_of, check_vital_loss, narrate_at_surgeon, Completion};
use crate::core::error::Result;
use crate::entity::{DamageType, Wound};
use crate::items::{DecayState, Item, ItemKind, SeveredBodypartItem};
use crate::procedures::rejection::Rejection;
use crate::procedures::target::ResolvedTarget;
use crate::procedures::{Operation, ProcedureContext};
use crate::world::World;

pub(super) fn validate(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let Some(part) = target.bodypart.and_then(|p| ctx.anatomy.bodypart(p)) else {
        return Ok(());
    };
    if !part.severable {
        return Err(Rejection::Variant(format!(
            "{}'s {} cannot be amputated.",
            ctx.patient.name, part.name
        )));
    }
    Ok(())
}

pub(super) fn complete(world: &mut World, op: &Operation) -> Result<Completion> {
    let part = op.bodypart()?;
    let anatomy = anatomy_of(world, op)?;
    let part_name = anatomy.bodypart_name(part).to_string();

    let patient = world.expect_character_mut(op.patient)?;
    let severed = patient.body.sever(&anatomy, part);
    let patient_name = patient.name.clone();
    tracing::info!(
        "{} lost {} bodyparts from the {}",
        patient_name,
        severed.parts.len(),
        part_name
    );

    let item = Item::new(
        format!("a severed {}", part_name),
        ItemKind::SeveredBodypart(SeveredBodypartItem {
            prototype: anatomy.id,
            severed,
            decay: DecayState::Fresh,
        }),
    );
    let item = world.create_item(item);
    let surgeon_name = world.character_name(op.surgeon);
    let text = if world.give_or_drop(op.surgeon, item)? {
        format!("{} is left holding {}'s severed {}.", surgeon_name, patient_name, part_name)
    } else {
        format!("{}'s severed {} falls to the floor.", patient_name, part_name)
    };
    narrate_at_surgeon(world, op, text)?;

    check_vital_loss(world, op, &anatomy)?;
    Ok(Completion::applied())
}

/// A half-finished amputation leaves a ragged, near-fatal wound
pub(super) fn interrupted(world: &mut World, op: &Operation) -> Result<()> {
    let part = op.bodypart()?;
    let severity = world.config.amputation_abort_severity;
    let tick = world.current_tick;
    let patient = world.expect_character_mut(op.patient)?;
    if patient.body.has_bodypart(part) {
        patient
            .body
            .add_wound(Wound::new(part, DamageType::Shearing, severity, tick));
    }
    Ok(())
}
