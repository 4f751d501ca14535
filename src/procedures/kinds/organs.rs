//! Organ extraction, transplant and stabilisation

use super::{anatomy_of, check_vital_loss, consume_from_surgeon, item_name, narrate_at_surgeon, target_item, Completion};
use crate::check::Outcome;
use crate::core::error::{ProcedureError, Result};
use crate::core::types::OrganId;
use crate::items::{DecayState, Item, ItemKind, OrganItem};
use crate::procedures::rejection::Rejection;
use crate::procedures::target::ResolvedTarget;
use crate::procedures::{Operation, ProcedureContext};
use crate::world::World;

fn target_organ(op: &Operation) -> Result<OrganId> {
    op.target.organ().ok_or_else(|| ProcedureError::MissingTarget {
        procedure: op.procedure.name.clone(),
        what: "organ",
    })
}

pub(super) fn validate_present(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let Some(organ) = target.organ() else {
        return Ok(());
    };
    if !ctx.patient.body.has_organ(&ctx.anatomy, organ) {
        return Err(Rejection::Variant(format!(
            "{}'s {} has already been removed.",
            ctx.patient.name,
            ctx.anatomy.organ_name(organ)
        )));
    }
    Ok(())
}

pub(super) fn validate_transplant(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let Some(item) = target.item.and_then(|i| ctx.world.items.get(i)) else {
        return Ok(());
    };
    let ItemKind::Organ(organ) = &item.kind else {
        return Ok(());
    };

    if organ.prototype != ctx.patient.body.prototype {
        return Err(Rejection::Variant(format!(
            "{} is not compatible with {}'s anatomy.",
            item.name, ctx.patient.name
        )));
    }
    if ctx.patient.body.has_organ(&ctx.anatomy, organ.organ) {
        return Err(Rejection::Variant(format!(
            "{} already has a {}.",
            ctx.patient.name,
            ctx.anatomy.organ_name(organ.organ)
        )));
    }
    Ok(())
}

pub(super) fn complete_extraction(world: &mut World, op: &Operation) -> Result<Completion> {
    let organ = target_organ(op)?;
    let anatomy = anatomy_of(world, op)?;
    let organ_name = anatomy.organ_name(organ).to_string();

    let patient = world.expect_character_mut(op.patient)?;
    if !patient.body.remove_organ(organ) {
        return Ok(Completion::no_effect());
    }
    let patient_name = patient.name.clone();

    let item = world.create_item(Item::new(
        format!("a {}", organ_name),
        ItemKind::Organ(OrganItem {
            prototype: anatomy.id,
            organ,
            decay: DecayState::Fresh,
        }),
    ));
    let surgeon_name = world.character_name(op.surgeon);
    let text = if world.give_or_drop(op.surgeon, item)? {
        format!("{} lifts {}'s {} free.", surgeon_name, patient_name, organ_name)
    } else {
        format!("{}'s {} slips free and falls to the floor.", patient_name, organ_name)
    };
    narrate_at_surgeon(world, op, text)?;

    check_vital_loss(world, op, &anatomy)?;
    Ok(Completion::applied())
}

/// A decayed organ is narrated as non-viable and nothing changes
pub(super) fn complete_transplant(world: &mut World, op: &Operation) -> Result<Completion> {
    let item_id = target_item(op)?;
    let organ = target_organ(op)?;
    let name = item_name(world, item_id);

    let decay = world.items.get(item_id).and_then(|i| i.decay());
    let Some(decay) = decay else {
        narrate_at_surgeon(world, op, format!("{} is no longer there to transplant.", name))?;
        return Ok(Completion::no_effect());
    };

    if decay > world.config.max_transplant_decay {
        tracing::debug!("Transplant of {} failed: organ is {}", name, decay.describe());
        narrate_at_surgeon(
            world,
            op,
            format!("{} is too {} to be viable, and will not take.", name, decay.describe()),
        )?;
        return Ok(Completion::no_effect());
    }

    consume_from_surgeon(world, op, item_id)?;
    let patient = world.expect_character_mut(op.patient)?;
    patient.body.restore_organ(organ);
    let text = format!("{} settles into place inside {}.", name, patient.name);
    narrate_at_surgeon(world, op, text)?;
    Ok(Completion::applied())
}

pub(super) fn complete_stabilisation(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let organ = target_organ(op)?;
    let anatomy = anatomy_of(world, op)?;
    let bonus = outcome.successes() as f64 * world.config.stabilisation_per_degree;

    let patient = world.expect_character_mut(op.patient)?;
    let text = if bonus > 0.0 {
        patient.body.stabilise_organ(organ, bonus);
        format!("{}'s {} is functioning more steadily.", patient.name, anatomy.organ_name(organ))
    } else {
        format!("{}'s {} is no steadier than before.", patient.name, anatomy.organ_name(organ))
    };
    narrate_at_surgeon(world, op, text)?;
    Ok(Completion::applied())
}
