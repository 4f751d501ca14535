//! Cannulation and decannulation

use super::{item_name, narrate_at_surgeon, target_item, Completion};
use crate::check::Outcome;
use crate::core::error::Result;
use crate::entity::{DamageType, InstalledCannula, Wound, WoundSeverity};
use crate::items::ItemKind;
use crate::procedures::rejection::Rejection;
use crate::procedures::target::ResolvedTarget;
use crate::procedures::{Operation, ProcedureContext};
use crate::world::World;

pub(super) fn validate_insert(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let (Some(part), Some(item)) = (target.bodypart, target.item.and_then(|i| ctx.world.items.get(i))) else {
        return Ok(());
    };
    let part_name = ctx.anatomy.bodypart_name(part);

    if let ItemKind::Cannula(spec) = &item.kind {
        if !spec.fits.is_empty() && !spec.fits.iter().any(|f| f.eq_ignore_ascii_case(part_name)) {
            return Err(Rejection::Variant(format!(
                "{} will not fit {}'s {}.",
                item.name, ctx.patient.name, part_name
            )));
        }
    }

    if ctx.patient.body.cannulas().iter().any(|c| c.bodypart == part) {
        return Err(Rejection::Variant(format!(
            "{} already has a cannula in their {}.",
            ctx.patient.name, part_name
        )));
    }
    Ok(())
}

/// A fumbled insertion still seats the cannula, at the cost of a puncture
pub(super) fn complete_insert(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let part = op.bodypart()?;
    let item = target_item(op)?;
    let name = item_name(world, item);
    let tick = world.current_tick;

    world.expect_character_mut(op.surgeon)?.inventory.remove(item);
    let patient = world.expect_character_mut(op.patient)?;
    patient.body.insert_cannula(InstalledCannula { item, bodypart: part });
    if outcome.failures() > 0 {
        let severity = WoundSeverity::Minor.shift(outcome.failures() - 1);
        patient
            .body
            .add_wound(Wound::new(part, DamageType::Piercing, severity, tick));
    }
    let text = format!("{} is now seated in {}.", name, patient.name);
    narrate_at_surgeon(world, op, text)?;
    Ok(Completion::applied())
}

pub(super) fn complete_remove(world: &mut World, op: &Operation) -> Result<Completion> {
    let item = target_item(op)?;
    let name = item_name(world, item);

    let patient = world.expect_character_mut(op.patient)?;
    if patient.body.remove_cannula(item).is_none() {
        return Ok(Completion::no_effect());
    }
    let text = format!("{} is drawn out of {}.", name, patient.name);
    narrate_at_surgeon(world, op, text)?;
    if !world.give_or_drop(op.surgeon, item)? {
        narrate_at_surgeon(world, op, format!("{} drops to the floor.", name))?;
    }
    Ok(Completion::applied())
}

