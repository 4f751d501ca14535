//! Replantation: reattach a severed part onto its stump

use super::{anatomy_of, consume_from_surgeon, item_name, narrate_at_surgeon, target_item, Completion};
use crate::core::error::Result;
use crate::items::ItemKind;
use crate::procedures::rejection::Rejection;
use crate::procedures::target::ResolvedTarget;
use crate::procedures::{Operation, ProcedureContext};
use crate::world::World;

pub(super) fn validate(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let Some(item) = target.item.and_then(|i| ctx.world.items.get(i)) else {
        return Ok(());
    };
    let ItemKind::SeveredBodypart(severed) = &item.kind else {
        return Ok(());
    };

    if severed.prototype != ctx.patient.body.prototype {
        return Err(Rejection::Variant(format!(
            "{} is not compatible with {}'s anatomy.",
            item.name, ctx.patient.name
        )));
    }

    let root = severed.severed.root;
    let root_name = ctx.anatomy.bodypart_name(root);
    if ctx.patient.body.has_bodypart(root) {
        return Err(Rejection::Variant(format!(
            "{} already has a {}.",
            ctx.patient.name, root_name
        )));
    }

    let stump_attached = ctx
        .anatomy
        .bodypart(root)
        .and_then(|p| p.upstream)
        .map_or(true, |upstream| ctx.patient.body.has_bodypart(upstream));
    if !stump_attached {
        return Err(Rejection::Variant(format!(
            "There is nothing on {} to attach the {} to.",
            ctx.patient.name, root_name
        )));
    }
    Ok(())
}

pub(super) fn complete(world: &mut World, op: &Operation) -> Result<Completion> {
    let item_id = target_item(op)?;
    let name = item_name(world, item_id);
    let Some(ItemKind::SeveredBodypart(severed)) = world.items.get(item_id).map(|i| i.kind.clone()) else {
        narrate_at_surgeon(world, op, format!("{} is no longer there to reattach.", name))?;
        return Ok(Completion::no_effect());
    };

    if severed.decay > world.config.max_replant_decay {
        narrate_at_surgeon(
            world,
            op,
            format!("{} is too {} to take.", name, severed.decay.describe()),
        )?;
        return Ok(Completion::no_effect());
    }

    let anatomy = anatomy_of(world, op)?;
    consume_from_surgeon(world, op, item_id)?;
    let patient = world.expect_character_mut(op.patient)?;
    patient.body.restore(&severed.severed);
    let text = format!(
        "{}'s {} is reattached.",
        patient.name,
        anatomy.bodypart_name(severed.severed.root)
    );
    narrate_at_surgeon(world, op, text)?;
    Ok(Completion::applied())
}
