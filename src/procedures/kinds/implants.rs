//! Implant installation, removal and configuration
//!
//! All four work through an existing open surgical wound. Installation checks
//! the device was made for this anatomy, fits the chosen part and has room.

use super::{item_name, narrate_at_surgeon, target_item, Completion};
use crate::check::Outcome;
use crate::core::error::Result;
use crate::core::types::{BodypartId, ItemId};
use crate::entity::{Character, InstalledImplant};
use crate::items::ItemStore;
use crate::procedures::rejection::Rejection;
use crate::procedures::target::ResolvedTarget;
use crate::procedures::{Operation, ProcedureContext};
use crate::world::World;

/// "on"/"off" and friends
pub fn parse_power_setting(setting: &str) -> Option<bool> {
    match setting.trim().to_lowercase().as_str() {
        "on" | "enable" | "enabled" | "up" => Some(true),
        "off" | "disable" | "disabled" | "down" => Some(false),
        _ => None,
    }
}

/// Space already taken by devices in a part
fn space_used(patient: &Character, items: &ItemStore, part: BodypartId) -> f64 {
    patient
        .body
        .implants_in(part)
        .filter_map(|installed| items.get(installed.item))
        .filter_map(|item| item.implant())
        .map(|spec| spec.space)
        .sum()
}

pub(super) fn validate_install(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let (Some(part), Some(item)) = (target.bodypart, target.item.and_then(|i| ctx.world.items.get(i))) else {
        return Ok(());
    };
    let Some(spec) = item.implant() else {
        return Ok(());
    };
    let patient = &ctx.patient.name;
    let part_name = ctx.anatomy.bodypart_name(part);

    if spec.target_prototype != ctx.patient.body.prototype {
        return Err(Rejection::Variant(format!(
            "{} is not designed for {}'s anatomy.",
            item.name, patient
        )));
    }
    if !spec.target_parts.is_empty() && !spec.target_parts.contains(&part) {
        return Err(Rejection::Variant(format!(
            "{} cannot be installed in the {}.",
            item.name, part_name
        )));
    }
    if let Some(organ) = spec.target_organ {
        if !ctx.anatomy.part_contains_organ(part, organ) || !ctx.patient.body.has_organ(&ctx.anatomy, organ) {
            return Err(Rejection::Variant(format!(
                "{} must be attached to a {}, and {}'s {} has none.",
                item.name,
                ctx.anatomy.organ_name(organ),
                patient,
                part_name
            )));
        }
    }

    let available = ctx.anatomy.bodypart(part).map_or(0.0, |p| p.implant_space);
    if space_used(ctx.patient, &ctx.world.items, part) + spec.space > available {
        return Err(Rejection::Variant(format!(
            "There is not enough room in {}'s {} for {}.",
            patient, part_name, item.name
        )));
    }
    Ok(())
}

pub(super) fn validate_power(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let Some(item) = target.item.and_then(|i| ctx.world.items.get(i)) else {
        return Ok(());
    };
    if item.implant().and_then(|spec| spec.powered).is_none() {
        return Err(Rejection::Variant(format!("{} has no power controls.", item.name)));
    }
    if target.setting.as_deref().and_then(parse_power_setting).is_none() {
        return Err(Rejection::Variant(format!(
            "You must specify whether to switch {} on or off.",
            item.name
        )));
    }
    Ok(())
}

/// Installed, interface-capable implant matching a keyword
fn find_interface(world: &World, patient: &Character, exclude: ItemId, token: &str) -> Option<ItemId> {
    patient
        .body
        .implants()
        .iter()
        .map(|installed| installed.item)
        .filter(|id| *id != exclude)
        .find(|id| {
            world.items.get(*id).map_or(false, |item| {
                item.matches_keyword(token) && item.implant().map_or(false, |spec| spec.interface_capable)
            })
        })
}

fn is_clear_setting(setting: &str) -> bool {
    matches!(setting.trim().to_lowercase().as_str(), "none" | "clear" | "unlink")
}

pub(super) fn validate_interface(ctx: &ProcedureContext, target: &ResolvedTarget) -> std::result::Result<(), Rejection> {
    let Some(item) = target.item else {
        return Ok(());
    };
    let Some(setting) = target.setting.as_deref() else {
        return Err(Rejection::MissingArgument("interface"));
    };
    if is_clear_setting(setting) {
        return Ok(());
    }
    if find_interface(ctx.world, ctx.patient, item, setting).is_none() {
        return Err(Rejection::Variant(format!(
            "{} has no interface-capable implant matching '{}'.",
            ctx.patient.name, setting
        )));
    }
    Ok(())
}

pub(super) fn complete_install(world: &mut World, op: &Operation) -> Result<Completion> {
    let part = op.bodypart()?;
    let item = target_item(op)?;
    let name = item_name(world, item);
    let organ = world
        .items
        .get(item)
        .and_then(|i| i.implant())
        .and_then(|spec| spec.target_organ);

    world.expect_character_mut(op.surgeon)?.inventory.remove(item);
    let patient = world.expect_character_mut(op.patient)?;
    patient.body.install_implant(InstalledImplant {
        item,
        bodypart: part,
        organ,
    });
    let text = format!("{} is now installed in {}.", name, patient.name);
    narrate_at_surgeon(world, op, text)?;
    Ok(Completion::applied())
}

/// Removal also breaks every interface link to or from the device
pub(super) fn complete_remove(world: &mut World, op: &Operation) -> Result<Completion> {
    let item = target_item(op)?;
    let name = item_name(world, item);

    let patient = world.expect_character_mut(op.patient)?;
    if patient.body.remove_implant(item).is_none() {
        return Ok(Completion::no_effect());
    }
    let remaining: Vec<ItemId> = patient.body.implants().iter().map(|i| i.item).collect();
    let text = format!("{} is drawn out of {}.", name, patient.name);

    for other in remaining {
        if let Some(spec) = world.items.get_mut(other).and_then(|i| i.implant_mut()) {
            if spec.linked_interface == Some(item) {
                spec.linked_interface = None;
            }
        }
    }
    if let Some(spec) = world.items.get_mut(item).and_then(|i| i.implant_mut()) {
        spec.linked_interface = None;
    }

    narrate_at_surgeon(world, op, text)?;
    if !world.give_or_drop(op.surgeon, item)? {
        narrate_at_surgeon(world, op, format!("{} drops to the floor.", name))?;
    }
    Ok(Completion::applied())
}

pub(super) fn complete_power(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let item = target_item(op)?;
    let name = item_name(world, item);
    let setting = op.target.setting.as_deref().and_then(parse_power_setting);

    let text = match (outcome.is_pass(), setting) {
        (true, Some(on)) => {
            if let Some(spec) = world.items.get_mut(item).and_then(|i| i.implant_mut()) {
                spec.powered = Some(on);
            }
            format!("{} is now switched {}.", name, if on { "on" } else { "off" })
        }
        _ => format!("The controls of {} do not respond.", name),
    };
    narrate_at_surgeon(world, op, text)?;
    Ok(Completion::applied())
}

pub(super) fn complete_interface(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let item = target_item(op)?;
    let name = item_name(world, item);
    let setting = op.target.setting.clone().unwrap_or_default();

    if !outcome.is_pass() {
        narrate_at_surgeon(world, op, format!("{} refuses to take the new configuration.", name))?;
        return Ok(Completion::applied());
    }

    let link = if is_clear_setting(&setting) {
        None
    } else {
        let patient = world.expect_character(op.patient)?;
        find_interface(world, patient, item, &setting)
    };
    let link_name = link.map(|l| item_name(world, l));

    if let Some(spec) = world.items.get_mut(item).and_then(|i| i.implant_mut()) {
        spec.linked_interface = link;
    }
    let text = match link_name {
        Some(other) => format!("{} is now linked to {}.", name, other),
        None => format!("{} is no longer linked to any interface.", name),
    };
    narrate_at_surgeon(world, op, text)?;
    Ok(Completion::applied())
}
