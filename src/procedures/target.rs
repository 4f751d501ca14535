//! Target resolution
//!
//! Turns the raw tokens a surgeon typed into a permitted bodypart, organ,
//! bone or item. Resolution is pure: the feasibility query and the execution
//! path call the same function and get the same answer for the same body
//! state.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::anatomy::BodypartProto;
use crate::core::types::{BodypartId, BoneId, InternalPart, ItemId, OrganId};
use crate::items::{ItemCapability, ItemKind};
use crate::procedures::rejection::Rejection;
use crate::procedures::ProcedureContext;

/// Named target arguments.
///
/// An organ or bone given without a bodypart is the shorthand form: the entry
/// bodypart is picked automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureArgs {
    pub bodypart: Option<String>,
    pub organ: Option<String>,
    pub bone: Option<String>,
    /// Held item (cannula, implant, organ, severed part) or installed device
    pub item: Option<String>,
    /// Free-form setting: "on"/"off" for power, an implant keyword or "none" for interfaces
    pub setting: Option<String>,
}

impl ProcedureArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bodypart(mut self, token: impl Into<String>) -> Self {
        self.bodypart = Some(token.into());
        self
    }

    pub fn with_organ(mut self, token: impl Into<String>) -> Self {
        self.organ = Some(token.into());
        self
    }

    pub fn with_bone(mut self, token: impl Into<String>) -> Self {
        self.bone = Some(token.into());
        self
    }

    pub fn with_item(mut self, token: impl Into<String>) -> Self {
        self.item = Some(token.into());
        self
    }

    pub fn with_setting(mut self, token: impl Into<String>) -> Self {
        self.setting = Some(token.into());
        self
    }
}

/// What a procedure kind aims at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// The patient as a whole
    Patient,
    Bodypart,
    OrganViaBodypart,
    BoneViaBodypart,
    /// A held item going into a named bodypart
    HeldItemIntoBodypart(ItemCapability),
    /// A held organ going back where it belongs
    HeldOrgan,
    /// A held severed part going back onto its stump
    HeldSeveredPart,
    /// A device already installed in a bodypart
    InstalledImplant,
    /// A cannula already in a bodypart
    InstalledCannula,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RestrictionMode {
    /// Listed targets are forbidden
    #[default]
    Blacklist,
    /// Only listed targets are allowed
    Whitelist,
}

/// Which targets a procedure may touch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetRestriction {
    pub mode: RestrictionMode,
    pub bodyparts: Vec<BodypartId>,
    pub internals: Vec<InternalPart>,
    /// Exact pair that is always allowed; also used when no organ/bone is named
    pub fixed: Option<(BodypartId, InternalPart)>,
}

impl TargetRestriction {
    pub fn whitelist() -> Self {
        Self {
            mode: RestrictionMode::Whitelist,
            ..Self::default()
        }
    }

    pub fn blacklist() -> Self {
        Self::default()
    }

    pub fn with_bodypart(mut self, part: BodypartId) -> Self {
        self.bodyparts.push(part);
        self
    }

    pub fn with_internal(mut self, internal: InternalPart) -> Self {
        self.internals.push(internal);
        self
    }

    pub fn with_fixed(mut self, part: BodypartId, internal: InternalPart) -> Self {
        self.fixed = Some((part, internal));
        self
    }

    pub fn permits_bodypart(&self, part: BodypartId) -> bool {
        let listed = self.bodyparts.contains(&part);
        match self.mode {
            RestrictionMode::Whitelist => listed,
            RestrictionMode::Blacklist => !listed,
        }
    }

    /// Bodypart an organ or bone is reached through. An allow-list that names
    /// no bodyparts only restricts the organ or bone.
    pub fn permits_entry(&self, part: BodypartId) -> bool {
        if self.mode == RestrictionMode::Whitelist && self.bodyparts.is_empty() {
            return true;
        }
        self.permits_bodypart(part)
    }

    pub fn permits_internal(&self, part: BodypartId, internal: InternalPart) -> bool {
        if self.fixed == Some((part, internal)) {
            return true;
        }
        let listed = self.internals.contains(&internal);
        match self.mode {
            RestrictionMode::Whitelist => listed,
            RestrictionMode::Blacklist => !listed,
        }
    }
}

/// A permitted target. Refers into the body model; owns nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub bodypart: Option<BodypartId>,
    pub internal: Option<InternalPart>,
    pub item: Option<ItemId>,
    pub setting: Option<String>,
}

impl ResolvedTarget {
    pub fn organ(&self) -> Option<OrganId> {
        match self.internal {
            Some(InternalPart::Organ(organ)) => Some(organ),
            _ => None,
        }
    }

    pub fn bone(&self) -> Option<BoneId> {
        match self.internal {
            Some(InternalPart::Bone(bone)) => Some(bone),
            _ => None,
        }
    }
}

pub fn resolve_target(
    ctx: &ProcedureContext,
    target_kind: TargetKind,
    args: &ProcedureArgs,
) -> Result<ResolvedTarget, Rejection> {
    let mut target = ResolvedTarget {
        setting: args.setting.clone(),
        ..ResolvedTarget::default()
    };

    match target_kind {
        TargetKind::Patient => {}
        TargetKind::Bodypart => {
            target.bodypart = Some(resolve_bodypart(ctx, args.bodypart.as_deref())?);
        }
        TargetKind::OrganViaBodypart | TargetKind::BoneViaBodypart => {
            let (part, internal) = resolve_via_bodypart(ctx, target_kind, args)?;
            target.bodypart = Some(part);
            target.internal = Some(internal);
        }
        TargetKind::HeldItemIntoBodypart(capability) => {
            target.item = Some(held_item(ctx, capability, args.item.as_deref())?);
            target.bodypart = Some(resolve_bodypart(ctx, args.bodypart.as_deref())?);
        }
        TargetKind::HeldOrgan => {
            let item = held_item(ctx, ItemCapability::Organ, args.item.as_deref())?;
            let organ = match ctx.world.items.get(item).map(|i| &i.kind) {
                Some(ItemKind::Organ(organ)) => organ.organ,
                _ => return Err(Rejection::NotHolding(ItemCapability::Organ.describe())),
            };
            let internal = InternalPart::Organ(organ);
            let part = match args.bodypart.as_deref() {
                Some(token) => {
                    let part = attached_bodypart(ctx, token)?;
                    ensure_reachable(ctx, part, internal)?;
                    part
                }
                None => entry_bodypart(ctx, internal)?,
            };
            ensure_internal_permitted(ctx, part, internal)?;
            target.item = Some(item);
            target.bodypart = Some(part);
            target.internal = Some(internal);
        }
        TargetKind::HeldSeveredPart => {
            let item = held_item(ctx, ItemCapability::SeveredBodypart, args.item.as_deref())?;
            let root = match ctx.world.items.get(item).map(|i| &i.kind) {
                Some(ItemKind::SeveredBodypart(severed)) => severed.severed.root,
                _ => return Err(Rejection::NotHolding(ItemCapability::SeveredBodypart.describe())),
            };
            if !ctx.procedure.restriction.permits_bodypart(root) {
                return Err(Rejection::NotPermitted(ctx.anatomy.bodypart_name(root).into()));
            }
            target.item = Some(item);
            target.bodypart = Some(root);
        }
        TargetKind::InstalledImplant => {
            let part = resolve_bodypart(ctx, args.bodypart.as_deref())?;
            target.item = Some(installed_implant(ctx, part, args.item.as_deref())?);
            target.bodypart = Some(part);
        }
        TargetKind::InstalledCannula => {
            let part = resolve_bodypart(ctx, args.bodypart.as_deref())?;
            target.item = Some(installed_cannula(ctx, part, args.item.as_deref())?);
            target.bodypart = Some(part);
        }
    }

    Ok(target)
}

fn attached_bodypart(ctx: &ProcedureContext, token: &str) -> Result<BodypartId, Rejection> {
    let (part, _) = ctx
        .anatomy
        .find_bodypart(token)
        .ok_or_else(|| Rejection::NoSuchTarget {
            patient: ctx.patient.name.clone(),
            what: "bodypart",
            token: token.to_string(),
        })?;
    if !ctx.patient.body.has_bodypart(part) {
        return Err(Rejection::MissingBodypart {
            patient: ctx.patient.name.clone(),
            part: ctx.anatomy.bodypart_name(part).into(),
        });
    }
    Ok(part)
}

fn resolve_bodypart(ctx: &ProcedureContext, token: Option<&str>) -> Result<BodypartId, Rejection> {
    let token = token.ok_or(Rejection::MissingArgument("bodypart"))?;
    let part = attached_bodypart(ctx, token)?;
    if !ctx.procedure.restriction.permits_bodypart(part) {
        return Err(Rejection::NotPermitted(ctx.anatomy.bodypart_name(part).into()));
    }
    Ok(part)
}

fn resolve_via_bodypart(
    ctx: &ProcedureContext,
    target_kind: TargetKind,
    args: &ProcedureArgs,
) -> Result<(BodypartId, InternalPart), Rejection> {
    let (what, token) = match target_kind {
        TargetKind::BoneViaBodypart => ("bone", args.bone.as_deref()),
        _ => ("organ", args.organ.as_deref()),
    };

    let Some(token) = token else {
        // Fixed-target lock: no organ or bone named, use the configured pair
        return match ctx.procedure.restriction.fixed {
            Some((part, internal)) if ctx.patient.body.has_bodypart(part) => Ok((part, internal)),
            Some((part, _)) => Err(Rejection::MissingBodypart {
                patient: ctx.patient.name.clone(),
                part: ctx.anatomy.bodypart_name(part).into(),
            }),
            None => Err(Rejection::MissingArgument(what)),
        };
    };

    let internal = match target_kind {
        TargetKind::BoneViaBodypart => ctx.anatomy.find_bone(token).map(|(id, _)| InternalPart::Bone(id)),
        _ => ctx.anatomy.find_organ(token).map(|(id, _)| InternalPart::Organ(id)),
    }
    .ok_or_else(|| Rejection::NoSuchTarget {
        patient: ctx.patient.name.clone(),
        what,
        token: token.to_string(),
    })?;

    let part = match args.bodypart.as_deref() {
        Some(part_token) => {
            let part = attached_bodypart(ctx, part_token)?;
            ensure_reachable(ctx, part, internal)?;
            part
        }
        None => entry_bodypart(ctx, internal)?,
    };

    ensure_internal_permitted(ctx, part, internal)?;
    Ok((part, internal))
}

fn internal_name<'a>(ctx: &'a ProcedureContext, internal: InternalPart) -> &'a str {
    match internal {
        InternalPart::Organ(organ) => ctx.anatomy.organ_name(organ),
        InternalPart::Bone(bone) => ctx.anatomy.bone_name(bone),
    }
}

fn ensure_reachable(ctx: &ProcedureContext, part: BodypartId, internal: InternalPart) -> Result<(), Rejection> {
    let contains = match internal {
        InternalPart::Organ(organ) => ctx.anatomy.part_contains_organ(part, organ),
        InternalPart::Bone(bone) => ctx.anatomy.part_contains_bone(part, bone),
    };
    if contains {
        Ok(())
    } else {
        Err(Rejection::NotReachable {
            internal: internal_name(ctx, internal).into(),
            part: ctx.anatomy.bodypart_name(part).into(),
        })
    }
}

fn ensure_internal_permitted(
    ctx: &ProcedureContext,
    part: BodypartId,
    internal: InternalPart,
) -> Result<(), Rejection> {
    let restriction = &ctx.procedure.restriction;
    if restriction.fixed == Some((part, internal)) {
        return Ok(());
    }
    if !restriction.permits_internal(part, internal) {
        return Err(Rejection::NotPermitted(internal_name(ctx, internal).into()));
    }
    if !restriction.permits_entry(part) {
        return Err(Rejection::NotPermitted(ctx.anatomy.bodypart_name(part).into()));
    }
    Ok(())
}

/// Pick the attached bodypart to go in through: permitted entries first, then
/// front-facing, then the one where the organ or bone is most exposed.
fn entry_bodypart(ctx: &ProcedureContext, internal: InternalPart) -> Result<BodypartId, Rejection> {
    let restriction = &ctx.procedure.restriction;
    let candidates: Vec<(&BodypartProto, f64)> = match internal {
        InternalPart::Organ(organ) => ctx.anatomy.parts_containing_organ(organ).collect(),
        InternalPart::Bone(bone) => ctx.anatomy.parts_containing_bone(bone).map(|p| (p, 1.0)).collect(),
    };

    candidates
        .into_iter()
        .filter(|(part, _)| ctx.patient.body.has_bodypart(part.id))
        .max_by_key(|(part, chance)| {
            (
                restriction.permits_entry(part.id),
                part.alignment.is_front(),
                !part.alignment.is_rear(),
                OrderedFloat(chance * part.relative_hit_chance),
            )
        })
        .map(|(part, _)| part.id)
        .ok_or_else(|| Rejection::Unreachable {
            patient: ctx.patient.name.clone(),
            internal: internal_name(ctx, internal).into(),
        })
}

fn held_item(
    ctx: &ProcedureContext,
    capability: ItemCapability,
    token: Option<&str>,
) -> Result<ItemId, Rejection> {
    ctx.surgeon
        .inventory
        .held()
        .iter()
        .copied()
        .find(|id| {
            ctx.world.items.get(*id).map_or(false, |item| {
                item.has_capability(capability) && token.map_or(true, |t| item.matches_keyword(t))
            })
        })
        .ok_or(Rejection::NotHolding(capability.describe()))
}

fn keyword_matches(ctx: &ProcedureContext, item: ItemId, token: Option<&str>) -> bool {
    match token {
        None => true,
        Some(token) => ctx
            .world
            .items
            .get(item)
            .map_or(false, |item| item.matches_keyword(token)),
    }
}

fn installed_implant(ctx: &ProcedureContext, part: BodypartId, token: Option<&str>) -> Result<ItemId, Rejection> {
    ctx.patient
        .body
        .implants_in(part)
        .map(|installed| installed.item)
        .find(|item| keyword_matches(ctx, *item, token))
        .ok_or_else(|| Rejection::NothingInstalled {
            patient: ctx.patient.name.clone(),
            what: "implant",
            part: ctx.anatomy.bodypart_name(part).into(),
        })
}

fn installed_cannula(ctx: &ProcedureContext, part: BodypartId, token: Option<&str>) -> Result<ItemId, Rejection> {
    ctx.patient
        .body
        .cannulas()
        .iter()
        .filter(|c| c.bodypart == part)
        .map(|c| c.item)
        .find(|item| keyword_matches(ctx, *item, token))
        .ok_or_else(|| Rejection::NothingInstalled {
            patient: ctx.patient.name.clone(),
            what: "cannula",
            part: ctx.anatomy.bodypart_name(part).into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anatomy::BodyPrototype;
    use crate::core::types::{BodyPrototypeId, CharacterId, LocationId, ProcedureId};
    use crate::entity::Character;
    use crate::items::{CannulaSpec, Item};
    use crate::procedures::{Procedure, ProcedureKind};
    use crate::world::World;

    struct Fixture {
        world: World,
        surgeon: CharacterId,
        patient: CharacterId,
    }

    fn fixture() -> Fixture {
        let mut world = World::default();
        let proto = world.add_prototype(BodyPrototype::humanoid(BodyPrototypeId(1)));
        let surgeon = world.spawn(Character::new("Ada", proto, LocationId(1)));
        let patient = world.spawn(Character::new("Bob", proto, LocationId(1)));
        Fixture { world, surgeon, patient }
    }

    fn resolve(fx: &Fixture, procedure: &Procedure, args: &ProcedureArgs) -> Result<ResolvedTarget, Rejection> {
        let ctx = ProcedureContext::new(&fx.world, procedure, fx.surgeon, fx.patient)?;
        resolve_target(&ctx, procedure.kind.target_kind(), args)
    }

    fn procedure(kind: ProcedureKind) -> Procedure {
        Procedure::new(ProcedureId(1), "test", kind, BodyPrototypeId(1))
    }

    #[test]
    fn test_bodypart_lookup_by_name_prefix_and_id() {
        let fx = fixture();
        let amputate = procedure(ProcedureKind::Amputation);
        let by_name = resolve(&fx, &amputate, &ProcedureArgs::new().with_bodypart("left forearm")).unwrap();
        let proto = fx.world.prototype(BodyPrototypeId(1)).unwrap();
        let (forearm, _) = proto.find_bodypart("left forearm").unwrap();
        assert_eq!(by_name.bodypart, Some(forearm));

        let by_id = resolve(&fx, &amputate, &ProcedureArgs::new().with_bodypart(forearm.0.to_string())).unwrap();
        assert_eq!(by_id.bodypart, Some(forearm));
    }

    #[test]
    fn test_unknown_and_forbidden_parts_explain_differently() {
        let fx = fixture();
        let proto = fx.world.prototype(BodyPrototypeId(1)).unwrap();
        let (head, _) = proto.find_bodypart("head").unwrap();
        let mut amputate = procedure(ProcedureKind::Amputation);
        amputate.restriction = TargetRestriction::blacklist().with_bodypart(head);

        let unknown = resolve(&fx, &amputate, &ProcedureArgs::new().with_bodypart("tail")).unwrap_err();
        assert!(matches!(unknown, Rejection::NoSuchTarget { .. }));

        let forbidden = resolve(&fx, &amputate, &ProcedureArgs::new().with_bodypart("head")).unwrap_err();
        assert_eq!(forbidden, Rejection::NotPermitted("head".into()));
    }

    #[test]
    fn test_organ_shorthand_prefers_front_entry() {
        let fx = fixture();
        let extract = procedure(ProcedureKind::OrganExtraction);
        let target = resolve(&fx, &extract, &ProcedureArgs::new().with_organ("heart")).unwrap();
        let proto = fx.world.prototype(BodyPrototypeId(1)).unwrap();
        let (chest, _) = proto.find_bodypart("chest").unwrap();
        assert_eq!(target.bodypart, Some(chest));
    }

    #[test]
    fn test_organ_through_wrong_bodypart() {
        let fx = fixture();
        let extract = procedure(ProcedureKind::OrganExtraction);
        let args = ProcedureArgs::new().with_organ("heart").with_bodypart("left thigh");
        let rejection = resolve(&fx, &extract, &args).unwrap_err();
        assert!(matches!(rejection, Rejection::NotReachable { .. }));
    }

    #[test]
    fn test_fixed_target_bypasses_whitelist() {
        let fx = fixture();
        let proto = fx.world.prototype(BodyPrototypeId(1)).unwrap();
        let (chest, _) = proto.find_bodypart("chest").unwrap();
        let (heart, _) = proto.find_organ("heart").unwrap();
        let mut extract = procedure(ProcedureKind::OrganExtraction);
        extract.restriction = TargetRestriction::whitelist().with_fixed(chest, InternalPart::Organ(heart));

        let locked = resolve(&fx, &extract, &ProcedureArgs::new()).unwrap();
        assert_eq!(locked.organ(), Some(heart));

        let named = resolve(&fx, &extract, &ProcedureArgs::new().with_organ("heart").with_bodypart("chest"));
        assert!(named.is_ok());

        let other = resolve(&fx, &extract, &ProcedureArgs::new().with_organ("liver")).unwrap_err();
        assert_eq!(other, Rejection::NotPermitted("liver".into()));
    }

    #[test]
    fn test_entry_bodypart_obeys_bodypart_list() {
        let fx = fixture();
        let proto = fx.world.prototype(BodyPrototypeId(1)).unwrap();
        let (chest, _) = proto.find_bodypart("chest").unwrap();
        let (back, _) = proto.find_bodypart("upper back").unwrap();
        let mut extract = procedure(ProcedureKind::OrganExtraction);
        extract.restriction = TargetRestriction::blacklist().with_bodypart(chest);

        let through_chest = ProcedureArgs::new().with_organ("heart").with_bodypart("chest");
        assert_eq!(
            resolve(&fx, &extract, &through_chest).unwrap_err(),
            Rejection::NotPermitted("chest".into())
        );

        // Shorthand routes around the forbidden entry
        let shorthand = resolve(&fx, &extract, &ProcedureArgs::new().with_organ("heart")).unwrap();
        assert_eq!(shorthand.bodypart, Some(back));
    }

    #[test]
    fn test_whitelist_checks_organ_before_entry() {
        let fx = fixture();
        let proto = fx.world.prototype(BodyPrototypeId(1)).unwrap();
        let (back, _) = proto.find_bodypart("upper back").unwrap();
        let (heart, _) = proto.find_organ("heart").unwrap();
        let mut extract = procedure(ProcedureKind::OrganExtraction);
        extract.restriction = TargetRestriction::whitelist()
            .with_bodypart(back)
            .with_internal(InternalPart::Organ(heart));

        let target = resolve(&fx, &extract, &ProcedureArgs::new().with_organ("heart")).unwrap();
        assert_eq!(target.bodypart, Some(back));

        let through_chest = ProcedureArgs::new().with_organ("heart").with_bodypart("chest");
        assert_eq!(
            resolve(&fx, &extract, &through_chest).unwrap_err(),
            Rejection::NotPermitted("chest".into())
        );

        let lung = ProcedureArgs::new().with_organ("left lung").with_bodypart("upper back");
        assert_eq!(
            resolve(&fx, &extract, &lung).unwrap_err(),
            Rejection::NotPermitted("left lung".into())
        );
    }

    #[test]
    fn test_held_item_capability() {
        let mut fx = fixture();
        let cannulate = procedure(ProcedureKind::Cannulation);
        let args = ProcedureArgs::new().with_bodypart("left forearm");
        assert_eq!(
            resolve(&fx, &cannulate, &args).unwrap_err(),
            Rejection::NotHolding("cannula")
        );

        let cannula = fx.world.create_item(Item::new(
            "a plastic cannula",
            ItemKind::Cannula(CannulaSpec { fits: vec![] }),
        ));
        fx.world.character_mut(fx.surgeon).unwrap().inventory.hold(cannula);
        let target = resolve(&fx, &cannulate, &args).unwrap();
        assert_eq!(target.item, Some(cannula));
    }
}
