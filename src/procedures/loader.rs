//! Procedure definitions from TOML
//!
//! ```toml
//! [[procedure]]
//! name = "amputate"
//! kind = "amputation"
//! body = "humanoid"
//! knowledge = "Surgery"
//! difficulty = "hard"
//!
//! [procedure.restriction]
//! mode = "blacklist"
//! bodyparts = ["head", "neck"]
//!
//! [[procedure.phase]]
//! duration = 2
//! emote = "$0 saws through $1's $3."
//! tools = [{ tag = "saw", action = "wield" }]
//! actions = ["attached"]
//! ```
//!
//! Anatomy names are resolved against the named body prototype at load time.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::anatomy::BodyPrototype;
use crate::check::{Difficulty, TraitId};
use crate::core::error::{ProcedureError, Result};
use crate::core::types::{BodypartId, InternalPart, ProcedureId, Tick};
use crate::items::{InventoryPlan, PlanAction, PlanRequirement};
use crate::procedures::hooks::ProcedureHooks;
use crate::procedures::kinds::ProcedureKind;
use crate::procedures::phase::{Phase, PhaseSpecial};
use crate::procedures::target::{RestrictionMode, TargetRestriction};
use crate::procedures::{Procedure, VariantFlags};
use crate::world::World;

#[derive(Debug, Clone, Deserialize)]
struct TomlProcedures {
    #[serde(default, rename = "procedure")]
    procedures: Vec<ProcedureRecord>,
}

/// One `[[procedure]]` table as written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureRecord {
    pub name: String,
    pub kind: String,
    /// Body prototype name
    pub body: String,
    #[serde(default)]
    pub gerund: Option<String>,
    #[serde(default)]
    pub knowledge: Option<String>,
    #[serde(default)]
    pub check_trait: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub start_emote: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub hooks: ProcedureHooks,
    #[serde(default)]
    pub restriction: Option<RestrictionRecord>,
    #[serde(default, rename = "phase")]
    pub phases: Vec<PhaseRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestrictionRecord {
    #[serde(default)]
    pub mode: RestrictionMode,
    #[serde(default)]
    pub bodyparts: Vec<String>,
    #[serde(default)]
    pub organs: Vec<String>,
    #[serde(default)]
    pub bones: Vec<String>,
    #[serde(default)]
    pub fixed: Option<FixedRecord>,
}

/// Exactly one of `organ` or `bone`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedRecord {
    pub bodypart: String,
    #[serde(default)]
    pub organ: Option<String>,
    #[serde(default)]
    pub bone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub duration: Tick,
    pub emote: String,
    #[serde(default)]
    pub tools: Vec<ToolRecord>,
    /// Phase special predicates, e.g. "checkorgan" or "bleeding 0.5"
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub hook: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub tag: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default = "default_action")]
    pub action: String,
}

fn default_quantity() -> u32 {
    1
}

fn default_action() -> String {
    "hold".into()
}

fn parse_tool_action(action: &str) -> Result<PlanAction> {
    match action.trim().to_lowercase().as_str() {
        "hold" => Ok(PlanAction::Hold),
        "wield" => Ok(PlanAction::Wield),
        "consume" => Ok(PlanAction::Consume),
        other => Err(ProcedureError::InvalidConfig(format!("unknown tool action '{}'", other))),
    }
}

fn lookup_bodypart(anatomy: &BodyPrototype, name: &str, context: &str) -> Result<BodypartId> {
    anatomy
        .find_bodypart(name)
        .map(|(id, _)| id)
        .ok_or_else(|| ProcedureError::UnknownAnatomy {
            name: name.to_string(),
            context: context.to_string(),
        })
}

fn lookup_organ(anatomy: &BodyPrototype, name: &str, context: &str) -> Result<InternalPart> {
    anatomy
        .find_organ(name)
        .map(|(id, _)| InternalPart::Organ(id))
        .ok_or_else(|| ProcedureError::UnknownAnatomy {
            name: name.to_string(),
            context: context.to_string(),
        })
}

fn lookup_bone(anatomy: &BodyPrototype, name: &str, context: &str) -> Result<InternalPart> {
    anatomy
        .find_bone(name)
        .map(|(id, _)| InternalPart::Bone(id))
        .ok_or_else(|| ProcedureError::UnknownAnatomy {
            name: name.to_string(),
            context: context.to_string(),
        })
}

impl RestrictionRecord {
    fn into_restriction(self, anatomy: &BodyPrototype, procedure: &str) -> Result<TargetRestriction> {
        let mut restriction = TargetRestriction {
            mode: self.mode,
            ..TargetRestriction::default()
        };
        for name in &self.bodyparts {
            restriction.bodyparts.push(lookup_bodypart(anatomy, name, procedure)?);
        }
        for name in &self.organs {
            restriction.internals.push(lookup_organ(anatomy, name, procedure)?);
        }
        for name in &self.bones {
            restriction.internals.push(lookup_bone(anatomy, name, procedure)?);
        }

        if let Some(fixed) = self.fixed {
            let part = lookup_bodypart(anatomy, &fixed.bodypart, procedure)?;
            let internal = match (fixed.organ.as_deref(), fixed.bone.as_deref()) {
                (Some(organ), None) => lookup_organ(anatomy, organ, procedure)?,
                (None, Some(bone)) => lookup_bone(anatomy, bone, procedure)?,
                _ => {
                    return Err(ProcedureError::InvalidConfig(format!(
                        "fixed target of {} needs exactly one organ or bone",
                        procedure
                    )))
                }
            };
            restriction.fixed = Some((part, internal));
        }
        Ok(restriction)
    }
}

impl PhaseRecord {
    fn into_phase(self) -> Result<Phase> {
        let mut phase = Phase::new(self.duration, self.emote);
        if !self.tools.is_empty() {
            let requirements = self
                .tools
                .into_iter()
                .map(|tool| -> Result<PlanRequirement> {
                    let action = parse_tool_action(&tool.action)?;
                    Ok(PlanRequirement::new(tool.tag, tool.quantity, action))
                })
                .collect::<Result<Vec<_>>>()?;
            phase = phase.with_plan(InventoryPlan::new(requirements));
        }
        for action in &self.actions {
            phase = phase.with_special(action.parse::<PhaseSpecial>()?);
        }
        if let Some(hook) = self.hook {
            phase = phase.with_hook(hook);
        }
        Ok(phase)
    }
}

impl ProcedureRecord {
    /// Convert to a runtime procedure, resolving names against the world
    pub fn into_procedure(self, id: ProcedureId, world: &World) -> Result<Procedure> {
        let kind: ProcedureKind = self.kind.parse()?;
        let anatomy = world
            .prototype_by_name(&self.body)
            .ok_or_else(|| ProcedureError::UnknownPrototypeName(self.body.clone()))?;
        if self.phases.is_empty() {
            return Err(ProcedureError::NoPhases(self.name));
        }

        let mut procedure = Procedure::new(id, self.name.clone(), kind, anatomy.id);
        if let Some(gerund) = self.gerund {
            procedure = procedure.with_gerund(gerund);
        }
        if let Some(knowledge) = self.knowledge {
            procedure = procedure.with_knowledge(knowledge);
        }
        if let Some(difficulty) = self.difficulty {
            let parsed: Difficulty = difficulty.parse().map_err(ProcedureError::InvalidDifficulty)?;
            procedure = procedure.with_difficulty(parsed);
        }
        if let Some(emote) = self.start_emote {
            procedure = procedure.with_start_emote(emote);
        }
        if let Some(restriction) = self.restriction {
            procedure = procedure.with_restriction(restriction.into_restriction(&anatomy, &self.name)?);
        }
        procedure.check_trait = self.check_trait.map(TraitId);
        procedure.flags = VariantFlags::parse(kind, &self.flags)?;
        procedure.hooks = self.hooks;

        for phase in self.phases {
            procedure = procedure.with_phase(phase.into_phase()?);
        }
        Ok(procedure)
    }
}

/// Parse procedure definitions without registering them
///
/// Ids continue from the world's highest registered procedure.
pub fn parse_procedures(content: &str, world: &World) -> Result<Vec<Procedure>> {
    let data: TomlProcedures = toml::from_str(content)?;
    let first = world.next_procedure_id().0;
    data.procedures
        .into_iter()
        .enumerate()
        .map(|(offset, record)| record.into_procedure(ProcedureId::new(first + offset as u32), world))
        .collect()
}

/// Parse and register procedure definitions from a TOML string
pub fn load_procedures_str(content: &str, world: &mut World) -> Result<Vec<ProcedureId>> {
    let procedures = parse_procedures(content, world)?;
    let ids = procedures
        .into_iter()
        .map(|procedure| world.add_procedure(procedure))
        .collect::<Vec<_>>();
    tracing::info!("Loaded {} procedures", ids.len());
    Ok(ids)
}

/// Load and register procedure definitions from a TOML file
pub fn load_procedures(path: &Path, world: &mut World) -> Result<Vec<ProcedureId>> {
    let content = std::fs::read_to_string(path)?;
    load_procedures_str(&content, world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BodyPrototypeId;

    fn world() -> World {
        let mut world = World::default();
        world.add_prototype(BodyPrototype::humanoid(BodyPrototypeId(1)));
        world
    }

    const AMPUTATE: &str = r#"
[[procedure]]
name = "amputate"
kind = "Amputation"
body = "humanoid"
knowledge = "Surgery"
difficulty = "very hard"
flags = ["quiet"]

[procedure.hooks]
completion = "log-amputation"

[procedure.restriction]
mode = "blacklist"
bodyparts = ["head", "neck"]

[[procedure.phase]]
duration = 1
emote = "$0 swabs $1's $3."

[[procedure.phase]]
duration = 2
emote = "$0 saws through $1's $3."
tools = [{ tag = "saw", action = "wield" }, { tag = "bandage", quantity = 2, action = "consume" }]
actions = ["attached", "bleeding 1.5"]
hook = "sawing"
"#;

    #[test]
    fn test_parse_full_procedure() {
        let world = world();
        let procedures = parse_procedures(AMPUTATE, &world).unwrap();
        assert_eq!(procedures.len(), 1);

        let amputate = &procedures[0];
        assert_eq!(amputate.id, ProcedureId(1));
        assert_eq!(amputate.kind, ProcedureKind::Amputation);
        assert_eq!(amputate.base_difficulty, Difficulty::VeryHard);
        assert_eq!(amputate.knowledge.as_deref(), Some("Surgery"));
        assert!(amputate.flags.quiet_start);
        assert_eq!(amputate.hooks.completion.as_deref(), Some("log-amputation"));
        assert_eq!(amputate.restriction.bodyparts.len(), 2);
        assert_eq!(amputate.phases.len(), 2);

        let saw = &amputate.phases[1];
        let plan = saw.plan.as_ref().unwrap();
        assert_eq!(plan.requirements[0].action, PlanAction::Wield);
        assert_eq!(plan.requirements[1].quantity, 2);
        assert_eq!(saw.specials().len(), 2);
        assert_eq!(saw.hook.as_deref(), Some("sawing"));
        assert!(amputate.phases[0].plan.is_none());
    }

    #[test]
    fn test_load_registers_sequential_ids() {
        let mut world = world();
        let doubled = format!("{}\n{}", AMPUTATE, AMPUTATE.replace("\"amputate\"", "\"lop\""));
        let ids = load_procedures_str(&doubled, &mut world).unwrap();
        assert_eq!(ids, vec![ProcedureId(1), ProcedureId(2)]);
        assert!(world.procedure_by_name("lop").is_some());
    }

    #[test]
    fn test_fixed_target_resolves() {
        let world = world();
        let content = r#"
[[procedure]]
name = "cardiac massage"
kind = "organstabilisation"
body = "humanoid"

[procedure.restriction]
mode = "whitelist"
fixed = { bodypart = "chest", organ = "heart" }

[[procedure.phase]]
duration = 1
emote = "$0 squeezes $1's $4."
"#;
        let procedures = parse_procedures(content, &world).unwrap();
        let restriction = &procedures[0].restriction;
        assert_eq!(restriction.mode, RestrictionMode::Whitelist);
        assert!(matches!(restriction.fixed, Some((_, InternalPart::Organ(_)))));
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let world = world();
        let no_phases = "[[procedure]]\nname = \"x\"\nkind = \"triage\"\nbody = \"humanoid\"\n";
        assert!(matches!(parse_procedures(no_phases, &world), Err(ProcedureError::NoPhases(_))));

        let bad_body = no_phases.replace("humanoid", "centaur");
        assert!(matches!(
            parse_procedures(&bad_body, &world),
            Err(ProcedureError::UnknownPrototypeName(_))
        ));

        let bad_part = format!(
            "{}[procedure.restriction]\nbodyparts = [\"tail\"]\n[[procedure.phase]]\nduration = 1\nemote = \"x\"\n",
            no_phases
        );
        assert!(matches!(
            parse_procedures(&bad_part, &world),
            Err(ProcedureError::UnknownAnatomy { .. })
        ));

        let bad_difficulty = format!(
            "{}difficulty = \"brutal\"\n[[procedure.phase]]\nduration = 1\nemote = \"x\"\n",
            no_phases
        );
        assert!(matches!(
            parse_procedures(&bad_difficulty, &world),
            Err(ProcedureError::InvalidDifficulty(_))
        ));
    }
}
