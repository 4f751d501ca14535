//! Medical examination, triage and what exploratory surgery turns up
//!
//! Nothing here mutates the patient. The quality of the check decides how
//! much of the body's state the surgeon gets to see.

use serde::{Deserialize, Serialize};

use super::{anatomy_of, narrate_at_surgeon, Completion};
use crate::anatomy::BodyPrototype;
use crate::check::{Difficulty, Outcome};
use crate::core::error::Result;
use crate::core::types::BodypartId;
use crate::entity::{BoneState, Character, WoundSeverity};
use crate::procedures::{Operation, ProcedureContext};
use crate::world::World;

/// Smallest wound an examiner notices at a given outcome
fn wound_threshold(outcome: Outcome) -> Option<WoundSeverity> {
    match outcome {
        Outcome::NotTested | Outcome::MajorFail => None,
        Outcome::Fail => Some(WoundSeverity::Severe),
        Outcome::MinorFail => Some(WoundSeverity::Moderate),
        Outcome::MinorPass => Some(WoundSeverity::Minor),
        Outcome::Pass | Outcome::MajorPass => Some(WoundSeverity::Superficial),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WoundFinding {
    pub bodypart: String,
    pub severity: WoundSeverity,
    pub bleeding: bool,
    /// Only reported on a solid pass
    pub infected: bool,
    pub treated: bool,
}

impl WoundFinding {
    fn describe(&self) -> String {
        let mut text = format!("a {} wound on the {}", self.severity.describe(), self.bodypart);
        if self.bleeding {
            text.push_str(", bleeding");
        }
        if self.infected {
            text.push_str(", infected");
        }
        if self.treated {
            text.push_str(", dressed");
        }
        text
    }
}

/// Everything an examination or exploration found
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExaminationFindings {
    pub wounds: Vec<WoundFinding>,
    pub missing_bodyparts: Vec<String>,
    /// Incisions still waiting to be closed, with how hard they will be
    pub open_surgical_wounds: Vec<(String, Difficulty)>,
    pub cannulas: Vec<String>,
    /// External bleed rate, only measured on a pass
    pub bleeding: Option<f64>,
    pub missing_organs: Vec<String>,
    pub implants: Vec<String>,
    pub internal_bleeding: Option<f64>,
    pub fractures: Vec<String>,
}

impl ExaminationFindings {
    /// Look the patient over from the outside
    pub fn examine(world: &World, anatomy: &BodyPrototype, patient: &Character, outcome: Outcome) -> Self {
        let mut findings = Self::default();
        let Some(threshold) = wound_threshold(outcome) else {
            return findings;
        };
        let body = &patient.body;

        findings.wounds = body
            .wounds()
            .iter()
            .filter(|w| w.severity >= threshold)
            .map(|w| WoundFinding {
                bodypart: anatomy.bodypart_name(w.bodypart).to_string(),
                severity: w.severity,
                bleeding: w.is_bleeding(),
                infected: outcome >= Outcome::Pass && w.infection.is_some(),
                treated: w.treated,
            })
            .collect();

        // Report each lost limb once, at the point it was taken off
        findings.missing_bodyparts = body
            .severed_parts()
            .filter(|part| {
                anatomy
                    .bodypart(*part)
                    .and_then(|p| p.upstream)
                    .map_or(true, |up| body.has_bodypart(up))
            })
            .map(|part| anatomy.bodypart_name(part).to_string())
            .collect();

        if !outcome.is_pass() {
            return findings;
        }

        findings.open_surgical_wounds = body
            .finalization_requirements()
            .iter()
            .map(|f| (anatomy.bodypart_name(f.bodypart).to_string(), f.difficulty))
            .collect();
        findings.cannulas = body
            .cannulas()
            .iter()
            .map(|c| anatomy.bodypart_name(c.bodypart).to_string())
            .collect();

        if outcome >= Outcome::Pass {
            findings.bleeding = Some(body.wounds().iter().map(|w| w.bleeding).sum());
        }
        if outcome == Outcome::MajorPass {
            findings.fractures = fractured_bones(anatomy, patient, None);
            findings.implants = body
                .implants()
                .iter()
                .filter_map(|i| world.items.get(i.item))
                .map(|item| item.name.clone())
                .collect();
        }
        findings
    }

    /// Look inside one opened bodypart
    pub fn explore(
        world: &World,
        anatomy: &BodyPrototype,
        patient: &Character,
        part: BodypartId,
        outcome: Outcome,
    ) -> Self {
        let mut findings = Self::default();
        if matches!(outcome, Outcome::NotTested | Outcome::MajorFail) {
            return findings;
        }
        let body = &patient.body;

        let bleeding = body.internal_bleeding(part);
        if bleeding > 0.0 {
            findings.internal_bleeding = Some(bleeding);
        }
        if !outcome.is_pass() {
            return findings;
        }

        if let Some(proto) = anatomy.bodypart(part) {
            findings.missing_organs = proto
                .organs
                .iter()
                .filter(|loc| !body.has_organ(anatomy, loc.organ))
                .map(|loc| anatomy.organ_name(loc.organ).to_string())
                .collect();
        }
        findings.implants = body
            .implants_in(part)
            .filter_map(|i| world.items.get(i.item))
            .map(|item| item.name.clone())
            .collect();
        findings.fractures = fractured_bones(anatomy, patient, Some(part));
        findings
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Lines to show the surgeon
    pub fn describe(&self, patient: &str) -> Vec<String> {
        if self.is_empty() {
            return vec![format!("You find nothing of note about {}.", patient)];
        }

        let mut lines = Vec::new();
        for wound in &self.wounds {
            lines.push(format!("{} has {}.", patient, wound.describe()));
        }
        if !self.missing_bodyparts.is_empty() {
            lines.push(format!("{} is missing: {}.", patient, self.missing_bodyparts.join(", ")));
        }
        for (part, difficulty) in &self.open_surgical_wounds {
            lines.push(format!(
                "{} has an open surgical wound on the {} ({} to close).",
                patient, part, difficulty
            ));
        }
        for part in &self.cannulas {
            lines.push(format!("{} has a cannula in the {}.", patient, part));
        }
        if let Some(rate) = self.bleeding {
            if rate > 0.0 {
                lines.push(format!("{} is bleeding at a rate of {:.2}.", patient, rate));
            } else {
                lines.push(format!("{} is not bleeding.", patient));
            }
        }
        if let Some(rate) = self.internal_bleeding {
            lines.push(format!("There is internal bleeding at a rate of {:.2}.", rate));
        }
        if !self.missing_organs.is_empty() {
            lines.push(format!("Missing organs: {}.", self.missing_organs.join(", ")));
        }
        if !self.implants.is_empty() {
            lines.push(format!("Implants: {}.", self.implants.join(", ")));
        }
        if !self.fractures.is_empty() {
            lines.push(format!("Broken bones: {}.", self.fractures.join(", ")));
        }
        lines
    }
}

fn fractured_bones(anatomy: &BodyPrototype, patient: &Character, within: Option<BodypartId>) -> Vec<String> {
    anatomy
        .bones
        .iter()
        .filter(|bone| within.map_or(true, |part| anatomy.part_contains_bone(part, bone.id)))
        .filter(|bone| patient.body.bone_state(bone.id) == Some(BoneState::Fractured))
        .map(|bone| bone.name.clone())
        .collect()
}

/// Treatment priority, least urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TriageCategory {
    Minor,
    Delayed,
    Immediate,
    /// Beyond saving
    Expectant,
}

impl TriageCategory {
    pub fn assess(anatomy: &BodyPrototype, patient: &Character) -> Self {
        let body = &patient.body;
        let bleeding = body.total_bleeding();

        if patient.is_dead() || body.is_missing_vital_organ(anatomy) || bleeding >= 2.0 {
            return TriageCategory::Expectant;
        }
        if bleeding >= 0.5 || !body.finalization_requirements().is_empty() {
            return TriageCategory::Immediate;
        }
        let serious_wound = body
            .wounds()
            .iter()
            .any(|w| !w.treated && w.severity >= WoundSeverity::Moderate);
        if serious_wound || bleeding > 0.0 || !fractured_bones(anatomy, patient, None).is_empty() {
            return TriageCategory::Delayed;
        }
        TriageCategory::Minor
    }

    pub fn describe(&self) -> &'static str {
        match self {
            TriageCategory::Minor => "has only minor injuries",
            TriageCategory::Delayed => "needs treatment, but can wait",
            TriageCategory::Immediate => "needs treatment immediately",
            TriageCategory::Expectant => "is unlikely to survive",
        }
    }
}

/// Harder to examine someone who cannot answer questions
pub(super) fn difficulty(ctx: &ProcedureContext, difficulty: Difficulty) -> Difficulty {
    if !ctx.patient.is_dead() && !ctx.patient.is_conscious() {
        difficulty.stage_up(1)
    } else {
        difficulty
    }
}

pub(super) fn complete_examination(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let anatomy = anatomy_of(world, op)?;
    let patient = world.expect_character(op.patient)?;
    let lines = ExaminationFindings::examine(world, &anatomy, patient, outcome).describe(&patient.name);
    for line in &lines {
        narrate_at_surgeon(world, op, line.clone())?;
    }
    Ok(Completion::no_effect().with_findings(lines))
}

pub(super) fn complete_triage(world: &mut World, op: &Operation, outcome: Outcome) -> Result<Completion> {
    let anatomy = anatomy_of(world, op)?;
    let patient = world.expect_character(op.patient)?;

    let line = if outcome.failures() >= 2 {
        format!("You cannot reach a conclusion about {}'s condition.", patient.name)
    } else {
        let category = TriageCategory::assess(&anatomy, patient);
        tracing::debug!("Triage of {}: {:?} ({})", patient.name, category, outcome.describe());
        let hedge = if outcome.is_fail() { "probably " } else { "" };
        format!("{} {}{}.", patient.name, hedge, category.describe())
    };
    narrate_at_surgeon(world, op, line.clone())?;
    Ok(Completion::no_effect().with_findings(vec![line]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BodyPrototypeId, LocationId};
    use crate::entity::{DamageType, Wound};

    fn setup() -> (World, BodyPrototype, Character) {
        let world = World::default();
        let anatomy = BodyPrototype::humanoid(BodyPrototypeId(1));
        let patient = Character::new("Bob", anatomy.id, LocationId(1));
        (world, anatomy, patient)
    }

    #[test]
    fn test_detail_scales_with_outcome() {
        let (world, anatomy, mut patient) = setup();
        let (arm, _) = anatomy.find_bodypart("left forearm").unwrap();
        patient
            .body
            .add_wound(Wound::new(arm, DamageType::Slashing, WoundSeverity::Small, 0));
        patient
            .body
            .add_wound(Wound::new(arm, DamageType::Crushing, WoundSeverity::Severe, 0));

        let botched = ExaminationFindings::examine(&world, &anatomy, &patient, Outcome::MajorFail);
        assert!(botched.is_empty());

        let poor = ExaminationFindings::examine(&world, &anatomy, &patient, Outcome::Fail);
        assert_eq!(poor.wounds.len(), 1);
        assert_eq!(poor.bleeding, None);

        let good = ExaminationFindings::examine(&world, &anatomy, &patient, Outcome::Pass);
        assert_eq!(good.wounds.len(), 2);
        assert!(good.bleeding.unwrap() > 0.0);
    }

    #[test]
    fn test_missing_limb_reported_once() {
        let (world, anatomy, mut patient) = setup();
        let (forearm, _) = anatomy.find_bodypart("left forearm").unwrap();
        patient.body.sever(&anatomy, forearm);
        let findings = ExaminationFindings::examine(&world, &anatomy, &patient, Outcome::MinorFail);
        assert_eq!(findings.missing_bodyparts, vec!["left forearm".to_string()]);
    }

    #[test]
    fn test_exploration_finds_internal_state() {
        let (world, anatomy, mut patient) = setup();
        let (chest, _) = anatomy.find_bodypart("chest").unwrap();
        let (lung, _) = anatomy.find_organ("left lung").unwrap();
        let (ribs, _) = anatomy.find_bone("ribs").unwrap();
        patient.body.add_internal_bleeding(chest, 0.3);
        patient.body.remove_organ(lung);
        patient.body.fracture_bone(ribs);

        let shallow = ExaminationFindings::explore(&world, &anatomy, &patient, chest, Outcome::MinorFail);
        assert_eq!(shallow.internal_bleeding, Some(0.3));
        assert!(shallow.missing_organs.is_empty());

        let thorough = ExaminationFindings::explore(&world, &anatomy, &patient, chest, Outcome::Pass);
        assert_eq!(thorough.missing_organs, vec!["left lung".to_string()]);
        assert_eq!(thorough.fractures, vec!["ribs".to_string()]);
        assert!(thorough.describe("Bob").iter().any(|l| l.contains("left lung")));
    }

    #[test]
    fn test_nothing_found_is_still_reported() {
        let findings = ExaminationFindings::default();
        assert_eq!(findings.describe("Bob"), vec!["You find nothing of note about Bob.".to_string()]);
    }

    #[test]
    fn test_triage_categories() {
        let (_, anatomy, mut patient) = setup();
        assert_eq!(TriageCategory::assess(&anatomy, &patient), TriageCategory::Minor);

        let (shin, _) = anatomy.find_bodypart("left shin").unwrap();
        patient
            .body
            .add_wound(Wound::new(shin, DamageType::Slashing, WoundSeverity::Moderate, 0));
        assert_eq!(TriageCategory::assess(&anatomy, &patient), TriageCategory::Delayed);

        patient.body.add_internal_bleeding(shin, 0.5);
        assert_eq!(TriageCategory::assess(&anatomy, &patient), TriageCategory::Immediate);

        let (heart, _) = anatomy.find_organ("heart").unwrap();
        patient.body.remove_organ(heart);
        assert_eq!(TriageCategory::assess(&anatomy, &patient), TriageCategory::Expectant);
    }
}
