//! Procedure phases and their special predicates
//!
//! Predicate keywords are parsed once when a procedure is built. At run time
//! a phase holds an ordered list of typed predicates and the first one that
//! fails supplies the abort explanation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{ProcedureError, Result};
use crate::core::types::Tick;
use crate::items::InventoryPlan;
use crate::procedures::target::ResolvedTarget;
use crate::procedures::ProcedureContext;

/// A condition checked just before a phase runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PhaseSpecial {
    /// Targeted organ is still in the body
    CheckOrgan,
    /// Targeted bone is still in the body
    CheckBone,
    /// Patient's total bleed rate is at most `max`
    Bleeding { max: f64 },
    /// Patient is asleep, unconscious or dead
    Unconscious,
    /// Targeted bodypart has an open surgical wound
    OpenWound,
    /// Targeted bodypart is still attached
    Attached,
    /// Surgeon still holds the targeted item
    Holding,
}

impl PhaseSpecial {
    pub fn test(&self, ctx: &ProcedureContext, target: &ResolvedTarget) -> bool {
        let body = &ctx.patient.body;
        match self {
            PhaseSpecial::CheckOrgan => target
                .organ()
                .map_or(true, |organ| body.has_organ(&ctx.anatomy, organ)),
            PhaseSpecial::CheckBone => target
                .bone()
                .map_or(true, |bone| body.has_bone(&ctx.anatomy, bone)),
            PhaseSpecial::Bleeding { max } => body.total_bleeding() <= *max,
            PhaseSpecial::Unconscious => !ctx.patient.is_conscious(),
            PhaseSpecial::OpenWound => target
                .bodypart
                .map_or(false, |part| body.finalization_requirement(part).is_some()),
            PhaseSpecial::Attached => target.bodypart.map_or(true, |part| body.has_bodypart(part)),
            PhaseSpecial::Holding => target
                .item
                .map_or(true, |item| ctx.surgeon.inventory.held().contains(&item)),
        }
    }

    /// In-fiction reason the phase cannot go ahead
    pub fn explanation(&self, ctx: &ProcedureContext, target: &ResolvedTarget) -> String {
        let patient = &ctx.patient.name;
        let part = target
            .bodypart
            .map(|p| ctx.anatomy.bodypart_name(p))
            .unwrap_or("body");
        match self {
            PhaseSpecial::CheckOrgan => {
                let organ = target.organ().map(|o| ctx.anatomy.organ_name(o)).unwrap_or("organ");
                format!("{}'s {} is no longer there.", patient, organ)
            }
            PhaseSpecial::CheckBone => {
                let bone = target.bone().map(|b| ctx.anatomy.bone_name(b)).unwrap_or("bone");
                format!("{}'s {} is no longer there.", patient, bone)
            }
            PhaseSpecial::Bleeding { .. } => format!("{} is bleeding too heavily to continue.", patient),
            PhaseSpecial::Unconscious => format!("{} must be unconscious for this.", patient),
            PhaseSpecial::OpenWound => format!("There is no open surgical wound on {}'s {}.", patient, part),
            PhaseSpecial::Attached => format!("{}'s {} is no longer attached.", patient, part),
            PhaseSpecial::Holding => {
                let item = target
                    .item
                    .and_then(|i| ctx.world.items.get(i))
                    .map(|i| i.name.as_str())
                    .unwrap_or("the item");
                format!("You are no longer holding {}.", item)
            }
        }
    }

    /// Builder-facing summary
    pub fn description(&self) -> String {
        match self {
            PhaseSpecial::CheckOrgan => "the targeted organ must be present".into(),
            PhaseSpecial::CheckBone => "the targeted bone must be present".into(),
            PhaseSpecial::Bleeding { max } => format!("the patient must be bleeding no more than {}", max),
            PhaseSpecial::Unconscious => "the patient must be unconscious".into(),
            PhaseSpecial::OpenWound => "the target must have an open surgical wound".into(),
            PhaseSpecial::Attached => "the targeted bodypart must be attached".into(),
            PhaseSpecial::Holding => "the surgeon must still hold the item".into(),
        }
    }
}

impl FromStr for PhaseSpecial {
    type Err = ProcedureError;

    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let keyword = words
            .next()
            .ok_or_else(|| ProcedureError::UnknownPhaseAction(s.to_string()))?
            .to_lowercase();
        let args: Vec<&str> = words.collect();

        let special = match keyword.as_str() {
            "checkorgan" => PhaseSpecial::CheckOrgan,
            "checkbone" => PhaseSpecial::CheckBone,
            "unconscious" => PhaseSpecial::Unconscious,
            "openwound" => PhaseSpecial::OpenWound,
            "attached" => PhaseSpecial::Attached,
            "holding" => PhaseSpecial::Holding,
            "bleeding" => {
                let [max] = args.as_slice() else {
                    return Err(ProcedureError::InvalidPhaseAction {
                        action: s.to_string(),
                        reason: "expected exactly one maximum bleed rate".into(),
                    });
                };
                let max: f64 = max.parse().map_err(|_| ProcedureError::InvalidPhaseAction {
                    action: s.to_string(),
                    reason: format!("'{}' is not a number", max),
                })?;
                return Ok(PhaseSpecial::Bleeding { max });
            }
            _ => return Err(ProcedureError::UnknownPhaseAction(s.to_string())),
        };

        if !args.is_empty() {
            return Err(ProcedureError::InvalidPhaseAction {
                action: s.to_string(),
                reason: format!("'{}' takes no arguments", keyword),
            });
        }
        Ok(special)
    }
}

impl fmt::Display for PhaseSpecial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseSpecial::CheckOrgan => write!(f, "checkorgan"),
            PhaseSpecial::CheckBone => write!(f, "checkbone"),
            PhaseSpecial::Bleeding { max } => write!(f, "bleeding {}", max),
            PhaseSpecial::Unconscious => write!(f, "unconscious"),
            PhaseSpecial::OpenWound => write!(f, "openwound"),
            PhaseSpecial::Attached => write!(f, "attached"),
            PhaseSpecial::Holding => write!(f, "holding"),
        }
    }
}

/// One timed step of a procedure
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    /// Ticks that elapse before this phase runs
    pub duration: Tick,
    /// `$0` surgeon, `$1` patient, `$2` item, `$3` bodypart, `$4` organ or bone
    pub emote: String,
    pub plan: Option<InventoryPlan>,
    specials: Vec<PhaseSpecial>,
    /// Named effect hook fired after the phase check
    pub hook: Option<String>,
}

impl Phase {
    pub fn new(duration: Tick, emote: impl Into<String>) -> Self {
        Self {
            duration,
            emote: emote.into(),
            plan: None,
            specials: Vec::new(),
            hook: None,
        }
    }

    pub fn with_plan(mut self, plan: InventoryPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn with_special(mut self, special: PhaseSpecial) -> Self {
        self.specials.push(special);
        self
    }

    pub fn with_hook(mut self, hook: impl Into<String>) -> Self {
        self.hook = Some(hook.into());
        self
    }

    pub fn specials(&self) -> &[PhaseSpecial] {
        &self.specials
    }

    pub fn insert_special(&mut self, index: usize, special: PhaseSpecial) {
        let index = index.min(self.specials.len());
        self.specials.insert(index, special);
    }

    pub fn remove_special(&mut self, index: usize) -> Option<PhaseSpecial> {
        (index < self.specials.len()).then(|| self.specials.remove(index))
    }

    /// First failing predicate's explanation, in order
    pub fn first_failure(&self, ctx: &ProcedureContext, target: &ResolvedTarget) -> Option<String> {
        self.specials
            .iter()
            .find(|special| !special.test(ctx, target))
            .map(|special| special.explanation(ctx, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!("checkorgan".parse::<PhaseSpecial>().unwrap(), PhaseSpecial::CheckOrgan);
        assert_eq!("  Unconscious ".parse::<PhaseSpecial>().unwrap(), PhaseSpecial::Unconscious);
        assert_eq!(
            "bleeding 1.5".parse::<PhaseSpecial>().unwrap(),
            PhaseSpecial::Bleeding { max: 1.5 }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_malformed() {
        assert!(matches!(
            "juggle".parse::<PhaseSpecial>(),
            Err(ProcedureError::UnknownPhaseAction(_))
        ));
        assert!(matches!(
            "bleeding lots".parse::<PhaseSpecial>(),
            Err(ProcedureError::InvalidPhaseAction { .. })
        ));
        assert!(matches!(
            "checkorgan heart".parse::<PhaseSpecial>(),
            Err(ProcedureError::InvalidPhaseAction { .. })
        ));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for special in [PhaseSpecial::OpenWound, PhaseSpecial::Bleeding { max: 0.5 }, PhaseSpecial::Holding] {
            assert_eq!(special.to_string().parse::<PhaseSpecial>().unwrap(), special);
        }
    }

    #[test]
    fn test_special_insertion_and_removal_by_index() {
        let mut phase = Phase::new(1, "$0 cuts.")
            .with_special(PhaseSpecial::Unconscious)
            .with_special(PhaseSpecial::Attached);
        phase.insert_special(1, PhaseSpecial::CheckOrgan);
        assert_eq!(
            phase.specials(),
            &[PhaseSpecial::Unconscious, PhaseSpecial::CheckOrgan, PhaseSpecial::Attached]
        );
        assert_eq!(phase.remove_special(0), Some(PhaseSpecial::Unconscious));
        assert_eq!(phase.remove_special(5), None);
        assert_eq!(phase.specials().len(), 2);
    }
}
