//! Check integration
//!
//! Probabilistic resolution is an external service. The engine only composes
//! a difficulty, names the check, and consumes the ranked [`Outcome`].

pub mod dice;
pub mod difficulty;
pub mod outcome;

pub use dice::DiceCheck;
pub use difficulty::Difficulty;
pub use outcome::Outcome;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::types::CharacterId;

/// Which skill check a procedure rolls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckType {
    MedicalExaminationCheck,
    TriageCheck,
    AmputationCheck,
    ReplantationCheck,
    OrganExtractionCheck,
    OrganTransplantCheck,
    OrganStabilisationCheck,
    CannulationProcedure,
    DecannulationProcedure,
    InstallImplantSurgery,
    RemoveImplantSurgery,
    ConfigureImplantPowerSurgery,
    ConfigureImplantInterfaceSurgery,
    TraumaControlSurgery,
    ExploratorySurgeryCheck,
    InvasiveProcedureFinalisation,
    SurgicalSetCheck,
}

/// Optional trait override (e.g. "Surgery", "Dexterity"), owned by the check service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitId(pub String);

/// Everything the check service needs to roll
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRequest {
    pub actor: CharacterId,
    pub check_type: CheckType,
    pub difficulty: Difficulty,
    pub trait_override: Option<TraitId>,
    pub target: Option<CharacterId>,
}

/// External probabilistic skill-check service
pub trait CheckService {
    fn check(&mut self, request: &CheckRequest) -> Outcome;
}

/// Always returns the same outcome
#[derive(Debug, Clone, Default)]
pub struct FixedCheck {
    pub outcome: Outcome,
    pub requests: Vec<CheckRequest>,
}

impl FixedCheck {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            requests: Vec::new(),
        }
    }
}

impl CheckService for FixedCheck {
    fn check(&mut self, request: &CheckRequest) -> Outcome {
        self.requests.push(request.clone());
        self.outcome
    }
}

/// Replays a queue of outcomes, then falls back to a default
#[derive(Debug, Clone, Default)]
pub struct ScriptedCheck {
    queued: VecDeque<Outcome>,
    fallback: Outcome,
    pub requests: Vec<CheckRequest>,
}

impl ScriptedCheck {
    pub fn new(outcomes: impl IntoIterator<Item = Outcome>, fallback: Outcome) -> Self {
        Self {
            queued: outcomes.into_iter().collect(),
            fallback,
            requests: Vec::new(),
        }
    }
}

impl CheckService for ScriptedCheck {
    fn check(&mut self, request: &CheckRequest) -> Outcome {
        self.requests.push(request.clone());
        self.queued.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckRequest {
        CheckRequest {
            actor: CharacterId::new(),
            check_type: CheckType::AmputationCheck,
            difficulty: Difficulty::Normal,
            trait_override: None,
            target: None,
        }
    }

    #[test]
    fn test_scripted_check_replays_then_falls_back() {
        let mut check = ScriptedCheck::new([Outcome::Fail, Outcome::MajorPass], Outcome::Pass);
        let req = request();
        assert_eq!(check.check(&req), Outcome::Fail);
        assert_eq!(check.check(&req), Outcome::MajorPass);
        assert_eq!(check.check(&req), Outcome::Pass);
        assert_eq!(check.requests.len(), 3);
    }

    #[test]
    fn test_fixed_check_records_requests() {
        let mut check = FixedCheck::new(Outcome::MinorPass);
        assert_eq!(check.check(&request()), Outcome::MinorPass);
        assert_eq!(check.requests[0].difficulty, Difficulty::Normal);
    }
}
