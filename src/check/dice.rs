//! Seeded percentile dice check service
//!
//! A stand-in for the game's full probability engine: skill versus a d100
//! roll, with each difficulty stage worth ten points and the margin mapped to
//! outcome degrees.

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{CheckRequest, CheckService, Difficulty, Outcome};
use crate::core::types::CharacterId;

/// Points of skill each difficulty stage adds or removes
const POINTS_PER_STAGE: i32 = 10;

/// Margin (in points) separating one outcome degree from the next
const MARGIN_PER_DEGREE: i32 = 20;

pub struct DiceCheck {
    rng: ChaCha8Rng,
    skills: AHashMap<CharacterId, i32>,
    default_skill: i32,
}

impl DiceCheck {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            skills: AHashMap::new(),
            default_skill: 50,
        }
    }

    /// Set an actor's skill (0-100)
    pub fn with_skill(mut self, actor: CharacterId, skill: i32) -> Self {
        self.skills.insert(actor, skill.clamp(0, 100));
        self
    }

    fn skill_of(&self, actor: CharacterId) -> i32 {
        self.skills.get(&actor).copied().unwrap_or(self.default_skill)
    }
}

/// Map a roll margin to an outcome
pub fn outcome_for_margin(margin: i32) -> Outcome {
    match margin {
        m if m >= 2 * MARGIN_PER_DEGREE => Outcome::MajorPass,
        m if m >= MARGIN_PER_DEGREE => Outcome::Pass,
        m if m >= 0 => Outcome::MinorPass,
        m if m > -MARGIN_PER_DEGREE => Outcome::MinorFail,
        m if m > -2 * MARGIN_PER_DEGREE => Outcome::Fail,
        _ => Outcome::MajorFail,
    }
}

impl CheckService for DiceCheck {
    fn check(&mut self, request: &CheckRequest) -> Outcome {
        match request.difficulty {
            Difficulty::Automatic => return Outcome::MajorPass,
            Difficulty::Impossible => return Outcome::MajorFail,
            _ => {}
        }

        let stage_offset = request.difficulty as i32 - Difficulty::Normal as i32;
        let target = self.skill_of(request.actor) - stage_offset * POINTS_PER_STAGE;
        let roll: i32 = self.rng.gen_range(1..=100);
        let outcome = outcome_for_margin(target - roll);

        tracing::debug!(
            "Check {:?} at {} for {:?}: rolled {} vs {} -> {}",
            request.check_type,
            request.difficulty,
            request.actor,
            roll,
            target,
            outcome.describe()
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckType;

    fn request(actor: CharacterId, difficulty: Difficulty) -> CheckRequest {
        CheckRequest {
            actor,
            check_type: CheckType::TriageCheck,
            difficulty,
            trait_override: None,
            target: None,
        }
    }

    #[test]
    fn test_margin_bands() {
        assert_eq!(outcome_for_margin(45), Outcome::MajorPass);
        assert_eq!(outcome_for_margin(20), Outcome::Pass);
        assert_eq!(outcome_for_margin(0), Outcome::MinorPass);
        assert_eq!(outcome_for_margin(-1), Outcome::MinorFail);
        assert_eq!(outcome_for_margin(-25), Outcome::Fail);
        assert_eq!(outcome_for_margin(-40), Outcome::MajorFail);
    }

    #[test]
    fn test_extremes_skip_the_roll() {
        let actor = CharacterId::new();
        let mut dice = DiceCheck::new(7);
        assert_eq!(dice.check(&request(actor, Difficulty::Automatic)), Outcome::MajorPass);
        assert_eq!(dice.check(&request(actor, Difficulty::Impossible)), Outcome::MajorFail);
    }

    #[test]
    fn test_same_seed_same_results() {
        let actor = CharacterId::new();
        let mut a = DiceCheck::new(42).with_skill(actor, 60);
        let mut b = DiceCheck::new(42).with_skill(actor, 60);
        for _ in 0..20 {
            let req = request(actor, Difficulty::Hard);
            assert_eq!(a.check(&req), b.check(&req));
        }
    }

    #[test]
    fn test_master_surgeon_never_majorly_fails_trivial_work() {
        let actor = CharacterId::new();
        let mut dice = DiceCheck::new(3).with_skill(actor, 100);
        for _ in 0..100 {
            assert_ne!(
                dice.check(&request(actor, Difficulty::Trivial)),
                Outcome::MajorFail
            );
        }
    }
}
