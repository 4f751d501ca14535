//! Why a procedure cannot go ahead
//!
//! Every rejection is addressed to the acting surgeon and names the specific
//! cause. None of these are errors in the `Result` sense; they travel inside
//! [`super::Feasibility`] and as abort reasons.

use thiserror::Error;

use crate::items::PlanFeasibility;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    // === PRECONDITIONS ===
    #[error("You are not in a fit state to perform surgery.")]
    SurgeonIncapable,

    #[error("You do not know how to perform {0}.")]
    MissingKnowledge(String),

    #[error("{patient}'s anatomy is not suited to {procedure}.")]
    WrongAnatomy { patient: String, procedure: String },

    #[error("{0} is dead, and this procedure requires a living patient.")]
    PatientDead(String),

    #[error("You cannot operate while on the move.")]
    SurgeonMoving,

    #[error("You cannot operate while fighting.")]
    SurgeonInMelee,

    #[error("{0} is not here.")]
    NotTogether(String),

    #[error("You cannot operate while {0} is moving.")]
    Moving(String),

    #[error("You cannot operate while {0} is fighting.")]
    InMelee(String),

    #[error("{0}")]
    Hook(String),

    // === RESOLUTION ===
    #[error("You must specify which {0} to target.")]
    MissingArgument(&'static str),

    #[error("{patient} has no such {what} as '{token}'.")]
    NoSuchTarget {
        patient: String,
        what: &'static str,
        token: String,
    },

    #[error("{patient} is missing their {part}.")]
    MissingBodypart { patient: String, part: String },

    #[error("The {internal} cannot be reached through the {part}.")]
    NotReachable { internal: String, part: String },

    #[error("There is no way to reach {patient}'s {internal}.")]
    Unreachable { patient: String, internal: String },

    #[error("This procedure cannot target the {0}.")]
    NotPermitted(String),

    #[error("You are not holding any such {0}.")]
    NotHolding(&'static str),

    #[error("{patient} has no such {what} in their {part}.")]
    NothingInstalled {
        patient: String,
        what: &'static str,
        part: String,
    },

    // === RESOURCES ===
    #[error("{}", plan_explanation(.0))]
    Plan(PlanFeasibility),

    // === VARIANT & PHASE PREDICATES ===
    #[error("{0}")]
    Variant(String),
}

fn plan_explanation(feasibility: &PlanFeasibility) -> &'static str {
    match feasibility {
        PlanFeasibility::Feasible => "You have everything you need.",
        PlanFeasibility::NotFeasibleMissingItems => "You do not have the tools you need for that.",
        PlanFeasibility::NotFeasibleNotEnoughHands => "You do not have enough free hands for that.",
        PlanFeasibility::NotFeasibleNotEnoughWielders => {
            "You do not have enough free limbs to wield the tools for that."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_sub_causes_are_distinct() {
        let texts: Vec<String> = [
            PlanFeasibility::NotFeasibleMissingItems,
            PlanFeasibility::NotFeasibleNotEnoughHands,
            PlanFeasibility::NotFeasibleNotEnoughWielders,
        ]
        .into_iter()
        .map(|f| Rejection::Plan(f).to_string())
        .collect();
        assert_ne!(texts[0], texts[1]);
        assert_ne!(texts[1], texts[2]);
        assert!(texts[1].contains("hands"));
    }

    #[test]
    fn test_resolution_messages_name_the_token() {
        let rejection = Rejection::NoSuchTarget {
            patient: "Bob".into(),
            what: "bodypart",
            token: "tail".into(),
        };
        assert_eq!(rejection.to_string(), "Bob has no such bodypart as 'tail'.");
    }
}
