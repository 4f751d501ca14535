//! Emote substitution and the engine's event stream

use serde::Serialize;

use crate::check::{Difficulty, Outcome};
use crate::procedures::Operation;
use crate::world::World;

/// Names substituted into `$0`..`$4`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmoteNames {
    pub surgeon: String,
    pub patient: String,
    pub item: String,
    pub bodypart: String,
    /// Organ or bone
    pub internal: String,
}

impl EmoteNames {
    pub fn for_operation(world: &World, op: &Operation) -> Self {
        let anatomy = world
            .character(op.patient)
            .and_then(|p| world.prototype(p.body.prototype));
        let bodypart = match (&anatomy, op.target.bodypart) {
            (Some(anatomy), Some(part)) => anatomy.bodypart_name(part).to_string(),
            _ => "body".into(),
        };
        let internal = match (&anatomy, op.target.organ(), op.target.bone()) {
            (Some(anatomy), Some(organ), _) => anatomy.organ_name(organ).to_string(),
            (Some(anatomy), _, Some(bone)) => anatomy.bone_name(bone).to_string(),
            _ => bodypart.clone(),
        };
        let item = op
            .target
            .item
            .and_then(|i| world.items.get(i))
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "something".into());

        Self {
            surgeon: world.character_name(op.surgeon),
            patient: world.character_name(op.patient),
            item,
            bodypart,
            internal,
        }
    }

    fn token(&self, position: char) -> Option<&str> {
        match position {
            '0' => Some(self.surgeon.as_str()),
            '1' => Some(self.patient.as_str()),
            '2' => Some(self.item.as_str()),
            '3' => Some(self.bodypart.as_str()),
            '4' => Some(self.internal.as_str()),
            _ => None,
        }
    }
}

/// Replace positional tokens in an emote
///
/// Single pass over the template: substituted names are never rescanned.
pub fn render_emote(template: &str, names: &EmoteNames) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            if let Some(name) = chars.peek().and_then(|next| names.token(*next)) {
                rendered.push_str(name);
                chars.next();
                continue;
            }
        }
        rendered.push(c);
    }
    rendered
}

/// "amputating Bob's left forearm", or the bare gerund if the patient is gone
pub fn describe_operation(world: &World, op: &Operation) -> String {
    op.context(world)
        .map(|ctx| op.procedure.describe_procedure_gerund(&ctx, &op.target))
        .unwrap_or_else(|_| op.procedure.gerund.clone())
}

/// Events generated while procedures run
///
/// Returned by [`super::ProcedureEngine::perform_procedure`] and
/// [`super::ProcedureEngine::tick`] for display or logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProcedureEvent {
    /// The procedure could not start
    Rejected {
        surgeon: String,
        procedure: String,
        reason: String,
    },
    Started {
        surgeon: String,
        patient: String,
        procedure: String,
        tick: u64,
    },
    PhaseCompleted {
        surgeon: String,
        procedure: String,
        /// 1-based
        phase: usize,
        difficulty: Difficulty,
        outcome: Outcome,
    },
    /// Stopped with narration and interruption consequences
    Aborted {
        surgeon: String,
        procedure: String,
        reason: String,
    },
    /// Stopped silently, still with interruption consequences
    Terminated {
        surgeon: String,
        procedure: String,
        reason: String,
    },
    Completed {
        surgeon: String,
        patient: String,
        procedure: String,
        outcome: Outcome,
        findings: Vec<String>,
    },
}

impl ProcedureEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcedureEvent::Aborted { .. } | ProcedureEvent::Terminated { .. } | ProcedureEvent::Completed { .. }
        )
    }
}
