//! In-flight procedure state

use crate::check::Outcome;
use crate::core::types::Tick;
use crate::procedures::{Operation, Phase};

/// One surgeon's running procedure
#[derive(Debug, Clone)]
pub struct ActionState {
    pub operation: Operation,
    /// 0-based index of the phase that runs next
    pub next_phase: usize,
    /// Tick at which the next phase boundary is evaluated
    pub due_tick: Tick,
    pub started_tick: Tick,
    /// Check outcome of every phase run so far
    pub outcomes: Vec<Outcome>,
}

impl ActionState {
    pub fn new(operation: Operation, tick: Tick) -> Self {
        let first = operation.procedure.phases.first().map_or(0, |p| p.duration);
        Self {
            operation,
            next_phase: 0,
            due_tick: tick + first,
            started_tick: tick,
            outcomes: Vec::new(),
        }
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.operation.procedure.phases.get(self.next_phase)
    }

    pub fn is_last_phase(&self) -> bool {
        self.next_phase + 1 >= self.operation.procedure.phases.len()
    }

    /// Record a phase's outcome and schedule the next one
    pub fn advance(&mut self, outcome: Outcome, now: Tick) {
        self.outcomes.push(outcome);
        self.next_phase += 1;
        let duration = self.current_phase().map_or(0, |p| p.duration);
        self.due_tick = now + duration;
    }

    pub fn is_due(&self, now: Tick) -> bool {
        self.due_tick <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BodyPrototypeId, CharacterId, ProcedureId};
    use crate::procedures::{Procedure, ProcedureKind, ResolvedTarget};
    use std::sync::Arc;

    #[test]
    fn test_durations_elapse_before_each_phase() {
        let procedure = Procedure::new(ProcedureId(1), "explore", ProcedureKind::ExploratorySurgery, BodyPrototypeId(1))
            .with_phase(Phase::new(2, "one"))
            .with_phase(Phase::new(3, "two"));
        let op = Operation {
            procedure: Arc::new(procedure),
            surgeon: CharacterId::new(),
            patient: CharacterId::new(),
            target: ResolvedTarget::default(),
        };
        let mut state = ActionState::new(op, 10);
        assert_eq!(state.due_tick, 12);
        assert!(!state.is_due(11));
        assert!(!state.is_last_phase());

        state.advance(Outcome::Pass, 12);
        assert_eq!(state.due_tick, 15);
        assert!(state.is_last_phase());
        assert_eq!(state.outcomes, vec![Outcome::Pass]);
    }
}
