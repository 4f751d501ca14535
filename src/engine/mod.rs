//! Phase sequencer
//!
//! Each surgeon runs at most one procedure. Phases are evaluated only at
//! their boundaries: when a phase falls due, the surgeon's state, the
//! environment, the phase's tools and its special predicates are checked
//! afresh, in that order. A boundary that passes commits the tools, narrates
//! the phase, rolls its check and fires its hook. The last phase's outcome
//! drives completion.

pub mod action;
pub mod consequences;
pub mod narration;

pub use action::ActionState;
pub use consequences::{abort_procedure, complete_procedure, finalization_site, silent_abort_procedure};
pub use narration::{describe_operation, render_emote, EmoteNames, ProcedureEvent};

use ahash::AHashMap;

use crate::check::{CheckRequest, CheckService, Difficulty};
use crate::core::error::Result;
use crate::core::types::{CharacterId, ProcedureId};
use crate::items::InventoryPlan;
use crate::procedures::{environment_rejection, Feasibility, Operation, Phase, ProcedureArgs, Rejection};
use crate::world::World;

/// What a phase boundary decided
enum Boundary {
    /// A participant no longer exists; nothing left to apply consequences to
    Vanished,
    /// Stop without narration
    Terminate(String),
    /// Stop with narration
    Abort(String),
    Proceed(Difficulty),
}

/// Drives every in-flight procedure
#[derive(Debug, Default)]
pub struct ProcedureEngine {
    active: AHashMap<CharacterId, ActionState>,
}

impl ProcedureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self, surgeon: CharacterId) -> bool {
        self.active.contains_key(&surgeon)
    }

    pub fn active(&self, surgeon: CharacterId) -> Option<&ActionState> {
        self.active.get(&surgeon)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    // === STARTING ===

    /// Begin a procedure. A rejection is reported as an event, not an error.
    ///
    /// Starting a feasible procedure abandons whatever the surgeon was doing,
    /// with full interruption consequences.
    pub fn perform_procedure(
        &mut self,
        world: &mut World,
        procedure: ProcedureId,
        surgeon: CharacterId,
        patient: CharacterId,
        args: &ProcedureArgs,
    ) -> Result<Vec<ProcedureEvent>> {
        let procedure = world.procedure(procedure)?;
        let surgeon_name = world.character_name(surgeon);
        let mut events = Vec::new();

        let target = match procedure.feasibility(world, surgeon, patient, args) {
            Feasibility::Feasible(target) => target,
            Feasibility::Rejected(rejection) => {
                tracing::warn!("{} cannot perform {}: {}", surgeon_name, procedure.name, rejection);
                events.push(ProcedureEvent::Rejected {
                    surgeon: surgeon_name,
                    procedure: procedure.name.clone(),
                    reason: rejection.to_string(),
                });
                return Ok(events);
            }
        };

        if let Some(previous) = self.active.remove(&surgeon) {
            let reason = format!("{} turns to something else.", surgeon_name);
            abort_procedure(world, &previous.operation, &reason)?;
            events.push(ProcedureEvent::Aborted {
                surgeon: surgeon_name.clone(),
                procedure: previous.operation.procedure.name.clone(),
                reason,
            });
        }

        let operation = Operation {
            procedure: procedure.clone(),
            surgeon,
            patient,
            target,
        };
        if !procedure.flags.quiet_start {
            let text = render_emote(&procedure.start_emote, &EmoteNames::for_operation(world, &operation));
            let location = world.expect_character(surgeon)?.location;
            world.narrate(location, text);
        }

        tracing::info!(
            "{} begins {}",
            surgeon_name,
            describe_operation(world, &operation)
        );
        events.push(ProcedureEvent::Started {
            surgeon: surgeon_name,
            patient: world.character_name(patient),
            procedure: procedure.name.clone(),
            tick: world.current_tick,
        });
        self.active
            .insert(surgeon, ActionState::new(operation, world.current_tick));
        Ok(events)
    }

    // === STOPPING ===

    /// Narrated stop, e.g. the surgeon chose to stop
    pub fn cancel_procedure(
        &mut self,
        world: &mut World,
        surgeon: CharacterId,
        reason: &str,
    ) -> Result<Option<ProcedureEvent>> {
        let Some(state) = self.active.remove(&surgeon) else {
            return Ok(None);
        };
        abort_procedure(world, &state.operation, reason)?;
        Ok(Some(ProcedureEvent::Aborted {
            surgeon: world.character_name(surgeon),
            procedure: state.operation.procedure.name.clone(),
            reason: reason.to_string(),
        }))
    }

    /// Silent stop, e.g. the world forced it
    pub fn terminate_procedure(
        &mut self,
        world: &mut World,
        surgeon: CharacterId,
        reason: &str,
    ) -> Result<Option<ProcedureEvent>> {
        let Some(state) = self.active.remove(&surgeon) else {
            return Ok(None);
        };
        silent_abort_procedure(world, &state.operation)?;
        Ok(Some(ProcedureEvent::Terminated {
            surgeon: world.character_name(surgeon),
            procedure: state.operation.procedure.name.clone(),
            reason: reason.to_string(),
        }))
    }

    // === RUNNING ===

    /// Advance the clock one tick and run every phase boundary that falls due
    ///
    /// A procedure that hits a hard error is logged and dropped with a
    /// `Terminated` event; the other due procedures still run.
    pub fn tick(&mut self, world: &mut World, checks: &mut dyn CheckService) -> Vec<ProcedureEvent> {
        world.tick();
        let now = world.current_tick;

        let mut due: Vec<(u64, CharacterId)> = self
            .active
            .iter()
            .filter(|(_, state)| state.is_due(now))
            .map(|(surgeon, state)| (state.started_tick, *surgeon))
            .collect();
        due.sort_by_key(|(started, surgeon)| (*started, surgeon.0));

        let mut events = Vec::new();
        for (_, surgeon) in due {
            let Some(state) = self.active.remove(&surgeon) else {
                continue;
            };
            let procedure = state.operation.procedure.name.clone();
            match self.run_boundary(world, checks, state, &mut events) {
                Ok(Some(state)) => {
                    self.active.insert(surgeon, state);
                }
                Ok(None) => {}
                Err(error) => {
                    let name = world.character_name(surgeon);
                    tracing::error!("{} could not continue {}: {}", name, procedure, error);
                    events.push(ProcedureEvent::Terminated {
                        surgeon: name,
                        procedure,
                        reason: error.to_string(),
                    });
                }
            }
        }
        events
    }

    /// Tick until nothing is running or `max_ticks` have passed
    pub fn run_until_idle(
        &mut self,
        world: &mut World,
        checks: &mut dyn CheckService,
        max_ticks: u64,
    ) -> Vec<ProcedureEvent> {
        let mut events = Vec::new();
        for _ in 0..max_ticks {
            if self.active.is_empty() {
                break;
            }
            events.extend(self.tick(world, checks));
        }
        events
    }

    /// Evaluate one phase boundary; returns the state if the procedure goes on
    fn run_boundary(
        &mut self,
        world: &mut World,
        checks: &mut dyn CheckService,
        mut state: ActionState,
        events: &mut Vec<ProcedureEvent>,
    ) -> Result<Option<ActionState>> {
        let op = state.operation.clone();
        let index = state.next_phase;
        let Some(phase) = op.procedure.phases.get(index) else {
            return Ok(None);
        };
        let surgeon = world.character_name(op.surgeon);
        let procedure = op.procedure.name.clone();

        let difficulty = match evaluate_boundary(world, &op, phase) {
            Boundary::Proceed(difficulty) => difficulty,
            Boundary::Vanished => {
                events.push(ProcedureEvent::Terminated {
                    surgeon,
                    procedure,
                    reason: "A participant is gone.".into(),
                });
                return Ok(None);
            }
            Boundary::Terminate(reason) => {
                silent_abort_procedure(world, &op)?;
                events.push(ProcedureEvent::Terminated {
                    surgeon,
                    procedure,
                    reason,
                });
                return Ok(None);
            }
            Boundary::Abort(reason) => {
                abort_procedure(world, &op, &reason)?;
                events.push(ProcedureEvent::Aborted {
                    surgeon,
                    procedure,
                    reason,
                });
                return Ok(None);
            }
        };

        // Commit: tools, emote, check, hook
        if let Some(plan) = &phase.plan {
            let (character, items) = world.character_and_items_mut(op.surgeon)?;
            if let Some(execution) = plan.execute_whole_plan(&mut character.inventory, items) {
                InventoryPlan::finalise_without_restore(&execution, &mut character.inventory, items);
            }
        }
        let text = render_emote(&phase.emote, &EmoteNames::for_operation(world, &op));
        let location = world.expect_character(op.surgeon)?.location;
        world.narrate(location, text);

        let outcome = checks.check(&CheckRequest {
            actor: op.surgeon,
            check_type: op.procedure.check_type(),
            difficulty,
            trait_override: op.procedure.check_trait.clone(),
            target: Some(op.patient),
        });
        if let Some(hook) = &phase.hook {
            if let Ok(ctx) = op.context(world) {
                world
                    .hooks
                    .fire(hook, &ctx.hook_context(&op.target, Some(index + 1), outcome));
            }
        }
        tracing::debug!(
            "{} phase {} of {}: {} at {}",
            surgeon,
            index + 1,
            procedure,
            outcome.describe(),
            difficulty
        );
        events.push(ProcedureEvent::PhaseCompleted {
            surgeon: surgeon.clone(),
            procedure: procedure.clone(),
            phase: index + 1,
            difficulty,
            outcome,
        });

        if state.is_last_phase() {
            let completion = complete_procedure(world, &op, outcome)?;
            events.push(ProcedureEvent::Completed {
                surgeon,
                patient: world.character_name(op.patient),
                procedure,
                outcome,
                findings: completion.findings,
            });
            return Ok(None);
        }

        state.advance(outcome, world.current_tick);
        Ok(Some(state))
    }
}

/// Fresh precondition evaluation for one phase; nothing is cached between
/// boundaries
fn evaluate_boundary(world: &World, op: &Operation, phase: &Phase) -> Boundary {
    let (Some(surgeon), Some(patient)) = (world.character(op.surgeon), world.character(op.patient)) else {
        return Boundary::Vanished;
    };

    if !surgeon.can_act() {
        return Boundary::Terminate(Rejection::SurgeonIncapable.to_string());
    }
    if op.procedure.requires_living_patient() && patient.is_dead() {
        return Boundary::Terminate(Rejection::PatientDead(patient.name.clone()).to_string());
    }
    if let Some(rejection) = environment_rejection(surgeon, patient) {
        return Boundary::Abort(rejection.to_string());
    }
    if let Some(plan) = &phase.plan {
        let feasibility = plan.plan_is_feasible(&surgeon.inventory, &world.items);
        if !feasibility.is_feasible() {
            return Boundary::Abort(Rejection::Plan(feasibility).to_string());
        }
    }

    let ctx = match op.context(world) {
        Ok(ctx) => ctx,
        Err(rejection) => return Boundary::Abort(rejection.to_string()),
    };
    if let Some(explanation) = phase.first_failure(&ctx, &op.target) {
        return Boundary::Abort(explanation);
    }
    Boundary::Proceed(op.procedure.get_procedure_difficulty(&ctx, &op.target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anatomy::BodyPrototype;
    use crate::check::{FixedCheck, Outcome, ScriptedCheck};
    use crate::core::types::{BodyPrototypeId, LocationId};
    use crate::entity::{Character, CharacterState};
    use crate::items::Item;
    use crate::procedures::{Procedure, ProcedureKind};

    struct Fixture {
        world: World,
        engine: ProcedureEngine,
        surgeon: CharacterId,
        patient: CharacterId,
        procedure: ProcedureId,
    }

    fn fixture(phases: Vec<Phase>) -> Fixture {
        let mut world = World::default();
        let proto = world.add_prototype(BodyPrototype::humanoid(BodyPrototypeId(1)));
        let surgeon = world.spawn(Character::new("Ada", proto, LocationId(1)));
        let patient = world.spawn(Character::new("Bob", proto, LocationId(1)).with_state(CharacterState::Unconscious));
        let mut procedure = Procedure::new(ProcedureId(1), "explore", ProcedureKind::ExploratorySurgery, proto)
            .with_start_emote("$0 leans over $1.");
        for phase in phases {
            procedure = procedure.with_phase(phase);
        }
        let procedure = world.add_procedure(procedure);
        Fixture {
            world,
            engine: ProcedureEngine::new(),
            surgeon,
            patient,
            procedure,
        }
    }

    fn start(f: &mut Fixture) -> Vec<ProcedureEvent> {
        let args = ProcedureArgs::new().with_bodypart("abdomen");
        f.engine
            .perform_procedure(&mut f.world, f.procedure, f.surgeon, f.patient, &args)
            .unwrap()
    }

    #[test]
    fn test_phases_run_in_order_after_their_durations() {
        let mut f = fixture(vec![Phase::new(1, "$0 opens $1's $3."), Phase::new(2, "$0 looks inside.")]);
        let started = start(&mut f);
        assert!(matches!(started[0], ProcedureEvent::Started { .. }));
        assert!(f.engine.is_busy(f.surgeon));

        let mut check = FixedCheck::new(Outcome::Pass);
        let first = f.engine.tick(&mut f.world, &mut check);
        assert!(matches!(first[0], ProcedureEvent::PhaseCompleted { phase: 1, .. }));

        let idle = f.engine.tick(&mut f.world, &mut check);
        assert!(idle.is_empty());

        let last = f.engine.tick(&mut f.world, &mut check);
        assert!(matches!(last[0], ProcedureEvent::PhaseCompleted { phase: 2, .. }));
        assert!(matches!(last[1], ProcedureEvent::Completed { outcome: Outcome::Pass, .. }));
        assert!(!f.engine.is_busy(f.surgeon));

        let texts: Vec<&str> = f.world.narration().iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts[0], "Ada leans over Bob.");
        assert_eq!(texts[1], "Ada opens Bob's abdomen.");
        assert_eq!(texts[2], "Ada looks inside.");
        assert_eq!(check.requests.len(), 2);
    }

    #[test]
    fn test_last_phase_outcome_drives_completion() {
        let mut f = fixture(vec![Phase::new(0, "one"), Phase::new(0, "two")]);
        start(&mut f);
        let mut check = ScriptedCheck::new([Outcome::MajorPass, Outcome::MinorFail], Outcome::Pass);
        let events = f.engine.run_until_idle(&mut f.world, &mut check, 10);
        let completed = events.iter().find_map(|e| match e {
            ProcedureEvent::Completed { outcome, .. } => Some(*outcome),
            _ => None,
        });
        assert_eq!(completed, Some(Outcome::MinorFail));
    }

    #[test]
    fn test_missing_tool_at_boundary_aborts_with_reason() {
        let saw_plan = InventoryPlan::new(vec![crate::items::PlanRequirement::new(
            "saw",
            1,
            crate::items::PlanAction::Wield,
        )]);
        let mut f = fixture(vec![Phase::new(1, "prep"), Phase::new(1, "saw").with_plan(saw_plan)]);
        start(&mut f);
        let mut check = FixedCheck::new(Outcome::Pass);
        f.engine.tick(&mut f.world, &mut check);
        let events = f.engine.tick(&mut f.world, &mut check);
        match &events[0] {
            ProcedureEvent::Aborted { reason, .. } => {
                assert_eq!(reason, &Rejection::Plan(crate::items::PlanFeasibility::NotFeasibleMissingItems).to_string())
            }
            other => panic!("expected abort, got {:?}", other),
        }
        let part = f.world.prototype(BodyPrototypeId(1)).unwrap().find_bodypart("abdomen").unwrap().0;
        assert!(f
            .world
            .character(f.patient)
            .unwrap()
            .body
            .finalization_requirement(part)
            .is_some());
    }

    #[test]
    fn test_consumed_tools_are_destroyed() {
        let plan = InventoryPlan::new(vec![crate::items::PlanRequirement::new(
            "gauze",
            1,
            crate::items::PlanAction::Consume,
        )]);
        let mut f = fixture(vec![Phase::new(1, "pack").with_plan(plan)]);
        let gauze = f.world.create_item(Item::consumable("a gauze pad", "gauze"));
        f.world.character_mut(f.surgeon).unwrap().inventory.carry(gauze);
        start(&mut f);
        let mut check = FixedCheck::new(Outcome::Pass);
        f.engine.run_until_idle(&mut f.world, &mut check, 5);
        assert!(f.world.items.get(gauze).is_none());
        assert!(!f.world.character(f.surgeon).unwrap().inventory.has(gauze));
    }

    #[test]
    fn test_surgeon_collapse_terminates_silently() {
        let mut f = fixture(vec![Phase::new(1, "one"), Phase::new(1, "two")]);
        start(&mut f);
        let mut check = FixedCheck::new(Outcome::Pass);
        f.engine.tick(&mut f.world, &mut check);
        let before = f.world.narration().len();

        f.world.character_mut(f.surgeon).unwrap().state = CharacterState::Unconscious;
        let events = f.engine.tick(&mut f.world, &mut check);
        assert!(matches!(events[0], ProcedureEvent::Terminated { .. }));
        assert_eq!(f.world.narration().len(), before);
        assert!(!f.engine.is_busy(f.surgeon));
    }

    #[test]
    fn test_broken_procedure_does_not_stall_the_tick() {
        let mut f = fixture(vec![Phase::new(1, "one")]);
        let proto = BodyPrototypeId(1);
        let other_surgeon = f.world.spawn(Character::new("Cy", proto, LocationId(1)));
        let other_patient = f
            .world
            .spawn(Character::new("Dee", proto, LocationId(1)).with_state(CharacterState::Unconscious));
        start(&mut f);
        let args = ProcedureArgs::new().with_bodypart("abdomen");
        f.engine
            .perform_procedure(&mut f.world, f.procedure, other_surgeon, other_patient, &args)
            .unwrap();

        // Bob's anatomy can no longer be found, so stopping his procedure fails
        f.world.character_mut(f.patient).unwrap().body.prototype = BodyPrototypeId(99);
        let mut check = FixedCheck::new(Outcome::Pass);
        let events = f.engine.tick(&mut f.world, &mut check);

        let expected = crate::core::error::ProcedureError::PrototypeNotFound(BodyPrototypeId(99)).to_string();
        assert!(events.iter().any(|e| matches!(
            e,
            ProcedureEvent::Terminated { surgeon, reason, .. } if surgeon == "Ada" && *reason == expected
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ProcedureEvent::Completed { surgeon, .. } if surgeon == "Cy"
        )));
        assert_eq!(f.engine.active_count(), 0);
    }

    #[test]
    fn test_new_procedure_abandons_current_one() {
        let mut f = fixture(vec![Phase::new(5, "slow")]);
        start(&mut f);
        let events = start(&mut f);
        assert!(matches!(events[0], ProcedureEvent::Aborted { .. }));
        assert!(matches!(events[1], ProcedureEvent::Started { .. }));
        assert_eq!(f.engine.active_count(), 1);
    }

    #[test]
    fn test_rejected_start_keeps_current_procedure() {
        let mut f = fixture(vec![Phase::new(5, "slow")]);
        start(&mut f);
        let args = ProcedureArgs::new().with_bodypart("tail");
        let events = f
            .engine
            .perform_procedure(&mut f.world, f.procedure, f.surgeon, f.patient, &args)
            .unwrap();
        assert!(matches!(events[0], ProcedureEvent::Rejected { .. }));
        assert!(f.engine.is_busy(f.surgeon));
    }

    #[test]
    fn test_cancel_and_terminate() {
        let mut f = fixture(vec![Phase::new(5, "slow")]);
        assert!(f.engine.cancel_procedure(&mut f.world, f.surgeon, "stop").unwrap().is_none());
        start(&mut f);
        let event = f.engine.cancel_procedure(&mut f.world, f.surgeon, "You stop.").unwrap();
        assert!(matches!(event, Some(ProcedureEvent::Aborted { .. })));

        start(&mut f);
        let event = f.engine.terminate_procedure(&mut f.world, f.surgeon, "forced").unwrap();
        assert!(matches!(event, Some(ProcedureEvent::Terminated { .. })));
        assert!(!f.engine.is_busy(f.surgeon));
    }
}
