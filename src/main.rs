//! Surgery Engine - Demo Runner
//!
//! Loads the procedure catalogue, lays a patient on the table and runs an
//! amputation followed by the stitch-up of the stump, printing everything
//! the room would see.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use surgery_engine::anatomy::BodyPrototype;
use surgery_engine::check::DiceCheck;
use surgery_engine::core::config::EngineConfig;
use surgery_engine::core::error::{ProcedureError, Result};
use surgery_engine::core::types::{BodyPrototypeId, CharacterId, LocationId};
use surgery_engine::engine::{ProcedureEngine, ProcedureEvent};
use surgery_engine::entity::{Character, CharacterState};
use surgery_engine::items::Item;
use surgery_engine::procedures::{load_procedures, ProcedureArgs};
use surgery_engine::world::World;

/// Surgery demo - one amputation, start to finish
#[derive(Parser, Debug)]
#[command(name = "surgery-engine")]
#[command(about = "Run a sample amputation through the procedure engine")]
struct Args {
    /// Procedure catalogue to load
    #[arg(long, default_value = "data/procedures.toml")]
    procedures: PathBuf,

    /// Optional engine configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bodypart to amputate
    #[arg(long, default_value = "left forearm")]
    limb: String,

    /// Surgeon skill, 0-100
    #[arg(long, default_value_t = 65)]
    skill: i32,

    /// Random seed for deterministic runs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Give up after this many ticks
    #[arg(long, default_value_t = 100)]
    max_ticks: u64,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: String,
}

/// JSON output structure
#[derive(Serialize)]
struct Report {
    narration: Vec<String>,
    events: Vec<ProcedureEvent>,
    wounds: usize,
    open_surgical_wounds: usize,
    bleeding: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("surgery_engine=debug")
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let mut world = World::new(config);
    let body = world.add_prototype(BodyPrototype::humanoid(BodyPrototypeId(1)));
    load_procedures(&args.procedures, &mut world)?;

    let (surgeon, patient) = spawn_theatre(&mut world, body);
    let mut checks = DiceCheck::new(args.seed).with_skill(surgeon, args.skill);
    let mut engine = ProcedureEngine::new();

    let amputate = world
        .procedure_by_name("amputate")
        .ok_or_else(|| ProcedureError::UnknownProcedureName("amputate".into()))?;
    let mut events = engine.perform_procedure(
        &mut world,
        amputate.id,
        surgeon,
        patient,
        &ProcedureArgs::new().with_bodypart(args.limb.as_str()),
    )?;
    events.extend(engine.run_until_idle(&mut world, &mut checks, args.max_ticks));

    // Close whatever the amputation left open
    let open_wounds: Vec<String> = {
        let patient = world.expect_character(patient)?;
        let anatomy = world
            .prototype(patient.body.prototype)
            .ok_or(ProcedureError::PrototypeNotFound(patient.body.prototype))?;
        patient
            .body
            .finalization_requirements()
            .iter()
            .map(|r| anatomy.bodypart_name(r.bodypart).to_string())
            .collect()
    };
    if let Some(stitch) = world.procedure_by_name("stitch up") {
        for part in open_wounds {
            events.extend(engine.perform_procedure(
                &mut world,
                stitch.id,
                surgeon,
                patient,
                &ProcedureArgs::new().with_bodypart(part),
            )?);
            events.extend(engine.run_until_idle(&mut world, &mut checks, args.max_ticks));
        }
    }

    let narration: Vec<String> = world
        .drain_narration()
        .into_iter()
        .map(|line| format!("[{:>3}] {}", line.tick, line.text))
        .collect();
    let patient = world.expect_character(patient)?;
    let report = Report {
        narration,
        events,
        wounds: patient.body.wounds().len(),
        open_surgical_wounds: patient.body.finalization_requirements().len(),
        bleeding: patient.body.total_bleeding(),
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== NARRATION ===");
    for line in &report.narration {
        println!("{}", line);
    }
    println!();
    println!("=== EVENTS ===");
    for event in &report.events {
        println!("{}", describe_event(event));
    }
    println!();
    println!(
        "{}: {} wounds, {} open surgical wounds, bleeding {:.2}",
        patient.name, report.wounds, report.open_surgical_wounds, report.bleeding
    );
    Ok(())
}

/// A surgeon with a full tray and an unconscious patient in the same room
fn spawn_theatre(world: &mut World, body: BodyPrototypeId) -> (CharacterId, CharacterId) {
    let room = LocationId(1);
    let surgeon = world.spawn(
        Character::new("Doctor Vance", body, room)
            .with_knowledge("Surgery")
            .with_knowledge("Medicine"),
    );
    let patient = world.spawn(Character::new("Corporal Hale", body, room).with_state(CharacterState::Unconscious));

    let tray = [
        Item::tool("a steel scalpel", "scalpel"),
        Item::tool("a bone saw", "saw"),
        Item::consumable("a length of sutures", "sutures"),
        Item::consumable("a length of sutures", "sutures"),
    ];
    for item in tray {
        let id = world.create_item(item);
        if let Some(character) = world.character_mut(surgeon) {
            character.inventory.carry(id);
        }
    }
    (surgeon, patient)
}

fn describe_event(event: &ProcedureEvent) -> String {
    match event {
        ProcedureEvent::Rejected { surgeon, procedure, reason } => {
            format!("{} could not start {}: {}", surgeon, procedure, reason)
        }
        ProcedureEvent::Started { surgeon, patient, procedure, tick } => {
            format!("tick {}: {} starts {} on {}", tick, surgeon, procedure, patient)
        }
        ProcedureEvent::PhaseCompleted { procedure, phase, difficulty, outcome, .. } => {
            format!("  {} phase {} at {}: {}", procedure, phase, difficulty, outcome.describe())
        }
        ProcedureEvent::Aborted { procedure, reason, .. } => format!("{} aborted: {}", procedure, reason),
        ProcedureEvent::Terminated { procedure, reason, .. } => format!("{} terminated: {}", procedure, reason),
        ProcedureEvent::Completed { procedure, outcome, findings, .. } => {
            let mut text = format!("{} completed ({})", procedure, outcome.describe());
            for finding in findings {
                text.push_str(&format!("\n    {}", finding));
            }
            text
        }
    }
}
