//! Track Racer headless runner
//!
//! Runs a race on the procedural demo circuit (or a level description laid
//! over it) with no rendering, and reports the finishing order.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use track_racer::SimSettings;
use track_racer::sim::{
    ControlSignals, ControlSource, Level, LevelDescription, Observation, PLAYER_ID, RaceState,
    TickInput, WaypointNavigator, demo, tick,
};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "track-racer",
    about = "Headless top-down racing simulation"
)]
struct RunOpts {
    /// Race seed (NPC stats and waypoint picks)
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Laps to finish
    #[arg(short, long, default_value_t = 2)]
    laps: u32,

    /// Number of NPC cars
    #[arg(short, long, default_value_t = 4)]
    npcs: usize,

    /// Give up after this many ticks
    #[arg(short = 't', long, default_value_t = 30_000)]
    max_ticks: u64,

    /// Simulation settings JSON (defaults tuned for the demo track)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Level description JSON laid over the demo track image
    #[arg(long)]
    level: Option<PathBuf>,

    /// Drive the player from its sensors instead of waypoints
    #[arg(short, long)]
    agent: bool,

    /// Write the final race snapshot here as JSON
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn read_level(path: &Path) -> anyhow::Result<LevelDescription> {
    let fh = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("Failed to open level file {}", path.display()))?;
    serde_json::from_reader(&fh)
        .with_context(|| format!("Failed to parse level file {}", path.display()))
}

/// Reflex driver on the first three rays (ahead, left, right)
fn sensor_policy(obs: &Observation) -> ControlSignals {
    let &[ahead, left, right, ..] = obs.distances.as_slice() else {
        return ControlSignals {
            throttle: true,
            ..Default::default()
        };
    };
    ControlSignals {
        turn_left: left > right + 10.0,
        turn_right: right > left + 10.0,
        throttle: ahead > 60.0 || obs.speed < 2.0,
        brake: ahead < 40.0 && obs.speed > 4.0,
        boost: ahead > 400.0,
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = RunOpts::parse();

    let settings = match &opts.settings {
        Some(path) => SimSettings::load(path),
        None => demo::settings(),
    };

    let description = match &opts.level {
        Some(path) => read_level(path)?,
        None => demo::description(opts.laps, opts.npcs),
    };
    let level = Level::new(description, &demo::image()).context("Invalid level")?;

    let player_source = if opts.agent {
        ControlSource::Agent
    } else {
        // Separate stream so the NPC draws match an agent-driven race
        let mut rng = Pcg32::seed_from_u64(opts.seed ^ 0x5eed);
        ControlSource::Waypoints(WaypointNavigator::from_groups(
            &level.description.waypoint_groups,
            &mut rng,
        ))
    };

    let mut state = RaceState::new(level, settings, opts.seed, demo::setup(player_source));

    let mut input = TickInput::default();
    while !state.race_over() && state.time_ticks < opts.max_ticks {
        if opts.agent {
            let signals = state
                .observation(PLAYER_ID)
                .map(|obs| sensor_policy(&obs))
                .unwrap_or_default();
            input = TickInput::player(signals);
        }
        tick(&mut state, &input);
    }

    let snapshot = state.snapshot();
    let seconds = state.time_ticks as f32 * state.settings.dt_ms / 1000.0;
    if snapshot.race_over {
        log::info!("Race over after {} ticks ({:.1}s)", state.time_ticks, seconds);
    } else {
        log::warn!("No finisher within {} ticks", opts.max_ticks);
    }

    println!("{:>4} {:>8} {:>6} {:>10}", "car", "place", "laps", "position");
    for v in &snapshot.vehicles {
        let place = v
            .placement
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        println!(
            "{:>4} {:>8} {:>6} {:>4.0},{:<5.0}",
            v.id, place, v.lap_count, v.pos.x, v.pos.y
        );
    }

    if let Some(path) = &opts.snapshot {
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        log::info!("Snapshot written to {}", path.display());
    }
    Ok(())
}
