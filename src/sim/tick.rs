//! Fixed timestep race tick
//!
//! One call advances every vehicle by `settings.dt_ms`. The phases always run
//! in this order so that effects never depend on vehicle order:
//! 1. collisions are resolved for all vehicles at their pre-move positions
//! 2. each vehicle takes its collision record
//! 3. control signals are decided (input for humans/agents, waypoints for NPCs)
//! 4. each vehicle integrates its motion
//! 5. sensors are recast from the new poses
//! 6. the finish line evaluates crossings

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::collision::{Body, resolve};
use super::state::{PLAYER_ID, RaceState};
use super::vehicle::{ControlSignals, ControlSource};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Signals for human or agent controlled vehicles, by id; missing ids coast
    pub controls: BTreeMap<u32, ControlSignals>,
}

impl TickInput {
    /// Input that drives only the player
    pub fn player(signals: ControlSignals) -> Self {
        Self::default().with(PLAYER_ID, signals)
    }

    pub fn with(mut self, id: u32, signals: ControlSignals) -> Self {
        self.controls.insert(id, signals);
        self
    }
}

/// Advance the race by one fixed timestep
pub fn tick(state: &mut RaceState, input: &TickInput) {
    for id in input.controls.keys() {
        if state.vehicle(*id).is_none() {
            log::warn!("Ignoring input for unknown vehicle {id}");
        }
    }

    // Collisions for everyone before anyone moves
    let probes = {
        let bodies: Vec<Body<'_>> = state
            .vehicles
            .iter()
            .map(|v| Body {
                id: v.id,
                rect: v.rect(),
                mask: v.mask(),
            })
            .collect();
        resolve(
            &bodies,
            state.level.boundary.mask(),
            state.settings.boundary_probe,
            state.settings.vehicle_probe,
        )
    };

    let settings = &state.settings;
    for (vehicle, probe) in state.vehicles.iter_mut().zip(probes) {
        vehicle.apply_collision(probe, settings);

        let mut signals = match &mut vehicle.source {
            ControlSource::Waypoints(navigator) => navigator.decide(
                vehicle.pos,
                vehicle.heading,
                vehicle.speed,
                &vehicle.collision,
                settings.waypoint_window,
                settings.steering_deadband,
            ),
            ControlSource::Human | ControlSource::Agent => {
                input.controls.get(&vehicle.id).copied().unwrap_or_default()
            }
        };

        // Finished cars are held on the e-brake
        if settings.brake_after_finish && state.finish.has_finished(vehicle.id) {
            signals.throttle = false;
            signals.boost = false;
            signals.brake = true;
        }

        vehicle.update(signals, settings);
    }

    state.refresh_sensors();
    state.finish.update(&mut state.vehicles);
    state.time_ticks += 1;
}
