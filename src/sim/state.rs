//! Race state and snapshots
//!
//! Everything the tick function mutates lives in `RaceState`. Vehicles are
//! stored in id order (player first) and never reordered.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::CollisionProbe;
use super::finish::FinishLine;
use super::level::Level;
use super::navigator::WaypointNavigator;
use super::sensor::{Observation, SensorArray};
use super::vehicle::{ControlSource, Vehicle};
use crate::settings::{NpcSpecRange, SimSettings, VehicleSpec};

/// Id of the player's vehicle
pub const PLAYER_ID: u32 = 0;

/// Who races, and with what
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSetup {
    pub player: VehicleSpec,
    /// `Human` or `Agent`; a `Waypoints` source makes the player a bot too
    pub player_source: ControlSource,
    pub npc_range: NpcSpecRange,
    pub player_sensor: bool,
    pub npc_sensors: bool,
}

impl Default for RaceSetup {
    fn default() -> Self {
        Self {
            player: VehicleSpec::default(),
            player_source: ControlSource::Human,
            npc_range: NpcSpecRange::default(),
            player_sensor: true,
            npc_sensors: false,
        }
    }
}

/// Complete race state (deterministic for a given seed and input sequence)
#[derive(Debug, Clone)]
pub struct RaceState {
    pub seed: u64,
    pub settings: SimSettings,
    pub level: Level,
    /// Sorted by id, player first
    pub vehicles: Vec<Vehicle>,
    pub finish: FinishLine,
    /// Simulation tick counter
    pub time_ticks: u64,
}

impl RaceState {
    pub fn new(level: Level, settings: SimSettings, seed: u64, setup: RaceSetup) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let desc = &level.description;
        let sensor = SensorArray::new(settings.sensor);

        let mut player = Vehicle::new(PLAYER_ID, setup.player, desc.player_start, setup.player_source);
        if setup.player_sensor {
            player = player.with_sensor(sensor);
        }
        let mut vehicles = vec![player];

        for (i, pose) in desc.npc_starts.iter().enumerate() {
            let spec = setup.npc_range.sample(&mut rng);
            let navigator = WaypointNavigator::from_groups(&desc.waypoint_groups, &mut rng);
            let mut npc = Vehicle::new(i as u32 + 1, spec, *pose, ControlSource::Waypoints(navigator));
            if setup.npc_sensors {
                npc = npc.with_sensor(sensor);
            }
            vehicles.push(npc);
        }

        let finish = FinishLine::new(desc.finish_line, desc.laps);
        log::info!(
            "New race (seed {}): {} vehicle(s), {} lap(s)",
            seed,
            vehicles.len(),
            desc.laps
        );

        let mut state = Self {
            seed,
            settings,
            level,
            vehicles,
            finish,
            time_ticks: 0,
        };
        state.refresh_sensors();
        state
    }

    pub fn vehicle(&self, id: u32) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn vehicle_mut(&mut self, id: u32) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.id == id)
    }

    pub fn player(&self) -> Option<&Vehicle> {
        self.vehicle(PLAYER_ID)
    }

    pub fn race_over(&self) -> bool {
        self.finish.race_over()
    }

    /// Recast every attached sensor from the vehicles' current poses
    pub fn refresh_sensors(&mut self) {
        let boundary = &self.level.boundary;
        for vehicle in &mut self.vehicles {
            if let Some(sensor) = vehicle.sensor {
                vehicle.readings = sensor.cast(vehicle.pos, vehicle.heading, boundary);
            }
        }
    }

    /// Sensor distances and speed, for vehicles that carry a sensor
    pub fn observation(&self, id: u32) -> Option<Observation> {
        self.vehicle(id)
            .filter(|v| v.sensor.is_some())
            .map(Vehicle::observation)
    }

    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            tick: self.time_ticks,
            vehicles: self
                .vehicles
                .iter()
                .map(|v| VehicleSnapshot {
                    id: v.id,
                    pos: v.pos,
                    heading: v.heading,
                    speed: v.speed,
                    throttle_held_ms: v.throttle_held_ms,
                    lap_count: v.lap_count,
                    collision: v.collision,
                    boosting: v.is_boosting(),
                    placement: self.finish.placement(v.id),
                })
                .collect(),
            results: self.finish.results().to_vec(),
            race_over: self.finish.race_over(),
        }
    }
}

/// Per-vehicle view handed to rendering and game-state layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: u32,
    pub pos: Vec2,
    pub heading: f32,
    pub speed: f32,
    pub throttle_held_ms: f32,
    pub lap_count: i32,
    pub collision: CollisionProbe,
    pub boosting: bool,
    pub placement: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub tick: u64,
    pub vehicles: Vec<VehicleSnapshot>,
    /// Vehicle ids in finishing order
    pub results: Vec<u32>,
    pub race_over: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::demo;

    fn race(seed: u64, npcs: usize) -> RaceState {
        let level = Level::new(demo::description(2, npcs), &demo::image()).unwrap();
        RaceState::new(level, demo::settings(), seed, RaceSetup::default())
    }

    #[test]
    fn test_new_race_layout() {
        let state = race(7, 3);
        let ids: Vec<u32> = state.vehicles.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(state.player().map(|p| p.source.clone()), Some(ControlSource::Human));
        assert!(state.vehicles[1..].iter().all(|v| v.source.is_scripted()));
        assert_eq!(state.time_ticks, 0);
        assert!(!state.race_over());
    }

    #[test]
    fn test_npc_stats_come_from_seed() {
        let a = race(11, 3);
        let b = race(11, 3);
        let c = race(12, 3);
        let specs = |s: &RaceState| s.vehicles.iter().map(|v| v.spec).collect::<Vec<_>>();
        assert_eq!(specs(&a), specs(&b));
        assert_ne!(specs(&a), specs(&c));

        let range = NpcSpecRange::default();
        for npc in &a.vehicles[1..] {
            assert!(npc.spec.max_speed >= range.max_speed.0 && npc.spec.max_speed <= range.max_speed.1);
        }
    }

    #[test]
    fn test_observation_only_with_sensor() {
        let state = race(1, 1);
        let obs = state.observation(PLAYER_ID).unwrap();
        assert_eq!(obs.distances.len(), state.settings.sensor.ray_count);
        // Pointing down the straight: the wall ahead is within reach
        assert!(obs.distances[0] < SensorArray::new(state.settings.sensor).max_distance());
        assert_eq!(obs.speed, 0.0);
        assert!(state.observation(1).is_none());
        assert!(state.observation(99).is_none());
    }

    #[test]
    fn test_snapshot_serializes() {
        let state = race(3, 2);
        let snap = state.snapshot();
        assert_eq!(snap.vehicles.len(), 3);
        assert_eq!(snap.vehicles[0].pos, state.vehicles[0].pos);
        let json = serde_json::to_string(&snap).unwrap();
        let back: RaceSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
