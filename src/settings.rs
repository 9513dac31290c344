//! Simulation tuning and car stats
//!
//! Everything here is plain data with serde support so a level pack or a
//! training harness can override it from JSON. Defaults match the stock game.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Sensor fan configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSettings {
    /// Number of rays (odd for a symmetric fan)
    pub ray_count: usize,
    /// Total angular spread of the fan (degrees)
    pub spread_deg: f32,
    /// Side length of the square each ray is drawn in (pixels)
    pub ray_length: u32,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            ray_count: SENSOR_RAY_COUNT,
            spread_deg: SENSOR_SPREAD_DEG,
            ray_length: SENSOR_RAY_LENGTH,
        }
    }
}

/// Global simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Tick length in milliseconds
    pub dt_ms: f32,

    // === Collision ===
    /// Shift used to find which side of a vehicle touches the boundary
    pub boundary_probe: i32,
    /// Shift used to find which side two vehicles touch on
    pub vehicle_probe: i32,
    /// Ticks of decaying correction after a boundary hit
    pub boundary_recovery_ticks: u32,
    /// Divisor of the boundary correction step
    pub boundary_recovery_divisor: f32,
    /// Ticks of decaying correction after a vehicle hit
    pub vehicle_recovery_ticks: u32,
    /// Divisor of the vehicle correction step
    pub vehicle_recovery_divisor: f32,
    /// Fraction of speed kept after hitting another vehicle
    pub vehicle_collision_speed_factor: f32,

    // === Navigation ===
    /// Per-axis window within which a waypoint counts as reached
    pub waypoint_window: f32,
    /// Heading error ignored by NPC steering (degrees)
    pub steering_deadband: f32,

    // === Boost ===
    pub boost_speed_mult: f32,
    pub boost_accel_mult: f32,
    pub boost_duration_ms: f32,

    // === Sensors ===
    pub sensor: SensorSettings,

    /// Hold finished vehicles on the e-brake once the race is over
    pub brake_after_finish: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            dt_ms: SIM_DT_MS,

            boundary_probe: BOUNDARY_PROBE_DISTANCE,
            vehicle_probe: VEHICLE_PROBE_DISTANCE,
            boundary_recovery_ticks: BOUNDARY_RECOVERY_TICKS,
            boundary_recovery_divisor: BOUNDARY_RECOVERY_DIVISOR,
            vehicle_recovery_ticks: VEHICLE_RECOVERY_TICKS,
            vehicle_recovery_divisor: VEHICLE_RECOVERY_DIVISOR,
            vehicle_collision_speed_factor: VEHICLE_COLLISION_SPEED_FACTOR,

            waypoint_window: WAYPOINT_WINDOW,
            steering_deadband: STEERING_DEADBAND,

            boost_speed_mult: BOOST_SPEED_MULT,
            boost_accel_mult: BOOST_ACCEL_MULT,
            boost_duration_ms: BOOST_DURATION_MS,

            sensor: SensorSettings::default(),

            brake_after_finish: true,
        }
    }
}

impl SimSettings {
    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return settings;
                }
                Err(e) => log::warn!("Ignoring malformed settings {}: {}", path.display(), e),
            },
            Err(_) => log::info!("No settings at {}, using defaults", path.display()),
        }
        Self::default()
    }
}

/// Physical stats of a single car
///
/// Speeds are in pixels per tick; acceleration and deceleration are in
/// speed units per millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSpec {
    pub max_speed: f32,
    /// Speed gained per millisecond of held throttle
    pub acceleration: f32,
    /// Speed lost per millisecond while coasting
    pub deceleration: f32,
    /// Speed lost per millisecond while the e-brake is held
    pub e_brake_deceleration: f32,
    /// Degrees per tick at full speed
    pub handling: f32,
    /// Degrees per tick while sliding on the e-brake without throttle
    pub e_brake_handling: f32,
    /// Number of boosts available for the race
    pub boost_charges: u32,
    /// Footprint along the heading (pixels)
    pub length: u32,
    /// Footprint across the heading (pixels)
    pub width: u32,
}

impl Default for VehicleSpec {
    fn default() -> Self {
        Self {
            max_speed: 35.0,
            acceleration: 0.03,
            deceleration: 0.00125,
            e_brake_deceleration: 0.00375,
            handling: 3.15,
            e_brake_handling: 4.0,
            boost_charges: 0,
            length: CAR_LENGTH,
            width: CAR_WIDTH,
        }
    }
}

/// Ranges NPC stats are drawn from at race start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcSpecRange {
    pub max_speed: (f32, f32),
    pub handling: (f32, f32),
    pub acceleration: (f32, f32),
    pub deceleration: f32,
}

impl Default for NpcSpecRange {
    fn default() -> Self {
        Self {
            max_speed: (25.0, 35.0),
            handling: (2.0, 3.0),
            acceleration: (0.025, 0.05),
            deceleration: 0.00125,
        }
    }
}

impl NpcSpecRange {
    /// Draw a concrete spec from the ranges
    pub fn sample(&self, rng: &mut impl rand::Rng) -> VehicleSpec {
        fn draw(rng: &mut impl rand::Rng, (lo, hi): (f32, f32)) -> f32 {
            if hi > lo { rng.random_range(lo..=hi) } else { lo }
        }

        VehicleSpec {
            max_speed: draw(rng, self.max_speed),
            acceleration: draw(rng, self.acceleration),
            deceleration: self.deceleration,
            handling: draw(rng, self.handling),
            ..VehicleSpec::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: SimSettings = serde_json::from_str(r#"{ "dt_ms": 10.0 }"#).unwrap();
        assert_eq!(settings.dt_ms, 10.0);
        assert_eq!(settings.boundary_probe, BOUNDARY_PROBE_DISTANCE);
        assert_eq!(settings.sensor.ray_count, 5);
    }

    #[test]
    fn test_npc_sample_within_ranges() {
        let range = NpcSpecRange::default();
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..100 {
            let spec = range.sample(&mut rng);
            assert!((25.0..=35.0).contains(&spec.max_speed));
            assert!((2.0..=3.0).contains(&spec.handling));
            assert!((0.025..=0.05).contains(&spec.acceleration));
        }
    }

    #[test]
    fn test_npc_sample_degenerate_range() {
        let range = NpcSpecRange {
            max_speed: (30.0, 30.0),
            ..Default::default()
        };
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(range.sample(&mut rng).max_speed, 30.0);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let settings = SimSettings::load("/nonexistent/track-racer-settings.json");
        assert_eq!(settings, SimSettings::default());
    }
}
