//! Track Racer - simulation core of a top-down racing game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (vehicle dynamics, collisions, sensors, laps)
//! - `settings`: Data-driven tuning for the simulation and car stats
//! - `error`: Load-time validation errors

pub mod error;
pub mod settings;
pub mod sim;

pub use error::LevelError;
pub use settings::{NpcSpecRange, SensorSettings, SimSettings, VehicleSpec};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (50 Hz)
    pub const SIM_DT_MS: f32 = 20.0;

    /// Boundary collision probe shift (pixels)
    pub const BOUNDARY_PROBE_DISTANCE: i32 = 30;
    /// Vehicle-vehicle collision probe shift (pixels)
    pub const VEHICLE_PROBE_DISTANCE: i32 = 60;

    /// Boundary recovery: ticks of correction and step divisor
    pub const BOUNDARY_RECOVERY_TICKS: u32 = 50;
    pub const BOUNDARY_RECOVERY_DIVISOR: f32 = 5.0;
    /// Vehicle recovery: ticks of correction and step divisor
    pub const VEHICLE_RECOVERY_TICKS: u32 = 80;
    pub const VEHICLE_RECOVERY_DIVISOR: f32 = 20.0;
    /// Fraction of speed kept after hitting another vehicle
    pub const VEHICLE_COLLISION_SPEED_FACTOR: f32 = 0.15;

    /// NPC waypoint proximity window, per axis (pixels)
    pub const WAYPOINT_WINDOW: f32 = 500.0;
    /// NPC steering dead-band (degrees)
    pub const STEERING_DEADBAND: f32 = 1.5;

    /// Boost multipliers and duration
    pub const BOOST_SPEED_MULT: f32 = 1.4;
    pub const BOOST_ACCEL_MULT: f32 = 4.0;
    pub const BOOST_DURATION_MS: f32 = 4000.0;

    /// Sensor fan defaults
    pub const SENSOR_RAY_COUNT: usize = 5;
    pub const SENSOR_SPREAD_DEG: f32 = 120.0;
    pub const SENSOR_RAY_LENGTH: u32 = 500;

    /// Car footprint (pixels, heading 0 points along +X)
    pub const CAR_LENGTH: u32 = 40;
    pub const CAR_WIDTH: u32 = 20;
}

/// Normalize a heading in degrees to [0, 360)
#[inline]
pub fn normalize_heading(heading: f32) -> f32 {
    let h = heading.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if h >= 360.0 { 0.0 } else { h }
}

/// Signed shortest difference `from - to` in degrees, in (-180, 180]
///
/// Negative means `to` lies clockwise of `from` (turn right, heading grows).
#[inline]
pub fn signed_angle_diff(from: f32, to: f32) -> f32 {
    let diff = (from - to + 180.0).rem_euclid(360.0) - 180.0;
    if diff <= -180.0 { 180.0 } else { diff }
}

/// Unit direction for a heading in degrees (0 = +X, 90 = +Y, screen coordinates)
#[inline]
pub fn heading_to_vec(heading: f32) -> Vec2 {
    let rad = heading.to_radians();
    Vec2::new(rad.cos(), rad.sin())
}

/// Bearing in degrees [0, 360) from `from` toward `to`
#[inline]
pub fn bearing(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    normalize_heading(d.y.atan2(d.x).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_heading_wraps() {
        assert_eq!(normalize_heading(0.0), 0.0);
        assert_eq!(normalize_heading(360.0), 0.0);
        assert!((normalize_heading(-90.0) - 270.0).abs() < 1e-4);
        assert!((normalize_heading(725.0) - 5.0).abs() < 1e-3);
        assert_eq!(normalize_heading(-1e-9), 0.0);
    }

    #[test]
    fn test_signed_angle_diff() {
        // Target 10 degrees clockwise: negative diff
        assert!((signed_angle_diff(0.0, 10.0) + 10.0).abs() < 1e-4);
        assert!((signed_angle_diff(10.0, 0.0) - 10.0).abs() < 1e-4);
        // Shortest way across the 0/360 seam
        assert!((signed_angle_diff(350.0, 10.0) + 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_bearing() {
        assert!((bearing(Vec2::ZERO, Vec2::new(10.0, 0.0))).abs() < 1e-4);
        assert!((bearing(Vec2::ZERO, Vec2::new(0.0, 10.0)) - 90.0).abs() < 1e-4);
        assert!((bearing(Vec2::ZERO, Vec2::new(0.0, -10.0)) - 270.0).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn prop_normalize_heading_in_range(h in -1.0e6f32..1.0e6) {
            let n = normalize_heading(h);
            prop_assert!((0.0..360.0).contains(&n));
        }

        #[test]
        fn prop_normalize_is_periodic(h in 0.0f32..360.0, k in -20i32..20) {
            let a = normalize_heading(h);
            let b = normalize_heading(h + 360.0 * k as f32);
            // Equal modulo the seam at 0/360
            let d = (a - b).abs();
            prop_assert!(d < 1e-2 || (360.0 - d) < 1e-2);
        }

        #[test]
        fn prop_normalize_is_idempotent(h in -1.0e4f32..1.0e4) {
            let n = normalize_heading(h);
            prop_assert_eq!(normalize_heading(n), n);
        }
    }
}
