//! Vehicle state and per-tick dynamics
//!
//! Player and NPC cars share the same physics. They differ only in where
//! their per-tick `ControlSignals` come from (`ControlSource`).
//!
//! Units: positions in pixels, heading in degrees (0 = +X, clockwise on
//! screen), speed in pixels per tick, time in milliseconds.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::collision::{CollisionProbe, Rect, Sides};
use super::mask::BitMask;
use super::navigator::WaypointNavigator;
use super::sensor::{Observation, SensorArray, SensorReading};
use crate::settings::{SimSettings, VehicleSpec};
use crate::{heading_to_vec, normalize_heading};

/// Resolved control inputs for one vehicle for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlSignals {
    pub turn_left: bool,
    pub turn_right: bool,
    pub throttle: bool,
    pub brake: bool,
    pub boost: bool,
}

/// Who decides a vehicle's control signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlSource {
    /// Keyboard input, supplied each tick
    Human,
    /// External decision-maker, supplied each tick
    Agent,
    /// Scripted waypoint follower
    Waypoints(WaypointNavigator),
}

impl ControlSource {
    pub fn is_scripted(&self) -> bool {
        matches!(self, ControlSource::Waypoints(_))
    }
}

/// Start position and heading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartPose {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
}

impl StartPose {
    pub fn new(x: f32, y: f32, heading: f32) -> Self {
        Self { x, y, heading }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryKind {
    Boundary,
    Vehicle,
}

/// Decaying push away from a collision
///
/// Each tick moves the car `remaining / divisor` pixels per touching axis,
/// then counts down, so the bounce starts strong and fades out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recovery {
    pub kind: RecoveryKind,
    pub remaining: u32,
    pub divisor: f32,
    pub sides: Sides,
}

impl Recovery {
    /// Total distance the correction will move along each touching axis
    pub fn total_push(&self) -> f32 {
        let n = self.remaining as f32;
        n * (n + 1.0) / 2.0 / self.divisor
    }
}

/// A car on track
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: u32,
    pub spec: VehicleSpec,
    pub source: ControlSource,
    /// Centre of the car
    pub pos: Vec2,
    /// Degrees in [0, 360)
    pub heading: f32,
    /// Pixels per tick, within [0, max_speed()]
    pub speed: f32,
    pub lap_count: i32,
    /// This tick's collision record
    pub collision: CollisionProbe,
    pub recovery: Option<Recovery>,
    /// How long the throttle has been held continuously
    ///
    /// Reported to controllers through the snapshot. Speed itself integrates
    /// `acceleration * dt` each tick, which from a standstill comes to
    /// `acceleration * throttle_held_ms` until the cap.
    pub throttle_held_ms: f32,
    /// Remaining boost time, if boosting
    pub boost_ms: Option<f32>,
    pub boost_charges: u32,
    pub sensor: Option<SensorArray>,
    pub readings: Vec<SensorReading>,
    /// Signals applied on the last tick
    pub last_signals: ControlSignals,
    mask: BitMask,
    mask_heading: i32,
}

impl Vehicle {
    pub fn new(id: u32, spec: VehicleSpec, pose: StartPose, source: ControlSource) -> Self {
        let heading = normalize_heading(pose.heading);
        let mask_heading = heading as i32;
        Self {
            id,
            spec,
            source,
            pos: Vec2::new(pose.x, pose.y),
            heading,
            speed: 0.0,
            lap_count: 0,
            collision: CollisionProbe::clear(),
            recovery: None,
            throttle_held_ms: 0.0,
            boost_ms: None,
            boost_charges: spec.boost_charges,
            sensor: None,
            readings: Vec::new(),
            last_signals: ControlSignals::default(),
            mask: BitMask::rotated_rect(spec.length, spec.width, mask_heading as f32),
            mask_heading,
        }
    }

    pub fn with_sensor(mut self, sensor: SensorArray) -> Self {
        self.sensor = Some(sensor);
        self
    }

    /// Occupancy mask for the current (truncated) heading
    pub fn mask(&self) -> &BitMask {
        &self.mask
    }

    /// Integer heading the mask was built for
    pub fn mask_heading(&self) -> i32 {
        self.mask_heading
    }

    /// World position of the mask's top-left pixel
    pub fn offset(&self) -> IVec2 {
        (self.pos - self.mask.size().as_vec2() / 2.0).floor().as_ivec2()
    }

    /// Bounding rectangle of the mask in world pixels
    pub fn rect(&self) -> Rect {
        let offset = self.offset();
        Rect::new(
            offset.x,
            offset.y,
            self.mask.width() as i32,
            self.mask.height() as i32,
        )
    }

    pub fn is_boosting(&self) -> bool {
        self.boost_ms.is_some()
    }

    /// Top speed, including any active boost
    pub fn max_speed(&self, settings: &SimSettings) -> f32 {
        if self.is_boosting() {
            self.spec.max_speed * settings.boost_speed_mult
        } else {
            self.spec.max_speed
        }
    }

    /// Acceleration, including any active boost
    pub fn acceleration(&self, settings: &SimSettings) -> f32 {
        if self.is_boosting() {
            self.spec.acceleration * settings.boost_accel_mult
        } else {
            self.spec.acceleration
        }
    }

    /// Sensor distances and speed for an external controller
    pub fn observation(&self) -> Observation {
        Observation {
            distances: self.readings.iter().map(|r| r.distance).collect(),
            speed: self.speed,
        }
    }

    /// Take this tick's collision record and react to it
    ///
    /// Boundary hits stop the car dead and reset the throttle timer; vehicle
    /// hits keep a fraction of the speed so two cars never lock together.
    /// Both start (or restart) a decaying recovery push.
    pub fn apply_collision(&mut self, probe: CollisionProbe, settings: &SimSettings) {
        self.collision = probe;

        if probe.boundary {
            self.speed = 0.0;
            self.throttle_held_ms = 0.0;
            let sides = if probe.sides.is_empty() {
                Sides::facing(self.heading)
            } else {
                probe.sides
            };
            self.recovery = Some(Recovery {
                kind: RecoveryKind::Boundary,
                remaining: settings.boundary_recovery_ticks,
                divisor: settings.boundary_recovery_divisor,
                sides,
            });
        } else if probe.vehicle {
            self.speed *= settings.vehicle_collision_speed_factor;
            self.recovery = Some(Recovery {
                kind: RecoveryKind::Vehicle,
                remaining: settings.vehicle_recovery_ticks,
                divisor: settings.vehicle_recovery_divisor,
                sides: probe.sides,
            });
        }
    }

    /// Advance one tick
    ///
    /// While recovering from a collision the car only slides back; otherwise
    /// speed, heading and position are integrated from `signals`.
    pub fn update(&mut self, signals: ControlSignals, settings: &SimSettings) {
        let dt = settings.dt_ms;
        self.last_signals = signals;
        self.update_boost(signals.boost, settings);

        if self.recovery.is_some() {
            self.step_recovery();
        } else {
            self.integrate_speed(signals, settings, dt);
            self.steer(signals, settings);
            self.pos += heading_to_vec(self.heading) * self.speed;
        }

        // Boost may have just expired
        self.speed = self.speed.clamp(0.0, self.max_speed(settings));
        self.refresh_mask();

        debug_assert!(self.speed >= 0.0 && self.speed <= self.max_speed(settings));
        debug_assert!((0.0..360.0).contains(&self.heading));
    }

    fn update_boost(&mut self, requested: bool, settings: &SimSettings) {
        if let Some(remaining) = self.boost_ms {
            let remaining = remaining - settings.dt_ms;
            self.boost_ms = (remaining > 0.0).then_some(remaining);
        } else if requested && self.boost_charges > 0 {
            self.boost_charges -= 1;
            self.boost_ms = Some(settings.boost_duration_ms);
            log::debug!("vehicle {} boosting ({} left)", self.id, self.boost_charges);
        }
    }

    fn step_recovery(&mut self) {
        let Some(recovery) = self.recovery.as_mut() else {
            return;
        };
        let step = recovery.remaining as f32 / recovery.divisor;
        self.pos += recovery.sides.push_direction() * step;
        recovery.remaining = recovery.remaining.saturating_sub(1);
        if recovery.remaining == 0 {
            self.recovery = None;
        }
    }

    fn integrate_speed(&mut self, signals: ControlSignals, settings: &SimSettings, dt: f32) {
        if signals.brake {
            self.throttle_held_ms = 0.0;
            self.speed -= self.spec.e_brake_deceleration * dt;
        } else if signals.throttle {
            self.throttle_held_ms += dt;
            self.speed += self.acceleration(settings) * dt;
        } else {
            self.throttle_held_ms = 0.0;
            self.speed -= self.spec.deceleration * dt;
        }
        self.speed = self.speed.clamp(0.0, self.max_speed(settings));
    }

    /// Turn rate grows with speed; no turning at a standstill
    fn steer(&mut self, signals: ControlSignals, settings: &SimSettings) {
        if self.speed <= 0.0 {
            return;
        }
        let mut rate = self.spec.handling * (self.speed / self.max_speed(settings));
        if signals.brake && !signals.throttle {
            rate = self.spec.e_brake_handling;
        }
        if signals.turn_left {
            self.heading -= rate;
        }
        if signals.turn_right {
            self.heading += rate;
        }
        self.heading = normalize_heading(self.heading);
    }

    /// Rebuild the occupancy mask when the integer heading changes
    fn refresh_mask(&mut self) {
        let heading = self.heading as i32;
        if heading != self.mask_heading {
            self.mask = BitMask::rotated_rect(self.spec.length, self.spec.width, heading as f32);
            self.mask_heading = heading;
        }
    }
}
