//! Deterministic race simulation
//!
//! All racing logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by vehicle id)
//! - No rendering or platform dependencies

pub mod collision;
pub mod demo;
pub mod finish;
pub mod level;
pub mod mask;
pub mod navigator;
pub mod sensor;
pub mod state;
pub mod tick;
pub mod vehicle;

pub use collision::{Body, CollisionProbe, Rect, Side, Sides, probe_boundary, probe_pair, resolve};
pub use finish::{FinishLine, ZoneFlags};
pub use level::{Level, LevelDescription};
pub use mask::{BitMask, BoundaryMask, TrackImage, overlaps};
pub use navigator::WaypointNavigator;
pub use sensor::{Observation, SensorArray, SensorReading};
pub use state::{PLAYER_ID, RaceSetup, RaceSnapshot, RaceState, VehicleSnapshot};
pub use tick::{TickInput, tick};
pub use vehicle::{ControlSignals, ControlSource, Recovery, RecoveryKind, StartPose, Vehicle};
