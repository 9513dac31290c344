//! Ray-cast distance sensors
//!
//! A fan of rays is cast from the vehicle's centre against the boundary.
//! Each ray is drawn as a one-pixel line mask in a square of side
//! `ray_length`, always pointing down-right. Rays that actually point left or
//! up are handled by testing against a boundary mask mirrored on that axis, so
//! the first hit found by the row-major overlap scan is also the nearest one.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::mask::{BitMask, BoundaryMask};
use crate::settings::SensorSettings;

/// One ray's result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Ray direction in degrees
    pub angle: f32,
    pub origin: Vec2,
    /// Boundary pixel the ray hit first, if any
    pub hit: Option<Vec2>,
    pub distance: f32,
}

/// What an external controller sees of a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub distances: Vec<f32>,
    pub speed: f32,
}

impl Observation {
    /// Flat feature vector: ray distances followed by speed
    pub fn features(&self) -> Vec<f32> {
        let mut out = self.distances.clone();
        out.push(self.speed);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorArray {
    pub settings: SensorSettings,
}

impl Default for SensorArray {
    fn default() -> Self {
        Self::new(SensorSettings::default())
    }
}

impl SensorArray {
    pub fn new(settings: SensorSettings) -> Self {
        Self { settings }
    }

    /// Distance reported by a ray that hits nothing
    pub fn max_distance(&self) -> f32 {
        let len = self.settings.ray_length as f32;
        len.hypot(len)
    }

    /// Ray directions, alternating out from the heading: 0, -s, +s, -2s, +2s...
    pub fn ray_angles(&self, heading: f32) -> Vec<f32> {
        let count = self.settings.ray_count;
        if count == 0 {
            return Vec::new();
        }
        let step = if count > 1 {
            self.settings.spread_deg / (count - 1) as f32
        } else {
            0.0
        };

        (0..count)
            .map(|k| {
                let magnitude = k.div_ceil(2) as f32 * step;
                if k % 2 == 1 {
                    heading - magnitude
                } else {
                    heading + magnitude
                }
            })
            .collect()
    }

    /// Cast every ray from `origin` against the boundary
    ///
    /// Zero rays or zero-length rays give an empty reading.
    pub fn cast(&self, origin: Vec2, heading: f32, boundary: &BoundaryMask) -> Vec<SensorReading> {
        let len = self.settings.ray_length;
        if len == 0 {
            return Vec::new();
        }

        let max_distance = self.max_distance();
        let origin_px = origin.floor().as_ivec2();
        let last_x = boundary.width() as i32 - 1;
        let last_y = boundary.height() as i32 - 1;

        self.ray_angles(heading)
            .into_iter()
            .map(|angle| {
                let (sin, cos) = angle.to_radians().sin_cos();
                let flip_x = cos < 0.0;
                let flip_y = sin < 0.0;

                let reach = (len - 1) as f32;
                let end = IVec2::new(
                    (reach * cos.abs()).round() as i32,
                    (reach * sin.abs()).round() as i32,
                );
                let mut beam = BitMask::new(len, len);
                beam.draw_line(IVec2::ZERO, end);

                let offset = IVec2::new(
                    if flip_x { last_x - origin_px.x } else { origin_px.x },
                    if flip_y { last_y - origin_px.y } else { origin_px.y },
                );

                // A ray starting inside the boundary is treated as unobstructed
                let hit = boundary
                    .variant(flip_x, flip_y)
                    .overlap(&beam, offset)
                    .filter(|&h| h != offset)
                    .map(|h| {
                        let x = if flip_x { last_x - h.x } else { h.x };
                        let y = if flip_y { last_y - h.y } else { h.y };
                        Vec2::new(x as f32, y as f32)
                    });

                SensorReading {
                    angle,
                    origin,
                    hit,
                    distance: hit.map_or(max_distance, |h| h.distance(origin)),
                }
            })
            .collect()
    }
}
