//! Procedural demo circuit
//!
//! A rounded-rectangle ring: the road is every pixel whose distance from a
//! central rectangle lies between an inner and an outer radius. Cars start on
//! the left straight pointing up the screen and lap clockwise.

use glam::Vec2;

use super::collision::Rect;
use super::level::LevelDescription;
use super::mask::TrackImage;
use super::state::RaceSetup;
use super::vehicle::{ControlSource, StartPose};
use crate::settings::{NpcSpecRange, SimSettings, VehicleSpec};

pub const BOUNDARY: [u8; 4] = [0, 0, 0, 255];
pub const ROAD: [u8; 4] = [96, 96, 96, 255];

pub const WIDTH: u32 = 1600;
pub const HEIGHT: u32 = 1000;

const CENTER: Vec2 = Vec2::new(800.0, 500.0);
/// Half extents of the infield rectangle the road wraps around
const HALF: Vec2 = Vec2::new(400.0, 150.0);
const INNER_RADIUS: f32 = 80.0;
const OUTER_RADIUS: f32 = 320.0;
/// Distance of the racing line from the infield rectangle
const LINE_RADIUS: f32 = (INNER_RADIUS + OUTER_RADIUS) / 2.0;

fn infield_distance(p: Vec2) -> f32 {
    ((p - CENTER).abs() - HALF).max(Vec2::ZERO).length()
}

/// Whether `(x, y)` is on the road
pub fn on_road(x: f32, y: f32) -> bool {
    let d = infield_distance(Vec2::new(x, y));
    d > INNER_RADIUS && d <= OUTER_RADIUS
}

pub fn image() -> TrackImage {
    TrackImage::from_fn(WIDTH, HEIGHT, |x, y| {
        if on_road(x as f32 + 0.5, y as f32 + 0.5) {
            ROAD
        } else {
            BOUNDARY
        }
    })
}

/// Racing line: straight midpoints and three points around each corner
fn racing_line() -> Vec<Vec2> {
    let corners = [
        (Vec2::new(-1.0, -1.0), 180.0),
        (Vec2::new(1.0, -1.0), 270.0),
        (Vec2::new(1.0, 1.0), 0.0),
        (Vec2::new(-1.0, 1.0), 90.0),
    ];
    let straights = [
        Vec2::new(-1.0, 0.0),
        Vec2::new(0.0, -1.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 1.0),
    ];

    let mut points = Vec::new();
    for ((corner, start), straight) in corners.into_iter().zip(straights) {
        points.push(CENTER + straight * (HALF + LINE_RADIUS));
        let pivot = CENTER + corner * HALF;
        for step in 0..3 {
            points.push(pivot + crate::heading_to_vec(start + 45.0 * step as f32) * LINE_RADIUS);
        }
    }
    points
}

/// Layout with `npcs` scripted cars gridded behind the player
pub fn description(laps: u32, npcs: usize) -> LevelDescription {
    let lane_x = CENTER.x - HALF.x - LINE_RADIUS;

    let waypoint_groups = racing_line()
        .into_iter()
        .map(|p| vec![p, p + Vec2::splat(15.0), p - Vec2::splat(15.0)])
        .collect();

    let npc_starts = (0..npcs)
        .map(|i| {
            let lane = if i % 2 == 0 { -40.0 } else { 40.0 };
            let row = (i / 2) as f32;
            StartPose::new(lane_x + lane, CENTER.y + 120.0 + 50.0 * row, 270.0)
        })
        .collect();

    let road_left = CENTER.x - HALF.x - OUTER_RADIUS;
    LevelDescription {
        laps,
        boundary_color: BOUNDARY,
        color_tolerance: 8,
        finish_line: Rect::new(
            road_left as i32,
            CENTER.y as i32 - 40,
            (OUTER_RADIUS - INNER_RADIUS) as i32,
            80,
        ),
        player_start: StartPose::new(lane_x, CENTER.y + 70.0, 270.0),
        npc_starts,
        waypoint_groups,
    }
}

/// Tuning for a track this size: tighter waypoint window than the default
pub fn settings() -> SimSettings {
    SimSettings {
        waypoint_window: 120.0,
        ..SimSettings::default()
    }
}

/// Cars slow enough to take the corners
pub fn setup(player_source: ControlSource) -> RaceSetup {
    RaceSetup {
        player: VehicleSpec {
            max_speed: 11.0,
            handling: 3.2,
            boost_charges: 1,
            ..VehicleSpec::default()
        },
        player_source,
        npc_range: NpcSpecRange {
            max_speed: (8.0, 11.0),
            handling: (2.8, 3.5),
            ..NpcSpecRange::default()
        },
        player_sensor: true,
        npc_sensors: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_racing_line_stays_on_road() {
        let line = racing_line();
        assert_eq!(line.len(), 16);
        assert!((line[0] - Vec2::new(200.0, 500.0)).length() < 1e-3);
        for (i, p) in line.iter().enumerate() {
            assert!(on_road(p.x, p.y), "waypoint {i} at {p} is off the road");
            // Chord to the next point stays on the road too
            let next = line[(i + 1) % line.len()];
            let mid = (*p + next) / 2.0;
            assert!(on_road(mid.x, mid.y), "chord {i} leaves the road");
        }
    }

    #[test]
    fn test_grid_fits_on_the_road() {
        let desc = description(1, 6);
        let poses = std::iter::once(&desc.player_start).chain(&desc.npc_starts);
        for pose in poses {
            // Car footprint pointing up: 20 wide, 40 tall
            for (dx, dy) in [(-10.0, -20.0), (10.0, -20.0), (-10.0, 20.0), (10.0, 20.0)] {
                assert!(on_road(pose.x + dx, pose.y + dy));
            }
        }
        // The player sits just below the line
        let line = desc.finish_line;
        assert!(desc.player_start.y - 20.0 > (line.y + line.h) as f32 - 1.0);
    }
}
