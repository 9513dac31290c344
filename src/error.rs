//! Load-time validation errors
//!
//! A race only starts from a validated level; nothing in here is raised
//! once ticking has begun.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("track image has zero area ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("track image expects {expected} pixels, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },
    #[error("race needs at least one lap")]
    NoLaps,
    #[error("finish line has zero area")]
    EmptyFinishLine,
    #[error("start pose {index} has a non-finite heading ({heading})")]
    InvalidHeading { index: usize, heading: f32 },
    #[error("start pose {index} ({x}, {y}) lies outside the {width}x{height} track")]
    StartOutOfBounds {
        index: usize,
        x: f32,
        y: f32,
        width: u32,
        height: u32,
    },
    #[error("waypoint group {0} is empty")]
    EmptyWaypointGroup(usize),
    #[error("level has {npcs} NPC(s) but no waypoint groups")]
    MissingWaypoints { npcs: usize },
    #[error("malformed level description: {0}")]
    Parse(#[from] serde_json::Error),
}
