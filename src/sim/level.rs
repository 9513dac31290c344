//! Level description and validation
//!
//! A level is a track image plus a small JSON description of where things are.
//! Everything is checked once at load; the boundary mask built here is shared
//! read-only for the rest of the race.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::mask::{BoundaryMask, TrackImage};
use super::vehicle::StartPose;
use crate::error::LevelError;

/// Serialized level layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescription {
    /// Laps required to finish
    pub laps: u32,
    /// Pixel colour that marks the off-track boundary
    pub boundary_color: [u8; 4],
    /// Per-channel tolerance when matching `boundary_color`
    #[serde(default)]
    pub color_tolerance: u8,
    /// Finish line, crossed bottom to top: bottom half approach, top half arrival
    pub finish_line: Rect,
    pub player_start: StartPose,
    #[serde(default)]
    pub npc_starts: Vec<StartPose>,
    /// Ordered groups of candidate waypoints; NPCs pick one point per group
    #[serde(default)]
    pub waypoint_groups: Vec<Vec<Vec2>>,
}

impl LevelDescription {
    pub fn validate(&self, width: u32, height: u32) -> Result<(), LevelError> {
        if self.laps == 0 {
            return Err(LevelError::NoLaps);
        }
        if self.finish_line.w <= 0 || self.finish_line.h <= 0 {
            return Err(LevelError::EmptyFinishLine);
        }

        let starts = std::iter::once(&self.player_start).chain(&self.npc_starts);
        for (index, pose) in starts.enumerate() {
            let inside = pose.x >= 0.0
                && pose.y >= 0.0
                && pose.x < width as f32
                && pose.y < height as f32;
            if !inside {
                return Err(LevelError::StartOutOfBounds {
                    index,
                    x: pose.x,
                    y: pose.y,
                    width,
                    height,
                });
            }
            if !pose.heading.is_finite() {
                return Err(LevelError::InvalidHeading {
                    index,
                    heading: pose.heading,
                });
            }
        }

        if let Some(index) = self.waypoint_groups.iter().position(Vec::is_empty) {
            return Err(LevelError::EmptyWaypointGroup(index));
        }
        if !self.npc_starts.is_empty() && self.waypoint_groups.is_empty() {
            return Err(LevelError::MissingWaypoints {
                npcs: self.npc_starts.len(),
            });
        }
        Ok(())
    }
}

/// A validated level ready to race on
#[derive(Debug, Clone)]
pub struct Level {
    pub description: LevelDescription,
    pub boundary: BoundaryMask,
}

impl Level {
    pub fn new(description: LevelDescription, image: &TrackImage) -> Result<Self, LevelError> {
        image.validate()?;
        description.validate(image.width, image.height)?;
        let boundary = BoundaryMask::build(
            image,
            description.boundary_color,
            description.color_tolerance,
        );
        log::info!(
            "Loaded {}x{} level: {} lap(s), {} NPC start(s), {} waypoint group(s)",
            image.width,
            image.height,
            description.laps,
            description.npc_starts.len(),
            description.waypoint_groups.len()
        );
        Ok(Self {
            description,
            boundary,
        })
    }

    pub fn from_json(json: &str, image: &TrackImage) -> Result<Self, LevelError> {
        let description: LevelDescription = serde_json::from_str(json)?;
        Self::new(description, image)
    }

    pub fn laps(&self) -> u32 {
        self.description.laps
    }

    pub fn width(&self) -> u32 {
        self.boundary.width()
    }

    pub fn height(&self) -> u32 {
        self.boundary.height()
    }
}
