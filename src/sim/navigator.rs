//! Waypoint following for non-player vehicles

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::CollisionProbe;
use super::vehicle::ControlSignals;
use crate::{bearing, signed_angle_diff};

/// Ordered steering targets with a wrapping cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointNavigator {
    targets: Vec<Vec2>,
    cursor: usize,
}

impl WaypointNavigator {
    pub fn new(targets: Vec<Vec2>) -> Self {
        if targets.is_empty() {
            log::warn!("Navigator created without waypoints; vehicle will drive straight");
        }
        Self { targets, cursor: 0 }
    }

    /// Pick one random point from each group, keeping group order
    pub fn from_groups(groups: &[Vec<Vec2>], rng: &mut impl Rng) -> Self {
        let targets = groups
            .iter()
            .filter(|group| !group.is_empty())
            .map(|group| group[rng.random_range(0..group.len())])
            .collect();
        Self::new(targets)
    }

    pub fn targets(&self) -> &[Vec2] {
        &self.targets
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current target; `None` when there is nothing valid to steer toward
    pub fn current_target(&self) -> Option<Vec2> {
        self.targets.get(self.cursor).copied()
    }

    /// Advance by exactly one target if `pos` is inside the window on both axes
    pub fn advance_if_reached(&mut self, pos: Vec2, window: f32) -> bool {
        let Some(target) = self.current_target() else {
            return false;
        };
        let delta = (target - pos).abs();
        if delta.x < window && delta.y < window {
            self.cursor = (self.cursor + 1) % self.targets.len();
            log::debug!("waypoint reached, next target #{}", self.cursor);
            true
        } else {
            false
        }
    }

    /// Control decision for this tick
    ///
    /// Throttle stays on unless the vehicle is colliding. Steering turns toward
    /// the target only once the heading error leaves the dead-band, and only
    /// while the car is moving and clear of collisions.
    pub fn decide(
        &mut self,
        pos: Vec2,
        heading: f32,
        speed: f32,
        collision: &CollisionProbe,
        window: f32,
        deadband: f32,
    ) -> ControlSignals {
        self.advance_if_reached(pos, window);

        let mut signals = ControlSignals {
            throttle: !collision.any(),
            ..Default::default()
        };
        if collision.any() || speed <= 0.0 {
            return signals;
        }

        if let Some(target) = self.current_target() {
            let diff = signed_angle_diff(heading, bearing(pos, target));
            if diff.abs() > deadband {
                // Negative: target is clockwise of the heading
                signals.turn_right = diff < 0.0;
                signals.turn_left = diff > 0.0;
            }
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn square() -> WaypointNavigator {
        WaypointNavigator::new(vec![
            Vec2::new(1000.0, 0.0),
            Vec2::new(1000.0, 1000.0),
            Vec2::new(0.0, 1000.0),
        ])
    }

    #[test]
    fn test_advances_one_per_tick_and_wraps() {
        let mut nav = square();
        // Inside the window of every target at once
        let pos = Vec2::new(500.0, 500.0);
        assert!(nav.advance_if_reached(pos, 600.0));
        assert_eq!(nav.cursor(), 1);
        assert!(nav.advance_if_reached(pos, 600.0));
        assert_eq!(nav.cursor(), 2);
        assert!(nav.advance_if_reached(pos, 600.0));
        assert_eq!(nav.cursor(), 0);
    }

    #[test]
    fn test_window_is_per_axis() {
        let mut nav = square();
        assert!(!nav.advance_if_reached(Vec2::new(1000.0, 500.0), 500.0));
        assert!(nav.advance_if_reached(Vec2::new(1000.0, 499.0), 500.0));
    }

    #[test]
    fn test_steers_toward_target() {
        let mut nav = WaypointNavigator::new(vec![Vec2::new(2000.0, 2000.0)]);
        let clear = CollisionProbe::clear();

        // Target is at 45 degrees, heading 0: clockwise, turn right
        let signals = nav.decide(Vec2::ZERO, 0.0, 10.0, &clear, 500.0, 1.5);
        assert!(signals.throttle && signals.turn_right && !signals.turn_left);

        // Heading 90: target is counter-clockwise, turn left
        let signals = nav.decide(Vec2::ZERO, 90.0, 10.0, &clear, 500.0, 1.5);
        assert!(signals.turn_left && !signals.turn_right);

        // Inside the dead-band: hold course
        let signals = nav.decide(Vec2::ZERO, 44.0, 10.0, &clear, 500.0, 1.5);
        assert!(!signals.turn_left && !signals.turn_right);
    }

    #[test]
    fn test_no_turn_while_stopped_or_colliding() {
        let mut nav = WaypointNavigator::new(vec![Vec2::new(0.0, 2000.0)]);
        let signals = nav.decide(Vec2::ZERO, 0.0, 0.0, &CollisionProbe::clear(), 500.0, 1.5);
        assert!(signals.throttle && !signals.turn_right);

        let hit = CollisionProbe {
            boundary: true,
            ..Default::default()
        };
        let signals = nav.decide(Vec2::ZERO, 0.0, 10.0, &hit, 500.0, 1.5);
        assert_eq!(signals, ControlSignals::default());
    }

    #[test]
    fn test_empty_route_coasts_straight() {
        let mut nav = WaypointNavigator::new(Vec::new());
        let signals = nav.decide(Vec2::ZERO, 0.0, 10.0, &CollisionProbe::clear(), 500.0, 1.5);
        assert!(signals.throttle);
        assert!(!signals.turn_left && !signals.turn_right);
        assert!(!nav.advance_if_reached(Vec2::ZERO, 500.0));
    }

    #[test]
    fn test_from_groups_picks_one_per_group() {
        let groups = vec![
            vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)],
            vec![Vec2::new(5.0, 5.0)],
            vec![Vec2::new(9.0, 0.0), Vec2::new(9.0, 1.0), Vec2::new(9.0, 2.0)],
        ];
        let mut rng = Pcg32::seed_from_u64(3);
        let nav = WaypointNavigator::from_groups(&groups, &mut rng);
        assert_eq!(nav.targets().len(), 3);
        for (target, group) in nav.targets().iter().zip(&groups) {
            assert!(group.contains(target));
        }
    }
}
