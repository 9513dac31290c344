//! Collision detection with directional disambiguation
//!
//! Two kinds of contact are resolved every tick:
//! - vehicle vs boundary: pixel-exact mask overlap
//! - vehicle vs vehicle: coarse bounding-rectangle overlap
//!
//! Knowing *that* something overlaps is not enough to push a car back out, so
//! both tests re-probe with the geometry shifted along ±X and ±Y. Whichever
//! shift of an axis overlaps more tells us which side the obstacle is on.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::mask::BitMask;

/// Integer axis-aligned rectangle in world pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict overlap; touching edges and empty rectangles never collide
    pub fn intersects(&self, other: &Rect) -> bool {
        self.w > 0
            && self.h > 0
            && other.w > 0
            && other.h > 0
            && self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    /// Overlapping area in square pixels
    pub fn intersection_area(&self, other: &Rect) -> u32 {
        if !self.intersects(other) {
            return 0;
        }
        let w = (self.x + self.w).min(other.x + other.w) - self.x.max(other.x);
        let h = (self.y + self.h).min(other.y + other.h) - self.y.max(other.y);
        (w * h) as u32
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    pub fn top_left(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.x as f32 + self.w as f32 / 2.0,
            self.y as f32 + self.h as f32 / 2.0,
        )
    }
}

/// Side of a vehicle an obstacle touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
    Up,
    Down,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Up => Side::Down,
            Side::Down => Side::Up,
        }
    }
}

/// Collision sides; at most one per axis is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sides {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl Sides {
    /// Mark a side as touching and its opposite as clear
    pub fn mark(&mut self, side: Side) {
        match side {
            Side::Left => (self.left, self.right) = (true, false),
            Side::Right => (self.left, self.right) = (false, true),
            Side::Up => (self.up, self.down) = (true, false),
            Side::Down => (self.up, self.down) = (false, true),
        }
    }

    /// The same contact seen from the other body
    pub fn mirrored(&self) -> Sides {
        Sides {
            left: self.right,
            right: self.left,
            up: self.down,
            down: self.up,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.left || self.right || self.up || self.down)
    }

    pub fn contains(&self, side: Side) -> bool {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
            Side::Up => self.up,
            Side::Down => self.down,
        }
    }

    /// Assume the obstacle lies ahead of a car facing `heading_deg`
    pub fn facing(heading_deg: f32) -> Sides {
        let dir = crate::heading_to_vec(heading_deg);
        let mut sides = Sides::default();
        if dir.x > 1e-3 {
            sides.mark(Side::Right);
        } else if dir.x < -1e-3 {
            sides.mark(Side::Left);
        }
        if dir.y > 1e-3 {
            sides.mark(Side::Down);
        } else if dir.y < -1e-3 {
            sides.mark(Side::Up);
        }
        sides
    }

    /// Unit-per-axis push away from the touching sides (screen coordinates, +Y down)
    pub fn push_direction(&self) -> Vec2 {
        let x = self.left as i32 - self.right as i32;
        let y = self.up as i32 - self.down as i32;
        Vec2::new(x as f32, y as f32)
    }
}

/// Per-tick collision record for one vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollisionProbe {
    pub boundary: bool,
    pub vehicle: bool,
    pub sides: Sides,
    /// Vehicle this one collided with, if any
    pub partner: Option<u32>,
}

impl CollisionProbe {
    pub fn clear() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.boundary || self.vehicle
    }
}

/// What the resolver needs to know about a vehicle
#[derive(Debug, Clone, Copy)]
pub struct Body<'a> {
    pub id: u32,
    pub rect: Rect,
    pub mask: &'a BitMask,
}

/// Mark the side of one axis whose probe overlaps more than its opposite
///
/// Equal overlap (a wall running along the axis, or a car wedged evenly)
/// leaves the axis unmarked.
fn classify_axis(sides: &mut Sides, toward: u32, away: u32, side: Side) {
    if toward > away {
        sides.mark(side);
    } else if away > toward {
        sides.mark(side.opposite());
    }
}

/// Sides of a vehicle mask that overlap the boundary at `offset`
///
/// `None` when the mask does not overlap at all. The mask is re-tested shifted
/// by `probe` along ±X and ±Y; the side whose shift still overlaps the most is
/// the side the boundary is on, and its opposite is clear. A corner sets one
/// side per axis.
pub fn probe_boundary(
    boundary: &BitMask,
    mask: &BitMask,
    offset: IVec2,
    probe: i32,
) -> Option<Sides> {
    if !boundary.intersects(mask, offset) {
        return None;
    }

    let count = |dx: i32, dy: i32| boundary.overlap_count(mask, offset + IVec2::new(dx, dy));
    let mut sides = Sides::default();
    classify_axis(&mut sides, count(probe, 0), count(-probe, 0), Side::Right);
    classify_axis(&mut sides, count(0, probe), count(0, -probe), Side::Down);
    Some(sides)
}

/// Sides of `a` touched by `b`, or `None` if the rectangles are apart
///
/// `b` is shifted along each axis; if it overlaps `a` more after moving +X it
/// came from `a`'s left, and so on. `b`'s own sides are the mirror image.
///
/// A shift longer than the cars often clears both ways, so a tied axis falls
/// back to which way `b`'s centre lies. The result is never empty: two cars
/// with the same centre are split along X.
pub fn probe_pair(a: Rect, b: Rect, probe: i32) -> Option<Sides> {
    if !a.intersects(&b) {
        return None;
    }

    let area = |dx: i32, dy: i32| a.intersection_area(&b.translated(dx, dy));
    let mut sides = Sides::default();
    classify_axis(&mut sides, area(probe, 0), area(-probe, 0), Side::Left);
    classify_axis(&mut sides, area(0, probe), area(0, -probe), Side::Up);

    let delta = b.center() - a.center();
    if !sides.left && !sides.right {
        side_toward(&mut sides, delta.x, Side::Right);
    }
    if !sides.up && !sides.down {
        side_toward(&mut sides, delta.y, Side::Down);
    }
    if sides.is_empty() {
        sides.mark(Side::Right);
    }
    Some(sides)
}

/// Mark `positive` if `delta > 0`, its opposite if `delta < 0`
fn side_toward(sides: &mut Sides, delta: f32, positive: Side) {
    if delta > 0.0 {
        sides.mark(positive);
    } else if delta < 0.0 {
        sides.mark(positive.opposite());
    }
}

/// Resolve collisions for every body against the others and the boundary
///
/// Pure with respect to the bodies: returns one probe per body, in input order,
/// and leaves applying the effects to each vehicle's owner.
///
/// Vehicle contacts are greedy: a body records the first other body it touches
/// (in input order) and stops looking. Each pair is probed once with the lower
/// index as `a`, so both partners always see mirrored sides. The boundary is
/// tested afterwards for every body and overrides the axes it touches.
pub fn resolve(
    bodies: &[Body<'_>],
    boundary: &BitMask,
    boundary_probe: i32,
    vehicle_probe: i32,
) -> Vec<CollisionProbe> {
    bodies
        .iter()
        .enumerate()
        .map(|(i, body)| {
            let mut probe = CollisionProbe::clear();

            for (j, other) in bodies.iter().enumerate() {
                if i == j {
                    continue;
                }
                let (lo, hi) = if i < j { (body, other) } else { (other, body) };
                if let Some(sides) = probe_pair(lo.rect, hi.rect, vehicle_probe) {
                    probe.vehicle = true;
                    probe.partner = Some(other.id);
                    probe.sides = if i < j { sides } else { sides.mirrored() };
                    break;
                }
            }

            if let Some(sides) =
                probe_boundary(boundary, body.mask, body.rect.top_left(), boundary_probe)
            {
                probe.boundary = true;
                for side in [Side::Left, Side::Right, Side::Up, Side::Down] {
                    if sides.contains(side) {
                        probe.sides.mark(side);
                    }
                }
            }

            if probe.any() {
                log::debug!(
                    "vehicle {} collision: boundary={} vehicle={:?} sides={:?}",
                    body.id,
                    probe.boundary,
                    probe.partner,
                    probe.sides
                );
            }
            probe
        })
        .collect()
}
