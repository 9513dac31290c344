//! Finish-line lap tracking
//!
//! The line is split into two halves along the direction of travel. A car
//! counts a lap when it clears into the arrival half having last been in the
//! approach half alone, and loses it again if it reverses back over the line.
//! Leaving the line altogether forgets which half it was in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::vehicle::Vehicle;

/// Which finish-line halves a vehicle was last seen in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneFlags {
    pub approach: bool,
    pub arrival: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishLine {
    approach: Rect,
    arrival: Rect,
    laps: u32,
    flags: BTreeMap<u32, ZoneFlags>,
    results: Vec<u32>,
}

impl FinishLine {
    /// Split `rect` for cars driving up the screen: they reach the bottom
    /// half (approach) first and leave through the top half (arrival)
    pub fn new(rect: Rect, laps: u32) -> Self {
        let top = rect.h / 2;
        let arrival = Rect::new(rect.x, rect.y, rect.w, top);
        let approach = Rect::new(rect.x, rect.y + top, rect.w, rect.h - top);
        Self::with_zones(approach, arrival, laps)
    }

    pub fn with_zones(approach: Rect, arrival: Rect, laps: u32) -> Self {
        Self {
            approach,
            arrival,
            laps,
            flags: BTreeMap::new(),
            results: Vec::new(),
        }
    }

    pub fn approach(&self) -> Rect {
        self.approach
    }

    pub fn arrival(&self) -> Rect {
        self.arrival
    }

    pub fn laps(&self) -> u32 {
        self.laps
    }

    pub fn flags(&self, id: u32) -> ZoneFlags {
        self.flags.get(&id).copied().unwrap_or_default()
    }

    /// Vehicle ids in finishing order
    pub fn results(&self) -> &[u32] {
        &self.results
    }

    /// Raised as soon as any vehicle has finished
    pub fn race_over(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn has_finished(&self, id: u32) -> bool {
        self.results.contains(&id)
    }

    /// 1-based finishing rank
    pub fn placement(&self, id: u32) -> Option<usize> {
        self.results.iter().position(|&r| r == id).map(|i| i + 1)
    }

    /// Evaluate crossings for every vehicle at its post-move position
    pub fn update(&mut self, vehicles: &mut [Vehicle]) {
        for vehicle in vehicles.iter_mut() {
            let rect = vehicle.rect();
            let flags = self.flags.entry(vehicle.id).or_default();
            let in_approach = self.approach.intersects(&rect);
            let in_arrival = self.arrival.intersects(&rect);

            match (in_approach, in_arrival) {
                (true, false) => {
                    if flags.arrival {
                        // Backed over the line
                        vehicle.lap_count -= 1;
                        log::info!("vehicle {} reversed over the line, lap {}", vehicle.id, vehicle.lap_count);
                    }
                    *flags = ZoneFlags { approach: true, arrival: false };
                }
                (false, true) => {
                    if flags.approach {
                        vehicle.lap_count += 1;
                        log::info!("vehicle {} crossed the line, lap {}", vehicle.id, vehicle.lap_count);
                    }
                    *flags = ZoneFlags { approach: false, arrival: true };
                }
                // Straddling decides nothing until the car clears one half
                (true, true) => {}
                (false, false) => *flags = ZoneFlags::default(),
            }

            if vehicle.lap_count > self.laps as i32 && !self.results.contains(&vehicle.id) {
                self.results.push(vehicle.id);
                log::info!("vehicle {} finished in place {}", vehicle.id, self.results.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::VehicleSpec;
    use crate::sim::vehicle::{ControlSource, StartPose};

    fn line() -> FinishLine {
        // Arrival y 100..150, approach y 150..200
        FinishLine::new(Rect::new(0, 100, 100, 100), 1)
    }

    /// Car pointing up the screen: 20 wide, 40 tall
    fn car_at(id: u32, y: f32) -> Vehicle {
        Vehicle::new(
            id,
            VehicleSpec::default(),
            StartPose::new(50.0, y, 270.0),
            ControlSource::Human,
        )
    }

    fn place(line: &mut FinishLine, cars: &mut [Vehicle], y: f32) -> i32 {
        cars[0].pos.y = y;
        line.update(cars);
        cars[0].lap_count
    }

    #[test]
    fn test_zones_split_the_line() {
        let line = line();
        assert_eq!(line.arrival(), Rect::new(0, 100, 100, 50));
        assert_eq!(line.approach(), Rect::new(0, 150, 100, 50));
    }

    #[test]
    fn test_round_trip_restores_lap_count() {
        let mut line = line();
        let mut cars = [car_at(0, 300.0)];
        assert_eq!(place(&mut line, &mut cars, 200.0), 0); // approach only
        assert!(line.flags(0).approach);
        assert_eq!(place(&mut line, &mut cars, 160.0), 0); // straddling
        assert_eq!(place(&mut line, &mut cars, 120.0), 1); // arrival only
        assert!(line.flags(0).arrival);
        assert_eq!(place(&mut line, &mut cars, 160.0), 1); // straddling again
        assert_eq!(place(&mut line, &mut cars, 200.0), 0); // back over
        assert!(line.flags(0).approach);
        assert!(line.results().is_empty());
    }

    #[test]
    fn test_rocking_on_the_line_counts_nothing() {
        let mut line = line();
        let mut cars = [car_at(0, 300.0)];
        for _ in 0..4 {
            assert_eq!(place(&mut line, &mut cars, 200.0), 0);
            assert_eq!(place(&mut line, &mut cars, 160.0), 0);
        }
        // Rocks on the far side without backing into the approach half alone
        let mut line = FinishLine::new(Rect::new(0, 100, 100, 100), 1);
        for y in [200.0, 160.0, 120.0, 160.0, 120.0, 160.0, 120.0] {
            place(&mut line, &mut cars, y);
        }
        assert_eq!(cars[0].lap_count, 1);
    }

    #[test]
    fn test_leaving_the_line_forgets_the_arrival() {
        let mut line = line();
        let mut cars = [car_at(0, 300.0)];
        for y in [200.0, 160.0, 120.0, 40.0] {
            place(&mut line, &mut cars, y);
        }
        assert_eq!(cars[0].lap_count, 1);
        assert_eq!(line.flags(0), ZoneFlags::default());
        // Next lap comes round into the approach half: no reversal
        assert_eq!(place(&mut line, &mut cars, 200.0), 1);
        assert_eq!(place(&mut line, &mut cars, 120.0), 2);
    }

    #[test]
    fn test_straddling_without_approach_does_not_count() {
        let mut line = line();
        let mut cars = [car_at(0, 300.0)];
        // Appears on the line without having come through the approach half
        assert_eq!(place(&mut line, &mut cars, 160.0), 0);
        assert_eq!(place(&mut line, &mut cars, 120.0), 0);
    }

    #[test]
    fn test_result_recorded_once() {
        let mut line = line();
        let mut cars = [car_at(0, 300.0), car_at(1, 500.0)];
        for _ in 0..2 {
            for y in [200.0, 160.0, 120.0, 40.0] {
                place(&mut line, &mut cars, y);
            }
        }
        assert_eq!(cars[0].lap_count, 2);
        assert_eq!(line.results(), &[0]);
        assert!(line.race_over());

        // Sitting past the line keeps the single entry
        for _ in 0..5 {
            line.update(&mut cars);
        }
        assert_eq!(line.results(), &[0]);
        assert_eq!(line.placement(0), Some(1));
        assert_eq!(line.placement(1), None);
        assert!(!line.has_finished(1));
    }
}
