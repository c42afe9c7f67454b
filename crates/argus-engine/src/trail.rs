//! Bounded per-robot position history for path rendering.

use std::collections::{HashMap, VecDeque};

use argus_protocol::{Robot, RobotId};

/// One recorded trail sample, `(longitude, latitude)` to match the map
/// library's coordinate order.
pub type TrailPoint = (f64, f64);

/// Fixed-capacity position history per robot, oldest evicted first.
///
/// A sample is appended only when it differs from the last recorded one, so
/// a stationary robot does not grow its trail. Trails are created lazily on
/// the first position update and survive snapshot replacement; only a
/// session reset clears them.
#[derive(Debug)]
pub struct TrailBuffer {
    cap: usize,
    trails: HashMap<RobotId, VecDeque<TrailPoint>>,
}

impl TrailBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            trails: HashMap::new(),
        }
    }

    /// Record the robot's current position. No-op when it matches the last
    /// recorded sample.
    pub fn record(&mut self, robot: &Robot) {
        self.push(
            robot.id.clone(),
            (robot.position.longitude, robot.position.latitude),
        );
    }

    fn push(&mut self, id: RobotId, point: TrailPoint) {
        let trail = self.trails.entry(id).or_default();
        if trail.back() == Some(&point) {
            return;
        }
        trail.push_back(point);
        while trail.len() > self.cap {
            trail.pop_front();
        }
    }

    /// Oldest-first samples for a robot, if any position has been seen.
    pub fn trail(&self, id: &RobotId) -> Option<&VecDeque<TrailPoint>> {
        self.trails.get(id)
    }

    pub fn clear(&mut self) {
        self.trails.clear();
    }
}
