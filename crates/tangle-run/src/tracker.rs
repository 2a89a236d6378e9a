//! One-dimensional target tracking.
//!
//! The agent starts at 0 and must reach a random integer target in
//! `[-RANGE, RANGE]` by stepping left or right. Observations are the
//! position, the target, their signed distance and a bias cell.

use tangle_foundation::{ActionId, RngStream};
use tangle_graph::LearningEnvironment;
use tangle_vm::{DataSource, PrimitiveArray};

pub const RANGE: i32 = 10;
pub const NB_OBSERVATIONS: usize = 4;

/// Decisions allowed per episode.
const MAX_STEPS: u32 = 50;

#[derive(Debug, Clone)]
pub struct Tracker {
    position: f64,
    target: f64,
    steps: u32,
    observations: PrimitiveArray,
}

impl Tracker {
    pub fn new() -> Self {
        let mut tracker = Self {
            position: 0.0,
            target: 0.0,
            steps: 0,
            observations: PrimitiveArray::new(NB_OBSERVATIONS),
        };
        tracker.observe();
        tracker
    }

    pub fn observations(&self) -> &PrimitiveArray {
        &self.observations
    }

    fn distance(&self) -> f64 {
        (self.target - self.position).abs()
    }

    fn observe(&mut self) {
        let cells = self.observations.values_mut();
        cells[0] = self.position;
        cells[1] = self.target;
        cells[2] = self.target - self.position;
        cells[3] = 1.0;
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningEnvironment for Tracker {
    fn reset(&mut self, seed: u64) {
        let mut rng = RngStream::new(seed);
        self.position = 0.0;
        self.target = f64::from(rng.next_i32(-RANGE, RANGE));
        self.steps = 0;
        self.observe();
    }

    fn data_sources(&self) -> Vec<&dyn DataSource> {
        vec![&self.observations as &dyn DataSource]
    }

    /// 0 steps left, 1 steps right, anything else stays.
    fn do_action(&mut self, action: ActionId) {
        match action.raw() % 3 {
            0 => self.position -= 1.0,
            1 => self.position += 1.0,
            _ => {}
        }
        self.steps += 1;
        self.observe();
    }

    fn is_terminal(&self) -> bool {
        self.distance() < 0.5 || self.steps >= MAX_STEPS
    }

    /// Zero on the target, negative elsewhere, with a small penalty per step.
    fn score(&self) -> f64 {
        -self.distance() - 0.01 * f64::from(self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaching_the_target_ends_the_episode() {
        let mut tracker = Tracker::new();
        tracker.reset(3);
        let target = tracker.target;
        let step = if target < 0.0 { ActionId::new(0) } else { ActionId::new(1) };
        while !tracker.is_terminal() {
            tracker.do_action(step);
        }
        assert_eq!(tracker.position, target);
        assert!(tracker.score() <= 0.0);
        assert_eq!(tracker.observations().get(2), Some(0.0));
    }

    #[test]
    fn staying_put_times_out() {
        let mut tracker = Tracker::new();
        tracker.reset(1);
        if tracker.target == 0.0 {
            assert!(tracker.is_terminal());
            return;
        }
        while !tracker.is_terminal() {
            tracker.do_action(ActionId::new(2));
        }
        assert_eq!(tracker.steps, MAX_STEPS);
        assert_eq!(tracker.position, 0.0);
    }

    #[test]
    fn reset_is_seeded() {
        let mut a = Tracker::new();
        let mut b = Tracker::new();
        a.reset(42);
        b.reset(42);
        assert_eq!(a.observations().values(), b.observations().values());
    }
}
