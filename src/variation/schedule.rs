//! RadiusSchedule — how far offspring may stray from their parents
//!
//! Simulated annealing: wide exploration in the first rounds, converging on
//! the witness's memory later. The radius never increases from one round to
//! the next and never drops below the configured floor.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiusSchedule {
    pub initial_radius: f64,
    /// Fraction of the radius removed each round (0 = constant, 1 = straight to the floor)
    pub decay_per_round: f64,
    pub min_radius: f64,
}

impl Default for RadiusSchedule {
    fn default() -> Self {
        Self {
            initial_radius: 1.0,
            decay_per_round: 0.15,
            min_radius: 0.05,
        }
    }
}

impl RadiusSchedule {
    /// Perturbation radius for a round
    pub fn radius(&self, round: u32) -> f64 {
        let retained = (1.0 - self.decay_per_round).clamp(0.0, 1.0);
        let decayed = self.initial_radius * retained.powi(round.min(i32::MAX as u32) as i32);
        decayed.max(self.min_radius)
    }

    /// Cooling temperature in [0, 1] relative to the first round
    pub fn temperature(&self, round: u32) -> f64 {
        if self.initial_radius <= 0.0 {
            return 0.0;
        }
        (self.radius(round) / self.initial_radius).min(1.0)
    }

    /// First round at which the radius sits on its floor, if it ever does
    pub fn rounds_to_floor(&self) -> Option<u32> {
        if self.initial_radius <= self.min_radius {
            return Some(0);
        }
        if self.decay_per_round <= 0.0 {
            return None;
        }
        (0..=u16::MAX as u32).find(|&r| self.radius(r) <= self.min_radius)
    }
}
