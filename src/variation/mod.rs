//! Variation — turning the witness's picks into the next set of candidates
//!
//! Mutation perturbs a vector within a radius that cools round after round;
//! recombination blends and crosses several picks together.

pub mod crossover;
mod engine;
mod mutation;
mod schedule;

pub use engine::VariationEngine;
pub use mutation::{MutationMode, MutationScope};
pub use schedule::RadiusSchedule;
