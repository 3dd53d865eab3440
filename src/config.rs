//! Session configuration
//!
//! Loaded from JSON; every field has a default so partial files work.

use crate::error::{IdkitError, Result};
use crate::variation::{MutationMode, RadiusSchedule};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for one interactive session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Candidates shown per round (N)
    pub population_size: usize,
    /// Round at which the session stops without a final pick
    pub max_rounds: u32,
    pub variation: VariationConfig,
    pub decode: DecodeConfig,
    /// Seed for the session's random source; drawn from entropy when absent
    pub seed: Option<u64>,
}

/// Parameters of the variation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariationConfig {
    pub initial_radius: f64,
    pub decay_per_round: f64,
    pub min_radius: f64,
    /// Direct perturbations produced per elite (K)
    pub k_per_elite: usize,
    pub mutation: MutationMode,
    /// Probability of taking a component from the nearest selected partner
    /// when several candidates are picked (0 disables crossing-over)
    pub crossover_rate: f64,
    /// Over-produce one offspring and drop the farthest outlier
    pub prune_outliers: bool,
}

/// Model-call limits for decoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    pub timeout_ms: u64,
    /// Extra attempts after a timeout or transient model failure
    pub max_retries: u32,
    /// Decode a population's candidates concurrently
    pub parallel: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            population_size: 5,
            max_rounds: 20,
            variation: VariationConfig::default(),
            decode: DecodeConfig::default(),
            seed: None,
        }
    }
}

impl Default for VariationConfig {
    fn default() -> Self {
        Self {
            initial_radius: 1.0,
            decay_per_round: 0.15,
            min_radius: 0.05,
            k_per_elite: 3,
            mutation: MutationMode::default(),
            crossover_rate: 0.5,
            prune_outliers: true,
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 2,
            parallel: true,
        }
    }
}

impl SessionConfig {
    /// Few candidates, fast cooling
    pub fn quick() -> Self {
        Self {
            population_size: 4,
            max_rounds: 8,
            variation: VariationConfig {
                initial_radius: 0.8,
                decay_per_round: 0.3,
                min_radius: 0.05,
                k_per_elite: 3,
                ..VariationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Larger population, slow cooling
    pub fn thorough() -> Self {
        Self {
            population_size: 9,
            max_rounds: 40,
            variation: VariationConfig {
                initial_radius: 1.5,
                decay_per_round: 0.05,
                min_radius: 0.02,
                k_per_elite: 4,
                ..VariationConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the documented ranges of every parameter
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(IdkitError::Initialization(msg));
        if self.population_size < 2 {
            return fail(format!("population_size must be >= 2, got {}", self.population_size));
        }
        if self.max_rounds < 1 {
            return fail("max_rounds must be >= 1".to_string());
        }
        let v = &self.variation;
        if !(v.initial_radius > 0.0 && v.initial_radius.is_finite()) {
            return fail(format!("initial_radius must be > 0, got {}", v.initial_radius));
        }
        if !(0.0..=1.0).contains(&v.decay_per_round) {
            return fail(format!("decay_per_round must be in [0, 1], got {}", v.decay_per_round));
        }
        if !(v.min_radius >= 0.0 && v.min_radius.is_finite()) {
            return fail(format!("min_radius must be >= 0, got {}", v.min_radius));
        }
        if v.k_per_elite < 1 {
            return fail("k_per_elite must be >= 1".to_string());
        }
        if !(0.0..=1.0).contains(&v.crossover_rate) {
            return fail(format!("crossover_rate must be in [0, 1], got {}", v.crossover_rate));
        }
        if let crate::variation::MutationScope::Partial { rate } = v.mutation.scope() {
            if !(0.0..=1.0).contains(&rate) {
                return fail(format!("partial mutation rate must be in [0, 1], got {}", rate));
            }
        }
        if self.decode.timeout_ms == 0 {
            return fail("decode.timeout_ms must be > 0".to_string());
        }
        Ok(())
    }

    /// Load a configuration from a JSON file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| IdkitError::Initialization(format!("{}: {}", path.display(), e)))?;
        let config: SessionConfig = serde_json::from_str(&json)
            .map_err(|e| IdkitError::Initialization(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        info!("Loaded session config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl VariationConfig {
    pub fn schedule(&self) -> RadiusSchedule {
        RadiusSchedule {
            initial_radius: self.initial_radius,
            decay_per_round: self.decay_per_round,
            min_radius: self.min_radius,
        }
    }
}
