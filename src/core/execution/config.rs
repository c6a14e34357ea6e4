//! Configuration for a simulation run
//!
//! Holds the knobs that make a run reproducible and bound its length. Loading
//! these from files is left to the caller; the type derives `serde` so any
//! format works.

use crate::core::types::SimTime;
use serde::{Deserialize, Serialize};

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 0x5EED;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the run's random number generator
    pub seed: u64,
    /// Entities created before this time are left out of registry statistics
    pub warm_up: SimTime,
    /// `run` stops before processing anything scheduled after this time
    pub time_limit: Option<SimTime>,
}

impl SimulationConfig {
    /// Create a new simulation configuration with default values
    ///
    /// Default configuration uses [`DEFAULT_SEED`], no warm-up and no time limit
    pub fn new() -> Self {
        Self {
            seed: DEFAULT_SEED,
            warm_up: 0,
            time_limit: None,
        }
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the warm-up period
    ///
    /// # Arguments
    /// * `warm_up` - Time before which created entities are not counted
    pub fn with_warm_up(mut self, warm_up: SimTime) -> Self {
        self.warm_up = warm_up;
        self
    }

    /// Stop the run at `limit`
    pub fn with_time_limit(mut self, limit: SimTime) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}
