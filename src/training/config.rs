//! Trainer configuration

use crate::config::DEFAULT_ACCEPTANCE_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Configuration for model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Best held-out R² must reach this for the model to be kept
    pub acceptance_threshold: f64,
    /// Seed handed to stochastic estimators
    pub random_state: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            random_state: 42,
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}
