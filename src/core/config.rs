#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use std::path::Path;

use crate::error::{NetworkError, NetworkResult};

/// Scheduling policy for one activation pass.
///
/// - `SequentialRandomized`: fresh seeded permutation per pass, immediate
///   prepare+commit per unit (same-pass propagation downstream).
/// - `ParallelBatch`: every unit prepares against frozen state, then every
///   unit commits (order independent, one-pass delay downstream).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Schedule {
    #[default]
    SequentialRandomized,
    ParallelBatch {
        /// Worker threads; 0 means "let rayon decide".
        workers: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NetworkConfig {
    /// Seed for the visitation-order generator.
    pub seed: u64,
    pub schedule: Schedule,

    /// Logistic slope: `1 / (1 + exp(-gain * (net - offset)))`.
    pub squash_gain: f32,
    pub squash_offset: f32,

    pub learning_rate: f32,
    /// Discrepancy magnitudes below this leave weights untouched.
    pub learning_deadband: f32,

    pub dopaminergic_gain: f32,
    pub hippocampal_gain: f32,

    /// If true, sensory-association learning is driven by the hippocampal
    /// signal plus the dopaminergic signal; otherwise by the hippocampal
    /// signal alone.
    pub dopamine_gates_sensory: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            schedule: Schedule::SequentialRandomized,
            squash_gain: 1.0,
            squash_offset: 0.0,
            learning_rate: 0.1,
            learning_deadband: 0.0,
            dopaminergic_gain: 1.0,
            hippocampal_gain: 1.0,
            dopamine_gates_sensory: true,
        }
    }
}

impl NetworkConfig {
    /// Upper bound on explicit worker counts for the parallel schedule.
    pub const MAX_WORKERS: usize = 1024;

    /// Validate the configuration, returning an error message if invalid.
    pub fn validate(&self) -> NetworkResult<()> {
        if !self.squash_gain.is_finite() || self.squash_gain <= 0.0 {
            return Err(NetworkError::InvalidConfig("squash_gain must be finite and > 0"));
        }
        if !self.squash_offset.is_finite() {
            return Err(NetworkError::InvalidConfig("squash_offset must be finite"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(NetworkError::InvalidConfig("learning_rate must be >= 0"));
        }
        if !self.learning_deadband.is_finite() || self.learning_deadband < 0.0 {
            return Err(NetworkError::InvalidConfig("learning_deadband must be >= 0"));
        }
        if !self.dopaminergic_gain.is_finite() || !self.hippocampal_gain.is_finite() {
            return Err(NetworkError::InvalidConfig("discrepancy gains must be finite"));
        }
        if let Schedule::ParallelBatch { workers } = self.schedule {
            if workers > Self::MAX_WORKERS {
                return Err(NetworkError::InvalidConfig("too many parallel workers"));
            }
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_learning_rate(mut self, rate: f32) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn with_squash(mut self, gain: f32, offset: f32) -> Self {
        self.squash_gain = gain;
        self.squash_offset = offset;
        self
    }

    /// The logistic squashing function used by every computing neuron.
    #[inline]
    pub fn squash(&self, net: f32) -> f32 {
        1.0 / (1.0 + (-self.squash_gain * (net - self.squash_offset)).exp())
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> NetworkResult<Self> {
        let cfg: Self = serde_json::from_str(json).map_err(std::io::Error::from)?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[cfg(feature = "serde")]
    pub fn load_json(path: impl AsRef<Path>) -> NetworkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
