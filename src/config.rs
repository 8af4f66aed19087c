//! Detector configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};

/// Configuration for a [`StreamController`](crate::StreamController) and its
/// isolation forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Number of most recent values the model is refit on (default: 20).
    pub window_size: usize,
    /// Expected fraction of anomalies, in (0, 0.5) (default: 0.05).
    pub contamination: f64,
    /// Number of isolation trees (default: 100).
    pub n_estimators: usize,
    /// Upper bound on points drawn per tree (default: 256).
    pub max_samples: usize,
    /// Refit on every k-th active tick (default: 1, every tick).
    pub refit_every: usize,
    /// Seed for tree construction; `None` seeds from entropy.
    pub random_state: Option<u64>,
    /// Tree-building threads: 1 builds sequentially, 0 uses every core.
    pub n_jobs: usize,
    /// Newest values kept for sinks; `None` keeps the full history.
    pub history_limit: Option<usize>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            contamination: 0.05,
            n_estimators: 100,
            max_samples: 256,
            refit_every: 1,
            random_state: None,
            n_jobs: 1,
            history_limit: None,
        }
    }
}

impl DetectorConfig {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_refit_every(mut self, refit_every: usize) -> Self {
        self.refit_every = refit_every;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Resolved tree-building thread count.
    pub fn threads(&self) -> usize {
        if self.n_jobs == 0 {
            num_cpus::get()
        } else {
            self.n_jobs
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(DetectorError::invalid_parameter(
                "window_size",
                "must be a positive integer",
            ));
        }
        if !(self.contamination > 0.0 && self.contamination < 0.5) {
            return Err(DetectorError::invalid_parameter(
                "contamination",
                format!("must lie in (0, 0.5), got {}", self.contamination),
            ));
        }
        if self.n_estimators == 0 {
            return Err(DetectorError::invalid_parameter(
                "n_estimators",
                "must be at least 1",
            ));
        }
        if self.max_samples < 2 {
            return Err(DetectorError::invalid_parameter(
                "max_samples",
                "must be at least 2",
            ));
        }
        if self.refit_every == 0 {
            return Err(DetectorError::invalid_parameter(
                "refit_every",
                "must be at least 1",
            ));
        }
        if let Some(limit) = self.history_limit {
            if limit < self.window_size {
                return Err(DetectorError::invalid_parameter(
                    "history_limit",
                    format!("must be at least window_size ({})", self.window_size),
                ));
            }
        }
        Ok(())
    }
}
