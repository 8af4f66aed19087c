// src/models/iforest.rs

use rand::prelude::*;
use rand::seq::index;
use rayon::prelude::*;
use std::cmp;

use crate::config::DetectorConfig;
use crate::error::{ensure_finite, DetectorError, Result};
use crate::models::base_model::{BaseModel, FitOutcome};
use crate::models::itree::{average_path_length, IsolationTree};
use crate::utils::window_stats::WindowStats;

/// Smallest window an isolation forest can be fit on.
pub const MIN_FIT_SAMPLES: usize = 2;

/// Isolation forest over a scalar window, rebuilt from scratch on every
/// refit.
///
/// Scores follow the decision-function convention: `score_samples(x)` minus
/// an offset placed at the `contamination` quantile of the training scores,
/// so roughly that fraction of the window scores below zero.
pub struct IsolationForestImpl {
    n_estimators: usize,
    max_samples: usize,
    contamination: f64,
    rng: StdRng,
    pool: Option<rayon::ThreadPool>,

    trees: Vec<IsolationTree>,
    sample_size: usize,
    offset: f64,
    fitted: bool,
    degenerate: bool,
}

impl IsolationForestImpl {
    pub fn new(
        n_estimators: usize,
        max_samples: usize,
        contamination: f64,
        random_state: Option<u64>,
    ) -> Self {
        let seed = random_state.unwrap_or_else(|| rand::random());
        IsolationForestImpl {
            n_estimators,
            max_samples,
            contamination,
            rng: StdRng::seed_from_u64(seed),
            pool: None,
            trees: Vec::new(),
            sample_size: 0,
            offset: 0.0,
            fitted: false,
            degenerate: false,
        }
    }

    /// Build from a validated config, with a dedicated thread pool when more
    /// than one job is requested.
    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        config.validate()?;
        let mut model = Self::new(
            config.n_estimators,
            config.max_samples,
            config.contamination,
            config.random_state,
        );
        let threads = config.threads();
        if threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| DetectorError::invalid_parameter("n_jobs", e.to_string()))?;
            model.pool = Some(pool);
        }
        Ok(model)
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn grow_trees(&mut self, window: &[f64]) -> Vec<IsolationTree> {
        let n = window.len();
        let sample_size = self.sample_size;
        let height_limit = (sample_size as f64).log2().ceil() as usize;

        // Seeds come from the model rng so a fixed random_state gives the same
        // forest whether or not the trees are grown in parallel.
        let seeds: Vec<u64> = (0..self.n_estimators).map(|_| self.rng.gen()).collect();

        let grow = |seed: &u64| {
            let mut rng = StdRng::seed_from_u64(*seed);
            let sample: Vec<f64> = index::sample(&mut rng, n, sample_size)
                .into_iter()
                .map(|i| window[i])
                .collect();
            IsolationTree::fit(&sample, height_limit, &mut rng)
        };

        match &self.pool {
            Some(pool) => pool.install(|| seeds.par_iter().map(grow).collect()),
            None => seeds.iter().map(grow).collect(),
        }
    }

    /// Opposite of the anomaly score of the original isolation forest paper:
    /// always in [-1, 0), lower is more abnormal.
    pub fn score_samples(&self, x: f64) -> f64 {
        if self.trees.is_empty() {
            return -0.5;
        }
        let mean_depth =
            self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm > 0.0 {
            -(2f64.powf(-mean_depth / norm))
        } else {
            -1.0
        }
    }
}

impl BaseModel for IsolationForestImpl {
    fn refit(&mut self, window: &[f64]) -> Result<FitOutcome> {
        if window.len() < MIN_FIT_SAMPLES {
            return Err(DetectorError::InsufficientData {
                required: MIN_FIT_SAMPLES,
                got: window.len(),
            });
        }
        for &v in window {
            ensure_finite(v)?;
        }

        let stats = WindowStats::from_slice(window);
        if stats.is_degenerate() {
            if !self.degenerate {
                tracing::warn!(
                    window = window.len(),
                    value = stats.mean,
                    "degenerate window, scoring every value as normal"
                );
            }
            self.trees.clear();
            self.sample_size = 0;
            self.offset = 0.0;
            self.degenerate = true;
            self.fitted = true;
            return Ok(FitOutcome::Degenerate);
        }

        self.sample_size = cmp::min(self.max_samples, window.len());
        self.trees = self.grow_trees(window);

        let mut train: Vec<f64> = window.iter().map(|&x| self.score_samples(x)).collect();
        self.offset = percentile(&mut train, 100.0 * self.contamination);
        self.degenerate = false;
        self.fitted = true;

        tracing::debug!(
            trees = self.trees.len(),
            sample_size = self.sample_size,
            offset = self.offset,
            std = stats.std,
            "isolation forest refit"
        );
        Ok(FitOutcome::Fitted)
    }

    fn score(&self, value: f64) -> Result<f64> {
        if !self.fitted {
            return Err(DetectorError::ModelNotFit);
        }
        let value = ensure_finite(value)?;
        if self.degenerate {
            return Ok(0.0);
        }
        Ok(self.score_samples(value) - self.offset)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

/// Linear-interpolation percentile, `q` in [0, 100]. Sorts `values` in place.
fn percentile(values: &mut [f64], q: f64) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let rank = (q / 100.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    values[lo] + (values[hi] - values[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest(seed: u64) -> IsolationForestImpl {
        IsolationForestImpl::new(100, 256, 0.05, Some(seed))
    }

    #[test]
    fn test_score_before_refit_is_model_not_fit() {
        let model = forest(0);
        assert!(!model.is_fitted());
        assert!(matches!(model.score(1.0), Err(DetectorError::ModelNotFit)));
    }

    #[test]
    fn test_refit_needs_two_points() {
        let mut model = forest(0);
        assert!(matches!(
            model.refit(&[1.0]),
            Err(DetectorError::InsufficientData { required: 2, got: 1 })
        ));
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_refit_rejects_non_finite_window() {
        let mut model = forest(0);
        assert!(matches!(
            model.refit(&[1.0, f64::NAN, 2.0]),
            Err(DetectorError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_degenerate_window_scores_everything_normal() {
        let mut model = forest(3);
        assert_eq!(model.refit(&[5.0; 20]).unwrap(), FitOutcome::Degenerate);
        assert!(model.is_degenerate());
        assert_eq!(model.score(5.0).unwrap(), 0.0);
        assert_eq!(model.score(1e9).unwrap(), 0.0);
    }

    #[test]
    fn test_extreme_value_scores_negative() {
        let mut model = forest(11);
        let mut window = vec![0.0; 29];
        window.push(1000.0);
        assert_eq!(model.refit(&window).unwrap(), FitOutcome::Fitted);
        assert!(model.score(1000.0).unwrap() < 0.0);
        assert!(model.score(0.0).unwrap() >= 0.0);
    }

    #[test]
    fn test_degenerate_then_recovers() {
        let mut model = forest(5);
        model.refit(&[1.0; 5]).unwrap();
        assert!(model.is_degenerate());
        assert_eq!(model.refit(&[1.0, 1.0, 1.0, 1.0, 50.0]).unwrap(), FitOutcome::Fitted);
        assert!(!model.is_degenerate());
        assert!(model.score(50.0).unwrap() < 0.0);
    }

    #[test]
    fn test_roughly_contamination_fraction_below_zero() {
        let mut rng = StdRng::seed_from_u64(9);
        let window: Vec<f64> = (0..200).map(|_| rng.gen::<f64>() * 10.0).collect();
        let mut model = forest(9);
        model.refit(&window).unwrap();
        let flagged = window
            .iter()
            .filter(|&&x| model.score(x).unwrap() < 0.0)
            .count();
        assert!(flagged <= 20, "flagged {} of 200", flagged);
    }

    #[test]
    fn test_seeded_forest_is_reproducible_across_thread_counts() {
        let window: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64).collect();
        let config = DetectorConfig::new(50).with_random_state(21);

        let mut sequential = IsolationForestImpl::from_config(&config).unwrap();
        let mut parallel =
            IsolationForestImpl::from_config(&config.clone().with_n_jobs(4)).unwrap();
        sequential.refit(&window).unwrap();
        parallel.refit(&window).unwrap();

        for x in [0.0, 5.0, 10.0, 42.0] {
            assert_eq!(sequential.score(x).unwrap(), parallel.score(x).unwrap());
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&mut values, 0.0), 1.0);
        assert_eq!(percentile(&mut values, 100.0), 5.0);
        assert!((percentile(&mut values, 5.0) - 1.2).abs() < 1e-12);
    }
}
