//! The streaming detection loop.
//!
//! Each tick appends one value, refits the model on the newest window once
//! enough history exists, scores the value against that fit and records it
//! when the score is negative. The window handed to the model includes the
//! value being scored, so every observation takes part in its own baseline.

use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::DetectorConfig;
use crate::error::{ensure_finite, Result};
use crate::models::base_model::{BaseModel, FitOutcome};
use crate::models::iforest::IsolationForestImpl;
use crate::stream::sink::{Sink, TickFrame};
use crate::stream::source::Source;
use crate::utils::anomaly_log::{AnomalyLog, AnomalyRecord};
use crate::utils::evaluation::{RunEvaluator, RunSummary};
use crate::utils::window::WindowBuffer;

/// Controller lifecycle. Warming lasts until more than `window_size` values
/// have been seen; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Warming,
    Active,
}

/// Result of processing a single observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickOutcome {
    /// 1-based stream index of the observation.
    pub index: usize,
    pub value: f64,
    /// State after the observation was appended.
    pub state: StreamState,
    /// Decision score, `None` when the tick was not scored.
    pub score: Option<f64>,
    /// Whether the model was refit on this tick.
    pub refit: bool,
    pub is_anomaly: bool,
}

/// Loop controls for [`StreamController::run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop after this many ticks; `None` runs until the source ends.
    pub max_ticks: Option<usize>,
    /// Pause between ticks.
    pub interval: Duration,
}

/// Owns the window, the model and the anomaly log for one run.
pub struct StreamController<M: BaseModel = IsolationForestImpl> {
    config: DetectorConfig,
    buffer: WindowBuffer,
    model: M,
    log: AnomalyLog,
    state: StreamState,
    active_ticks: usize,
    evaluator: RunEvaluator,
}

impl StreamController<IsolationForestImpl> {
    /// Controller backed by an isolation forest built from `config`.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        let model = IsolationForestImpl::from_config(&config)?;
        Self::with_model(config, model)
    }
}

impl<M: BaseModel> StreamController<M> {
    pub fn with_model(config: DetectorConfig, model: M) -> Result<Self> {
        config.validate()?;
        let buffer = match config.history_limit {
            Some(limit) => WindowBuffer::with_history_limit(config.window_size, limit),
            None => WindowBuffer::new(config.window_size),
        };
        Ok(StreamController {
            config,
            buffer,
            model,
            log: AnomalyLog::new(),
            state: StreamState::Warming,
            active_ticks: 0,
            evaluator: RunEvaluator::default(),
        })
    }

    /// Replace the evaluator, e.g. to change its progress interval.
    pub fn with_evaluator(mut self, evaluator: RunEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Process one observation.
    ///
    /// A NaN or infinite value is rejected before any state changes. Missing
    /// data or an unfit model only skip scoring for this tick.
    pub fn process(&mut self, value: f64) -> Result<TickOutcome> {
        let value = ensure_finite(value)?;
        let started = Instant::now();

        self.buffer.append(value);
        let index = self.buffer.size();

        if self.state == StreamState::Warming && self.buffer.is_full() {
            self.state = StreamState::Active;
            tracing::info!(
                index,
                window_size = self.config.window_size,
                "window filled, scoring enabled"
            );
        }

        let mut outcome = TickOutcome {
            index,
            value,
            state: self.state,
            score: None,
            refit: false,
            is_anomaly: false,
        };

        if self.state == StreamState::Active {
            let refit_due = self.active_ticks % self.config.refit_every == 0;
            self.active_ticks += 1;

            match self.score_tick(value, refit_due) {
                Ok((score, refit)) => {
                    outcome.score = Some(score);
                    outcome.refit = refit;
                }
                Err(e) if e.is_recoverable() => {
                    tracing::debug!(index, error = %e, "tick not scored");
                }
                Err(e) => return Err(e),
            }

            if let Some(score) = outcome.score {
                if score < 0.0 {
                    self.log.record(index, value);
                    outcome.is_anomaly = true;
                }
            }
        }

        self.evaluator
            .record_tick(started.elapsed(), outcome.score.is_some(), outcome.is_anomaly);
        tracing::trace!(index, value, score = ?outcome.score, "tick processed");
        Ok(outcome)
    }

    fn score_tick(&mut self, value: f64, refit_due: bool) -> Result<(f64, bool)> {
        let mut refit = false;
        if refit_due || !self.model.is_fitted() {
            let window = self.buffer.window()?;
            let started = Instant::now();
            let fit = self.model.refit(window)?;
            self.evaluator.record_refit(started.elapsed());
            if fit == FitOutcome::Degenerate {
                tracing::debug!(index = self.buffer.size(), "refit on constant window");
            }
            refit = true;
        }
        let score = self.model.score(value)?;
        Ok((score, refit))
    }

    /// Drive the tick loop until the source ends or `max_ticks` is reached.
    ///
    /// Every tick is applied in full (append, refit, score, log, emit) before
    /// the pause, so interrupting between ticks leaves consistent state.
    pub fn run<S, K>(&mut self, mut source: S, mut sink: K, options: RunOptions) -> Result<RunSummary>
    where
        S: Source,
        K: Sink,
    {
        let mut ticks = 0usize;
        while options.max_ticks.map_or(true, |max| ticks < max) {
            let Some(value) = source.next_value() else {
                tracing::info!(ticks, "source exhausted");
                break;
            };

            let outcome = self.process(value)?;
            ticks += 1;

            if outcome.is_anomaly {
                if let (Some(record), Some(score)) = (self.log.last(), outcome.score) {
                    sink.on_anomaly(record, score)?;
                }
            }
            sink.emit(&TickFrame {
                outcome: &outcome,
                history: self.buffer.history(),
                first_index: self.buffer.first_index(),
                anomalies: self.log.all(),
            })?;

            if !options.interval.is_zero() {
                thread::sleep(options.interval);
            }
        }
        Ok(self.evaluator.summary())
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == StreamState::Active
    }

    /// Total observations processed.
    pub fn size(&self) -> usize {
        self.buffer.size()
    }

    pub fn history(&self) -> &[f64] {
        self.buffer.history()
    }

    pub fn buffer(&self) -> &WindowBuffer {
        &self.buffer
    }

    pub fn anomalies(&self) -> &[AnomalyRecord] {
        self.log.all()
    }

    pub fn anomaly_log(&self) -> &AnomalyLog {
        &self.log
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn evaluator(&self) -> &RunEvaluator {
        &self.evaluator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectorError;
    use crate::stream::sink::MemorySink;

    fn controller(window_size: usize) -> StreamController {
        StreamController::new(
            DetectorConfig::new(window_size)
                .with_random_state(42)
                .with_n_estimators(50),
        )
        .unwrap()
    }

    /// Counts calls and always reports a fixed score.
    struct FixedModel {
        score: f64,
        refits: usize,
    }

    impl BaseModel for FixedModel {
        fn refit(&mut self, _window: &[f64]) -> Result<FitOutcome> {
            self.refits += 1;
            Ok(FitOutcome::Fitted)
        }

        fn score(&self, _value: f64) -> Result<f64> {
            if self.refits == 0 {
                return Err(DetectorError::ModelNotFit);
            }
            Ok(self.score)
        }

        fn is_fitted(&self) -> bool {
            self.refits > 0
        }
    }

    #[test]
    fn test_reference_scenario() {
        let mut ctl = controller(5);
        let values = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 50.0];
        let outcomes: Vec<TickOutcome> = values.iter().map(|&v| ctl.process(v).unwrap()).collect();

        for o in &outcomes[..5] {
            assert_eq!(o.state, StreamState::Warming);
            assert!(o.score.is_none());
        }
        assert_eq!(outcomes[5].state, StreamState::Active);
        assert!(!outcomes[5].is_anomaly);
        assert!(outcomes[6].score.unwrap() < 0.0);
        assert!(outcomes[6].is_anomaly);
        assert_eq!(ctl.anomalies(), &[AnomalyRecord::new(7, 50.0)]);
    }

    #[test]
    fn test_non_finite_value_rejected_without_mutation() {
        let mut ctl = controller(3);
        ctl.process(1.0).unwrap();
        assert!(matches!(
            ctl.process(f64::NAN),
            Err(DetectorError::InvalidValue { .. })
        ));
        assert!(ctl.process(f64::INFINITY).is_err());
        assert_eq!(ctl.size(), 1);
        assert_eq!(ctl.history(), &[1.0]);
    }

    #[test]
    fn test_window_of_one_never_scores() {
        let mut ctl = controller(1);
        for v in [1.0, 2.0, 100.0, -4.0] {
            let outcome = ctl.process(v).unwrap();
            assert!(outcome.score.is_none());
        }
        assert!(ctl.is_active());
        assert!(ctl.anomalies().is_empty());
    }

    #[test]
    fn test_refit_every_batches_refits() {
        let config = DetectorConfig::new(2).with_refit_every(3);
        let model = FixedModel { score: 1.0, refits: 0 };
        let mut ctl = StreamController::with_model(config, model).unwrap();

        let refits: Vec<bool> = (0..9).map(|i| ctl.process(i as f64).unwrap().refit).collect();
        // Active from the third tick: refit on active ticks 0, 3 and 6.
        assert_eq!(
            refits,
            vec![false, false, true, false, false, true, false, false, true]
        );
        assert_eq!(ctl.model().refits, 3);
    }

    #[test]
    fn test_negative_scores_are_logged_with_index() {
        let model = FixedModel { score: -0.25, refits: 0 };
        let mut ctl = StreamController::with_model(DetectorConfig::new(2), model).unwrap();
        for v in [3.0, 4.0, 5.0, 6.0] {
            ctl.process(v).unwrap();
        }
        let indices: Vec<usize> = ctl.anomalies().iter().map(|r| r.index()).collect();
        assert_eq!(indices, vec![3, 4]);
    }

    #[test]
    fn test_run_emits_every_tick_and_flags_through_sink() {
        let mut ctl = controller(5);
        let mut sink = MemorySink::default();
        let summary = ctl
            .run(
                vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 50.0].into_iter(),
                &mut sink,
                RunOptions::default(),
            )
            .unwrap();

        assert_eq!(summary.ticks, 7);
        assert_eq!(summary.anomalies, 1);
        assert_eq!(sink.outcomes.len(), 7);
        assert_eq!(sink.flagged.len(), 1);
        assert_eq!(sink.flagged[0].0, AnomalyRecord::new(7, 50.0));
        assert_eq!(sink.log_lengths, vec![0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_run_respects_max_ticks() {
        let mut ctl = controller(4);
        let options = RunOptions {
            max_ticks: Some(10),
            interval: Duration::ZERO,
        };
        let summary = ctl
            .run((0..).map(|i| i as f64), MemorySink::default(), options)
            .unwrap();
        assert_eq!(summary.ticks, 10);
        assert_eq!(ctl.size(), 10);
    }

    #[test]
    fn test_run_stops_on_invalid_value() {
        let mut ctl = controller(2);
        let result = ctl.run(
            vec![1.0, 2.0, f64::NAN, 3.0].into_iter(),
            MemorySink::default(),
            RunOptions::default(),
        );
        assert!(matches!(result, Err(DetectorError::InvalidValue { .. })));
        assert_eq!(ctl.size(), 2);
    }
}
