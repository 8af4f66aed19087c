use serde::Serialize;
use std::time::Duration;

/// Aggregate figures for a run, reported when the stream ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: usize,
    pub scored: usize,
    pub refits: usize,
    pub anomalies: usize,
    pub anomaly_rate: f64,
    pub mean_tick_micros: f64,
    pub max_tick_micros: f64,
    pub mean_refit_micros: f64,
}

/// Tracks per-tick cost and detection counts for a stream run.
///
/// Refit cost grows with the window size, so the refit timings are kept
/// separately from the whole-tick timings.
#[derive(Debug, Clone)]
pub struct RunEvaluator {
    ticks: usize,
    scored: usize,
    refits: usize,
    anomalies: usize,
    total_tick_time: Duration,
    max_tick_time: Duration,
    total_refit_time: Duration,
    progress_interval: usize,
}

impl Default for RunEvaluator {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl RunEvaluator {
    /// `progress_interval` ticks between progress log lines; 0 disables them.
    pub fn new(progress_interval: usize) -> Self {
        RunEvaluator {
            ticks: 0,
            scored: 0,
            refits: 0,
            anomalies: 0,
            total_tick_time: Duration::ZERO,
            max_tick_time: Duration::ZERO,
            total_refit_time: Duration::ZERO,
            progress_interval,
        }
    }

    pub fn record_refit(&mut self, elapsed: Duration) {
        self.refits += 1;
        self.total_refit_time += elapsed;
    }

    pub fn record_tick(&mut self, elapsed: Duration, scored: bool, is_anomaly: bool) {
        self.ticks += 1;
        if scored {
            self.scored += 1;
        }
        if is_anomaly {
            self.anomalies += 1;
        }
        self.total_tick_time += elapsed;
        if elapsed > self.max_tick_time {
            self.max_tick_time = elapsed;
        }

        if self.progress_interval > 0 && self.ticks % self.progress_interval == 0 {
            let summary = self.summary();
            tracing::info!(
                ticks = summary.ticks,
                anomalies = summary.anomalies,
                anomaly_rate = summary.anomaly_rate,
                mean_refit_micros = summary.mean_refit_micros,
                "stream progress"
            );
        }
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            scored: self.scored,
            refits: self.refits,
            anomalies: self.anomalies,
            anomaly_rate: ratio(self.anomalies as f64, self.scored as f64),
            mean_tick_micros: ratio(micros(self.total_tick_time), self.ticks as f64),
            max_tick_micros: micros(self.max_tick_time),
            mean_refit_micros: ratio(micros(self.total_refit_time), self.refits as f64),
        }
    }
}

fn micros(d: Duration) -> f64 {
    d.as_secs_f64() * 1e6
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}
