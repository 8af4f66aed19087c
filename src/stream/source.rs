//! Value sources feeding the stream controller.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{DetectorError, Result};

/// Anything producing one real-valued observation per tick.
///
/// `None` means the source is exhausted and the run ends.
pub trait Source {
    fn next_value(&mut self) -> Option<f64>;
}

impl<I> Source for I
where
    I: Iterator<Item = f64>,
{
    fn next_value(&mut self) -> Option<f64> {
        self.next()
    }
}

/// Synthetic signal: a sawtooth trend, a stepped seasonal level and Gaussian
/// noise, sampled on a virtual clock.
///
/// At time `t` seconds the value is
/// `10(1 + 0.1 (t mod 10)) + 5(1 + 0.5 floor((t mod 50) / 10)) + noise`.
/// The clock advances `step_seconds` per sample, so runs are reproducible
/// for a fixed seed.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    rng: StdRng,
    noise_std: f64,
    t: f64,
    step_seconds: f64,
}

impl SyntheticSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        SyntheticSource {
            rng,
            noise_std: 1.0,
            t: 0.0,
            step_seconds: 1.0,
        }
    }

    pub fn with_noise_std(mut self, std: f64) -> Result<Self> {
        if !(std.is_finite() && std >= 0.0) {
            return Err(DetectorError::invalid_parameter(
                "noise_std",
                "must be a non-negative finite number",
            ));
        }
        self.noise_std = std;
        Ok(self)
    }

    pub fn with_step_seconds(mut self, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(DetectorError::invalid_parameter(
                "step_seconds",
                "must be a positive finite number",
            ));
        }
        self.step_seconds = step;
        Ok(self)
    }

    /// Noise-free component at virtual time `t`.
    pub fn baseline(t: f64) -> f64 {
        let regular_pattern = 10.0 * (1.0 + 0.1 * (t % 10.0));
        let seasonal_element = 5.0 * (1.0 + 0.5 * ((t % 50.0) / 10.0).floor());
        regular_pattern + seasonal_element
    }

    /// Virtual time of the next sample.
    pub fn clock(&self) -> f64 {
        self.t
    }

    /// Jump the virtual clock, e.g. to wall-clock seconds.
    pub fn set_clock(&mut self, t: f64) {
        self.t = t;
    }
}

impl Iterator for SyntheticSource {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let noise: f64 = self.rng.sample(StandardNormal);
        let value = Self::baseline(self.t) + self.noise_std * noise;
        self.t += self.step_seconds;
        Some(value)
    }
}
