use ndarray::ArrayView1;
use serde::Serialize;

/// Spread below which a window is treated as constant. Matches the split
/// cutoff used when growing isolation trees.
pub const DEGENERATE_SPREAD: f64 = 1e-10;

/// Summary statistics of a scoring window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population variance.
    pub var: f64,
    pub std: f64,
}

impl WindowStats {
    pub fn from_slice(values: &[f64]) -> Self {
        if values.is_empty() {
            return WindowStats {
                count: 0,
                min: f64::NAN,
                max: f64::NAN,
                mean: f64::NAN,
                var: f64::NAN,
                std: f64::NAN,
            };
        }

        let view = ArrayView1::from(values);
        let min = view.fold(f64::INFINITY, |acc, &v| acc.min(v));
        let max = view.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let mean = view.mean().unwrap_or(f64::NAN);
        let var = view.var(0.0);

        WindowStats {
            count: values.len(),
            min,
            max,
            mean,
            var,
            std: var.sqrt(),
        }
    }

    pub fn spread(&self) -> f64 {
        self.max - self.min
    }

    /// Zero-variance (or empty) window: nothing can be isolated.
    pub fn is_degenerate(&self) -> bool {
        self.count == 0 || self.spread() < DEGENERATE_SPREAD
    }
}
