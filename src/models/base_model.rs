use crate::error::Result;

/// How a refit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    /// Model parameters were rebuilt from the window.
    Fitted,
    /// The window had no spread; the model scores every value as normal
    /// until variance returns.
    Degenerate,
}

/// A common Rust trait for point-outlier models refit on a sliding window.
pub trait BaseModel {
    /// Replace the model parameters with a fit on `window`.
    fn refit(&mut self, window: &[f64]) -> Result<FitOutcome>;

    /// Decision score for one value; negative means outlier-leaning.
    fn score(&self, value: f64) -> Result<f64>;

    fn is_fitted(&self) -> bool;

    /// Default: refit then score.
    fn refit_score(&mut self, window: &[f64], value: f64) -> Result<f64> {
        self.refit(window)?;
        self.score(value)
    }
}
