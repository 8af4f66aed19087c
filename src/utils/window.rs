use crate::error::{DetectorError, Result};

/// Append-only history of observed values with a fixed scoring window.
///
/// `size()` counts every value ever appended, so the 1-based stream index of
/// the newest value is always `size()`, regardless of how much history is
/// retained.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    window_size: usize,
    history_limit: Option<usize>,
    values: Vec<f64>,
    total: usize,
}

impl WindowBuffer {
    /// Buffer retaining the full history.
    pub fn new(window_size: usize) -> Self {
        WindowBuffer {
            window_size,
            history_limit: None,
            values: Vec::new(),
            total: 0,
        }
    }

    /// Buffer retaining at most `limit` values (never fewer than `window_size`).
    pub fn with_history_limit(window_size: usize, limit: usize) -> Self {
        WindowBuffer {
            history_limit: Some(limit.max(window_size)),
            ..Self::new(window_size)
        }
    }

    pub fn append(&mut self, value: f64) {
        self.values.push(value);
        self.total += 1;

        // Compact lazily so appends stay amortised O(1).
        if let Some(limit) = self.history_limit {
            if self.values.len() >= limit.saturating_mul(2).max(limit + 1) {
                let excess = self.values.len() - limit;
                self.values.drain(..excess);
            }
        }
    }

    /// Last `n` appended values in append order.
    pub fn recent(&self, n: usize) -> Result<&[f64]> {
        if n > self.window_size {
            return Err(DetectorError::InvalidSize {
                requested: n,
                capacity: self.window_size,
            });
        }
        if n > self.values.len() {
            return Err(DetectorError::InsufficientData {
                required: n,
                got: self.values.len(),
            });
        }
        Ok(&self.values[self.values.len() - n..])
    }

    /// The scoring window: the last `window_size` values.
    pub fn window(&self) -> Result<&[f64]> {
        self.recent(self.window_size)
    }

    /// Total number of values ever appended.
    pub fn size(&self) -> usize {
        self.total
    }

    /// Number of values currently visible through `history()`.
    pub fn len(&self) -> usize {
        self.history().len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// More than `window_size` values seen: enough to fit and score.
    pub fn is_full(&self) -> bool {
        self.total > self.window_size
    }

    pub fn history(&self) -> &[f64] {
        match self.history_limit {
            Some(limit) if self.values.len() > limit => {
                &self.values[self.values.len() - limit..]
            }
            _ => &self.values,
        }
    }

    /// 1-based stream index of `history()[0]`.
    pub fn first_index(&self) -> usize {
        self.total - self.history().len() + 1
    }
}
