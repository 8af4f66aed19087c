//! Detector error types.

use thiserror::Error;

/// Errors raised by the window buffer, the outlier models and the stream
/// controller.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Insufficient data: required {required}, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("Model not fitted: call refit() before score()")]
    ModelNotFit,

    #[error("Invalid size: requested {requested}, window holds at most {capacity}")]
    InvalidSize { requested: usize, capacity: usize },

    #[error("Invalid value: {value} is not a finite number")]
    InvalidValue { value: f64 },

    #[error("Invalid parameter: {name} - {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DetectorError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        DetectorError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors the controller absorbs locally instead of ending the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DetectorError::InsufficientData { .. } | DetectorError::ModelNotFit
        )
    }
}

/// Result type for detector operations.
pub type Result<T> = std::result::Result<T, DetectorError>;

/// Rejects NaN and infinite observations.
pub(crate) fn ensure_finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DetectorError::InvalidValue { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_display() {
        let error = DetectorError::InsufficientData {
            required: 21,
            got: 3,
        };
        assert_eq!(error.to_string(), "Insufficient data: required 21, got 3");
    }

    #[test]
    fn test_model_not_fit_display() {
        assert_eq!(
            DetectorError::ModelNotFit.to_string(),
            "Model not fitted: call refit() before score()"
        );
    }

    #[test]
    fn test_invalid_value_display() {
        let error = DetectorError::InvalidValue { value: f64::NAN };
        assert_eq!(error.to_string(), "Invalid value: NaN is not a finite number");
    }

    #[test]
    fn test_invalid_parameter_display() {
        let error = DetectorError::invalid_parameter("contamination", "must lie in (0, 0.5)");
        assert_eq!(
            error.to_string(),
            "Invalid parameter: contamination - must lie in (0, 0.5)"
        );
    }

    #[test]
    fn test_recoverable_variants() {
        assert!(DetectorError::ModelNotFit.is_recoverable());
        assert!(DetectorError::InsufficientData { required: 2, got: 1 }.is_recoverable());
        assert!(!DetectorError::InvalidValue { value: f64::INFINITY }.is_recoverable());
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite(1.5).unwrap(), 1.5);
        assert!(matches!(
            ensure_finite(f64::NEG_INFINITY),
            Err(DetectorError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DetectorError>();
    }
}
