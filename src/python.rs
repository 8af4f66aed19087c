use numpy::{PyArray1, ToPyArray};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::DetectorConfig;
use crate::error::DetectorError;
use crate::models::base_model::{BaseModel, FitOutcome};
use crate::models::iforest::IsolationForestImpl;
use crate::stream::controller::StreamController;

impl From<DetectorError> for PyErr {
    fn from(err: DetectorError) -> PyErr {
        match err {
            DetectorError::ModelNotFit => PyRuntimeError::new_err(err.to_string()),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

/// Python‐exposed streaming detector: one `update` call per observation.
#[pyclass(unsendable)]
pub struct StreamDetector {
    inner: StreamController<IsolationForestImpl>,
}

#[pymethods]
impl StreamDetector {
    #[new]
    #[pyo3(signature = (
        window_size = 20,
        contamination = 0.05,
        n_estimators = 100,
        max_samples = 256,
        refit_every = 1,
        random_state = None,
        n_jobs = 1
    ))]
    fn new(
        window_size: usize,
        contamination: f64,
        n_estimators: usize,
        max_samples: usize,
        refit_every: usize,
        random_state: Option<u64>,
        n_jobs: usize,
    ) -> PyResult<Self> {
        let config = DetectorConfig {
            window_size,
            contamination,
            n_estimators,
            max_samples,
            refit_every,
            random_state,
            n_jobs,
            history_limit: None,
        };
        Ok(StreamDetector {
            inner: StreamController::new(config)?,
        })
    }

    /// Process one value; returns `(is_anomaly, score)`, score is None while warming.
    fn update(&mut self, value: f64) -> PyResult<(bool, Option<f64>)> {
        let outcome = self.inner.process(value)?;
        Ok((outcome.is_anomaly, outcome.score))
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn history<'py>(&self, py: Python<'py>) -> Py<PyArray1<f64>> {
        self.inner.history().to_pyarray(py).into_py(py)
    }

    fn anomalies(&self) -> Vec<(usize, f64)> {
        self.inner.anomalies().iter().map(|&r| r.into()).collect()
    }
}

/// Python‐exposed wrapper around IsolationForestImpl
#[pyclass(unsendable)]
pub struct IsolationForest {
    inner: IsolationForestImpl,
}

#[pymethods]
impl IsolationForest {
    #[new]
    #[pyo3(signature = (n_estimators = 100, max_samples = 256, contamination = 0.05, random_state = None))]
    fn new(
        n_estimators: usize,
        max_samples: usize,
        contamination: f64,
        random_state: Option<u64>,
    ) -> PyResult<Self> {
        let config = DetectorConfig {
            n_estimators,
            max_samples,
            contamination,
            random_state,
            ..DetectorConfig::default()
        };
        Ok(IsolationForest {
            inner: IsolationForestImpl::from_config(&config)?,
        })
    }

    /// Refit on a window; returns False when the window was constant.
    fn refit(&mut self, window: Vec<f64>) -> PyResult<bool> {
        Ok(self.inner.refit(&window)? == FitOutcome::Fitted)
    }

    fn score(&self, value: f64) -> PyResult<f64> {
        Ok(self.inner.score(value)?)
    }

    fn is_fitted(&self) -> bool {
        self.inner.is_fitted()
    }
}

/// A Python module implemented in Rust.
#[pymodule]
fn iforest_stream(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<StreamDetector>()?;
    m.add_class::<IsolationForest>()?;
    Ok(())
}
