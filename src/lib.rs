//! Streaming point-outlier detection over a scalar signal.
//!
//! A [`StreamController`] keeps a bounded scoring window over the incoming
//! values, refits an isolation forest on that window and flags values whose
//! decision score is negative. Values come from any [`Source`]; per-tick
//! state goes to any [`Sink`].

pub mod config;
pub mod error;
pub mod models;
pub mod stream;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use config::DetectorConfig;
pub use error::{DetectorError, Result};
pub use models::base_model::{BaseModel, FitOutcome};
pub use models::iforest::IsolationForestImpl;
pub use stream::controller::{RunOptions, StreamController, StreamState, TickOutcome};
pub use stream::sink::{ConsoleSink, JsonLinesSink, MemorySink, Sink, TextSink, TickFrame};
pub use stream::source::{Source, SyntheticSource};
pub use utils::anomaly_log::{AnomalyLog, AnomalyRecord};
pub use utils::evaluation::{RunEvaluator, RunSummary};
pub use utils::window::WindowBuffer;
pub use utils::window_stats::WindowStats;
