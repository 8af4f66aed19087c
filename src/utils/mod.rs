pub mod anomaly_log;
pub mod evaluation;
pub mod window;
pub mod window_stats;
