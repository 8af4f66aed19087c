//! Property tests for the stream controller invariants.

use iforest_stream::{AnomalyLog, DetectorConfig, StreamController, StreamState, WindowBuffer};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn controller(window_size: usize, seed: u64) -> StreamController {
    StreamController::new(
        DetectorConfig::new(window_size)
            .with_random_state(seed)
            .with_n_estimators(25),
    )
    .unwrap()
}

fn arb_stream(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1e3f64..1e3, 0..max_len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn log_never_outgrows_stream(
        window_size in 1usize..12,
        seed in any::<u64>(),
        values in arb_stream(60),
    ) {
        let mut detector = controller(window_size, seed);
        for v in values {
            detector.process(v).unwrap();
            prop_assert!(detector.anomalies().len() <= detector.size());
        }
    }

    #[test]
    fn warming_never_scores(
        window_size in 2usize..20,
        seed in any::<u64>(),
        values in arb_stream(40),
    ) {
        let mut detector = controller(window_size, seed);
        for v in values.into_iter().take(window_size) {
            let outcome = detector.process(v).unwrap();
            prop_assert_eq!(outcome.state, StreamState::Warming);
            prop_assert!(outcome.score.is_none());
        }
        prop_assert!(detector.anomalies().is_empty());
    }

    #[test]
    fn constant_stream_never_flags(
        window_size in 2usize..25,
        value in -1e6f64..1e6,
        extra in 6usize..30,
    ) {
        let mut detector = controller(window_size, 1);
        for _ in 0..(window_size + extra) {
            prop_assert!(!detector.process(value).unwrap().is_anomaly);
        }
    }

    #[test]
    fn recent_is_suffix_of_appends(
        window_size in 1usize..16,
        values in prop::collection::vec(-1e3f64..1e3, 16..64),
        n in 0usize..16,
    ) {
        let n = n.min(window_size);
        let mut buffer = WindowBuffer::new(window_size);
        for &v in &values {
            buffer.append(v);
        }
        prop_assert_eq!(buffer.recent(n).unwrap(), &values[values.len() - n..]);
    }

    #[test]
    fn anomaly_indices_strictly_increase(
        seed in any::<u64>(),
        values in arb_stream(80),
    ) {
        let mut detector = controller(6, seed);
        for v in values {
            detector.process(v).unwrap();
        }
        let indices: Vec<usize> = detector.anomalies().iter().map(|r| r.index()).collect();
        prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(indices.iter().all(|&i| i > 6));
    }

    #[test]
    fn log_reads_are_repeatable(
        entries in prop::collection::vec((1usize..1000, -1e3f64..1e3), 0..20),
    ) {
        let mut log = AnomalyLog::new();
        for (i, v) in entries {
            log.record(i, v);
        }
        prop_assert_eq!(log.all().to_vec(), log.all().to_vec());
    }
}
