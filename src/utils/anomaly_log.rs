use serde::{Deserialize, Serialize};

/// A flagged observation: 1-based stream index and the observed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    index: usize,
    value: f64,
}

impl AnomalyRecord {
    pub fn new(index: usize, value: f64) -> Self {
        AnomalyRecord { index, value }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl From<AnomalyRecord> for (usize, f64) {
    fn from(record: AnomalyRecord) -> Self {
        (record.index, record.value)
    }
}

/// Insertion-ordered, append-only record of anomalies for one run.
///
/// Unbounded: long-running callers that need bounded memory must export and
/// rebuild the controller themselves.
#[derive(Debug, Clone, Default)]
pub struct AnomalyLog {
    records: Vec<AnomalyRecord>,
}

impl AnomalyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, index: usize, value: f64) -> AnomalyRecord {
        let record = AnomalyRecord::new(index, value);
        self.records.push(record);
        record
    }

    pub fn all(&self) -> &[AnomalyRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&AnomalyRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
