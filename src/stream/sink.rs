//! Consumers of per-tick detector state.

use serde::Serialize;
use std::io::Write;

use crate::error::Result;
use crate::stream::controller::TickOutcome;
use crate::utils::anomaly_log::AnomalyRecord;

/// Detector state emitted after every tick.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TickFrame<'a> {
    pub outcome: &'a TickOutcome,
    /// Retained history, oldest first.
    pub history: &'a [f64],
    /// 1-based stream index of `history[0]`.
    pub first_index: usize,
    pub anomalies: &'a [AnomalyRecord],
}

/// Anything consuming detector output for display or persistence.
pub trait Sink {
    /// Called once per flagged observation, before `emit`.
    fn on_anomaly(&mut self, _record: &AnomalyRecord, _score: f64) -> Result<()> {
        Ok(())
    }

    /// Called after every tick, whatever its outcome.
    fn emit(&mut self, frame: &TickFrame<'_>) -> Result<()>;
}

/// Reports through `tracing`: anomalies at info, every frame at trace.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn on_anomaly(&mut self, record: &AnomalyRecord, score: f64) -> Result<()> {
        tracing::info!(
            index = record.index(),
            value = record.value(),
            score,
            "Anomaly detected"
        );
        Ok(())
    }

    fn emit(&mut self, frame: &TickFrame<'_>) -> Result<()> {
        tracing::trace!(
            index = frame.outcome.index,
            value = frame.outcome.value,
            score = ?frame.outcome.score,
            history = frame.history.len(),
            anomalies = frame.anomalies.len(),
            "tick"
        );
        Ok(())
    }
}

/// Plain text lines, one per anomaly: `"<index> Anomaly detected: <value>"`.
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        TextSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for TextSink<W> {
    fn on_anomaly(&mut self, record: &AnomalyRecord, _score: f64) -> Result<()> {
        writeln!(self.out, "{} Anomaly detected: {}", record.index(), record.value())?;
        Ok(())
    }

    fn emit(&mut self, _frame: &TickFrame<'_>) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// One JSON object per tick.
///
/// With `full_frames` off only the tick outcome and the anomaly count are
/// written, which keeps lines constant-size on long runs.
pub struct JsonLinesSink<W: Write> {
    out: W,
    full_frames: bool,
}

#[derive(Serialize)]
struct CompactFrame<'a> {
    outcome: &'a TickOutcome,
    anomalies: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        JsonLinesSink {
            out,
            full_frames: false,
        }
    }

    pub fn with_full_frames(mut self, full_frames: bool) -> Self {
        self.full_frames = full_frames;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for JsonLinesSink<W> {
    fn emit(&mut self, frame: &TickFrame<'_>) -> Result<()> {
        if self.full_frames {
            serde_json::to_writer(&mut self.out, frame)?;
        } else {
            let compact = CompactFrame {
                outcome: frame.outcome,
                anomalies: frame.anomalies.len(),
            };
            serde_json::to_writer(&mut self.out, &compact)?;
        }
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

/// Keeps every outcome and flagged record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub outcomes: Vec<TickOutcome>,
    pub flagged: Vec<(AnomalyRecord, f64)>,
    /// Anomaly-log length seen at each emit.
    pub log_lengths: Vec<usize>,
}

impl Sink for MemorySink {
    fn on_anomaly(&mut self, record: &AnomalyRecord, score: f64) -> Result<()> {
        self.flagged.push((*record, score));
        Ok(())
    }

    fn emit(&mut self, frame: &TickFrame<'_>) -> Result<()> {
        self.outcomes.push(*frame.outcome);
        self.log_lengths.push(frame.anomalies.len());
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn on_anomaly(&mut self, record: &AnomalyRecord, score: f64) -> Result<()> {
        (**self).on_anomaly(record, score)
    }

    fn emit(&mut self, frame: &TickFrame<'_>) -> Result<()> {
        (**self).emit(frame)
    }
}
