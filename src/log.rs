//! Trial log sinks.
//!
//! Every trainer call is appended to the configured [`TrialLogSink`] as a
//! [`TrialLogRecord`]; when the search terminates the sink receives a
//! checkpoint naming the record of the global best. Diagnostics go through
//! `tracing` instead (feature `tracing`).
//!
//! | Sink | Description | Feature flag |
//! |------|-------------|--------------|
//! | [`MemoryTrialLog`] | Records kept in memory behind a shared lock | none |
//! | `JsonlTrialLog` | One JSON object per line on any `io::Write` | `serde` |

use std::sync::Arc;

use parking_lot::Mutex;
#[cfg(feature = "serde")]
use serde::Serialize;

use crate::error::{Error, Result};
use crate::space::Configuration;

/// Writes finite losses as numbers and the rest as strings (`"inf"`,
/// `"NaN"`), which JSON cannot represent as numbers.
#[cfg(feature = "serde")]
#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn serialize_loss<S: serde::Serializer>(
    loss: &f64,
    serializer: S,
) -> core::result::Result<S::Ok, S::Error> {
    if loss.is_finite() {
        serializer.serialize_f64(*loss)
    } else {
        serializer.collect_str(loss)
    }
}

/// Why a trainer call was made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "snake_case"))]
pub enum TrialKind {
    /// A search trial proposed by local search.
    Search,
    /// A retrain of the best configuration on the full data size.
    Retrain,
}

/// One trainer call as seen by the trial log.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TrialLogRecord {
    /// Monotonically increasing id, unique within one search.
    pub record_id: u64,
    /// Scheduler iteration that issued the call.
    pub iteration: u64,
    /// Candidate name.
    pub candidate: String,
    /// Why the call was made.
    pub kind: TrialKind,
    /// Training rows used.
    pub sample_size: usize,
    /// Configuration trained.
    pub config: Configuration,
    /// Validation loss (`+inf` for failures, serialized as `"inf"`).
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_loss"))]
    pub val_loss: f64,
    /// Training loss, if the trainer reported one.
    pub train_loss: Option<f64>,
    /// Time charged for this call.
    pub trial_time: f64,
    /// Global time from start after this call.
    pub total_time: f64,
    /// Candidate's best loss after this call.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_loss"))]
    pub best_loss: f64,
    /// Candidate's best configuration after this call.
    pub best_config: Option<Configuration>,
}

/// Destination for trial records.
pub trait TrialLogSink {
    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Log`](crate::Error::Log) if the record could not be persisted.
    fn append(&mut self, record: &TrialLogRecord) -> Result<()>;

    /// Marks the end of the search; `best_record_id` names the record of the
    /// global best, if any trial succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Log`](crate::Error::Log) if the checkpoint could not be persisted.
    fn checkpoint(&mut self, _best_record_id: Option<u64>) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryLogInner {
    records: Vec<TrialLogRecord>,
    checkpoint: Option<Option<u64>>,
}

/// In-memory trial log.
///
/// Clones share the same buffer, so a handle kept by the caller sees every
/// record appended by the scheduler.
///
/// # Examples
///
/// ```
/// use budget_search::log::MemoryTrialLog;
///
/// let log = MemoryTrialLog::new();
/// let handle = log.clone();
/// assert!(handle.records().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTrialLog {
    inner: Arc<Mutex<MemoryLogInner>>,
}

impl MemoryTrialLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every record appended so far.
    #[must_use]
    pub fn records(&self) -> Vec<TrialLogRecord> {
        self.inner.lock().records.clone()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Returns `true` if nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Returns the checkpoint if the search has terminated: the outer
    /// `Option` is `None` while running, the inner one names the best record.
    #[must_use]
    pub fn checkpoint(&self) -> Option<Option<u64>> {
        self.inner.lock().checkpoint
    }
}

impl TrialLogSink for MemoryTrialLog {
    fn append(&mut self, record: &TrialLogRecord) -> Result<()> {
        self.inner.lock().records.push(record.clone());
        Ok(())
    }

    fn checkpoint(&mut self, best_record_id: Option<u64>) -> Result<()> {
        self.inner.lock().checkpoint = Some(best_record_id);
        Ok(())
    }
}

/// Trial log writing one JSON object per line.
///
/// Records are written as they arrive; the checkpoint is a final
/// `{"checkpoint":{"best_record_id":...}}` line followed by a flush.
/// Non-finite losses are written as strings (`"inf"` for a failed trial)
/// so they stay distinguishable from missing values.
///
/// # Examples
///
/// ```
/// use budget_search::log::JsonlTrialLog;
///
/// let log = JsonlTrialLog::new(Vec::<u8>::new());
/// assert!(log.into_inner().is_empty());
/// ```
#[cfg(feature = "serde")]
#[derive(Debug)]
pub struct JsonlTrialLog<W: std::io::Write> {
    writer: W,
}

#[cfg(feature = "serde")]
impl<W: std::io::Write> JsonlTrialLog<W> {
    /// Wraps a writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, value: &impl Serialize) -> Result<()> {
        serde_json::to_writer(&mut self.writer, value)
            .map_err(|e| Error::Log(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| Error::Log(e.to_string()))
    }
}

#[cfg(feature = "serde")]
impl<W: std::io::Write> TrialLogSink for JsonlTrialLog<W> {
    fn append(&mut self, record: &TrialLogRecord) -> Result<()> {
        self.write_line(record)
    }

    fn checkpoint(&mut self, best_record_id: Option<u64>) -> Result<()> {
        self.write_line(&serde_json::json!({
            "checkpoint": { "best_record_id": best_record_id }
        }))?;
        self.writer
            .flush()
            .map_err(|e| Error::Log(e.to_string()))
    }
}

/// Assigns record ids and forwards records to the optional sink.
///
/// Sink failures never abort the search: they are reported through
/// `tracing`, counted, and the last one is kept for inspection.
pub(crate) struct TrialLog {
    sink: Option<Box<dyn TrialLogSink>>,
    next_id: u64,
    failures: usize,
    last_error: Option<Error>,
}

impl TrialLog {
    pub(crate) fn new(sink: Option<Box<dyn TrialLogSink>>) -> Self {
        Self {
            sink,
            next_id: 0,
            failures: 0,
            last_error: None,
        }
    }

    /// Number of sink calls that failed.
    pub(crate) fn failures(&self) -> usize {
        self.failures
    }

    /// The most recent sink failure.
    pub(crate) fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    fn fail(&mut self, err: Error) {
        self.failures += 1;
        self.last_error = Some(err);
    }

    /// Appends `record` after stamping it with the next id; returns that id.
    pub(crate) fn append(&mut self, mut record: TrialLogRecord) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        record.record_id = id;
        if let Some(sink) = self.sink.as_mut()
            && let Err(err) = sink.append(&record)
        {
            trace_warn!(error = %err, record_id = id, "failed to append trial record");
            self.fail(err);
        }
        id
    }

    pub(crate) fn checkpoint(&mut self, best_record_id: Option<u64>) {
        if let Some(sink) = self.sink.as_mut()
            && let Err(err) = sink.checkpoint(best_record_id)
        {
            trace_warn!(error = %err, "failed to write trial log checkpoint");
            self.fail(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{ConfigurationSpace, HyperparameterSpec};

    fn record() -> TrialLogRecord {
        let space =
            ConfigurationSpace::new(vec![HyperparameterSpec::int("n", 1, 8).init(2.0)]).unwrap();
        let config = space.init_config();
        TrialLogRecord {
            record_id: 99,
            iteration: 1,
            candidate: "rf".to_string(),
            kind: TrialKind::Search,
            sample_size: 100,
            config: config.clone(),
            val_loss: 0.5,
            train_loss: None,
            trial_time: 1.0,
            total_time: 1.0,
            best_loss: 0.5,
            best_config: Some(config),
        }
    }

    struct FailingSink;

    impl TrialLogSink for FailingSink {
        fn append(&mut self, _record: &TrialLogRecord) -> Result<()> {
            Err(Error::Log("disk full".to_string()))
        }
    }

    #[test]
    fn test_ids_are_stamped_in_order() {
        let memory = MemoryTrialLog::new();
        let mut log = TrialLog::new(Some(Box::new(memory.clone())));
        assert_eq!(log.append(record()), 0);
        assert_eq!(log.append(record()), 1);
        assert_eq!(log.failures(), 0);
        let ids: Vec<u64> = memory.records().iter().map(|r| r.record_id).collect();
        assert_eq!(ids, vec![0, 1]);

        assert_eq!(memory.checkpoint(), None);
        log.checkpoint(Some(1));
        assert_eq!(memory.checkpoint(), Some(Some(1)));
    }

    #[test]
    fn test_sink_failures_are_counted_not_raised() {
        let mut log = TrialLog::new(Some(Box::new(FailingSink)));
        assert_eq!(log.append(record()), 0);
        log.checkpoint(None);
        assert_eq!(log.append(record()), 1);
        assert_eq!(log.failures(), 2);
        assert!(matches!(log.last_error(), Some(Error::Log(msg)) if msg == "disk full"));
    }

    #[test]
    fn test_without_sink_ids_still_advance() {
        let mut log = TrialLog::new(None);
        assert_eq!(log.append(record()), 0);
        assert_eq!(log.append(record()), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_jsonl_lines() {
        let mut sink = JsonlTrialLog::new(Vec::new());
        sink.append(&record()).unwrap();
        sink.checkpoint(Some(99)).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["candidate"], "rf");
        assert_eq!(first["config"]["n"], 2);
        assert_eq!(first["kind"], "search");
        let last: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(last["checkpoint"]["best_record_id"], 99);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_jsonl_failed_trial_loss_is_not_null() {
        let mut failed = record();
        failed.val_loss = f64::INFINITY;
        failed.best_loss = f64::INFINITY;
        failed.best_config = None;
        let mut sink = JsonlTrialLog::new(Vec::new());
        sink.append(&failed).unwrap();
        sink.append(&record()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines[0]["val_loss"], "inf");
        assert_eq!(lines[0]["best_loss"], "inf");
        assert!(lines[0]["best_config"].is_null());
        assert_eq!(lines[1]["val_loss"], 0.5);
    }
}
