//! Run-time trace recorder.
//!
//! Probes executing inside instrumented code call into a shared
//! [`TraceRecorder`]. Records first land in a per-test-case buffer with
//! SUBCONDITION_CHECKED / EXERCISED deduplication, move to a batch when the
//! test case finishes, and reach the persistent log when the batch fills up,
//! on explicit flush, or when the recorder is dropped.
//!
//! Both tiers are guarded by mutexes. When both are needed the test-case
//! state is locked first, then the batch.

mod buffer;
mod sink;

pub use buffer::BatchBuffer;
pub use sink::{FileSink, LogSink, MemorySink};

use crate::config::RecorderConfig;
use crate::event::{line_key, subcondition_key, TraceEvent, EXERCISED_MARKER, SUBCONDITION_MARKER};
use crate::result::{ProbeError, ProbeResult};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

#[derive(Debug, Default)]
struct TestCaseState {
    buffer: Vec<String>,
    seen_subconditions: HashSet<String>,
    seen_lines: HashSet<String>,
}

/// Two-tier, deduplicating trace sink shared by all probes of a run
#[derive(Debug)]
pub struct TraceRecorder {
    test_case: Mutex<TestCaseState>,
    batch: Mutex<BatchBuffer>,
    sink: Box<dyn LogSink>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TraceRecorder {
    /// Recorder appending to the configured log file
    #[must_use]
    pub fn new(config: &RecorderConfig) -> Self {
        Self::with_sink(FileSink::new(&config.log_path), config.flush_threshold)
    }

    /// Recorder writing to an arbitrary sink
    #[must_use]
    pub fn with_sink(sink: impl LogSink + 'static, flush_threshold: usize) -> Self {
        Self {
            test_case: Mutex::new(TestCaseState::default()),
            batch: Mutex::new(BatchBuffer::with_flush_threshold(flush_threshold)),
            sink: Box::new(sink),
        }
    }

    /// Append a raw record to the current test case.
    ///
    /// Records containing `"event":"SUBCONDITION_CHECKED"` are dropped when
    /// their `file:line:index` key was already seen since the last reset;
    /// records containing `"event":"EXERCISED"` likewise by `file:line`.
    /// Returns whether the record was kept.
    pub fn record_raw(&self, record: impl Into<String>) -> bool {
        let record = record.into();
        let mut state = lock(&self.test_case);
        if record.contains(SUBCONDITION_MARKER) {
            if !state.seen_subconditions.insert(subcondition_key(&record)) {
                return false;
            }
        } else if record.contains(EXERCISED_MARKER) && !state.seen_lines.insert(line_key(&record)) {
            return false;
        }
        state.buffer.push(record);
        true
    }

    /// Append an event to the current test case
    pub fn record(&self, event: &TraceEvent) -> bool {
        self.record_raw(event.encode())
    }

    /// Clear the test-case buffer and both dedup sets
    pub fn reset_for_new_test_case(&self) {
        let mut state = lock(&self.test_case);
        state.buffer.clear();
        state.seen_subconditions.clear();
        state.seen_lines.clear();
    }

    /// Reset for a new test case and write its start marker
    pub fn begin_test(&self, test: &str) {
        self.reset_for_new_test_case();
        self.record(&TraceEvent::TestStart(test.to_string()));
    }

    /// Write the end marker and move the test case into the batch
    pub fn end_test(&self, test: &str) -> ProbeResult<()> {
        self.record(&TraceEvent::TestEnd(test.to_string()));
        self.flush_logs()
    }

    /// Move the test-case buffer into the batch, flushing once the batch
    /// reaches its threshold
    pub fn flush_logs(&self) -> ProbeResult<()> {
        let mut state = lock(&self.test_case);
        if state.buffer.is_empty() {
            return Ok(());
        }
        let mut batch = lock(&self.batch);
        batch.extend(state.buffer.drain(..));
        if batch.flush_due() {
            self.write_batch(&mut batch)?;
        }
        Ok(())
    }

    /// Append the whole batch to the log.
    ///
    /// On failure the batch is kept for the next flush.
    pub fn flush(&self) -> ProbeResult<()> {
        let mut batch = lock(&self.batch);
        self.write_batch(&mut batch)
    }

    fn write_batch(&self, batch: &mut BatchBuffer) -> ProbeResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        match self.sink.append(batch.entries()) {
            Ok(()) => {
                debug!(records = batch.len(), "trace batch flushed");
                batch.mark_flushed();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, records = batch.len(), "trace batch flush failed");
                Err(ProbeError::Flush(e))
            }
        }
    }

    /// Records buffered for the current test case
    #[must_use]
    pub fn test_case_records(&self) -> Vec<String> {
        lock(&self.test_case).buffer.clone()
    }

    /// Records waiting in the batch
    #[must_use]
    pub fn pending_batch(&self) -> usize {
        lock(&self.batch).len()
    }

    /// Number of successful flushes
    #[must_use]
    pub fn flush_count(&self) -> usize {
        lock(&self.batch).flush_count()
    }
}

impl Drop for TraceRecorder {
    fn drop(&mut self) {
        // best effort; failures are already logged
        let _ = self.flush();
    }
}
