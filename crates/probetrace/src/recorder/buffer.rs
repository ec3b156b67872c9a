//! Batch buffer between per-test-case records and the persistent log.
//!
//! Records accumulate here as tests finish; writing happens only once the
//! batch reaches its threshold (or on explicit flush), which keeps log I/O
//! proportional to the number of batches rather than the number of records.

use crate::config::DEFAULT_FLUSH_THRESHOLD;

/// Append-only record batch with a flush threshold
#[derive(Debug)]
pub struct BatchBuffer {
    entries: Vec<String>,
    /// Records in the batch before a flush is due
    flush_threshold: usize,
    /// Number of successful flushes
    flush_count: usize,
}

impl BatchBuffer {
    /// Create a batch with the default threshold of 1000 records
    #[must_use]
    pub fn new() -> Self {
        Self::with_flush_threshold(DEFAULT_FLUSH_THRESHOLD)
    }

    /// Create with a custom flush threshold
    #[must_use]
    pub fn with_flush_threshold(threshold: usize) -> Self {
        Self {
            entries: Vec::new(),
            flush_threshold: threshold.max(1),
            flush_count: 0,
        }
    }

    /// Move records into the batch
    pub fn extend(&mut self, records: impl IntoIterator<Item = String>) {
        self.entries.extend(records);
    }

    /// Whether the batch has reached its threshold
    #[must_use]
    pub fn flush_due(&self) -> bool {
        self.entries.len() >= self.flush_threshold
    }

    /// Pending records
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Drop all pending records after a successful write
    pub fn mark_flushed(&mut self) {
        self.entries.clear();
        self.flush_count += 1;
    }

    /// Number of pending records
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful flushes
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    /// The flush threshold
    #[must_use]
    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }
}

impl Default for BatchBuffer {
    fn default() -> Self {
        Self::new()
    }
}
