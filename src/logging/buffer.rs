//! In-memory queue of entries waiting to be flushed
//!
//! Entries keep arrival order. Draining removes a prefix of the queue under a
//! single lock, so an entry is either handed to the flusher or left queued,
//! never both.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::entry::LogEntry;

/// Default number of pending entries that triggers an immediate flush
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 100;

/// Thread-safe FIFO of pending log entries
#[derive(Debug)]
pub struct LogBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
    max_size: usize,
}

impl LogBuffer {
    /// Create a buffer that reports full at `max_size` entries
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_size)),
            max_size,
        }
    }

    /// Threshold at which `push` asks for a flush
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Append an entry to the tail
    ///
    /// Returns `true` when the buffer has reached its threshold and should be flushed.
    pub fn push(&self, entry: LogEntry) -> bool {
        let mut entries = self.lock();
        entries.push_back(entry);
        entries.len() >= self.max_size
    }

    /// Remove up to `max` entries from the head, in arrival order
    pub fn drain(&self, max: usize) -> Vec<LogEntry> {
        let mut entries = self.lock();
        let count = entries.len().min(max);
        entries.drain(..count).collect()
    }

    /// Copy of all pending entries, oldest first
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the queue half-modified,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER_SIZE)
    }
}
