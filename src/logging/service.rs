//! Buffered log service
//!
//! [`LogService`] is the single entry point for application logging. Entries are
//! queued in memory and appended to the current day's partition either when the
//! queue reaches its threshold or when the background flush task ticks.
//!
//! Logging never fails from the caller's point of view: write errors are
//! reported on the operator channel (`tracing`) and the affected batch is dropped.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, error, info, warn};

use crate::config::{friendly_io_error_message, Config};

use super::buffer::{LogBuffer, DEFAULT_MAX_BUFFER_SIZE};
use super::clock::{Clock, SystemClock};
use super::entry::{ErrorInfo, LogContext, LogEntry, LogLevel, Meta};
use super::flusher::{self, FlushHandle};
use super::query::{self, ErrorSummary, PerformanceMetrics};
use super::retention::{self, CleanupReport};
use super::store::{partition_name, FsStore, PartitionStore};

/// Default interval between background flushes
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(5000);

/// Tunables for a [`LogService`]
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Pending entries that trigger an immediate flush; also the per-flush batch limit
    pub max_buffer_size: usize,
    /// Period of the background flush task
    pub flush_interval: Duration,
    /// Mirror every entry to the console as `[timestamp] LEVEL: message`
    pub console_mirror: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            console_mirror: true,
        }
    }
}

impl ServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_buffer_size: config.max_buffer_size,
            flush_interval: Duration::from_millis(config.flush_interval_ms.max(1)),
            console_mirror: config.console_mirror,
        }
    }
}

struct Inner {
    options: ServiceOptions,
    buffer: LogBuffer,
    store: Arc<dyn PartitionStore>,
    clock: Arc<dyn Clock>,
    /// Held across drain + write so flushes never interleave
    flush_lock: Mutex<()>,
}

/// Shared handle to the log service
///
/// Cloning is cheap; every clone feeds the same buffer and partitions.
#[derive(Clone)]
pub struct LogService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogService")
            .field("options", &self.inner.options)
            .field("buffered", &self.inner.buffer.len())
            .finish()
    }
}

impl LogService {
    /// Create a service without a background flush task
    ///
    /// The storage location is created immediately; failure is reported, not returned.
    pub fn new(
        options: ServiceOptions,
        store: Arc<dyn PartitionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if let Err(e) = store.ensure_dir() {
            error!(
                "{}",
                friendly_io_error_message(&e, "Failed to create logs directory")
            );
        }

        Self {
            inner: Arc::new(Inner {
                buffer: LogBuffer::new(options.max_buffer_size),
                options,
                store,
                clock,
                flush_lock: Mutex::new(()),
            }),
        }
    }

    /// Service writing to `logs_dir` on disk with the wall clock
    pub fn with_dir(options: ServiceOptions, logs_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            options,
            Arc::new(FsStore::new(logs_dir)),
            Arc::new(SystemClock),
        )
    }

    /// Create a service and spawn its background flush task
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        options: ServiceOptions,
        store: Arc<dyn PartitionStore>,
        clock: Arc<dyn Clock>,
    ) -> (Self, FlushHandle) {
        let service = Self::new(options, store, clock);
        let handle = service.spawn_flush_task();
        (service, handle)
    }

    /// Spawn a task that flushes every `flush_interval`
    pub fn spawn_flush_task(&self) -> FlushHandle {
        flusher::spawn(self.clone())
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.inner.options
    }

    /// Number of entries not yet written
    pub fn buffered_len(&self) -> usize {
        self.inner.buffer.len()
    }

    /// Copy of the entries not yet written, oldest first
    pub fn buffered_entries(&self) -> Vec<LogEntry> {
        self.inner.buffer.snapshot()
    }

    /// Record an entry at `level`
    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        meta: Option<Meta>,
        context: Option<LogContext>,
    ) {
        let entry = LogEntry::new(self.inner.clock.now(), level, message)
            .with_meta(meta)
            .with_context(context);
        self.record(entry);
    }

    pub fn info(&self, message: impl Into<String>, meta: Option<Meta>, context: Option<LogContext>) {
        self.log(LogLevel::Info, message, meta, context);
    }

    pub fn warn(&self, message: impl Into<String>, meta: Option<Meta>, context: Option<LogContext>) {
        self.log(LogLevel::Warn, message, meta, context);
    }

    pub fn debug(
        &self,
        message: impl Into<String>,
        meta: Option<Meta>,
        context: Option<LogContext>,
    ) {
        self.log(LogLevel::Debug, message, meta, context);
    }

    /// Record an error entry, capturing the failure structurally when given
    pub fn error(
        &self,
        message: impl Into<String>,
        error: Option<ErrorInfo>,
        meta: Option<Meta>,
        context: Option<LogContext>,
    ) {
        let entry = LogEntry::new(self.inner.clock.now(), LogLevel::Error, message)
            .with_meta(meta)
            .with_context(context)
            .with_error(error);
        self.record(entry);
    }

    fn record(&self, entry: LogEntry) {
        if self.inner.options.console_mirror {
            mirror_to_console(&entry);
        }
        self.enqueue(entry);
    }

    /// Queue an entry, flushing synchronously if the buffer is full
    pub fn enqueue(&self, entry: LogEntry) {
        if self.inner.buffer.push(entry) {
            self.flush();
        }
    }

    /// Write up to `max_buffer_size` pending entries to today's partition
    ///
    /// Returns the number of entries written. On a write failure the drained
    /// batch is dropped and 0 is returned.
    pub fn flush(&self) -> usize {
        let _guard = self
            .inner
            .flush_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let batch = self.inner.buffer.drain(self.inner.options.max_buffer_size);
        if batch.is_empty() {
            return 0;
        }

        let mut block = String::new();
        let mut written = 0;
        for entry in &batch {
            match entry.to_line() {
                Ok(line) => {
                    block.push_str(&line);
                    block.push('\n');
                    written += 1;
                }
                Err(e) => warn!("Skipping unserializable log entry: {}", e),
            }
        }

        // Dated at flush time: entries queued just before midnight land in the next day's file
        let name = partition_name(self.inner.clock.now().date_naive());
        match self.inner.store.append(&name, &block) {
            Ok(()) => {
                debug!(partition = %name, count = written, "Flushed log entries");
                written
            }
            Err(e) => {
                error!(
                    partition = %name,
                    dropped = batch.len(),
                    "{}",
                    friendly_io_error_message(&e, "Failed to write log entries")
                );
                0
            }
        }
    }

    /// Flush until the buffer is empty or a write fails
    pub fn flush_all(&self) -> usize {
        let mut total = 0;
        while !self.inner.buffer.is_empty() {
            let written = self.flush();
            if written == 0 {
                break;
            }
            total += written;
        }
        total
    }

    /// Entries from the last `hours`, newest first, at most 100
    ///
    /// Combines pending entries with today's and yesterday's partitions.
    pub fn get_recent_logs(&self, hours: u32, level: Option<LogLevel>) -> Vec<LogEntry> {
        let now = self.inner.clock.now();
        // Windows reaching past chrono's range cover everything
        let since = now
            .checked_sub_signed(ChronoDuration::hours(hours.into()))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut entries = self.inner.buffer.snapshot();
        let today = now.date_naive();
        for date in [Some(today), today.pred_opt()].into_iter().flatten() {
            let name = partition_name(date);
            match self.inner.store.read(&name) {
                Ok(Some(content)) => entries.extend(query::parse_lines(&content)),
                Ok(None) => {}
                Err(e) => warn!(partition = %name, "Failed to read log partition: {}", e),
            }
        }

        query::collect_recent(entries, since, level)
    }

    /// Error counts by endpoint and type over the last `hours`
    pub fn get_error_summary(&self, hours: u32) -> ErrorSummary {
        let errors = self.get_recent_logs(hours, Some(LogLevel::Error));
        query::summarize_errors(&errors)
    }

    /// Per-endpoint latency over the last `hours`
    pub fn get_performance_metrics(&self, hours: u32) -> PerformanceMetrics {
        let entries = self.get_recent_logs(hours, None);
        query::aggregate_performance(&entries)
    }

    /// Delete partitions older than `days_to_keep` days
    pub fn cleanup_old_logs(&self, days_to_keep: u32) -> CleanupReport {
        let today = self.inner.clock.now().date_naive();
        let report = retention::cleanup_old_logs(self.inner.store.as_ref(), today, days_to_keep);
        if !report.deleted.is_empty() {
            info!("Cleaned up {} old log files", report.deleted.len());
        }
        report
    }
}

fn mirror_to_console(entry: &LogEntry) {
    let line = entry.console_line();
    match entry.level {
        LogLevel::Debug => tracing::debug!(target: "console", "{}", line),
        LogLevel::Info => tracing::info!(target: "console", "{}", line),
        LogLevel::Warn => tracing::warn!(target: "console", "{}", line),
        LogLevel::Error => tracing::error!(target: "console", "{}", line),
    }
}
