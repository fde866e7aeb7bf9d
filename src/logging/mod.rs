//! Logging system for the fortune app
//!
//! Provides the buffered log service, daily JSONL partitions with retention,
//! read-back queries for the admin dashboard, and request hooks for HTTP servers.

mod buffer;
mod clock;
mod entry;
mod events;
mod flusher;
mod middleware;
mod query;
mod retention;
mod service;
mod store;

pub use buffer::{LogBuffer, DEFAULT_MAX_BUFFER_SIZE};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{ErrorInfo, LogContext, LogEntry, LogLevel, Meta, MetaValue, ParseLevelError};
pub use events::{level_for_status, AiRequest, FortuneGeneration, RequestInfo, ResponseInfo};
pub use flusher::FlushHandle;
pub use middleware::{capture_failure, RequestTimer};
pub use query::{
    ErrorSummary, EndpointStats, PerformanceMetrics, DEFAULT_QUERY_HOURS, RECENT_ERRORS_LIMIT,
    RECENT_LOGS_LIMIT,
};
pub use retention::{cleanup_old_logs, CleanupReport, DEFAULT_RETENTION_DAYS};
pub use service::{LogService, ServiceOptions, DEFAULT_FLUSH_INTERVAL};
pub use store::{partition_name, FsStore, MemoryStore, PartitionStore, PARTITION_EXTENSION};
