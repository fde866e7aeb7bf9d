//! Read-back queries over log entries
//!
//! Pure functions over entry slices: recent-window filtering, error summaries
//! and per-endpoint latency aggregates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::{LogEntry, LogLevel};

/// Maximum entries returned by a recent-logs query
pub const RECENT_LOGS_LIMIT: usize = 100;

/// Maximum entries kept in [`ErrorSummary::recent_errors`]
pub const RECENT_ERRORS_LIMIT: usize = 10;

/// Default query window in hours
pub const DEFAULT_QUERY_HOURS: u32 = 24;

/// Bucket for errors that carry no structured error name
pub const UNKNOWN_ERROR_TYPE: &str = "Unknown";

/// Parse partition content, skipping blank and malformed lines
pub fn parse_lines(content: &str) -> Vec<LogEntry> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| LogEntry::from_line(line).ok())
        .collect()
}

/// Keep entries at or after `since` (and of `level`, if given), newest first, capped
pub fn collect_recent(
    mut entries: Vec<LogEntry>,
    since: DateTime<Utc>,
    level: Option<LogLevel>,
) -> Vec<LogEntry> {
    entries.retain(|e| e.timestamp >= since && level.map_or(true, |l| e.level == l));
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries.truncate(RECENT_LOGS_LIMIT);
    entries
}

/// Error counts over a query window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSummary {
    pub total_errors: usize,
    pub errors_by_endpoint: BTreeMap<String, usize>,
    pub errors_by_type: BTreeMap<String, usize>,
    pub recent_errors: Vec<LogEntry>,
}

/// Summarize error entries, expected newest first
pub fn summarize_errors(errors: &[LogEntry]) -> ErrorSummary {
    let mut summary = ErrorSummary {
        total_errors: errors.len(),
        ..Default::default()
    };

    for entry in errors {
        if let Some(endpoint) = &entry.context.endpoint {
            *summary
                .errors_by_endpoint
                .entry(endpoint.clone())
                .or_default() += 1;
        }

        let kind = entry
            .error
            .as_ref()
            .map(|e| e.name.as_str())
            .unwrap_or(UNKNOWN_ERROR_TYPE);
        *summary.errors_by_type.entry(kind.to_string()).or_default() += 1;
    }

    summary.recent_errors = errors.iter().take(RECENT_ERRORS_LIMIT).cloned().collect();
    summary
}

/// Latency aggregate for one endpoint, durations in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub count: u64,
    pub total_duration: f64,
    pub avg_duration: f64,
}

impl EndpointStats {
    /// Add one measurement and recompute the mean
    pub fn add_sample(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_duration += duration_ms;
        self.avg_duration = self.total_duration / self.count as f64;
    }
}

/// Per-endpoint latency aggregates
pub type PerformanceMetrics = BTreeMap<String, EndpointStats>;

/// Aggregate every entry carrying both an endpoint and a duration
pub fn aggregate_performance(entries: &[LogEntry]) -> PerformanceMetrics {
    let mut metrics = PerformanceMetrics::new();

    for entry in entries {
        if let (Some(endpoint), Some(duration)) = (&entry.context.endpoint, entry.context.duration)
        {
            metrics
                .entry(endpoint.clone())
                .or_default()
                .add_sample(duration);
        }
    }

    metrics
}
