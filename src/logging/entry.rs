//! Log entry types
//!
//! A [`LogEntry`] is created once per logging call and never mutated afterwards.
//! Entries serialize to a single JSON object per line with camelCase keys.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase name, as stored on disk
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Uppercase label used by the console mirror
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a log level
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level '{0}' (expected debug, info, warn or error)")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Free-form auxiliary data attached to an entry
pub type Meta = BTreeMap<String, MetaValue>;

/// A single value inside a [`Meta`] map
///
/// Serialized untagged, so `{"table":"users","rows":3}` round-trips as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<MetaValue>),
    Map(Meta),
}

impl MetaValue {
    /// Borrow the string payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric payload as f64, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Int(i) => Some(*i as f64),
            MetaValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::String(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::String(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<i32> for MetaValue {
    fn from(value: i32) -> Self {
        MetaValue::Int(value as i64)
    }
}

impl From<u16> for MetaValue {
    fn from(value: u16) -> Self {
        MetaValue::Int(value.into())
    }
}

impl From<u32> for MetaValue {
    fn from(value: u32) -> Self {
        MetaValue::Int(value as i64)
    }
}

impl From<u64> for MetaValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(MetaValue::Int)
            .unwrap_or(MetaValue::Float(value as f64))
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl<T: Into<MetaValue>> From<Vec<T>> for MetaValue {
    fn from(values: Vec<T>) -> Self {
        MetaValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Meta> for MetaValue {
    fn from(value: Meta) -> Self {
        MetaValue::Map(value)
    }
}

/// Structured failure captured by the `error` helper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Failure kind, e.g. "Error" or "TypeError"
    pub name: String,
    /// Human-readable failure message
    pub message: String,
    /// Trace of causes, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture a Rust error: message from `Display`, stack from the `source()` chain
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            name: "Error".to_string(),
            message: err.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }
}

impl From<&anyhow::Error> for ErrorInfo {
    fn from(err: &anyhow::Error) -> Self {
        let causes: Vec<String> = err
            .chain()
            .skip(1)
            .map(|cause| format!("caused by: {}", cause))
            .collect();

        Self {
            name: "Error".to_string(),
            message: err.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }
}

impl From<&std::io::Error> for ErrorInfo {
    fn from(err: &std::io::Error) -> Self {
        Self::from_error(err)
    }
}

/// Request-correlation attributes merged into an entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContext {
    /// Numeric ids in stored lines are read back as text
    #[serde(
        default,
        deserialize_with = "deserialize_user_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Elapsed time of the logged operation in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

fn deserialize_user_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UserId {
        Text(String),
        Int(i64),
        UInt(u64),
        Float(f64),
    }

    Ok(Option::<UserId>::deserialize(deserializer)?.map(|id| match id {
        UserId::Text(s) => s,
        UserId::Int(n) => n.to_string(),
        UserId::UInt(n) => n.to_string(),
        UserId::Float(n) => n.to_string(),
    }))
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(mut self, user_id: impl ToString) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn duration(mut self, duration_ms: f64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    /// Fill every attribute unset here from `other`; values already set win
    pub fn or(self, other: LogContext) -> Self {
        Self {
            user_id: self.user_id.or(other.user_id),
            session_id: self.session_id.or(other.session_id),
            ip: self.ip.or(other.ip),
            user_agent: self.user_agent.or(other.user_agent),
            endpoint: self.endpoint.or(other.endpoint),
            duration: self.duration.or(other.duration),
        }
    }
}

/// A single structured logging event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(flatten)]
    pub context: LogContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
            meta: None,
            context: LogContext::default(),
            error: None,
        }
    }

    pub fn with_meta(mut self, meta: Option<Meta>) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_context(mut self, context: Option<LogContext>) -> Self {
        if let Some(context) = context {
            self.context = context;
        }
        self
    }

    pub fn with_error(mut self, error: Option<ErrorInfo>) -> Self {
        self.error = error;
        self
    }

    /// Console rendering: `[2026-01-21T14:30:45.123Z] INFO: message`
    pub fn console_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level.label(),
            self.message
        )
    }

    /// Serialize as one JSON line (no trailing newline)
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a single JSON line
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 21, 14, 30, 45).unwrap()
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("error".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(" info ".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert!("fatal".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_console_line_format() {
        let entry = LogEntry::new(ts(), LogLevel::Warn, "slow response");
        assert_eq!(
            entry.console_line(),
            "[2026-01-21T14:30:45.000Z] WARN: slow response"
        );
    }

    #[test]
    fn test_entry_serializes_camel_case_and_skips_empty_fields() {
        let entry = LogEntry::new(ts(), LogLevel::Info, "hello").with_context(Some(
            LogContext::new()
                .user_id(42)
                .user_agent("curl/8.0")
                .endpoint("/api/fortune"),
        ));

        let line = entry.to_line().unwrap();
        assert!(line.contains(r#""level":"info""#));
        assert!(line.contains(r#""userId":"42""#));
        assert!(line.contains(r#""userAgent":"curl/8.0""#));
        assert!(line.contains(r#""endpoint":"/api/fortune""#));
        assert!(!line.contains("meta"));
        assert!(!line.contains("error"));
        assert!(!line.contains("sessionId"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_entry_parses_from_line() {
        let line = r#"{"timestamp":"2026-01-21T14:30:45.123Z","level":"error","message":"boom","meta":{"table":"users","rows":3,"ratio":0.5,"tags":["a",true]},"endpoint":"/api/users","duration":12.5,"error":{"name":"Error","message":"ECONNRESET"}}"#;

        let entry = LogEntry::from_line(line).unwrap();
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.message, "boom");
        assert_eq!(entry.context.endpoint.as_deref(), Some("/api/users"));
        assert_eq!(entry.context.duration, Some(12.5));

        let meta = entry.meta.unwrap();
        assert_eq!(meta["table"], MetaValue::from("users"));
        assert_eq!(meta["rows"], MetaValue::Int(3));
        assert_eq!(meta["ratio"], MetaValue::Float(0.5));
        assert_eq!(
            meta["tags"],
            MetaValue::List(vec![MetaValue::from("a"), MetaValue::Bool(true)])
        );

        let error = entry.error.unwrap();
        assert_eq!(error.name, "Error");
        assert_eq!(error.message, "ECONNRESET");
        assert_eq!(error.stack, None);
    }

    #[test]
    fn test_entry_missing_required_field_fails() {
        let line = r#"{"timestamp":"2026-01-21T14:30:45.123Z","message":"no level"}"#;
        assert!(LogEntry::from_line(line).is_err());
    }

    #[test]
    fn test_error_info_from_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "ECONNRESET");
        let info = ErrorInfo::from(&err);
        assert_eq!(info.name, "Error");
        assert_eq!(info.message, "ECONNRESET");
    }

    #[test]
    fn test_error_info_from_anyhow_chain() {
        let err = anyhow::anyhow!("socket closed").context("query failed");
        let info = ErrorInfo::from(&err);
        assert_eq!(info.message, "query failed");
        assert_eq!(info.stack.as_deref(), Some("caused by: socket closed"));
    }

    #[test]
    fn test_context_or_prefers_own_values() {
        let merged = LogContext::new()
            .endpoint("/a")
            .or(LogContext::new().endpoint("/b").ip("10.0.0.1"));
        assert_eq!(merged.endpoint.as_deref(), Some("/a"));
        assert_eq!(merged.ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_meta_value_from_u64_overflow() {
        assert_eq!(MetaValue::from(7u64), MetaValue::Int(7));
        assert!(matches!(MetaValue::from(u64::MAX), MetaValue::Float(_)));
    }
}
