//! Before/after hooks around an HTTP request-response cycle
//!
//! These hooks are independent of any server framework. An adapter calls
//! [`RequestTimer::start`] when a request arrives and [`RequestTimer::finish`]
//! once the response is ready; [`capture_failure`] records an unhandled error.

use std::time::Instant;

use uuid::Uuid;

use super::entry::{ErrorInfo, Meta, MetaValue};
use super::events::{RequestInfo, ResponseInfo};
use super::service::LogService;

/// Times one request from arrival to response
#[derive(Debug)]
pub struct RequestTimer {
    request: RequestInfo,
    started_at: Instant,
}

impl RequestTimer {
    /// Before hook: start timing and assign a request id if the caller has none
    pub fn start(mut request: RequestInfo) -> Self {
        if request.request_id.is_none() {
            request.request_id = Some(Uuid::new_v4().to_string());
        }
        Self {
            request,
            started_at: Instant::now(),
        }
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Milliseconds since the request arrived
    pub fn elapsed_ms(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64() * 1000.0
    }

    /// After hook: record exactly one access-log entry for the request
    pub fn finish(self, service: &LogService, response: ResponseInfo) -> f64 {
        let duration_ms = self.elapsed_ms();
        service.log_request(&self.request, &response, duration_ms);
        duration_ms
    }
}

/// Error hook: record one entry for a failure that escaped the request handler
pub fn capture_failure(service: &LogService, request: &RequestInfo, error: ErrorInfo) {
    let mut meta = Meta::new();
    meta.insert(
        "method".to_string(),
        MetaValue::String(request.method.clone()),
    );
    if let Some(request_id) = &request.request_id {
        meta.insert(
            "requestId".to_string(),
            MetaValue::String(request_id.clone()),
        );
    }

    service.error(
        format!("Unhandled error: {} {}", request.method, request.path),
        Some(error),
        Some(meta),
        Some(request.context()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::clock::SystemClock;
    use crate::logging::entry::LogLevel;
    use crate::logging::service::ServiceOptions;
    use crate::logging::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn service() -> LogService {
        LogService::new(
            ServiceOptions {
                console_mirror: false,
                ..Default::default()
            },
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
        )
    }

    #[test]
    fn test_timer_assigns_request_id() {
        let timer = RequestTimer::start(RequestInfo::new("GET", "/"));
        assert!(timer.request().request_id.is_some());

        let mut request = RequestInfo::new("GET", "/");
        request.request_id = Some("upstream-id".to_string());
        let timer = RequestTimer::start(request);
        assert_eq!(timer.request().request_id.as_deref(), Some("upstream-id"));
    }

    #[test]
    fn test_timer_logs_once_with_duration() {
        let service = service();
        let timer = RequestTimer::start(RequestInfo::new("GET", "/api/zodiac"));
        std::thread::sleep(Duration::from_millis(5));

        let duration = timer.finish(&service, ResponseInfo::new(200));
        assert!(duration >= 5.0);

        let entries = service.buffered_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].context.endpoint.as_deref(), Some("/api/zodiac"));
        assert_eq!(entries[0].context.duration, Some(duration));
    }

    #[test]
    fn test_capture_failure() {
        let service = service();
        let mut request = RequestInfo::new("POST", "/api/payments");
        request.user_id = Some("42".to_string());

        capture_failure(
            &service,
            &request,
            ErrorInfo::new("PaymentError", "card declined"),
        );

        let entries = service.buffered_entries();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.message, "Unhandled error: POST /api/payments");
        assert_eq!(entry.error.as_ref().unwrap().name, "PaymentError");
        assert_eq!(entry.context.user_id.as_deref(), Some("42"));
        assert_eq!(entry.context.endpoint.as_deref(), Some("/api/payments"));
    }
}
