//! axum adapters for the request hooks
//!
//! `request_logging` times every request and writes one access-log entry;
//! `capture_errors` records server errors through `capture_failure`.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::logging::{capture_failure, ErrorInfo, LogService, RequestInfo, RequestTimer, ResponseInfo};

/// Build the hook's view of an incoming request
pub fn request_info(request: &Request) -> RequestInfo {
    let headers = request.headers();
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let ip = header_value("x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

    RequestInfo {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        ip,
        user_agent: header_value("user-agent"),
        user_id: header_value("x-user-id"),
        session_id: header_value("x-session-id"),
        request_id: header_value("x-request-id"),
    }
}

/// Time the request and log it once the response is produced
pub async fn request_logging(
    State(service): State<LogService>,
    mut request: Request,
    next: Next,
) -> Response {
    let timer = RequestTimer::start(request_info(&request));
    request.extensions_mut().insert(timer.request().clone());
    let request_id = timer.request().request_id.clone();

    let mut response = next.run(request).await;

    if let Some(value) = request_id.and_then(|id| HeaderValue::from_str(&id).ok()) {
        response.headers_mut().insert("x-request-id", value);
    }

    let content_length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    timer.finish(
        &service,
        ResponseInfo {
            status: response.status().as_u16(),
            content_length,
        },
    );

    response
}

/// Log server errors, using the handler's `ErrorInfo` extension when present
pub async fn capture_errors(
    State(service): State<LogService>,
    request: Request,
    next: Next,
) -> Response {
    let info = request
        .extensions()
        .get::<RequestInfo>()
        .cloned()
        .unwrap_or_else(|| request_info(&request));

    let response = next.run(request).await;

    if response.status().is_server_error() {
        let error = response
            .extensions()
            .get::<ErrorInfo>()
            .cloned()
            .unwrap_or_else(|| ErrorInfo::new("HttpError", response.status().to_string()));
        capture_failure(&service, &info, error);
    }

    response
}
