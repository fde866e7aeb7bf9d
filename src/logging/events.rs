//! Domain-specific logging helpers
//!
//! Each helper shapes one entry for a call-site category (HTTP traffic, AI
//! calls, database work, product events) and records it through [`LogService::log`].

use serde::{Deserialize, Serialize};

use super::entry::{ErrorInfo, LogContext, LogLevel, Meta, MetaValue};
use super::service::LogService;

/// Request side of an HTTP exchange
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub request_id: Option<String>,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Correlation attributes for entries about this request
    pub fn context(&self) -> LogContext {
        LogContext {
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            ip: self.ip.clone(),
            user_agent: self.user_agent.clone(),
            endpoint: Some(self.path.clone()),
            duration: None,
        }
    }
}

/// Response side of an HTTP exchange
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub status: u16,
    pub content_length: Option<u64>,
}

impl ResponseInfo {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_length: None,
        }
    }
}

/// Level for an access-log line given the response status
pub fn level_for_status(status: u16) -> LogLevel {
    if status >= 500 {
        LogLevel::Error
    } else if status >= 400 {
        LogLevel::Warn
    } else {
        LogLevel::Info
    }
}

/// One call to an AI provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiRequest {
    pub provider: String,
    pub model: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub duration_ms: f64,
    pub user_id: Option<String>,
    /// Set when the call failed
    pub error: Option<ErrorInfo>,
}

/// One personalized fortune produced for a user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FortuneGeneration {
    /// e.g. "tarot", "horoscope", "daily"
    pub fortune_type: String,
    pub user_id: Option<String>,
    pub premium: bool,
    pub duration_ms: f64,
    pub error: Option<ErrorInfo>,
}

fn meta_of<const N: usize>(pairs: [(&str, MetaValue); N]) -> Meta {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

impl LogService {
    /// Access-log line for a completed HTTP exchange
    pub fn log_request(&self, request: &RequestInfo, response: &ResponseInfo, duration_ms: f64) {
        let mut meta = meta_of([
            ("method", request.method.clone().into()),
            ("statusCode", response.status.into()),
        ]);
        if let Some(length) = response.content_length {
            meta.insert("contentLength".to_string(), length.into());
        }
        if let Some(request_id) = &request.request_id {
            meta.insert("requestId".to_string(), request_id.clone().into());
        }

        self.log(
            level_for_status(response.status),
            format!(
                "{} {} {} - {:.0}ms",
                request.method, request.path, response.status, duration_ms
            ),
            Some(meta),
            Some(request.context().duration(duration_ms)),
        );
    }

    /// Product analytics event (page views, clicks, conversions)
    pub fn log_analytics_event(
        &self,
        event: &str,
        properties: Option<Meta>,
        context: Option<LogContext>,
    ) {
        let mut meta = properties.unwrap_or_default();
        meta.insert("event".to_string(), event.into());
        self.info(format!("Analytics event: {}", event), Some(meta), context);
    }

    /// Outcome of a call to an AI provider
    pub fn log_ai_request(&self, request: &AiRequest) {
        let mut meta = meta_of([
            ("provider", request.provider.clone().into()),
            ("model", request.model.clone().into()),
            ("success", request.error.is_none().into()),
        ]);
        if let Some(tokens) = request.prompt_tokens {
            meta.insert("promptTokens".to_string(), tokens.into());
        }
        if let Some(tokens) = request.completion_tokens {
            meta.insert("completionTokens".to_string(), tokens.into());
        }

        let mut context = LogContext::new()
            .endpoint(format!("ai/{}", request.provider))
            .duration(request.duration_ms);
        context.user_id = request.user_id.clone();

        match &request.error {
            None => self.info(
                format!("AI request to {} ({})", request.provider, request.model),
                Some(meta),
                Some(context),
            ),
            Some(error) => self.error(
                format!("AI request to {} failed", request.provider),
                Some(error.clone()),
                Some(meta),
                Some(context),
            ),
        }
    }

    /// Outcome of a database operation
    pub fn log_database_operation(
        &self,
        operation: &str,
        table: &str,
        duration_ms: f64,
        error: Option<ErrorInfo>,
    ) {
        let meta = meta_of([
            ("operation", operation.into()),
            ("table", table.into()),
        ]);
        let context = LogContext::new()
            .endpoint(format!("db/{}", table))
            .duration(duration_ms);

        match error {
            None => self.debug(
                format!("DB {} on {}", operation, table),
                Some(meta),
                Some(context),
            ),
            Some(error) => self.error(
                format!("DB {} on {} failed", operation, table),
                Some(error),
                Some(meta),
                Some(context),
            ),
        }
    }

    /// Something a signed-in user did
    pub fn log_user_action(&self, action: &str, user_id: &str, details: Option<Meta>) {
        let mut meta = details.unwrap_or_default();
        meta.insert("action".to_string(), action.into());
        self.info(
            format!("User action: {}", action),
            Some(meta),
            Some(LogContext::new().user_id(user_id)),
        );
    }

    /// Outcome of a personalized fortune generation
    pub fn log_fortune_generation(&self, generation: &FortuneGeneration) {
        let meta = meta_of([
            ("fortuneType", generation.fortune_type.clone().into()),
            ("premium", generation.premium.into()),
            ("success", generation.error.is_none().into()),
        ]);

        let mut context = LogContext::new()
            .endpoint(format!("fortune/{}", generation.fortune_type))
            .duration(generation.duration_ms);
        context.user_id = generation.user_id.clone();

        match &generation.error {
            None => self.info(
                format!("Fortune generated: {}", generation.fortune_type),
                Some(meta),
                Some(context),
            ),
            Some(error) => self.error(
                format!("Fortune generation failed: {}", generation.fortune_type),
                Some(error.clone()),
                Some(meta),
                Some(context),
            ),
        }
    }

    /// Virality score computed for a piece of shareable content
    ///
    /// Scores are expected in `[0, 1]`; anything else is logged as a warning.
    pub fn log_viral_prediction(
        &self,
        content_id: &str,
        score: f64,
        factors: Option<Meta>,
        context: Option<LogContext>,
    ) {
        let mut meta = meta_of([
            ("contentId", content_id.into()),
            ("score", score.into()),
        ]);
        if let Some(factors) = factors {
            meta.insert("factors".to_string(), factors.into());
        }

        let level = if (0.0..=1.0).contains(&score) {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };
        self.log(
            level,
            format!("Viral prediction for {}: {:.2}", content_id, score),
            Some(meta),
            context,
        );
    }
}
