use std::{fmt, time::Duration};

use serde::Serialize;
use thiserror::Error;

/// Whether an LLM failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Transient,
    Fatal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Stage of the rating pipeline that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingStage {
    Reasoning,
    Formatting,
}

impl fmt::Display for RatingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingStage::Reasoning => write!(f, "reasoning"),
            RatingStage::Formatting => write!(f, "formatting"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("LLM invocation failed ({kind}): {message}")]
    LlmInvocation { kind: FailureKind, message: String },

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed generation response: {reason}")]
    MalformedGenerationResponse { reason: String, raw: String },

    #[error("Malformed formatting response: {reason}")]
    MalformedFormattingResponse { reason: String, raw: String },

    #[error("Rating {0} is outside [1.0, 5.0]")]
    OutOfRangeRating(f64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Knowledge source unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Rating failed at {stage} stage: {source}")]
    RatingPipeline {
        stage: RatingStage,
        /// Rationale produced before the failure, if the reasoning stage finished.
        rationale: Option<String>,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn transient(message: impl Into<String>) -> Self {
        AppError::LlmInvocation {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        AppError::LlmInvocation {
            kind: FailureKind::Fatal,
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::LlmInvocation {
                kind: FailureKind::Transient,
                ..
            } => "TRANSIENT_SERVICE_ERROR",
            AppError::LlmInvocation { .. } => "LLM_INVOCATION_ERROR",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::MalformedGenerationResponse { .. } => "MALFORMED_GENERATION_RESPONSE",
            AppError::MalformedFormattingResponse { .. } => "MALFORMED_FORMATTING_RESPONSE",
            AppError::OutOfRangeRating(_) => "OUT_OF_RANGE_RATING",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::RatingPipeline { source, .. } => source.error_code(),
        }
    }

    /// True when retrying the same call may succeed. Timeouts count as transient.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::LlmInvocation { kind, .. } => *kind == FailureKind::Transient,
            AppError::Timeout(_) => true,
            AppError::RatingPipeline { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// True when the model replied but not in the expected shape.
    pub fn is_malformed(&self) -> bool {
        match self {
            AppError::MalformedGenerationResponse { .. }
            | AppError::MalformedFormattingResponse { .. }
            | AppError::OutOfRangeRating(_) => true,
            AppError::RatingPipeline { source, .. } => source.is_malformed(),
            _ => false,
        }
    }

    pub fn rationale(&self) -> Option<&str> {
        match self {
            AppError::RatingPipeline { rationale, .. } => rationale.as_deref(),
            _ => None,
        }
    }

    pub fn failed_stage(&self) -> Option<RatingStage> {
        match self {
            AppError::RatingPipeline { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON serialization error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for AppError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        use async_openai::error::OpenAIError;

        let kind = match &err {
            OpenAIError::Reqwest(_) => FailureKind::Transient,
            // 5xx bodies are not parsed, so server errors arrive untyped
            OpenAIError::ApiError(api) if api.r#type.is_none() && api.code.is_none() => {
                FailureKind::Transient
            }
            OpenAIError::ApiError(api) => classify_api_error(
                api.r#type.as_deref().unwrap_or_default(),
                api.code.as_deref().unwrap_or_default(),
            ),
            _ => FailureKind::Fatal,
        };

        AppError::LlmInvocation {
            kind,
            message: err.to_string(),
        }
    }
}

/// Rate limits, overload and server faults are retryable. Auth and bad
/// requests (unknown model, invalid key) are not.
pub fn classify_api_error(error_type: &str, code: &str) -> FailureKind {
    const TRANSIENT_MARKERS: [&str; 5] = [
        "rate_limit",
        "server_error",
        "overloaded",
        "timeout",
        "service_unavailable",
    ];

    let error_type = error_type.to_ascii_lowercase();
    let code = code.to_ascii_lowercase();
    if TRANSIENT_MARKERS
        .iter()
        .any(|marker| error_type.contains(marker) || code.contains(marker))
    {
        FailureKind::Transient
    } else {
        FailureKind::Fatal
    }
}

pub type AppResult<T> = Result<T, AppError>;
