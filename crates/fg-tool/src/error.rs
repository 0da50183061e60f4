// error.rs: Tool error taxonomy and transport failures.
//
// Two failure channels exist and must not be mixed:
// - ToolError: the operation is impossible or was refused (bad input,
//   missing target, unmet precondition). Carried inside a ToolResult.
// - TransportError: the operation could not be attempted (cancelled
//   context, serialization failure, backend down). Returned as `Err`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of tool error codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidInput,
    NotFound,
    Unauthorized,
    UpstreamError,
    RateLimited,
    Timeout,
    Conflict,
    Internal,
    Unsupported,
    PreconditionFailed,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 10] = [
        ErrorCode::InvalidInput,
        ErrorCode::NotFound,
        ErrorCode::Unauthorized,
        ErrorCode::UpstreamError,
        ErrorCode::RateLimited,
        ErrorCode::Timeout,
        ErrorCode::Conflict,
        ErrorCode::Internal,
        ErrorCode::Unsupported,
        ErrorCode::PreconditionFailed,
    ];

    /// The caller sent something that must change before a retry can succeed.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidInput
                | ErrorCode::NotFound
                | ErrorCode::Unauthorized
                | ErrorCode::Conflict
                | ErrorCode::Unsupported
                | ErrorCode::PreconditionFailed
        )
    }

    /// Something failed on our side or upstream of us.
    pub fn is_server_error(self) -> bool {
        matches!(
            self,
            ErrorCode::UpstreamError | ErrorCode::Internal | ErrorCode::Timeout
        )
    }

    /// Eligible for retry by the caller.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorCode::UpstreamError
                | ErrorCode::RateLimited
                | ErrorCode::Timeout
                | ErrorCode::Internal
        )
    }

    /// Whether `retryable` may legitimately disagree with `is_transient()`.
    ///
    /// A conflict may clear on its own (a concurrent writer finished), and a
    /// server-side failure may be known permanent. Everything else is fixed.
    pub fn retry_is_situational(self) -> bool {
        matches!(
            self,
            ErrorCode::Conflict
                | ErrorCode::UpstreamError
                | ErrorCode::Timeout
                | ErrorCode::Internal
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::UpstreamError => "upstream_error",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Conflict => "conflict",
            ErrorCode::Internal => "internal",
            ErrorCode::Unsupported => "unsupported",
            ErrorCode::PreconditionFailed => "precondition_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A business-logic failure reported by a tool.
///
/// Built through the constructors below so `retryable` starts out agreeing
/// with the code's transient classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    /// Structured context, e.g. the schema violations for invalid input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            retryable: code.is_transient(),
            retry_after_seconds: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// `kind` names what was looked up ("tool", "certificate", "alert").
    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("{} '{}' not found", kind, id))
            .with_details(serde_json::json!({ "kind": kind, "id": id }))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamError, message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_seconds: u64) -> Self {
        let mut err = Self::new(ErrorCode::RateLimited, message);
        err.retry_after_seconds = Some(retry_after_seconds);
        err
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unsupported, message)
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PreconditionFailed, message)
    }

    /// Attach structured details (builder pattern).
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Override retryability. Ignored for codes whose retryability is
    /// fixed by the taxonomy (`invalid_input` is never retryable,
    /// `rate_limited` always is).
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        if self.code.retry_is_situational() {
            self.retryable = retryable;
        }
        self
    }

    /// Lift any error into a ToolError.
    ///
    /// A ToolError passes through unchanged. Anything else becomes
    /// `internal` with the error's text as the message, marked retryable
    /// pending investigation.
    pub fn wrap<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        match err.into().downcast::<ToolError>() {
            Ok(tool_error) => *tool_error,
            Err(other) => {
                let mut wrapped = Self::new(ErrorCode::Internal, other.to_string());
                wrapped.retryable = true;
                wrapped
            }
        }
    }
}

/// Optional-error form of [`ToolError::wrap`]: `None` stays `None`.
pub fn wrap_error<E>(err: Option<E>) -> Option<ToolError>
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    err.map(ToolError::wrap)
}

/// Infrastructure failures below a tool. Forwarded unchanged by the registry.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// Params or results could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A collaborator (data store, upstream API) could not be reached.
    #[error("backend failure: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TransportError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        TransportError::Backend { source: err.into() }
    }
}
