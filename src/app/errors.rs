//! Engine error taxonomy and AWS SDK error classification.
//!
//! Two failure policies live side by side:
//!
//! - **Gate failures** ([`EngineError::LogGroupNotFound`]) stop an operation
//!   before anything is submitted to the backend.
//! - **Operational failures** ([`EngineError::QueryFailed`],
//!   [`EngineError::Transport`]) describe a backend that misbehaved. The query
//!   executor folds them into a `Failed` result instead of returning them.
//!
//! The SDK wraps service errors in several layers, so classification works on
//! the rendered error chain rather than on concrete SDK types.

#![warn(clippy::all, rust_2018_idioms)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::data_plane::cloudwatch_logs::QueryStatus;

/// Errors surfaced at the engine boundary
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A referenced log group does not exist
    #[error("Log group '{log_group}' does not exist")]
    LogGroupNotFound { log_group: String },

    /// A query reached a terminal status other than `Complete`
    #[error("Query ended with status {status}: {message}")]
    QueryFailed { status: QueryStatus, message: String },

    /// The backend could not be reached or rejected the request
    #[error("{operation} failed ({kind}): {message}")]
    Transport {
        operation: String,
        kind: TransportKind,
        message: String,
    },
}

impl EngineError {
    /// Build a transport error from an `anyhow` chain, classifying it on the way
    pub fn transport(operation: &str, error: &anyhow::Error) -> Self {
        let message = format!("{:#}", error);
        EngineError::Transport {
            operation: operation.to_string(),
            kind: TransportKind::classify(&message),
            message: truncate_message(&message, 300),
        }
    }

    /// Stable machine-readable code for transports
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::LogGroupNotFound { .. } => "NotFound",
            EngineError::QueryFailed { .. } => "QueryFailed",
            EngineError::Transport { .. } => "TransportError",
        }
    }
}

/// Coarse classification of a backend/transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Throttled,
    Timeout,
    Network,
    ServiceUnavailable,
    AccessDenied,
    Backend,
}

impl TransportKind {
    /// Classify a rendered SDK error message
    pub fn classify(error_str: &str) -> Self {
        const THROTTLED: &[&str] = &[
            "ThrottlingException",
            "Throttling",
            "TooManyRequestsException",
            "RequestLimitExceeded",
            "LimitExceededException",
            "RateExceeded",
        ];
        const TIMEOUT: &[&str] = &["TimeoutError", "timed out", "timeout", "deadline exceeded"];
        const NETWORK: &[&str] = &[
            "DispatchFailure",
            "dispatch failure",
            "connection",
            "Connection",
            "network",
            "DNS",
            "socket",
        ];
        const UNAVAILABLE: &[&str] = &[
            "ServiceUnavailable",
            "Service Unavailable",
            "InternalServerError",
            "InternalServerException",
            "InternalError",
        ];
        const DENIED: &[&str] = &[
            "AccessDenied",
            "UnauthorizedOperation",
            "UnrecognizedClientException",
            "InvalidClientTokenId",
            "ExpiredToken",
            "SignatureDoesNotMatch",
            "NoCredentialsError",
            "no credentials",
            "failed to load credentials",
        ];

        let has = |needles: &[&str]| needles.iter().any(|n| error_str.contains(n));

        if has(THROTTLED) {
            TransportKind::Throttled
        } else if has(DENIED) {
            TransportKind::AccessDenied
        } else if has(TIMEOUT) {
            TransportKind::Timeout
        } else if has(UNAVAILABLE) {
            TransportKind::ServiceUnavailable
        } else if has(NETWORK) {
            TransportKind::Network
        } else {
            TransportKind::Backend
        }
    }

    /// Whether retrying the same request later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportKind::Throttled
                | TransportKind::Timeout
                | TransportKind::Network
                | TransportKind::ServiceUnavailable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Throttled => "throttled",
            TransportKind::Timeout => "timeout",
            TransportKind::Network => "network",
            TransportKind::ServiceUnavailable => "unavailable",
            TransportKind::AccessDenied => "access denied",
            TransportKind::Backend => "backend error",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Truncate on a char boundary, adding an ellipsis when shortened
fn truncate_message(msg: &str, max_chars: usize) -> String {
    if msg.chars().count() <= max_chars {
        return msg.to_string();
    }
    let mut out: String = msg.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
