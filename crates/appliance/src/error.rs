//! Error types for appliance operations.
//!
//! Errors are categorized so callers can tell transport problems apart from
//! the appliance rejecting a request, and an ETag mismatch apart from both.

use serde_json::Value;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for appliance operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of appliance errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection refused, reset, timed out (transient).
    Network,
    /// Login rejected or session expired.
    Authentication,
    /// The addressed resource does not exist.
    NotFound,
    /// Optimistic concurrency check failed (ETag mismatch).
    Conflict,
    /// The appliance rejected the request body.
    Validation,
    /// The appliance answered with something that is not JSON.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether the orchestrator may retry the whole invocation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Conflict)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Appliance connectivity issue",
            Self::Authentication => "Authentication failed",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Resource changed concurrently",
            Self::Validation => "Request rejected by the appliance",
            Self::Format => "Invalid appliance response",
            Self::Other => "Unexpected error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to an appliance.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The appliance answered with an error status.
    #[error("appliance returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Human-readable message from the error body.
        message: String,
        /// Appliance error code (e.g. `RESOURCE_NOT_FOUND`).
        error_code: Option<String>,
        /// Additional details from the error body.
        details: Option<String>,
        /// Recommended actions listed by the appliance.
        recommended_actions: Vec<String>,
    },

    /// The request never got an answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// Login failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Response body could not be decoded.
    #[error("invalid appliance response: {0}")]
    InvalidResponse(String),

    /// IO error while reading or writing a local file.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a status error with only a message.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
            error_code: None,
            details: None,
            recommended_actions: Vec::new(),
        }
    }

    /// Build a status error from an appliance error document.
    ///
    /// OneView error bodies carry `errorCode`, `message`, `details` and
    /// `recommendedActions`; any of them may be missing.
    pub fn from_body(status: u16, body: &Value) -> Self {
        let text = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let recommended_actions = body
            .get("recommendedActions")
            .and_then(Value::as_array)
            .map(|actions| {
                actions
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self::Status {
            status,
            message: text("message").unwrap_or_else(|| format!("HTTP {status}")),
            error_code: text("errorCode"),
            details: text("details"),
            recommended_actions,
        }
    }

    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status code, when the appliance answered.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Status { .. } if self.is_etag_conflict() => ErrorCategory::Conflict,
            Self::Status { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                404 => ErrorCategory::NotFound,
                400 | 409 | 422 => ErrorCategory::Validation,
                500..=599 => ErrorCategory::Network,
                _ => ErrorCategory::Other,
            },
            Self::Transport(_) => ErrorCategory::Network,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::InvalidResponse(_) => ErrorCategory::Format,
            Self::Io { .. } | Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the appliance reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Whether the appliance rejected an `If-Match` precondition.
    #[must_use]
    pub fn is_etag_conflict(&self) -> bool {
        match self {
            Self::Status {
                status, error_code, ..
            } => {
                *status == 412
                    || error_code
                        .as_deref()
                        .is_some_and(|code| code.to_ascii_uppercase().contains("ETAG"))
            }
            _ => false,
        }
    }

    /// Appliance-provided details joined into one line, if any.
    #[must_use]
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Status {
                details,
                recommended_actions,
                ..
            } => {
                let mut parts: Vec<&str> = details.iter().map(String::as_str).collect();
                parts.extend(recommended_actions.iter().map(String::as_str));
                (!parts.is_empty()).then(|| parts.join(" "))
            }
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::status(code, format!("HTTP {code}")),
            ureq::Error::Io(source) => Self::Transport(source.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
