//! Reconciliation errors.
//!
//! Every variant maps to exactly one [`MessageCode`]; the module shell turns
//! an `Err` into a failure record using that code.

use crate::message::MessageCode;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the engine, the facts gatherer and the task monitor.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mandatory input field is missing.
    #[error("{0}")]
    MandatoryFieldMissing(String),

    /// An input value is invalid (unknown option, unsupported state, ...).
    #[error("{0}")]
    Value(String),

    /// A referenced resource does not exist.
    #[error("{kind} '{reference}' not found")]
    NotFound {
        /// Display name of the kind that was searched.
        kind: String,
        /// Name or URI that was searched for.
        reference: String,
        /// Code to report (`RESOURCE_NOT_FOUND`, `USER_NOT_FOUND`, ...).
        code: MessageCode,
    },

    /// The resource is absent and only the appliance may create it.
    #[error("{kind} '{reference}' not found; it can only be created by the appliance")]
    NotFoundForCreate {
        /// Display name of the kind.
        kind: String,
        /// Natural key that was searched for.
        reference: String,
    },

    /// A natural-key lookup matched more than one resource.
    #[error("{count} {kind} resources match '{reference}'")]
    Ambiguous {
        /// Display name of the kind.
        kind: String,
        /// Natural key that was searched for.
        reference: String,
        /// Number of matches.
        count: usize,
    },

    /// The operation needs a newer appliance API.
    #[error("{operation} requires API version {required} or later (appliance reports {actual})")]
    ApiVersion {
        /// What was attempted.
        operation: String,
        /// Minimum API version.
        required: u32,
        /// Version the appliance reports.
        actual: u32,
    },

    /// The resource changed since it was read.
    #[error("{kind} '{reference}' was modified concurrently; re-run to converge")]
    EtagConflict {
        /// Display name of the kind.
        kind: String,
        /// URI of the resource.
        reference: String,
        /// Appliance error.
        #[source]
        source: appliance::Error,
    },

    /// An appliance task ended in failure.
    #[error("task '{name}' failed: {log}")]
    Task {
        /// Task name.
        name: String,
        /// Task log details.
        log: String,
    },

    /// A job was submitted but the appliance did not hand back a task.
    #[error("job not started: {0}")]
    JobNotStarted(String),

    /// The appliance rejected a request or could not be reached.
    #[error(transparent)]
    Appliance(#[from] appliance::Error),
}

impl Error {
    /// Create a not-found error with the default code.
    pub fn not_found(kind: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            reference: reference.into(),
            code: MessageCode::ResourceNotFound,
        }
    }

    /// Message code reported for this error.
    #[must_use]
    pub fn code(&self) -> MessageCode {
        match self {
            Self::MandatoryFieldMissing(_) => MessageCode::MandatoryFieldMissing,
            Self::Value(_) => MessageCode::ValueError,
            Self::NotFound { code, .. } => *code,
            Self::NotFoundForCreate { .. } => MessageCode::ResourceNotFoundForCreate,
            Self::Ambiguous { .. } => MessageCode::AmbiguousReference,
            Self::ApiVersion { .. } => MessageCode::ApiVersionError,
            Self::EtagConflict { .. } => MessageCode::EtagConflict,
            Self::Task { .. } => MessageCode::TaskFailed,
            Self::JobNotStarted(_) => MessageCode::JobNotStarted,
            Self::Appliance(err) if err.is_etag_conflict() => MessageCode::EtagConflict,
            Self::Appliance(_) => MessageCode::ApplianceError,
        }
    }

    /// Whether the orchestrator may retry the invocation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EtagConflict { .. } => true,
            Self::Appliance(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Extra detail for the failure record (appliance details, task log).
    #[must_use]
    pub fn exception(&self) -> Option<String> {
        match self {
            Self::Appliance(err) | Self::EtagConflict { source: err, .. } => err.details(),
            Self::Task { log, .. } if !log.is_empty() => Some(log.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            Error::MandatoryFieldMissing("name is required".into()).code(),
            MessageCode::MandatoryFieldMissing
        );
        assert_eq!(Error::not_found("FC Network", "net1").code(), MessageCode::ResourceNotFound);
        let user = Error::NotFound {
            kind: "SNMPv3 User".into(),
            reference: "u1".into(),
            code: MessageCode::UserNotFound,
        };
        assert_eq!(user.code(), MessageCode::UserNotFound);
        assert_eq!(
            Error::from(appliance::Error::status(500, "boom")).code(),
            MessageCode::ApplianceError
        );
        assert_eq!(
            Error::from(appliance::Error::status(412, "stale")).code(),
            MessageCode::EtagConflict
        );
    }

    #[test]
    fn test_retryable() {
        let conflict = Error::EtagConflict {
            kind: "FC Network".into(),
            reference: "/rest/fc-networks/1".into(),
            source: appliance::Error::status(412, "stale"),
        };
        assert!(conflict.is_retryable());
        assert!(!Error::not_found("FC Network", "net1").is_retryable());
        assert!(!Error::Value("bad".into()).is_retryable());
    }

    #[test]
    fn test_exception_carries_task_log() {
        let err = Error::Task {
            name: "Add server".into(),
            log: "iLO unreachable".into(),
        };
        assert_eq!(err.exception().as_deref(), Some("iLO unreachable"));
        assert!(err.to_string().contains("iLO unreachable"));
    }
}
