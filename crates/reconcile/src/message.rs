//! Message codes reported in result records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome codes shared by every resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageCode {
    Created,
    Updated,
    Deleted,
    AlreadyPresent,
    AlreadyAbsent,
    ResourceNotFound,
    ResourceNotFoundForCreate,
    AmbiguousReference,
    MandatoryFieldMissing,
    ValueError,
    EtagConflict,
    ApiVersionError,
    Allocated,
    Collected,
    PresentationsRemoved,
    PortsUpdated,
    PasswordUpdated,
    DifferencesRetrieved,
    ResourceAssignmentsUpdated,
    StateChanged,
    Refreshed,
    UserNotFound,
    JobNotStarted,
    TaskFailed,
    TaskScheduled,
    OsDeployed,
    NetworkConfigured,
    FactsRetrieved,
    ApplianceError,
}

impl MessageCode {
    /// Wire name, e.g. `ALREADY_PRESENT`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Deleted => "DELETED",
            Self::AlreadyPresent => "ALREADY_PRESENT",
            Self::AlreadyAbsent => "ALREADY_ABSENT",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::ResourceNotFoundForCreate => "RESOURCE_NOT_FOUND_FOR_CREATE",
            Self::AmbiguousReference => "AMBIGUOUS_REFERENCE",
            Self::MandatoryFieldMissing => "MANDATORY_FIELD_MISSING",
            Self::ValueError => "VALUE_ERROR",
            Self::EtagConflict => "ETAG_CONFLICT",
            Self::ApiVersionError => "API_VERSION_ERROR",
            Self::Allocated => "ALLOCATED",
            Self::Collected => "COLLECTED",
            Self::PresentationsRemoved => "PRESENTATIONS_REMOVED",
            Self::PortsUpdated => "PORTS_UPDATED",
            Self::PasswordUpdated => "PASSWORD_UPDATED",
            Self::DifferencesRetrieved => "DIFFERENCES_RETRIEVED",
            Self::ResourceAssignmentsUpdated => "RESOURCE_ASSIGNMENTS_UPDATED",
            Self::StateChanged => "STATE_CHANGED",
            Self::Refreshed => "REFRESHED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::JobNotStarted => "JOB_NOT_STARTED",
            Self::TaskFailed => "TASK_FAILED",
            Self::TaskScheduled => "TASK_SCHEDULED",
            Self::OsDeployed => "OS_DEPLOYED",
            Self::NetworkConfigured => "NETWORK_CONFIGURED",
            Self::FactsRetrieved => "FACTS_RETRIEVED",
            Self::ApplianceError => "APPLIANCE_ERROR",
        }
    }

    /// Human-readable message for a successful outcome on `display`
    /// (e.g. "FC Network created successfully.").
    #[must_use]
    pub fn describe(&self, display: &str) -> String {
        match self {
            Self::Created => format!("{display} created successfully."),
            Self::Updated => format!("{display} updated successfully."),
            Self::Deleted => format!("{display} deleted successfully."),
            Self::AlreadyPresent => format!("{display} is already present."),
            Self::AlreadyAbsent => format!("{display} is already absent."),
            Self::Allocated => format!("{display} IDs allocated successfully."),
            Self::Collected => format!("{display} IDs collected successfully."),
            Self::PresentationsRemoved => {
                format!("{display} extra presentations removed successfully.")
            }
            Self::PortsUpdated => format!("{display} ports updated successfully."),
            Self::PasswordUpdated => format!("{display} password updated successfully."),
            Self::DifferencesRetrieved => format!("{display} differences retrieved."),
            Self::ResourceAssignmentsUpdated => {
                format!("{display} resource assignments updated successfully.")
            }
            Self::StateChanged => format!("{display} state changed successfully."),
            Self::Refreshed => format!("{display} refreshed successfully."),
            Self::TaskScheduled => format!("{display} task scheduled."),
            Self::OsDeployed => "OS Deployed Successfully.".to_string(),
            Self::NetworkConfigured => "Network configured successfully.".to_string(),
            Self::FactsRetrieved => format!("{display} facts retrieved."),
            other => format!("{display}: {}", other.as_str()),
        }
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_wire_name() {
        for code in [
            MessageCode::AlreadyPresent,
            MessageCode::EtagConflict,
            MessageCode::ApiVersionError,
            MessageCode::OsDeployed,
            MessageCode::ResourceNotFoundForCreate,
        ] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, serde_json::Value::String(code.as_str().to_string()));
        }
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            MessageCode::Created.describe("FC Network"),
            "FC Network created successfully."
        );
        assert_eq!(
            MessageCode::OsDeployed.describe("ICsp Server"),
            "OS Deployed Successfully."
        );
    }
}
