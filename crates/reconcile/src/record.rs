//! Result records, the single output of every invocation.

use crate::error::Error;
use crate::message::MessageCode;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Before/after pair attached when a create or update was decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    /// State before the change (`null` for creates).
    pub before: Value,
    /// State after the change (or the state that would have been submitted).
    pub after: Value,
}

/// Uniform outcome of a reconciliation or facts query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Whether the appliance was (or would have been) mutated.
    pub changed: bool,
    /// Human-readable message.
    pub msg: String,
    /// Machine-readable outcome code.
    pub code: MessageCode,
    /// Fact name to payload.
    #[serde(default)]
    pub ansible_facts: Map<String, Value>,
    /// Before/after states, when a change was decided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
    /// Set on failure records only.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
    /// Appliance details or task log, on failure records only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl ResultRecord {
    /// Successful record with the default message for `code`.
    pub fn new(changed: bool, code: MessageCode, display: &str) -> Self {
        Self::with_message(changed, code, code.describe(display))
    }

    /// Successful record with an explicit message.
    pub fn with_message(changed: bool, code: MessageCode, msg: impl Into<String>) -> Self {
        Self {
            changed,
            msg: msg.into(),
            code,
            ansible_facts: Map::new(),
            diff: None,
            failed: false,
            exception: None,
        }
    }

    /// Failure record for an error. Never reports a change.
    pub fn failure(error: &Error) -> Self {
        Self {
            changed: false,
            msg: error.to_string(),
            code: error.code(),
            ansible_facts: Map::new(),
            diff: None,
            failed: true,
            exception: error.exception(),
        }
    }

    /// Record for a task the appliance scheduled instead of running.
    ///
    /// The change is pending, so the record reports `changed` and carries the
    /// task document under `fact`.
    pub fn scheduled(task: &Task, fact: &str) -> Self {
        let when = task
            .scheduled_for()
            .unwrap_or_else(|| "a later time".to_string());
        Self::with_message(
            true,
            MessageCode::TaskScheduled,
            format!("{} is scheduled for {when}.", task.name),
        )
        .fact(fact, task.raw.clone())
    }

    /// Add a fact.
    #[must_use]
    pub fn fact(mut self, name: &str, value: Value) -> Self {
        self.ansible_facts.insert(name.to_string(), value);
        self
    }

    /// Attach a before/after pair.
    #[must_use]
    pub fn diff(mut self, before: Value, after: Value) -> Self {
        self.diff = Some(Diff { before, after });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_record_serialization() {
        let record = ResultRecord::new(true, MessageCode::Created, "FC Network")
            .fact("fc_network", json!({"name": "net1"}));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["changed"], json!(true));
        assert_eq!(value["code"], json!("CREATED"));
        assert_eq!(value["msg"], json!("FC Network created successfully."));
        assert_eq!(value["ansible_facts"]["fc_network"]["name"], json!("net1"));
        assert!(value.get("failed").is_none());
        assert!(value.get("diff").is_none());
    }

    #[test]
    fn test_failure_record() {
        let err = Error::not_found("FC Network", "net9");
        let record = ResultRecord::failure(&err);
        assert!(record.failed);
        assert!(!record.changed);
        assert_eq!(record.code, MessageCode::ResourceNotFound);
        assert!(record.msg.contains("net9"));
    }
}
