//! # appliance
//!
//! Blocking client abstraction for HPE OneView and its companions
//! (Image Streamer, Insight Control server provisioning).
//!
//! Every appliance exposes the same REST shape: resources live in
//! collections (`/rest/fc-networks`), each member has a stable `uri`, and
//! sub-operations are sub-paths of a member (`/rest/enclosures/e1/script`).
//! The [`Appliance`] trait captures that shape so the reconciliation engine
//! can be driven by a real appliance ([`RestClient`]) or an in-memory one
//! ([`MemoryAppliance`]).
//!
//! ## Example
//!
//! ```
//! use appliance::{Appliance, MemoryAppliance, Query};
//! use serde_json::json;
//!
//! let appliance = MemoryAppliance::new();
//! appliance.insert("/rest/fc-networks", json!({"name": "net1"}));
//!
//! let found = appliance.find_by("/rest/fc-networks", "name", "net1").unwrap();
//! assert_eq!(found.len(), 1);
//!
//! let all = appliance.get_all("/rest/fc-networks", &Query::new()).unwrap();
//! assert_eq!(all.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod memory;
pub mod query;
pub mod rest;

pub use error::{Error, ErrorCategory, Result};
pub use memory::{Call, MemoryAppliance, Method};
pub use query::{PatchOp, Query};
pub use rest::{Credentials, RestClient};

use serde_json::Value;
use std::path::Path;

/// Operations every appliance offers.
///
/// Mutating calls return whatever the appliance answered: the resulting
/// resource, a task document for asynchronous operations, or `Null`.
pub trait Appliance {
    /// REST API version negotiated with the appliance.
    fn api_version(&self) -> u32;

    /// List the members of a collection.
    fn get_all(&self, collection: &str, query: &Query) -> Result<Vec<Value>>;

    /// Fetch a single document, `None` when the appliance answers 404.
    fn get(&self, uri: &str) -> Result<Option<Value>>;

    /// Fetch a single document with query parameters (`utilization`, ...).
    fn get_with(&self, uri: &str, query: &Query) -> Result<Option<Value>>;

    /// Create a member of a collection.
    fn create(&self, collection: &str, body: &Value) -> Result<Value>;

    /// Replace a resource. `if_match` carries the ETag to validate against.
    fn update(&self, uri: &str, body: &Value, if_match: Option<&str>) -> Result<Value>;

    /// Delete a resource.
    fn delete(&self, uri: &str, if_match: Option<&str>) -> Result<Value>;

    /// Apply patch operations to a resource.
    fn patch(&self, uri: &str, ops: &[PatchOp], if_match: Option<&str>) -> Result<Value>;

    /// POST to an arbitrary URI (jobs, repair requests, ...).
    fn post(&self, uri: &str, body: &Value) -> Result<Value>;

    /// PUT to an arbitrary URI (sub-resources such as `/refreshState`).
    fn put(&self, uri: &str, body: &Value) -> Result<Value>;

    /// Download a binary document to a local file.
    fn download(&self, uri: &str, destination: &Path) -> Result<()>;

    /// Find members whose `key` equals `value`.
    ///
    /// The filter is evaluated by the appliance and then re-checked locally,
    /// since some endpoints ignore filters.
    fn find_by(&self, collection: &str, key: &str, value: &str) -> Result<Vec<Value>> {
        let members = self.get_all(collection, &Query::by_field(key, value))?;
        Ok(members
            .into_iter()
            .filter(|member| member.get(key).and_then(Value::as_str) == Some(value))
            .collect())
    }
}
