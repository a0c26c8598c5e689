//! # reconcile
//!
//! Converges HPE OneView resources to a desired state.
//!
//! ## Core Concepts
//!
//! - **ResourceDescriptor**: static per-kind data (collection, natural key,
//!   capabilities, name references, options, actions)
//! - **ReconciliationEngine**: drives `present`, `absent` and action verbs
//!   for one kind, producing exactly one [`ResultRecord`]
//! - **FactsGatherer**: read-only listing, lookup and sub-fact queries
//! - **TaskMonitor**: polls appliance tasks and ICsp jobs to completion
//! - **Comparator** / [`merge`]: partial structural equality and the
//!   right-biased merge that builds submission bodies
//!
//! ## Example
//!
//! ```
//! use appliance::MemoryAppliance;
//! use reconcile::{Capabilities, MessageCode, ReconciliationEngine, ResourceDescriptor};
//! use serde_json::json;
//!
//! static FC_NETWORK: ResourceDescriptor =
//!     ResourceDescriptor::new("fc_network", "FC Network", "/rest/fc-networks")
//!         .capabilities(Capabilities::CRUD.scoped().etagged());
//!
//! let appliance = MemoryAppliance::new();
//! let engine = ReconciliationEngine::new(&appliance, &FC_NETWORK);
//! let desired = json!({"name": "net1", "fabricType": "FabricAttach"});
//!
//! let record = engine.run("present", desired.as_object().unwrap()).unwrap();
//! assert_eq!(record.code, MessageCode::Created);
//!
//! let record = engine.run("present", desired.as_object().unwrap()).unwrap();
//! assert_eq!(record.code, MessageCode::AlreadyPresent);
//! ```
//!
//! ## Errors
//!
//! Operations return [`Result`]; nothing is retried and nothing is
//! swallowed. The caller turns an [`Error`] into a failure record with
//! [`ResultRecord::failure`].

pub mod compare;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod facts;
pub mod merge;
pub mod message;
pub mod record;
pub mod resolve;
pub mod task;

// Re-export main types at crate root
pub use compare::Comparator;
pub use descriptor::{
    ActionSpec, Call, Capabilities, CreatePolicy, CustomFetch, Endpoint, Fetch, Lookup,
    OptionSpec, Payload, Precheck, ReferenceField, ResourceDescriptor, Target,
};
pub use engine::{EngineOptions, ReconciliationEngine};
pub use error::{Error, Result};
pub use facts::{FactsGatherer, RequestedOption};
pub use merge::{merge_list_by_key, prepare_body};
pub use message::MessageCode;
pub use record::{Diff, ResultRecord};
pub use resolve::{Reference, Resolver};
pub use task::{NoProgress, Task, TaskMonitor, TaskOutcome, TaskProgress, TaskState};
