//! Per-kind resource descriptors.
//!
//! A descriptor is immutable `'static` data that tells the engine everything
//! kind-specific: where the collection lives, which field is the natural key,
//! what the kind can do, which nested name fields must become URIs, which
//! sub-facts exist and which verbs beyond `present`/`absent` are supported.
//!
//! Descriptors are built with `const fn` builders so catalogs can declare
//! them as statics:
//!
//! ```
//! use reconcile::{Capabilities, ResourceDescriptor};
//!
//! static FC_NETWORK: ResourceDescriptor = ResourceDescriptor::new(
//!     "fc_network",
//!     "FC Network",
//!     "/rest/fc-networks",
//! )
//! .facts_name("fc_networks")
//! .capabilities(Capabilities::CRUD.scoped().etagged());
//!
//! assert_eq!(FC_NETWORK.fact_name, "fc_network");
//! assert_eq!(FC_NETWORK.facts_name, "fc_networks");
//! ```

use crate::error::Result;
use crate::message::MessageCode;
use appliance::Appliance;
use serde_json::{Map, Value};

/// Which appliance serves a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// HPE OneView.
    OneView,
    /// HPE Image Streamer (shares the OneView session).
    ImageStreamer,
    /// HPE Insight Control server provisioning.
    Icsp,
}

/// What the appliance allows for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub creatable: bool,
    pub updatable: bool,
    pub deletable: bool,
    pub patchable: bool,
    /// Resources carry `scopeUris` and accept a `/scopeUris` replace patch.
    pub scoped: bool,
    /// Resources carry an `eTag` validated on update.
    pub etagged: bool,
}

impl Capabilities {
    /// Create, update and delete.
    pub const CRUD: Self = Self {
        creatable: true,
        updatable: true,
        deletable: true,
        patchable: false,
        scoped: false,
        etagged: false,
    };

    /// Nothing but reads (facts-only kinds).
    pub const READ_ONLY: Self = Self {
        creatable: false,
        updatable: false,
        deletable: false,
        patchable: false,
        scoped: false,
        etagged: false,
    };

    /// Mark as scope-aware. Scope assignment is done by patch.
    pub const fn scoped(mut self) -> Self {
        self.scoped = true;
        self.patchable = true;
        self
    }

    pub const fn etagged(mut self) -> Self {
        self.etagged = true;
        self
    }

    pub const fn patchable(mut self) -> Self {
        self.patchable = true;
        self
    }

    /// Drop create (resources discovered or added by the appliance).
    pub const fn without_create(mut self) -> Self {
        self.creatable = false;
        self
    }

    pub const fn without_update(mut self) -> Self {
        self.updatable = false;
        self
    }

    pub const fn without_delete(mut self) -> Self {
        self.deletable = false;
        self
    }
}

/// Who may create resources of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePolicy {
    /// Clients create resources.
    Client,
    /// Only the appliance creates resources.
    Appliance,
    /// Only the appliance creates resources from this API version on.
    ApplianceFrom(u32),
}

impl CreatePolicy {
    /// Whether a client create is allowed at `api_version`.
    #[must_use]
    pub fn allows_client_create(&self, api_version: u32) -> bool {
        match self {
            Self::Client => true,
            Self::Appliance => false,
            Self::ApplianceFrom(version) => api_version < *version,
        }
    }
}

/// How to find resources of a kind by natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// Collection path.
    pub collection: &'static str,
    /// Field matched against the reference.
    pub key: &'static str,
    /// Display name used in errors.
    pub kind: &'static str,
}

impl Lookup {
    pub const fn new(collection: &'static str, kind: &'static str) -> Self {
        Self {
            collection,
            key: "name",
            kind,
        }
    }

    pub const fn by(mut self, key: &'static str) -> Self {
        self.key = key;
        self
    }
}

/// A nested name field translated into a URI (or id) before submission.
///
/// The field may appear anywhere in the desired document, including inside
/// lists of mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceField {
    /// Field holding the name, e.g. `enclosureGroupName`.
    pub field: &'static str,
    /// Field receiving the resolved value, e.g. `enclosureGroupUri`.
    pub target: &'static str,
    /// Where to look the name up.
    pub lookup: Lookup,
    /// Member field copied into `target` (`uri` or `id`).
    pub yields: &'static str,
    /// Code reported when nothing matches.
    pub missing: MessageCode,
}

impl ReferenceField {
    pub const fn new(field: &'static str, target: &'static str, lookup: Lookup) -> Self {
        Self {
            field,
            target,
            lookup,
            yields: "uri",
            missing: MessageCode::ResourceNotFound,
        }
    }

    pub const fn yields(mut self, member_field: &'static str) -> Self {
        self.yields = member_field;
        self
    }

    pub const fn missing(mut self, code: MessageCode) -> Self {
        self.missing = code;
        self
    }
}

/// Custom option fetcher: `(appliance, resource, params) -> payload`.
pub type CustomFetch = fn(&dyn Appliance, &Value, &Map<String, Value>) -> Result<Value>;

/// How an option's payload is fetched.
#[derive(Debug, Clone, Copy)]
pub enum Fetch {
    /// GET `{uri}/{sub}`.
    Sub(&'static str),
    /// GET `{uri}/{sub}` with the option's parameters as query.
    SubWithQuery(&'static str),
    /// List `{uri}/{sub}`, filtered by `key` when the option names one.
    Lookup {
        /// Sub-collection.
        sub: &'static str,
        /// Parameter and member field matched against each other.
        key: &'static str,
    },
    /// Anything else (downloads, cross-collection queries).
    Custom(CustomFetch),
}

/// A named sub-fact available through the facts gatherer.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    /// Option name as written by the caller, e.g. `environmentalConfiguration`.
    pub name: &'static str,
    /// Fact name, e.g. `enclosure_environmental_configuration`.
    pub fact: &'static str,
    pub fetch: Fetch,
}

impl OptionSpec {
    pub const fn new(name: &'static str, fact: &'static str, fetch: Fetch) -> Self {
        Self { name, fact, fetch }
    }
}

/// Body or value sent by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// `{}`.
    Empty,
    /// A fixed string, e.g. `"On"`.
    Text(&'static str),
    /// `{key: value}`.
    Pair(&'static str, &'static str),
    /// The desired document's field, mandatory.
    Field(&'static str),
    /// An object of the listed desired fields; at least one is mandatory.
    Fields(&'static [&'static str]),
    /// Like `Fields`, plus a fixed `key: value` entry.
    Tagged {
        fields: &'static [&'static str],
        key: &'static str,
        value: &'static str,
    },
    /// Desired merged over current, as for an update.
    Merged,
}

/// Appliance call made by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    /// PATCH the target with `replace path value`.
    Patch {
        path: &'static str,
        value: Payload,
    },
    /// PUT to `{target}/{sub}` (the target itself when `sub` is empty).
    Put { sub: &'static str, body: Payload },
    /// POST to `{target}/{sub}`.
    Post { sub: &'static str, body: Payload },
    /// GET `{target}/{sub}`; never a change.
    Get { sub: &'static str },
}

impl Call {
    #[must_use]
    pub fn mutates(&self) -> bool {
        !matches!(self, Self::Get { .. })
    }
}

/// How an action decides it has nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precheck {
    /// Never skip; the action always reports a change.
    Always,
    /// Skip when the current resource's `field` already equals `expect`.
    Field {
        field: &'static str,
        expect: &'static str,
    },
    /// Skip when GET `{uri}/{sub}` already matches the desired `field`.
    SubResource {
        sub: &'static str,
        field: &'static str,
    },
}

/// What an action operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// An existing resource, located by natural key or URI.
    Resource,
    /// The kind's collection.
    Collection,
}

/// A verb beyond `present`/`absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    /// State name, e.g. `powered_on`.
    pub state: &'static str,
    /// Code reported on success.
    pub code: MessageCode,
    pub target: Target,
    pub call: Call,
    pub check: Precheck,
    /// Fact receiving the call's answer; `None` re-reads the resource into
    /// the kind's fact.
    pub fact: Option<&'static str>,
    /// Minimum API version.
    pub min_api: Option<u32>,
}

impl ActionSpec {
    pub const fn new(state: &'static str, code: MessageCode, call: Call) -> Self {
        Self {
            state,
            code,
            target: Target::Resource,
            call,
            check: Precheck::Always,
            fact: None,
            min_api: None,
        }
    }

    pub const fn on_collection(mut self) -> Self {
        self.target = Target::Collection;
        self
    }

    pub const fn unless(mut self, check: Precheck) -> Self {
        self.check = check;
        self
    }

    pub const fn fact(mut self, fact: &'static str) -> Self {
        self.fact = Some(fact);
        self
    }

    pub const fn since(mut self, api_version: u32) -> Self {
        self.min_api = Some(api_version);
        self
    }
}

/// Everything kind-specific the engine needs.
#[derive(Debug)]
pub struct ResourceDescriptor {
    /// Kind name, e.g. `fc_network`.
    pub kind: &'static str,
    /// Display name, e.g. `FC Network`.
    pub display: &'static str,
    pub endpoint: Endpoint,
    /// Collection path, e.g. `/rest/fc-networks`.
    pub path: &'static str,
    /// Natural-key field.
    pub natural_key: &'static str,
    /// Fact name for `present` results.
    pub fact_name: &'static str,
    /// Fact name for facts queries.
    pub facts_name: &'static str,
    pub capabilities: Capabilities,
    pub create: CreatePolicy,
    pub references: &'static [ReferenceField],
    /// Dotted paths whose lists compare in order.
    pub ordered_paths: &'static [&'static str],
    /// `(path, key)` pairs whose lists merge by key instead of being replaced.
    pub additive_paths: &'static [(&'static str, &'static str)],
    /// Top-level fields the appliance never echoes back.
    pub write_only: &'static [&'static str],
    pub options: &'static [OptionSpec],
    pub actions: &'static [ActionSpec],
}

impl ResourceDescriptor {
    /// A CRUD kind keyed by `name`. Both fact names start out as `kind`.
    pub const fn new(kind: &'static str, display: &'static str, path: &'static str) -> Self {
        Self {
            kind,
            display,
            endpoint: Endpoint::OneView,
            path,
            natural_key: "name",
            fact_name: kind,
            facts_name: kind,
            capabilities: Capabilities::CRUD,
            create: CreatePolicy::Client,
            references: &[],
            ordered_paths: &[],
            additive_paths: &[],
            write_only: &[],
            options: &[],
            actions: &[],
        }
    }

    pub const fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub const fn key(mut self, natural_key: &'static str) -> Self {
        self.natural_key = natural_key;
        self
    }

    pub const fn fact_name(mut self, fact_name: &'static str) -> Self {
        self.fact_name = fact_name;
        self
    }

    pub const fn facts_name(mut self, facts_name: &'static str) -> Self {
        self.facts_name = facts_name;
        self
    }

    pub const fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub const fn create_policy(mut self, policy: CreatePolicy) -> Self {
        self.create = policy;
        self
    }

    pub const fn references(mut self, references: &'static [ReferenceField]) -> Self {
        self.references = references;
        self
    }

    pub const fn ordered(mut self, paths: &'static [&'static str]) -> Self {
        self.ordered_paths = paths;
        self
    }

    pub const fn additive(mut self, paths: &'static [(&'static str, &'static str)]) -> Self {
        self.additive_paths = paths;
        self
    }

    pub const fn write_only(mut self, fields: &'static [&'static str]) -> Self {
        self.write_only = fields;
        self
    }

    pub const fn options(mut self, options: &'static [OptionSpec]) -> Self {
        self.options = options;
        self
    }

    pub const fn actions(mut self, actions: &'static [ActionSpec]) -> Self {
        self.actions = actions;
        self
    }

    /// Natural-key lookup on the kind's own collection.
    #[must_use]
    pub fn lookup(&self) -> Lookup {
        Lookup::new(self.path, self.display).by(self.natural_key)
    }

    #[must_use]
    pub fn option(&self, name: &str) -> Option<&'static OptionSpec> {
        self.options.iter().find(|option| option.name == name)
    }

    #[must_use]
    pub fn action(&self, state: &str) -> Option<&'static ActionSpec> {
        self.actions.iter().find(|action| action.state == state)
    }

    /// Every state this kind accepts.
    #[must_use]
    pub fn states(&self) -> Vec<&'static str> {
        let mut states = Vec::new();
        if self.capabilities.creatable || self.capabilities.updatable {
            states.push("present");
        }
        if self.capabilities.deletable {
            states.push("absent");
        }
        states.extend(self.actions.iter().map(|action| action.state));
        states
    }
}
