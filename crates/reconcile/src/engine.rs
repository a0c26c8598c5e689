//! The reconciliation engine.
//!
//! One engine value reconciles one resource kind against one appliance. It
//! drives `present`, `absent` and the descriptor's action verbs, always in
//! the order fetch, compare, mutate, scope sync, re-fetch.

use crate::compare::{self, Comparator};
use crate::descriptor::{ActionSpec, Call, Payload, Precheck, ResourceDescriptor, Target};
use crate::error::{Error, Result};
use crate::merge;
use crate::message::MessageCode;
use crate::record::ResultRecord;
use crate::resolve::{Reference, Resolver};
use crate::task::{Task, TaskMonitor, TaskOutcome};
use appliance::{Appliance, PatchOp};
use serde_json::{Map, Value};

/// First API version accepting `/scopeUris` patches.
pub const SCOPES_MIN_API: u32 = 300;

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Decide everything, mutate nothing.
    pub check_mode: bool,
    /// Send the current `eTag` as `If-Match` on updates.
    pub validate_etag: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            check_mode: false,
            validate_etag: true,
        }
    }
}

/// What a mutation left behind once its task, if any, was monitored.
enum Settled {
    /// The resulting resource (or the appliance's answer).
    Resource(Value),
    /// The appliance scheduled the work for later.
    Scheduled(Task),
}

/// Reconciles resources of one kind.
pub struct ReconciliationEngine<'a> {
    appliance: &'a dyn Appliance,
    descriptor: &'static ResourceDescriptor,
    comparator: Comparator,
    resolver: Resolver<'a>,
    monitor: TaskMonitor<'a>,
    options: EngineOptions,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(appliance: &'a dyn Appliance, descriptor: &'static ResourceDescriptor) -> Self {
        Self {
            appliance,
            descriptor,
            comparator: Comparator::for_descriptor(descriptor),
            resolver: Resolver::new(appliance),
            monitor: TaskMonitor::new(appliance),
            options: EngineOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_monitor(mut self, monitor: TaskMonitor<'a>) -> Self {
        self.monitor = monitor;
        self
    }

    #[must_use]
    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    /// Dispatch on `state`: `present`, `absent` or one of the kind's actions.
    pub fn run(&self, state: &str, data: &Map<String, Value>) -> Result<ResultRecord> {
        log::debug!("{} {state}", self.descriptor.kind);
        match state {
            "present" => self.present(data),
            "absent" => self.absent(data),
            verb => match self.descriptor.action(verb) {
                Some(action) => self.action(action, data),
                None => Err(Error::Value(format!(
                    "state '{verb}' is not supported for {}; expected one of: {}",
                    self.descriptor.display,
                    self.descriptor.states().join(", ")
                ))),
            },
        }
    }

    /// Converge the resource to `data`.
    pub fn present(&self, data: &Map<String, Value>) -> Result<ResultRecord> {
        let descriptor = self.descriptor;
        let caps = descriptor.capabilities;
        let key = descriptor.natural_key;
        if !caps.creatable && !caps.updatable {
            return Err(Error::Value(format!(
                "{} does not support state 'present'",
                descriptor.display
            )));
        }
        let reference = self.reference(data)?;

        let mut desired = self.resolver.resolve_fields(descriptor.references, data)?;
        let scope_uris = if caps.scoped {
            desired.remove("scopeUris").map(scope_list).transpose()?
        } else {
            None
        };
        let new_name = desired.get("newName").and_then(Value::as_str).map(str::to_string);

        let mut found = self.resolver.fetch(&descriptor.lookup(), &reference)?;
        if found.is_none()
            && let Some(new_name) = &new_name
        {
            // A rename that already happened on an earlier run
            found = self.resolver.find(&descriptor.lookup(), new_name)?;
        }

        let (mut current, mut changed, mut code, before) = match found {
            None if new_name.is_some() => {
                return Err(Error::not_found(descriptor.display, reference.as_str()));
            }
            None => {
                if !caps.creatable {
                    return Err(Error::not_found(descriptor.display, reference.as_str()));
                }
                if !descriptor.create.allows_client_create(self.appliance.api_version()) {
                    return Err(Error::NotFoundForCreate {
                        kind: descriptor.display.to_string(),
                        reference: reference.as_str().to_string(),
                    });
                }
                let body = merge::prepare_body(&Value::Null, &desired, descriptor);
                let created = if self.options.check_mode {
                    body
                } else {
                    log::info!("Creating {} '{}'", descriptor.display, reference.as_str());
                    let answer = self.appliance.create(descriptor.path, &body)?;
                    match self.settle(answer, None)? {
                        Settled::Resource(created) => created,
                        Settled::Scheduled(task) => return Ok(self.scheduled(&task)),
                    }
                };
                (created, true, MessageCode::Created, Value::Null)
            }
            Some(existing) => {
                let wanted = Value::Object(merge::normalize(&desired, key));
                if self.comparator.matches(&wanted, &existing) {
                    log::debug!("{} '{}' already matches", descriptor.display, reference.as_str());
                    (existing.clone(), false, MessageCode::AlreadyPresent, existing)
                } else if !caps.updatable {
                    return Err(Error::Value(format!(
                        "{} '{}' differs from the desired state but cannot be updated",
                        descriptor.display,
                        reference.as_str()
                    )));
                } else {
                    let body = merge::prepare_body(&existing, &desired, descriptor);
                    let updated = if self.options.check_mode {
                        body
                    } else {
                        let uri = uri_of(&existing)?;
                        log::info!("Updating {} {uri}", descriptor.display);
                        let answer = self
                            .appliance
                            .update(&uri, &body, self.if_match(&existing).as_deref())
                            .map_err(|err| self.conflict(err, &uri))?;
                        match self.settle(answer, Some(&uri))? {
                            Settled::Resource(updated) => updated,
                            Settled::Scheduled(task) => return Ok(self.scheduled(&task)),
                        }
                    };
                    (updated, true, MessageCode::Updated, existing)
                }
            }
        };

        if let Some(scopes) = scope_uris
            && !compare::scopes_match(&current, &scopes)
        {
            current = match self.sync_scopes(current, scopes)? {
                Settled::Resource(synced) => synced,
                Settled::Scheduled(task) => return Ok(self.scheduled(&task)),
            };
            changed = true;
            if code == MessageCode::AlreadyPresent {
                code = MessageCode::Updated;
            }
        }

        let mut record =
            ResultRecord::new(changed, code, descriptor.display).fact(descriptor.fact_name, current.clone());
        if changed {
            record = record.diff(before, current);
        }
        Ok(record)
    }

    /// Make sure the resource does not exist.
    pub fn absent(&self, data: &Map<String, Value>) -> Result<ResultRecord> {
        let descriptor = self.descriptor;
        if !descriptor.capabilities.deletable {
            return Err(Error::Value(format!(
                "{} does not support state 'absent'",
                descriptor.display
            )));
        }
        let reference = self.reference(data)?;

        let Some(existing) = self.resolver.fetch(&descriptor.lookup(), &reference)? else {
            return Ok(ResultRecord::new(false, MessageCode::AlreadyAbsent, descriptor.display));
        };
        if !self.options.check_mode {
            let uri = uri_of(&existing)?;
            log::info!("Deleting {} {uri}", descriptor.display);
            let answer = self
                .appliance
                .delete(&uri, self.if_match(&existing).as_deref())
                .map_err(|err| self.conflict(err, &uri))?;
            if Task::is_task(&answer)
                && let TaskOutcome::Scheduled(task) = self.monitor.wait(&answer)?
            {
                return Ok(self.scheduled(&task));
            }
        }
        Ok(ResultRecord::new(true, MessageCode::Deleted, descriptor.display).diff(existing, Value::Null))
    }

    /// Run a kind-specific verb.
    pub fn action(&self, action: &ActionSpec, data: &Map<String, Value>) -> Result<ResultRecord> {
        let descriptor = self.descriptor;
        if let Some(required) = action.min_api {
            let actual = self.appliance.api_version();
            if actual < required {
                return Err(Error::ApiVersion {
                    operation: format!("{} '{}'", descriptor.display, action.state),
                    required,
                    actual,
                });
            }
        }
        let desired = self.resolver.resolve_fields(descriptor.references, data)?;

        let (target, current) = match action.target {
            Target::Collection => (descriptor.path.to_string(), Value::Null),
            Target::Resource => {
                let reference = self.reference(data)?;
                let current = self
                    .resolver
                    .fetch(&descriptor.lookup(), &reference)?
                    .ok_or_else(|| Error::not_found(descriptor.display, reference.as_str()))?;
                (uri_of(&current)?, current)
            }
        };

        if self.already_done(action, &target, &current, &desired)? {
            log::debug!("{} '{}' needs no change", descriptor.display, action.state);
            return Ok(ResultRecord::with_message(
                false,
                MessageCode::AlreadyPresent,
                format!("{} is already in the requested state.", descriptor.display),
            )
            .fact(descriptor.fact_name, current));
        }

        let mutates = action.call.mutates();
        if mutates && self.options.check_mode {
            return Ok(ResultRecord::new(true, action.code, descriptor.display).fact(descriptor.fact_name, current));
        }

        let answer = match action.call {
            Call::Patch { path, value } => {
                let value = self.payload(value, &current, &desired)?;
                self.appliance
                    .patch(&target, &[PatchOp::replace(path, value)], self.if_match(&current).as_deref())
                    .map_err(|err| self.conflict(err, &target))?
            }
            Call::Put { sub, body } => {
                let body = self.payload(body, &current, &desired)?;
                self.appliance.put(&sub_uri(&target, sub), &body)?
            }
            Call::Post { sub, body } => {
                let body = self.payload(body, &current, &desired)?;
                self.appliance.post(&sub_uri(&target, sub), &body)?
            }
            Call::Get { sub } => self.appliance.get(&sub_uri(&target, sub))?.unwrap_or(Value::Null),
        };
        if mutates {
            log::info!("{} '{}' applied to {target}", descriptor.display, action.state);
        }

        let record = ResultRecord::new(mutates, action.code, descriptor.display);
        let settled = match self.settle(answer, None)? {
            Settled::Resource(settled) => settled,
            Settled::Scheduled(task) => return Ok(self.scheduled(&task)),
        };
        Ok(match (action.fact, action.target) {
            (Some(fact), _) => record.fact(fact, settled),
            (None, Target::Resource) => {
                let fresh = self.appliance.get(&target)?.unwrap_or(settled);
                record.fact(descriptor.fact_name, fresh)
            }
            (None, Target::Collection) => record.fact(descriptor.fact_name, settled),
        })
    }

    fn reference(&self, data: &Map<String, Value>) -> Result<Reference> {
        Reference::from_data(data, self.descriptor.natural_key).ok_or_else(|| {
            Error::MandatoryFieldMissing(format!(
                "{} requires '{}' or 'uri'",
                self.descriptor.display, self.descriptor.natural_key
            ))
        })
    }

    fn if_match(&self, current: &Value) -> Option<String> {
        if !self.descriptor.capabilities.etagged || !self.options.validate_etag {
            return None;
        }
        current.get("eTag").and_then(Value::as_str).map(str::to_string)
    }

    fn conflict(&self, err: appliance::Error, uri: &str) -> Error {
        if err.is_etag_conflict() {
            Error::EtagConflict {
                kind: self.descriptor.display.to_string(),
                reference: uri.to_string(),
                source: err,
            }
        } else {
            Error::Appliance(err)
        }
    }

    /// Monitor a task answer and return the resource it produced.
    fn settle(&self, answer: Value, uri: Option<&str>) -> Result<Settled> {
        if !Task::is_task(&answer) {
            return match (&answer, uri) {
                (Value::Null, Some(uri)) => Ok(Settled::Resource(
                    self.appliance.get(uri)?.unwrap_or(Value::Null),
                )),
                _ => Ok(Settled::Resource(answer)),
            };
        }
        let task = match self.monitor.wait(&answer)? {
            TaskOutcome::Completed(task) => task,
            TaskOutcome::Scheduled(task) => return Ok(Settled::Scheduled(task)),
        };
        let resource = match task.associated_resource.as_deref().or(uri) {
            Some(resource) => self.appliance.get(resource)?.unwrap_or(task.raw),
            None => task.raw,
        };
        Ok(Settled::Resource(resource))
    }

    fn scheduled(&self, task: &Task) -> ResultRecord {
        log::info!("{} change scheduled: {}", self.descriptor.display, task.status_line());
        ResultRecord::scheduled(task, "task")
    }

    fn sync_scopes(&self, current: Value, scopes: Vec<String>) -> Result<Settled> {
        let actual = self.appliance.api_version();
        if actual < SCOPES_MIN_API {
            return Err(Error::ApiVersion {
                operation: "Scope assignment".to_string(),
                required: SCOPES_MIN_API,
                actual,
            });
        }
        if self.options.check_mode {
            let mut current = current;
            current["scopeUris"] = Value::from(scopes);
            return Ok(Settled::Resource(current));
        }
        let uri = uri_of(&current)?;
        log::info!("Replacing scopes of {uri}");
        let answer = self
            .appliance
            .patch(
                &uri,
                &[PatchOp::replace("/scopeUris", Value::from(scopes))],
                self.if_match(&current).as_deref(),
            )
            .map_err(|err| self.conflict(err, &uri))?;
        self.settle(answer, Some(&uri))
    }

    fn already_done(
        &self,
        action: &ActionSpec,
        target: &str,
        current: &Value,
        desired: &Map<String, Value>,
    ) -> Result<bool> {
        match action.check {
            Precheck::Always => Ok(false),
            Precheck::Field { field, expect } => {
                Ok(current.get(field).and_then(Value::as_str) == Some(expect))
            }
            Precheck::SubResource { sub, field } => {
                let Some(wanted) = desired.get(field) else {
                    return Ok(false);
                };
                let actual = self.appliance.get(&sub_uri(target, sub))?.unwrap_or(Value::Null);
                Ok(self.comparator.matches(wanted, &actual))
            }
        }
    }

    fn payload(&self, payload: Payload, current: &Value, desired: &Map<String, Value>) -> Result<Value> {
        let missing = |field: &str| {
            Error::MandatoryFieldMissing(format!(
                "{} requires '{field}' for this state",
                self.descriptor.display
            ))
        };
        match payload {
            Payload::Empty => Ok(Value::Object(Map::new())),
            Payload::Text(text) => Ok(Value::String(text.to_string())),
            Payload::Pair(key, value) => {
                let mut body = Map::new();
                body.insert(key.to_string(), Value::String(value.to_string()));
                Ok(Value::Object(body))
            }
            Payload::Field(field) => desired.get(field).cloned().ok_or_else(|| missing(field)),
            Payload::Fields(fields) => {
                let body: Map<String, Value> = fields
                    .iter()
                    .filter_map(|field| desired.get(*field).map(|value| ((*field).to_string(), value.clone())))
                    .collect();
                if body.is_empty() {
                    return Err(missing(&fields.join("' or '")));
                }
                Ok(Value::Object(body))
            }
            Payload::Tagged { fields, key, value } => {
                let mut body = self.payload(Payload::Fields(fields), current, desired)?;
                if let Value::Object(map) = &mut body {
                    map.insert(key.to_string(), Value::String(value.to_string()));
                }
                Ok(body)
            }
            Payload::Merged => Ok(merge::prepare_body(current, desired, self.descriptor)),
        }
    }
}

fn uri_of(resource: &Value) -> Result<String> {
    resource
        .get("uri")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Value("appliance returned a resource without a uri".to_string()))
}

fn sub_uri(target: &str, sub: &str) -> String {
    if sub.is_empty() {
        target.to_string()
    } else {
        format!("{}/{}", target.trim_end_matches('/'), sub)
    }
}

fn scope_list(value: Value) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(uri) => Ok(uri),
                other => Err(Error::Value(format!("scopeUris must hold strings, got {other}"))),
            })
            .collect(),
        other => Err(Error::Value(format!("scopeUris must be a list, got {other}"))),
    }
}
