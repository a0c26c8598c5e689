//! In-memory appliance for tests.
//!
//! Collections are plain vectors of JSON documents. The appliance assigns
//! URIs on create, optionally tracks ETags per collection, evaluates the
//! simple `field='value'` filters the engine sends, serves scripted task
//! progressions and records every call so tests can assert on what was
//! submitted.

use crate::Appliance;
use crate::error::{Error, Result};
use crate::query::{PatchOp, Query};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Default API version reported by [`MemoryAppliance::new`].
pub const DEFAULT_API_VERSION: u32 = 800;

/// Kind of call recorded by the in-memory appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `get_all`
    GetAll,
    /// `get`
    Get,
    /// `create`
    Create,
    /// `update`
    Update,
    /// `delete`
    Delete,
    /// `patch`
    Patch,
    /// `post`
    Post,
    /// `put`
    Put,
    /// `download`
    Download,
}

impl Method {
    /// Whether the call changes appliance state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::GetAll | Self::Get | Self::Download)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetAll => "GET_ALL",
            Self::Get => "GET",
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Download => "DOWNLOAD",
        };
        write!(f, "{name}")
    }
}

/// A call received by the in-memory appliance.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Operation.
    pub method: Method,
    /// Collection or resource URI.
    pub uri: String,
    /// Submitted body, if any.
    pub body: Option<Value>,
    /// `If-Match` value, if any.
    pub if_match: Option<String>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Answer(Value),
    Failure(u16, String),
}

#[derive(Debug, Default)]
struct State {
    api_version: u32,
    collections: BTreeMap<String, Vec<Value>>,
    documents: BTreeMap<String, Value>,
    tasks: BTreeMap<String, VecDeque<Value>>,
    responses: BTreeMap<(String, String), VecDeque<Scripted>>,
    etagged: BTreeSet<String>,
    calls: Vec<Call>,
    next_id: u64,
    next_etag: u64,
}

impl State {
    fn record(&mut self, method: Method, uri: &str, body: Option<&Value>, if_match: Option<&str>) {
        self.calls.push(Call {
            method,
            uri: uri.to_string(),
            body: body.cloned(),
            if_match: if_match.map(str::to_string),
        });
    }

    fn locate(&self, uri: &str) -> Option<(String, usize)> {
        self.collections.iter().find_map(|(collection, members)| {
            members
                .iter()
                .position(|member| member.get("uri").and_then(Value::as_str) == Some(uri))
                .map(|index| (collection.clone(), index))
        })
    }

    fn scripted(&mut self, method: Method, uri: &str) -> Option<Result<Value>> {
        let next = self
            .responses
            .get_mut(&(method.to_string(), uri.to_string()))
            .and_then(VecDeque::pop_front)?;
        Some(match next {
            Scripted::Answer(value) => Ok(value),
            Scripted::Failure(status, message) => Err(Error::status(status, message)),
        })
    }

    fn stamp(&mut self, collection: &str, document: &mut Value) {
        if self.etagged.contains(collection) {
            self.next_etag += 1;
            document["eTag"] = Value::String(format!("etag-{}", self.next_etag));
        }
    }

    fn check_etag(&self, current: &Value, if_match: Option<&str>) -> Result<()> {
        match (if_match, current.get("eTag").and_then(Value::as_str)) {
            (Some(expected), Some(actual)) if expected != "*" && expected != actual => {
                Err(Error::status(412, "The resource was modified by another request."))
            }
            _ => Ok(()),
        }
    }

    fn create(&mut self, collection: &str, body: &Value) -> Value {
        let mut document = body.clone();
        if document.get("uri").and_then(Value::as_str).is_none() {
            self.next_id += 1;
            document["uri"] = Value::String(format!("{collection}/{}", self.next_id));
        }
        self.stamp(collection, &mut document);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        document
    }
}

/// In-memory appliance.
///
/// Cloning shares the underlying state, so a test can hand a clone to the
/// engine and inspect the original afterwards.
#[derive(Debug, Clone)]
pub struct MemoryAppliance {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryAppliance {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAppliance {
    /// Create an empty appliance reporting [`DEFAULT_API_VERSION`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_api_version(DEFAULT_API_VERSION)
    }

    /// Create an empty appliance reporting the given API version.
    #[must_use]
    pub fn with_api_version(api_version: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                api_version,
                ..State::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the appliance assign and validate ETags for a collection.
    pub fn enable_etags(&self, collection: &str) {
        self.state().etagged.insert(collection.to_string());
    }

    /// Seed a collection member, assigning a URI (and ETag) when missing.
    pub fn insert(&self, collection: &str, document: Value) -> Value {
        self.state().create(collection, &document)
    }

    /// Seed a standalone document such as a sub-resource.
    pub fn set_document(&self, uri: &str, document: Value) {
        self.state().documents.insert(uri.to_string(), document);
    }

    /// Script the successive states a task reports when polled.
    ///
    /// The last state is repeated once the script is exhausted.
    pub fn script_task(&self, uri: &str, states: Vec<Value>) {
        self.state()
            .tasks
            .insert(uri.to_string(), states.into_iter().collect());
    }

    /// Script the answer to the next `method` call on `uri`.
    pub fn script_response(&self, method: Method, uri: &str, response: Value) {
        self.script(method, uri, Scripted::Answer(response));
    }

    /// Make the next `method` call on `uri` fail with an error status.
    pub fn script_failure(&self, method: Method, uri: &str, status: u16, message: &str) {
        self.script(method, uri, Scripted::Failure(status, message.to_string()));
    }

    fn script(&self, method: Method, uri: &str, scripted: Scripted) {
        self.state()
            .responses
            .entry((method.to_string(), uri.to_string()))
            .or_default()
            .push_back(scripted);
    }

    /// Change a member behind the engine's back (simulates a concurrent writer).
    pub fn touch(&self, uri: &str, field: &str, value: Value) {
        let mut state = self.state();
        if let Some((collection, index)) = state.locate(uri) {
            let mut document = state.collections[&collection][index].clone();
            document[field] = value;
            state.stamp(&collection, &mut document);
            if let Some(members) = state.collections.get_mut(&collection) {
                members[index] = document;
            }
        }
    }

    /// Current members of a collection.
    #[must_use]
    pub fn members(&self, collection: &str) -> Vec<Value> {
        self.state()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Calls that changed (or tried to change) appliance state.
    #[must_use]
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.method.is_mutation())
            .collect()
    }
}

/// Resolve a dotted field path inside a document.
fn field<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |value, key| value.get(key))
}

/// Parse `"field='value'"` / `field='value'` / `field=value`.
fn parse_filter(expression: &str) -> Option<(&str, &str)> {
    let expression = expression.trim().trim_matches('"');
    let (key, value) = expression.split_once('=')?;
    Some((key.trim(), value.trim().trim_matches('\'')))
}

fn matches_filter(document: &Value, expression: &str) -> bool {
    let Some((key, expected)) = parse_filter(expression) else {
        return true;
    };
    match field(document, key) {
        Some(Value::String(actual)) => actual == expected,
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

fn sort_members(members: &mut [Value], expression: &str) {
    let (key, direction) = expression
        .split_once(':')
        .unwrap_or((expression, "ascending"));
    members.sort_by(|a, b| {
        let left = field(a, key).map(ToString::to_string).unwrap_or_default();
        let right = field(b, key).map(ToString::to_string).unwrap_or_default();
        left.cmp(&right)
    });
    if direction.eq_ignore_ascii_case("descending") || direction.eq_ignore_ascii_case("desc") {
        members.reverse();
    }
}

fn apply_patch(document: &mut Value, op: &PatchOp) -> Result<()> {
    let pointer = op.path.trim_end_matches('/');
    let (parent_path, key) = pointer
        .rsplit_once('/')
        .ok_or_else(|| Error::status(400, format!("invalid patch path {}", op.path)))?;
    let parent = if parent_path.is_empty() {
        Some(&mut *document)
    } else {
        document.pointer_mut(parent_path)
    };
    let Some(Value::Object(parent)) = parent else {
        return Err(Error::status(400, format!("invalid patch path {}", op.path)));
    };
    match op.op.as_str() {
        "replace" | "add" => {
            parent.insert(key.to_string(), op.value.clone());
        }
        "remove" => {
            parent.remove(key);
        }
        other => return Err(Error::status(400, format!("unsupported patch op {other}"))),
    }
    Ok(())
}

impl Appliance for MemoryAppliance {
    fn api_version(&self) -> u32 {
        self.state().api_version
    }

    fn get_all(&self, collection: &str, query: &Query) -> Result<Vec<Value>> {
        let mut state = self.state();
        state.record(Method::GetAll, collection, None, None);

        let source = match state.collections.get(collection) {
            Some(members) => members.clone(),
            None => match state.documents.get(collection) {
                Some(Value::Array(items)) => items.clone(),
                Some(Value::Object(page)) => page
                    .get("members")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
                _ => Vec::new(),
            },
        };

        let mut members: Vec<Value> = source
            .into_iter()
            .filter(|member| query.filter.iter().all(|f| matches_filter(member, f)))
            .collect();
        if let Some(sort) = &query.sort {
            sort_members(&mut members, sort);
        }
        let start = query.start.unwrap_or(0) as usize;
        let count = query.count.map_or(usize::MAX, |count| count as usize);
        Ok(members.into_iter().skip(start).take(count).collect())
    }

    fn get(&self, uri: &str) -> Result<Option<Value>> {
        self.get_with(uri, &Query::new())
    }

    fn get_with(&self, uri: &str, query: &Query) -> Result<Option<Value>> {
        let mut state = self.state();
        let params = (query != &Query::new()).then(|| serde_json::to_value(query)).transpose()?;
        state.record(Method::Get, uri, params.as_ref(), None);

        if let Some(script) = state.tasks.get_mut(uri) {
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            return Ok(next);
        }
        if let Some(document) = state.documents.get(uri) {
            return Ok(Some(document.clone()));
        }
        Ok(state
            .locate(uri)
            .map(|(collection, index)| state.collections[&collection][index].clone()))
    }

    fn create(&self, collection: &str, body: &Value) -> Result<Value> {
        let mut state = self.state();
        state.record(Method::Create, collection, Some(body), None);
        if let Some(response) = state.scripted(Method::Create, collection) {
            return response;
        }
        Ok(state.create(collection, body))
    }

    fn update(&self, uri: &str, body: &Value, if_match: Option<&str>) -> Result<Value> {
        let mut state = self.state();
        state.record(Method::Update, uri, Some(body), if_match);
        if let Some(response) = state.scripted(Method::Update, uri) {
            return response;
        }

        let (collection, index) = state
            .locate(uri)
            .ok_or_else(|| Error::status(404, format!("{uri} not found")))?;
        state.check_etag(&state.collections[&collection][index], if_match)?;

        let mut document = body.clone();
        document["uri"] = Value::String(uri.to_string());
        state.stamp(&collection, &mut document);
        if let Some(members) = state.collections.get_mut(&collection) {
            members[index] = document.clone();
        }
        Ok(document)
    }

    fn delete(&self, uri: &str, if_match: Option<&str>) -> Result<Value> {
        let mut state = self.state();
        state.record(Method::Delete, uri, None, if_match);
        if let Some(response) = state.scripted(Method::Delete, uri) {
            return response;
        }

        let (collection, index) = state
            .locate(uri)
            .ok_or_else(|| Error::status(404, format!("{uri} not found")))?;
        state.check_etag(&state.collections[&collection][index], if_match)?;
        if let Some(members) = state.collections.get_mut(&collection) {
            members.remove(index);
        }
        Ok(Value::Null)
    }

    fn patch(&self, uri: &str, ops: &[PatchOp], if_match: Option<&str>) -> Result<Value> {
        let mut state = self.state();
        let body = serde_json::to_value(ops)?;
        state.record(Method::Patch, uri, Some(&body), if_match);
        if let Some(response) = state.scripted(Method::Patch, uri) {
            return response;
        }

        let (collection, index) = state
            .locate(uri)
            .ok_or_else(|| Error::status(404, format!("{uri} not found")))?;
        state.check_etag(&state.collections[&collection][index], if_match)?;

        let mut document = state.collections[&collection][index].clone();
        for op in ops {
            apply_patch(&mut document, op)?;
        }
        state.stamp(&collection, &mut document);
        if let Some(members) = state.collections.get_mut(&collection) {
            members[index] = document.clone();
        }
        Ok(document)
    }

    fn post(&self, uri: &str, body: &Value) -> Result<Value> {
        let mut state = self.state();
        state.record(Method::Post, uri, Some(body), None);
        if let Some(response) = state.scripted(Method::Post, uri) {
            return response;
        }
        if state.collections.contains_key(uri) {
            return Ok(state.create(uri, body));
        }
        Ok(body.clone())
    }

    fn put(&self, uri: &str, body: &Value) -> Result<Value> {
        let mut state = self.state();
        state.record(Method::Put, uri, Some(body), None);
        if let Some(response) = state.scripted(Method::Put, uri) {
            return response;
        }
        if let Some((collection, index)) = state.locate(uri) {
            let mut document = body.clone();
            document["uri"] = Value::String(uri.to_string());
            state.stamp(&collection, &mut document);
            if let Some(members) = state.collections.get_mut(&collection) {
                members[index] = document.clone();
            }
            return Ok(document);
        }
        state.documents.insert(uri.to_string(), body.clone());
        Ok(body.clone())
    }

    fn download(&self, uri: &str, destination: &Path) -> Result<()> {
        let mut state = self.state();
        state.record(Method::Download, uri, None, None);
        let document = state
            .documents
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::status(404, format!("{uri} not found")))?;
        let bytes = match document {
            Value::String(text) => text.into_bytes(),
            other => serde_json::to_vec_pretty(&other)?,
        };
        std::fs::write(destination, bytes).map_err(|e| Error::io(destination, e))
    }
}
