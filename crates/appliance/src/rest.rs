//! REST client for real appliances.
//!
//! Speaks the OneView REST dialect: a login session obtained from
//! `/rest/login-sessions`, the `X-API-Version` and `Auth` headers on every
//! request, `If-Match` for ETag validation and paged collections that are
//! followed through `nextPageUri`.
//!
//! Image Streamer reuses the OneView session; ICsp has its own login.

use crate::Appliance;
use crate::error::{Error, Result};
use crate::query::{PatchOp, Query};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs::File;
use std::path::Path;
use ureq::http::Response;
use ureq::{Body, RequestBuilder};

/// Login credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Appliance user name.
    pub user_name: String,
    /// Password.
    pub password: String,
    /// Directory to authenticate against, when not local.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_login_domain: Option<String>,
}

/// Blocking REST client bound to one appliance.
pub struct RestClient {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// `https://host`, without trailing slash.
    base: String,
    api_version: u32,
    session: String,
}

impl RestClient {
    /// Log in and return a client carrying the session.
    pub fn connect(
        host: &str,
        api_version: u32,
        credentials: &Credentials,
        insecure: bool,
    ) -> Result<Self> {
        let mut client = Self::with_session(host, api_version, "", insecure);
        let mut body = serde_json::to_value(credentials)?;
        body["loginMsgAck"] = Value::Bool(true);

        log::debug!("Logging in to {} as {}", client.base, credentials.user_name);
        let request = client
            .agent
            .post(client.url("/rest/login-sessions"))
            .header("X-API-Version", api_version.to_string());
        let session = match read(request.send_json(&body)?) {
            Ok(answer) => answer
                .get("sessionID")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::Authentication("no sessionID in login response".into()))?,
            Err(err) if err.status_code() == Some(401) || err.status_code() == Some(400) => {
                return Err(Error::Authentication(err.to_string()));
            }
            Err(err) => return Err(err),
        };
        client.session = session;
        Ok(client)
    }

    /// Build a client around an existing session.
    pub fn with_session(host: &str, api_version: u32, session: &str, insecure: bool) -> Self {
        let mut config = ureq::Agent::config_builder().http_status_as_error(false);
        if insecure {
            config = config.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }
        let agent: ureq::Agent = config.build().into();

        Self {
            agent,
            base: base_url(host),
            api_version,
            session: session.to_string(),
        }
    }

    /// Session identifier, shared with Image Streamer.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session
    }

    /// Appliance base URL.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!("{}{}", self.base, uri)
        }
    }

    fn authorize<B>(&self, request: RequestBuilder<B>, if_match: Option<&str>) -> RequestBuilder<B> {
        let request = request
            .header("X-API-Version", self.api_version.to_string())
            .header("Auth", self.session.as_str())
            .header("Accept", "application/json");
        match if_match {
            Some(etag) => request.header("If-Match", etag),
            None => request,
        }
    }

    fn fetch(&self, uri: &str, pairs: &[(String, String)]) -> Result<Value> {
        log::debug!("GET {uri}");
        let mut request = self.authorize(self.agent.get(self.url(uri)), None);
        for (key, value) in pairs {
            request = request.query(key, value);
        }
        read(request.call()?)
    }

    fn send(
        &self,
        method: &str,
        uri: &str,
        body: &Value,
        if_match: Option<&str>,
    ) -> Result<Value> {
        log::debug!("{method} {uri}");
        let url = self.url(uri);
        let request = match method {
            "POST" => self.agent.post(url),
            "PUT" => self.agent.put(url),
            "PATCH" => self
                .agent
                .patch(url)
                .header("Content-Type", "application/json-patch+json"),
            other => return Err(Error::Other(format!("unsupported method {other}"))),
        };
        read(self.authorize(request, if_match).send_json(body)?)
    }
}

/// Normalize `host`, `host:port` or a full URL into a base URL.
fn base_url(host: &str) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Decode a response, turning error statuses into [`Error::Status`].
///
/// A `202 Accepted` without a body is turned into a task stub pointing at
/// the `Location` header so the caller can monitor it.
fn read(mut response: Response<Body>) -> Result<Value> {
    let status = response.status().as_u16();
    let location = response
        .headers()
        .get("location")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let text = response.body_mut().read_to_string()?;
    let body: Value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text)?
    };

    if status >= 400 {
        return Err(Error::from_body(status, &body));
    }
    match (status, body, location) {
        (202, Value::Null, Some(task_uri)) => Ok(json!({"category": "tasks", "uri": task_uri})),
        (_, body, _) => Ok(body),
    }
}

impl Appliance for RestClient {
    fn api_version(&self) -> u32 {
        self.api_version
    }

    fn get_all(&self, collection: &str, query: &Query) -> Result<Vec<Value>> {
        let mut members = Vec::new();
        let mut page = self.fetch(collection, &query.pairs())?;

        loop {
            let next = match page {
                Value::Array(items) => {
                    members.extend(items);
                    None
                }
                Value::Object(mut map) => {
                    if let Some(Value::Array(items)) = map.remove("members") {
                        members.extend(items);
                    }
                    map.remove("nextPageUri")
                        .and_then(|next| next.as_str().map(str::to_string))
                        .filter(|next| !next.is_empty())
                }
                _ => None,
            };

            match next {
                Some(next) if !query.is_paged() => page = self.fetch(&next, &[])?,
                _ => break,
            }
        }

        Ok(members)
    }

    fn get(&self, uri: &str) -> Result<Option<Value>> {
        self.get_with(uri, &Query::new())
    }

    fn get_with(&self, uri: &str, query: &Query) -> Result<Option<Value>> {
        match self.fetch(uri, &query.pairs()) {
            Ok(document) => Ok(Some(document)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn create(&self, collection: &str, body: &Value) -> Result<Value> {
        self.send("POST", collection, body, None)
    }

    fn update(&self, uri: &str, body: &Value, if_match: Option<&str>) -> Result<Value> {
        self.send("PUT", uri, body, if_match)
    }

    fn delete(&self, uri: &str, if_match: Option<&str>) -> Result<Value> {
        log::debug!("DELETE {uri}");
        let request = self.authorize(self.agent.delete(self.url(uri)), Some(if_match.unwrap_or("*")));
        read(request.call()?)
    }

    fn patch(&self, uri: &str, ops: &[PatchOp], if_match: Option<&str>) -> Result<Value> {
        self.send("PATCH", uri, &serde_json::to_value(ops)?, if_match)
    }

    fn post(&self, uri: &str, body: &Value) -> Result<Value> {
        self.send("POST", uri, body, None)
    }

    fn put(&self, uri: &str, body: &Value) -> Result<Value> {
        self.send("PUT", uri, body, None)
    }

    fn download(&self, uri: &str, destination: &Path) -> Result<()> {
        log::debug!("GET {uri} -> {}", destination.display());
        let request = self
            .authorize(self.agent.get(self.url(uri)), None)
            .header("Accept", "application/octet-stream");
        let mut response = request.call()?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(Error::status(status, format!("download of {uri} failed")));
        }

        let mut file = File::create(destination).map_err(|e| Error::io(destination, e))?;
        let mut reader = response.body_mut().as_reader();
        std::io::copy(&mut reader, &mut file).map_err(|e| Error::io(destination, e))?;
        Ok(())
    }
}
