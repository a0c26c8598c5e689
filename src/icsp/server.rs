//! ICsp server registration and network personalization.

use super::deployment::personalization;
use super::{PERSONALIZE, Provisioner, SERVER, SERVER_FACT, SERVERS, scheduled, uri_of};
use appliance::Query;
use reconcile::{Error, MessageCode, Result, ResultRecord, TaskOutcome};
use serde_json::{Map, Value, json};

const DEFAULT_PORT: u64 = 443;

/// A server identified by its iLO address.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    pub ilo_address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: u64,
    pub personality_data: Option<Value>,
}

impl ServerRequest {
    /// Read `server_ipAddress`, `server_username`, `server_password`,
    /// `server_port` and `server_personality_data`.
    pub fn from_data(data: &Map<String, Value>) -> Result<Self> {
        let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
        let ilo_address = text("server_ipAddress").ok_or_else(|| {
            Error::MandatoryFieldMissing("ICsp server requires 'server_ipAddress'".to_string())
        })?;
        let port = match data.get("server_port") {
            None | Some(Value::Null) => DEFAULT_PORT,
            Some(Value::Number(port)) => port
                .as_u64()
                .ok_or_else(|| Error::Value(format!("invalid server_port {port}")))?,
            Some(Value::String(port)) => port
                .parse()
                .map_err(|_| Error::Value(format!("invalid server_port '{port}'")))?,
            Some(other) => return Err(Error::Value(format!("invalid server_port {other}"))),
        };

        Ok(Self {
            ilo_address,
            username: text("server_username"),
            password: text("server_password"),
            port,
            personality_data: data
                .get("server_personality_data")
                .filter(|value| !value.is_null())
                .cloned(),
        })
    }
}

impl Provisioner<'_> {
    /// Dispatch on `present`, `absent` or `network_configured`.
    pub fn server(&self, state: &str, request: &ServerRequest) -> Result<ResultRecord> {
        match state {
            "present" => self.register(request),
            "absent" => self.unregister(request),
            "network_configured" => self.configure_network(request),
            other => Err(Error::Value(format!(
                "state '{other}' is not supported for {SERVER}; expected one of: present, absent, network_configured"
            ))),
        }
    }

    fn server_by_ilo(&self, address: &str) -> Result<Option<Value>> {
        let servers = self.appliance.get_all(SERVERS, &Query::new())?;
        Ok(servers.into_iter().find(|server| {
            server.pointer("/ilo/ipAddress").and_then(Value::as_str) == Some(address)
        }))
    }

    fn register(&self, request: &ServerRequest) -> Result<ResultRecord> {
        if let Some(server) = self.server_by_ilo(&request.ilo_address)? {
            return Ok(ResultRecord::new(false, MessageCode::AlreadyPresent, SERVER)
                .fact(SERVER_FACT, server));
        }
        let (Some(username), Some(password)) = (&request.username, &request.password) else {
            return Err(Error::MandatoryFieldMissing(
                "registering an ICsp server requires 'server_username' and 'server_password'"
                    .to_string(),
            ));
        };

        let body = json!({
            "ipAddress": request.ilo_address,
            "username": username,
            "password": password,
            "port": request.port,
        });
        if let TaskOutcome::Scheduled(task) = self.run_job(SERVERS, &body)? {
            return Ok(scheduled(&task));
        }

        let server = self
            .server_by_ilo(&request.ilo_address)?
            .unwrap_or(Value::Null);
        Ok(ResultRecord::new(true, MessageCode::Created, SERVER).fact(SERVER_FACT, server))
    }

    fn unregister(&self, request: &ServerRequest) -> Result<ResultRecord> {
        let Some(server) = self.server_by_ilo(&request.ilo_address)? else {
            return Ok(ResultRecord::new(false, MessageCode::AlreadyAbsent, SERVER));
        };
        let uri = uri_of(&server)?;
        log::info!("Removing {SERVER} {uri}");
        let answer = self.appliance.delete(&uri, None)?;
        if let Some(task) = self.settle(&answer)? {
            return Ok(scheduled(&task));
        }
        Ok(ResultRecord::new(true, MessageCode::Deleted, SERVER).diff(server, Value::Null))
    }

    fn configure_network(&self, request: &ServerRequest) -> Result<ResultRecord> {
        let personality = request.personality_data.as_ref().ok_or_else(|| {
            Error::MandatoryFieldMissing(
                "network configuration requires 'server_personality_data'".to_string(),
            )
        })?;
        let server = self
            .server_by_ilo(&request.ilo_address)?
            .ok_or_else(|| Error::not_found(SERVER, &request.ilo_address))?;
        let uri = uri_of(&server)?;

        if let TaskOutcome::Scheduled(task) =
            self.run_job(PERSONALIZE, &personalization(&uri, personality))?
        {
            return Ok(scheduled(&task));
        }
        let configured = self.appliance.get(&uri)?.unwrap_or(server);
        Ok(ResultRecord::new(true, MessageCode::NetworkConfigured, SERVER)
            .fact(SERVER_FACT, configured))
    }
}
