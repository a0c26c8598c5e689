//! HPE Insight Control server provisioning.
//!
//! ICsp does not fit the descriptor model: a deployment is a sequence of
//! jobs against a server found by serial number, and servers are registered
//! by iLO address rather than created from a document. Both flows still go
//! through the shared [`Resolver`] and [`TaskMonitor`] and report a single
//! [`ResultRecord`].

mod deployment;
mod server;

pub use deployment::{DeployRequest, custom_attributes};
pub use server::ServerRequest;

use appliance::Appliance;
use reconcile::{
    Error, Lookup, Resolver, Result, ResultRecord, Task, TaskMonitor, TaskOutcome,
};
use serde_json::Value;

/// API version ICsp 7.x speaks.
pub const API_VERSION: u32 = 102;

const BUILD_PLANS: &str = "/rest/os-deployment-build-plans";
const SERVERS: &str = "/rest/os-deployment-servers";
const JOBS: &str = "/rest/os-deployment-jobs/?writeOnly=true";
const PERSONALIZE: &str = "/rest/os-deployment-apxs/personalizeserver";

const SERVER: &str = "ICsp Server";
const SERVER_FACT: &str = "icsp_server";

/// Runs ICsp flows against one appliance.
pub struct Provisioner<'a> {
    appliance: &'a dyn Appliance,
    resolver: Resolver<'a>,
    monitor: TaskMonitor<'a>,
}

impl<'a> Provisioner<'a> {
    pub fn new(appliance: &'a dyn Appliance) -> Self {
        Self {
            appliance,
            resolver: Resolver::new(appliance),
            monitor: TaskMonitor::new(appliance),
        }
    }

    #[must_use]
    pub fn with_monitor(mut self, monitor: TaskMonitor<'a>) -> Self {
        self.monitor = monitor;
        self
    }

    fn server_by_serial(&self, serial: &str) -> Result<Value> {
        let lookup = Lookup::new(SERVERS, SERVER).by("serialNumber");
        self.resolver
            .find(&lookup, serial)?
            .ok_or_else(|| Error::not_found(SERVER, serial))
    }

    /// Submit a job and wait for it.
    fn run_job(&self, uri: &str, body: &Value) -> Result<TaskOutcome> {
        log::info!("Submitting ICsp job to {uri}");
        let answer = self.appliance.post(uri, body)?;
        self.monitor.wait(&answer)
    }

    /// Wait for `answer` when it is a job; anything else has completed.
    fn settle(&self, answer: &Value) -> Result<Option<Task>> {
        if !Task::is_task(answer) {
            return Ok(None);
        }
        match self.monitor.wait(answer)? {
            TaskOutcome::Completed(_) => Ok(None),
            TaskOutcome::Scheduled(task) => Ok(Some(task)),
        }
    }
}

/// Record for a job the appliance scheduled instead of running.
fn scheduled(task: &Task) -> ResultRecord {
    ResultRecord::scheduled(task, "icsp_job")
}

fn uri_of(resource: &Value) -> Result<String> {
    resource
        .get("uri")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Value(format!("{SERVER} record has no uri")))
}
