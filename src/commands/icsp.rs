//! `ovc icsp`: OS deployment and server registration on ICsp.

use crate::Context;
use crate::cli::IcspCommand;
use crate::config::ApplianceConfig;
use crate::icsp::{self, DeployRequest, Provisioner, ServerRequest};
use crate::progress::TaskSpinner;
use crate::{input, session};
use anyhow::{Result, bail};
use reconcile::{Endpoint, ResultRecord, TaskMonitor};
use serde_json::Value;
use std::process::ExitCode;

pub fn run(ctx: &Context, cmd: &IcspCommand) -> Result<ExitCode> {
    super::finish(ctx, provision(ctx, cmd), false)
}

fn provision(ctx: &Context, cmd: &IcspCommand) -> Result<ResultRecord> {
    // Parse input before logging in so bad input never costs a session.
    let request = Request::parse(cmd)?;

    let config = ApplianceConfig::load(ctx.config.as_deref())?;
    let client = session::connect(&config, Endpoint::Icsp)?;
    let spinner = TaskSpinner::new(ctx.quiet);
    let provisioner = Provisioner::new(&client)
        .with_monitor(TaskMonitor::new(&client).with_progress(&spinner));

    let record = match &request {
        Request::Deploy(deploy) => {
            log::info!(
                "Deploying '{}' to server {}",
                deploy.os_build_plan,
                deploy.server_id
            );
            provisioner.deploy(deploy)?
        }
        Request::Server(state, server) => {
            log::info!("ICsp server {} {state}", server.ilo_address);
            provisioner.server(state, server)?
        }
    };
    Ok(record)
}

enum Request {
    Deploy(DeployRequest),
    Server(String, ServerRequest),
}

impl Request {
    fn parse(cmd: &IcspCommand) -> Result<Self> {
        match cmd {
            IcspCommand::Deploy {
                server_id,
                os_build_plan,
                personality,
                custom_attributes,
            } => {
                let custom_attributes =
                    match input::optional(custom_attributes.as_deref(), "custom attributes")? {
                        Some(raw) => icsp::custom_attributes(&raw)?,
                        None => Vec::new(),
                    };
                Ok(Self::Deploy(DeployRequest {
                    server_id: server_id.clone(),
                    os_build_plan: os_build_plan.clone(),
                    personality_data: input::optional(personality.as_deref(), "personality")?,
                    custom_attributes,
                }))
            }
            IcspCommand::Server { state, data } => match input::value(data, "server data")? {
                Value::Object(data) => Ok(Self::Server(
                    state.clone(),
                    ServerRequest::from_data(&data)?,
                )),
                other => bail!("server data must be a mapping, got {other}"),
            },
        }
    }
}
