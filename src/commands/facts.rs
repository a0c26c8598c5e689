//! `ovc facts`: read-only queries.

use crate::Context;
use crate::cli::FactsArgs;
use crate::config::ApplianceConfig;
use crate::{input, session};
use anyhow::{Result, bail};
use appliance::Query;
use reconcile::{FactsGatherer, Reference, ResultRecord};
use serde_json::{Map, Value};
use std::process::ExitCode;

pub fn run(ctx: &Context, args: &FactsArgs) -> Result<ExitCode> {
    super::finish(ctx, gather(ctx, args), false)
}

fn gather(ctx: &Context, args: &FactsArgs) -> Result<ResultRecord> {
    let descriptor = super::descriptor(&args.kind)?;
    let raw_options = requested_options(args)?;
    let params = match input::optional(args.params.as_deref(), "params")? {
        None => Map::new(),
        Some(Value::Object(params)) => params,
        Some(other) => bail!("params must be a mapping, got {other}"),
    };

    let config = ApplianceConfig::load(ctx.config.as_deref())?;
    let client = session::connect(&config, descriptor.endpoint)?;
    let gatherer = FactsGatherer::new(&client, descriptor);
    let options = gatherer.parse_options(&raw_options)?;

    match Reference::from_parts(args.name.as_deref(), args.uri.as_deref()) {
        Some(reference) => Ok(gatherer.with_options(&reference, &options)?),
        None => {
            if !options.is_empty() {
                log::warn!("Options need --name or --uri; listing without them");
            }
            let query = Query::from_params(&params)?;
            Ok(gatherer.list(&query)?)
        }
    }
}

/// `--options` JSON, or the repeated `--option` names as a list.
fn requested_options(args: &FactsArgs) -> Result<Value> {
    if let Some(options) = &args.options {
        return input::value(options, "options");
    }
    Ok(Value::Array(
        args.option.iter().cloned().map(Value::String).collect(),
    ))
}
