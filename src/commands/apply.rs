//! `ovc apply`: converge one resource.

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::ApplianceConfig;
use crate::progress::TaskSpinner;
use crate::{input, session};
use anyhow::Result;
use reconcile::{EngineOptions, ReconciliationEngine, ResultRecord, TaskMonitor};
use std::process::ExitCode;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<ExitCode> {
    super::finish(ctx, reconcile(ctx, args), args.diff)
}

fn reconcile(ctx: &Context, args: &ApplyArgs) -> Result<ResultRecord> {
    let descriptor = super::descriptor(&args.kind)?;
    let data = input::document(&args.data, descriptor.natural_key)?;
    let config = ApplianceConfig::load(ctx.config.as_deref())?;
    let client = session::connect(&config, descriptor.endpoint)?;

    let spinner = TaskSpinner::new(ctx.quiet);
    let engine = ReconciliationEngine::new(&client, descriptor)
        .with_options(EngineOptions {
            check_mode: args.check,
            validate_etag: !args.no_validate_etag,
        })
        .with_monitor(TaskMonitor::new(&client).with_progress(&spinner));

    log::info!(
        "{} {} on {}{}",
        descriptor.display,
        args.state,
        config.hostname,
        if args.check { " (check mode)" } else { "" }
    );
    Ok(engine.run(&args.state, &data)?)
}
