//! Command implementations.
//!
//! Every command that talks to an appliance ends in exactly one result
//! record, printed by [`finish`]; errors become failure records rather than
//! escaping to `main`.

pub mod apply;
pub mod facts;
pub mod icsp;
pub mod kinds;

use crate::Context;
use crate::output;
use anyhow::{Result, bail};
use reconcile::{ResourceDescriptor, ResultRecord};
use std::process::ExitCode;

/// Look up a kind, listing the known ones when it does not exist.
fn descriptor(kind: &str) -> Result<&'static ResourceDescriptor> {
    match crate::kinds::find(kind) {
        Some(descriptor) => Ok(descriptor),
        None => {
            let known: Vec<&str> = crate::kinds::all().iter().map(|d| d.kind).collect();
            bail!("unknown resource kind '{kind}'; known kinds: {}", known.join(", "))
        }
    }
}

/// Print the record of `outcome`; failure records exit non-zero.
fn finish(ctx: &Context, outcome: Result<ResultRecord>, show_diff: bool) -> Result<ExitCode> {
    let record = outcome.unwrap_or_else(output::failure_record);
    output::emit(ctx, &record, show_diff)?;
    Ok(if record.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
