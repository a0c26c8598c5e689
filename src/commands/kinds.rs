//! `ovc kinds`: the resource-kind catalog.

use crate::{Context, kinds, ui};
use anyhow::Result;
use reconcile::{Endpoint, ResourceDescriptor};
use std::process::ExitCode;

const ENDPOINTS: &[(Endpoint, &str)] = &[
    (Endpoint::OneView, "OneView"),
    (Endpoint::ImageStreamer, "Image Streamer"),
];

pub fn run(ctx: &Context) -> Result<ExitCode> {
    for (endpoint, title) in ENDPOINTS {
        ui::header(title);
        for descriptor in kinds::served_by(*endpoint) {
            ui::kv(descriptor.kind, &summary(descriptor));
            if ctx.verbose > 0 && !descriptor.options.is_empty() {
                let options: Vec<&str> = descriptor.options.iter().map(|o| o.name).collect();
                ui::kv("    options", &options.join(", "));
            }
        }
    }
    if !ctx.quiet {
        println!();
        ui::dim("ICsp flows: ovc icsp deploy, ovc icsp server");
    }
    Ok(ExitCode::SUCCESS)
}

/// Display name and accepted states.
fn summary(descriptor: &ResourceDescriptor) -> String {
    format!(
        "{} [{}]",
        descriptor.display,
        descriptor.states().join(", ")
    )
}
