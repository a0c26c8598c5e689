//! Appliance sessions.

use crate::config::ApplianceConfig;
use crate::icsp;
use anyhow::{Context, Result};
use appliance::{Credentials, RestClient};
use reconcile::Endpoint;

fn credentials(config: &ApplianceConfig) -> Credentials {
    Credentials {
        user_name: config.username.clone(),
        password: config.password.clone(),
        auth_login_domain: config.auth_login_domain.clone(),
    }
}

/// Log in to the appliance serving `endpoint`.
///
/// Image Streamer has no login of its own: the OneView session is reused
/// against the Image Streamer host.
pub fn connect(config: &ApplianceConfig, endpoint: Endpoint) -> Result<RestClient> {
    match endpoint {
        Endpoint::OneView => oneview(config),
        Endpoint::ImageStreamer => {
            let host = config.image_streamer()?;
            let oneview = oneview(config)?;
            log::debug!("Reusing the OneView session for Image Streamer at {host}");
            Ok(RestClient::with_session(
                host,
                config.api_version,
                oneview.session_id(),
                config.insecure,
            ))
        }
        Endpoint::Icsp => {
            let host = config.icsp()?;
            log::debug!("Logging in to ICsp at {host}");
            RestClient::connect(host, icsp::API_VERSION, &credentials(config), config.insecure)
                .with_context(|| format!("Failed to log in to ICsp at {host}"))
        }
    }
}

fn oneview(config: &ApplianceConfig) -> Result<RestClient> {
    log::debug!(
        "Logging in to OneView at {} (API {})",
        config.hostname,
        config.api_version
    );
    RestClient::connect(
        &config.hostname,
        config.api_version,
        &credentials(config),
        config.insecure,
    )
    .with_context(|| format!("Failed to log in to OneView at {}", config.hostname))
}
