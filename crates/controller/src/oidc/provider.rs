use super::http::async_http_client;
use crate::settings;
use anyhow::{Context, Result};
use openidconnect::core::CoreProviderMetadata;

/// Contains all structures necessary to talk to the configured OIDC provider.
#[derive(Debug)]
pub struct ProviderClient {
    pub metadata: CoreProviderMetadata,
}

impl ProviderClient {
    /// Discover provider information from the given settings
    pub async fn discover(
        http_client: reqwest::Client,
        config: settings::Oidc,
    ) -> Result<ProviderClient> {
        let metadata =
            CoreProviderMetadata::discover_async(config.issuer, async_http_client(http_client))
                .await
                .context("Failed to discover provider metadata")?;

        Ok(ProviderClient { metadata })
    }
}
