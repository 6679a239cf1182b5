//! Admin identity verification against the configured OIDC provider.
//!
//! Only admins carry tokens; regular party members identify themselves with
//! their party's code word instead. Tokens are verified offline against the
//! provider's published key set.

use crate::settings;
use anyhow::{Context, Result};
use claims::AccessTokenClaims;
use openidconnect::AccessToken;
use provider::ProviderClient;

mod claims;
mod http;
mod jwt;
mod provider;

pub use jwt::VerifyError;

/// The `OidcContext` contains all information about the configured OIDC provider.
#[derive(Debug)]
pub struct OidcContext {
    provider: ProviderClient,
}

impl OidcContext {
    /// Create the OidcContext from the configuration.
    /// This reads the provider configuration and tries to fetch the metadata from it.
    /// If the provider is misconfigured or not reachable this function will fail.
    #[tracing::instrument(name = "oidc_discover", skip(config))]
    pub async fn from_config(config: settings::Oidc) -> Result<Self> {
        let http_client = http::make_client().context("Failed to create http client")?;

        let provider = ProviderClient::discover(http_client, config).await?;

        Ok(Self { provider })
    }

    /// Verifies the signature and expiration of an AccessToken.
    ///
    /// Returns the subject (user id) if the token is verified.
    #[tracing::instrument(name = "oidc_verify_access_token", skip_all)]
    pub fn verify_access_token(&self, access_token: &AccessToken) -> Result<String, VerifyError> {
        let claims: AccessTokenClaims = jwt::verify(
            self.provider.metadata.jwks(),
            access_token.secret().as_str(),
        )?;

        Ok(claims.sub)
    }
}
