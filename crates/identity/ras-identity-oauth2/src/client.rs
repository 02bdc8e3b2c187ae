//! Authorization-code grant engine.

use crate::config::{ClientCredentials, OAuth2Config};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::hooks::{OAuth2Hooks, TokenRequestContext};
use crate::params::Params;
use crate::types::{AccessToken, AuthorizationRequest, Grant, ProviderResponse};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Drives the authorization-code grant for one provider.
#[derive(Clone)]
pub struct GrantFlow<P> {
    provider: P,
    credentials: ClientCredentials,
    http_client: Client,
}

impl<P: OAuth2Hooks> GrantFlow<P> {
    pub fn new(
        provider: P,
        credentials: ClientCredentials,
        config: &OAuth2Config,
    ) -> OAuth2Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()?;

        Ok(Self::with_http_client(provider, credentials, http_client))
    }

    pub fn with_http_client(
        provider: P,
        credentials: ClientCredentials,
        http_client: Client,
    ) -> Self {
        Self {
            provider,
            credentials,
            http_client,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Default authorization parameters, caller options layered on top, then
    /// the provider hook. Returns the final parameters and any PKCE verifier.
    pub fn authorization_parameters(
        &self,
        options: Params,
    ) -> Result<(Params, Option<String>), P::Error> {
        let scope = self
            .provider
            .default_scopes()
            .join(self.provider.scope_separator());

        let mut params = Params::new()
            .with("state", Uuid::new_v4().simple().to_string())
            .with("scope", scope)
            .with("response_type", "code")
            .with("redirect_uri", self.credentials.redirect_uri.as_str())
            .with("client_id", self.credentials.client_id.as_str())
            .merge(options);

        let code_verifier = self.provider.authorization_parameters(&mut params)?;
        Ok((params, code_verifier))
    }

    /// Builds the URL to redirect the user agent to.
    pub fn authorization_url(&self, options: Params) -> Result<AuthorizationRequest, P::Error> {
        let (params, code_verifier) = self.authorization_parameters(options)?;

        let mut url =
            Url::parse(&self.provider.base_authorization_url()).map_err(OAuth2Error::from)?;
        params.append_to(&mut url);

        let state = params.get("state").unwrap_or_default().to_string();
        debug!(
            pkce = code_verifier.is_some(),
            "Generated authorization URL for {}",
            url.host_str().unwrap_or_default()
        );

        Ok(AuthorizationRequest {
            url,
            state,
            code_verifier,
        })
    }

    /// Exchanges `grant` for an access token.
    pub async fn access_token(
        &self,
        grant: Grant,
        options: Params,
        context: TokenRequestContext,
    ) -> Result<AccessToken, P::Error> {
        let mut params = Params::new().with("client_id", self.credentials.client_id.as_str());
        if let Some(secret) = &self.credentials.client_secret {
            params.insert("client_secret", secret.as_str());
        }
        params.insert("redirect_uri", self.credentials.redirect_uri.as_str());
        grant.apply(&mut params);

        let mut params = params.merge(options);
        self.provider.token_parameters(&mut params, &context)?;

        let token_url = self.provider.base_access_token_url(&params);
        let request = self.http_client.post(&token_url).form(params.as_slice());

        let body = self.get_response(request).await?;
        let token = AccessToken::from_response(body)?;

        info!("Successfully exchanged {} grant for tokens", grant.grant_type());
        Ok(token)
    }

    /// Fetches and maps the profile of the token's owner.
    pub async fn resource_owner(&self, token: &AccessToken) -> Result<P::Owner, P::Error> {
        let url = self.provider.resource_owner_details_url(token)?;
        let body = self.get_response(self.http_client.get(url)).await?;
        self.provider.create_resource_owner(body, token)
    }

    /// Sends `request` and runs the provider's response check on the reply.
    pub async fn get_response(
        &self,
        request: RequestBuilder,
    ) -> Result<serde_json::Value, P::Error> {
        let response = request.send().await.map_err(OAuth2Error::from)?;
        let response = ProviderResponse::from_reqwest(response).await?;

        if let Err(e) = self.provider.check_response(&response) {
            warn!(status = response.status, "Provider response rejected: {}", e);
            return Err(e);
        }

        Ok(response.body)
    }
}
