//! Provider hooks invoked by the grant engine.

use crate::error::OAuth2Error;
use crate::params::Params;
use crate::types::{AccessToken, ProviderResponse};
use url::Url;

/// Per-exchange inputs that come from outside the engine.
#[derive(Debug, Clone, Default)]
pub struct TokenRequestContext {
    /// Query parameters of the inbound redirect request.
    pub inbound_query: Params,
    /// Verifier returned by the matching authorization request, if any.
    pub code_verifier: Option<String>,
}

impl TokenRequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inbound_query(mut self, inbound_query: Params) -> Self {
        self.inbound_query = inbound_query;
        self
    }

    pub fn with_code_verifier(mut self, code_verifier: Option<String>) -> Self {
        self.code_verifier = code_verifier;
        self
    }
}

/// The provider-specific half of an OAuth2 client.
///
/// [`crate::GrantFlow`] drives the authorization-code flow and calls these
/// hooks; implementations stay free of transport concerns.
pub trait OAuth2Hooks: Send + Sync {
    type Owner: Send;
    type Error: std::error::Error + From<OAuth2Error> + Send + Sync + 'static;

    fn base_authorization_url(&self) -> String;

    fn base_access_token_url(&self, params: &Params) -> String;

    fn resource_owner_details_url(&self, token: &AccessToken) -> Result<Url, Self::Error>;

    fn default_scopes(&self) -> Vec<String>;

    fn scope_separator(&self) -> &str {
        ","
    }

    /// Final say over the authorization parameters. Returns a PKCE verifier
    /// when one was generated for this attempt.
    fn authorization_parameters(
        &self,
        _params: &mut Params,
    ) -> Result<Option<String>, Self::Error> {
        Ok(None)
    }

    /// Final say over the token request body.
    fn token_parameters(
        &self,
        _params: &mut Params,
        _context: &TokenRequestContext,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called on every provider reply before its body is used.
    fn check_response(&self, response: &ProviderResponse) -> Result<(), Self::Error>;

    fn create_resource_owner(
        &self,
        response: serde_json::Value,
        token: &AccessToken,
    ) -> Result<Self::Owner, Self::Error>;
}
