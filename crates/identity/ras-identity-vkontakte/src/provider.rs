//! VK ID hooks for the grant engine.

use crate::config::VkontakteConfig;
use crate::error::{VkontakteError, VkontakteResult};
use crate::pkce::{CHALLENGE_METHOD, derive_challenge, generate_verifier};
use crate::user::{VkontakteUser, resource_owner_from_response};
use crate::validation;
use ras_identity_oauth2::{
    AccessToken, OAuth2Error, OAuth2Hooks, Params, ProviderResponse, TokenRequestContext,
};
use tracing::{debug, warn};
use url::Url;

const DEVICE_ID_PARAM: &str = "device_id";

/// VK ID (OAuth 2.1 with mandatory PKCE) plus the VK API profile methods.
#[derive(Debug, Clone, Default)]
pub struct Vkontakte {
    config: VkontakteConfig,
}

impl Vkontakte {
    pub fn new(config: VkontakteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VkontakteConfig {
        &self.config
    }

    pub fn set_language(&mut self, language: impl Into<String>) -> &mut Self {
        self.config.set_language(language);
        self
    }

    /// Parameters every API method call carries.
    pub fn api_params(&self, token: Option<&AccessToken>) -> Params {
        let mut params = Params::new().with("fields", self.config.fields.to_param());
        if let Some(token) = token {
            params.insert("access_token", token.token());
        }
        params.insert("v", self.config.api_version.as_str());
        if let Some(language) = &self.config.language {
            params.insert("lang", language.as_str());
        }
        params
    }

    /// `{api_base}/{method}?{params}`
    pub fn api_url(&self, method: &str, params: &Params) -> VkontakteResult<Url> {
        let base = self.config.api_base_uri.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/{}", base, method)).map_err(OAuth2Error::from)?;
        params.append_to(&mut url);
        Ok(url)
    }
}

impl OAuth2Hooks for Vkontakte {
    type Owner = VkontakteUser;
    type Error = VkontakteError;

    fn base_authorization_url(&self) -> String {
        format!("{}/authorize", self.config.oauth_base_uri)
    }

    fn base_access_token_url(&self, _params: &Params) -> String {
        format!("{}/oauth2/auth", self.config.oauth_base_uri)
    }

    fn resource_owner_details_url(&self, token: &AccessToken) -> VkontakteResult<Url> {
        self.api_url("users.get", &self.api_params(Some(token)))
    }

    fn default_scopes(&self) -> Vec<String> {
        self.config.scopes.as_slice().to_vec()
    }

    /// Adds an S256 challenge unless the caller brought their own, in which
    /// case the caller also owns the verifier.
    fn authorization_parameters(&self, params: &mut Params) -> VkontakteResult<Option<String>> {
        if params.contains_key("code_challenge") {
            debug!("Caller supplied code_challenge; no verifier generated");
            return Ok(None);
        }

        let verifier = generate_verifier(self.config.verifier_length)?;
        params.insert("code_challenge", derive_challenge(&verifier).as_str());
        params.insert("code_challenge_method", CHALLENGE_METHOD);

        Ok(Some(verifier.into_inner()))
    }

    fn token_parameters(
        &self,
        params: &mut Params,
        context: &TokenRequestContext,
    ) -> VkontakteResult<()> {
        if let Some(device_id) = context.inbound_query.get(DEVICE_ID_PARAM) {
            params.insert_if_absent(DEVICE_ID_PARAM, device_id);
        }

        match &context.code_verifier {
            Some(verifier) => {
                params.insert("code_verifier", verifier.as_str());
            }
            // VK answers with invalid_grant; nothing useful to do locally.
            None => warn!("No pending PKCE verifier for token exchange"),
        }

        Ok(())
    }

    fn check_response(&self, response: &ProviderResponse) -> VkontakteResult<()> {
        validation::check_response(response)
    }

    fn create_resource_owner(
        &self,
        response: serde_json::Value,
        token: &AccessToken,
    ) -> VkontakteResult<VkontakteUser> {
        resource_owner_from_response(response, token, self.config.uses_legacy_uid_fallback())
    }
}
