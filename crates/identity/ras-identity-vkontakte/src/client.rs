//! VK client: the grant flow plus the user lookup methods.

use crate::config::VkontakteConfig;
use crate::error::{VkontakteError, VkontakteResult};
use crate::provider::Vkontakte;
use crate::user::{VkontakteUser, response_payload, user_entries};
use ras_identity_oauth2::{
    AccessToken, AuthorizationRequest, ClientCredentials, Grant, GrantFlow, OAuth2Config, Params,
    TokenRequestContext,
};
use tracing::debug;

#[derive(Clone)]
pub struct VkontakteClient {
    flow: GrantFlow<Vkontakte>,
}

impl VkontakteClient {
    pub fn new(
        config: VkontakteConfig,
        credentials: ClientCredentials,
        oauth2_config: &OAuth2Config,
    ) -> VkontakteResult<Self> {
        let flow = GrantFlow::new(Vkontakte::new(config), credentials, oauth2_config)?;
        Ok(Self { flow })
    }

    pub fn from_flow(flow: GrantFlow<Vkontakte>) -> Self {
        Self { flow }
    }

    pub fn flow(&self) -> &GrantFlow<Vkontakte> {
        &self.flow
    }

    pub fn provider(&self) -> &Vkontakte {
        self.flow.provider()
    }

    pub fn set_language(&mut self, language: impl Into<String>) -> &mut Self {
        self.flow.provider_mut().set_language(language);
        self
    }

    /// Builds the authorization redirect. The returned request carries the
    /// PKCE verifier, which the caller keeps for [`Self::exchange_code`].
    pub fn authorization_url(&self, options: Params) -> VkontakteResult<AuthorizationRequest> {
        self.flow.authorization_url(options)
    }

    pub async fn access_token(
        &self,
        grant: Grant,
        options: Params,
        context: TokenRequestContext,
    ) -> VkontakteResult<AccessToken> {
        self.flow.access_token(grant, options, context).await
    }

    /// Exchanges an authorization code. `inbound_query` is the query of the
    /// redirect request; VK sends `device_id` there.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<String>,
        inbound_query: Params,
    ) -> VkontakteResult<AccessToken> {
        let context = TokenRequestContext::new()
            .with_inbound_query(inbound_query)
            .with_code_verifier(code_verifier);
        self.access_token(Grant::authorization_code(code), Params::new(), context)
            .await
    }

    pub async fn refresh(
        &self,
        token: &AccessToken,
        device_id: Option<&str>,
    ) -> VkontakteResult<AccessToken> {
        let refresh_token = token.refresh_token().ok_or_else(|| {
            VkontakteError::InvalidArgument("token has no refresh_token".to_string())
        })?;

        let mut options = Params::new();
        if let Some(device_id) = device_id {
            options.insert("device_id", device_id);
        }
        self.access_token(
            Grant::refresh_token(refresh_token),
            options,
            TokenRequestContext::new(),
        )
        .await
    }

    pub async fn resource_owner(&self, token: &AccessToken) -> VkontakteResult<VkontakteUser> {
        self.flow.resource_owner(token).await
    }

    /// `users.get` for `ids`, or for the token owner when `ids` is empty.
    /// `params` override the defaults.
    pub async fn users_get(
        &self,
        ids: &[i64],
        token: Option<&AccessToken>,
        params: Params,
    ) -> VkontakteResult<Vec<VkontakteUser>> {
        if ids.is_empty() && token.is_none() {
            return Err(VkontakteError::InvalidArgument(
                "either user ids or an access token is required".to_string(),
            ));
        }

        let mut defaults = Params::new();
        if !ids.is_empty() {
            let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
            defaults.insert("user_ids", ids.join(","));
        }
        let defaults = defaults.merge(self.provider().api_params(token));

        let users = self.call_user_list("users.get", defaults.merge(params)).await?;
        debug!("users.get returned {} users", users.len());
        Ok(users)
    }

    /// `friends.get` for `user_id`. Entries may be bare ids when no fields
    /// were requested.
    pub async fn friends_get(
        &self,
        user_id: i64,
        token: Option<&AccessToken>,
        params: Params,
    ) -> VkontakteResult<Vec<VkontakteUser>> {
        let defaults = Params::new()
            .with("user_id", user_id.to_string())
            .merge(self.provider().api_params(token));

        let friends = self
            .call_user_list("friends.get", defaults.merge(params))
            .await?;
        debug!("friends.get returned {} users for {}", friends.len(), user_id);
        Ok(friends)
    }

    /// Calls an API method and returns its `response` member.
    pub async fn call_method(
        &self,
        method: &str,
        params: &Params,
    ) -> VkontakteResult<serde_json::Value> {
        let url = self.provider().api_url(method, params)?;
        let request = self.flow.http_client().get(url);
        let body = self.flow.get_response(request).await?;
        response_payload(body)
    }

    async fn call_user_list(
        &self,
        method: &str,
        params: Params,
    ) -> VkontakteResult<Vec<VkontakteUser>> {
        let payload = self.call_method(method, &params).await?;
        Ok(user_entries(payload)?
            .into_iter()
            .map(VkontakteUser::from)
            .collect())
    }
}
