//! VK as a session-service identity provider.

use crate::client::VkontakteClient;
use crate::error::{VkontakteError, VkontakteResult};
use crate::pkce::Verifier;
use crate::session::VerifierSlot;
use crate::user::VkontakteUser;
use async_trait::async_trait;
use ras_identity_core::{IdentityError, IdentityProvider, IdentityResult, VerifiedIdentity};
use ras_identity_oauth2::{AccessToken, Params, SessionStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub const PROVIDER_ID: &str = "vkontakte";

/// Session key of the `state` issued with the pending authorization request.
pub const STATE_SESSION_KEY: &str = "__oauth2_state";

/// Authentication payload for the verify method
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VkontakteAuthPayload {
    /// Start the flow - returns the authorization URL
    StartFlow {
        session_id: String,
        additional_params: Option<HashMap<String, String>>,
    },
    /// Complete the flow with the redirect's query parameters
    Callback {
        session_id: String,
        code: Option<String>,
        state: String,
        device_id: Option<String>,
        error: Option<String>,
        error_description: Option<String>,
    },
}

/// Returned (inside `IdentityError::ProviderError`) for `StartFlow`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VkontakteResponse {
    AuthorizationUrl { url: String, state: String },
}

/// Runs the VK ID flow, bridging the verifier and state through `store`.
#[derive(Clone)]
pub struct VkontakteIdentityProvider {
    client: VkontakteClient,
    store: Arc<dyn SessionStore>,
}

impl VkontakteIdentityProvider {
    pub fn new(client: VkontakteClient, store: Arc<dyn SessionStore>) -> Self {
        Self { client, store }
    }

    pub fn client(&self) -> &VkontakteClient {
        &self.client
    }

    /// Builds the authorization URL and remembers its verifier and state for
    /// `session_id`.
    pub async fn start_flow(
        &self,
        session_id: &str,
        options: Params,
    ) -> VkontakteResult<VkontakteResponse> {
        let request = self.client.authorization_url(options)?;

        if let Some(verifier) = request.code_verifier {
            VerifierSlot::new(self.store.as_ref(), session_id)
                .put(&Verifier::from_raw(verifier))
                .await?;
        }
        self.store
            .put(session_id, STATE_SESSION_KEY, request.state.clone())
            .await?;

        info!("Started VK ID flow for session {}", session_id);
        Ok(VkontakteResponse::AuthorizationUrl {
            url: request.url.to_string(),
            state: request.state,
        })
    }

    /// Drops the pending verifier and state, e.g. after VK redirected back
    /// with an error.
    pub async fn abort_flow(&self, session_id: &str) -> VkontakteResult<()> {
        self.store.take(session_id, STATE_SESSION_KEY).await?;
        VerifierSlot::new(self.store.as_ref(), session_id)
            .take()
            .await?;
        Ok(())
    }

    /// Consumes the pending verifier, exchanges `code` and loads the owner.
    pub async fn complete_flow(
        &self,
        session_id: &str,
        code: &str,
        state: &str,
        device_id: Option<&str>,
    ) -> VkontakteResult<(AccessToken, VkontakteUser)> {
        // Both values are single-use, whatever the outcome.
        let expected_state = self.store.take(session_id, STATE_SESSION_KEY).await?;
        let verifier = VerifierSlot::new(self.store.as_ref(), session_id)
            .take()
            .await?;

        if expected_state.as_deref() != Some(state) {
            warn!("State mismatch for session {}", session_id);
            return Err(VkontakteError::InvalidArgument(
                "state does not match the pending authorization request".to_string(),
            ));
        }

        let mut inbound_query = Params::new().with("code", code).with("state", state);
        if let Some(device_id) = device_id {
            inbound_query.insert("device_id", device_id);
        }

        let token = self
            .client
            .exchange_code(code, verifier.map(Verifier::into_inner), inbound_query)
            .await?;
        let owner = self.client.resource_owner(&token).await?;

        Ok((token, owner))
    }
}

/// Maps a VK user onto the provider-neutral identity.
pub fn verified_identity(user: &VkontakteUser) -> VkontakteResult<VerifiedIdentity> {
    let subject = user
        .id()
        .ok_or_else(|| VkontakteError::UnexpectedResponse("user has no id".to_string()))?;

    Ok(
        VerifiedIdentity::new(format!("oauth2:{}", PROVIDER_ID), subject.to_string())
            .with_email(user.email().map(String::from))
            .with_display_name(user.full_name())
            .with_metadata(serde_json::Value::Object(user.as_map().clone())),
    )
}

fn provider_error(e: VkontakteError) -> IdentityError {
    IdentityError::ProviderError(e.to_string())
}

#[async_trait]
impl IdentityProvider for VkontakteIdentityProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn verify(&self, auth_payload: serde_json::Value) -> IdentityResult<VerifiedIdentity> {
        let payload: VkontakteAuthPayload =
            serde_json::from_value(auth_payload).map_err(|_| IdentityError::InvalidPayload)?;

        match payload {
            VkontakteAuthPayload::StartFlow {
                session_id,
                additional_params,
            } => {
                let options: Params = additional_params.unwrap_or_default().into_iter().collect();
                let response = self
                    .start_flow(&session_id, options)
                    .await
                    .map_err(provider_error)?;

                // The client handles the authorization URL specially
                let response_json = serde_json::to_string(&response)?;
                Err(IdentityError::ProviderError(response_json))
            }
            VkontakteAuthPayload::Callback {
                session_id,
                code,
                state,
                device_id,
                error,
                error_description,
            } => {
                if let Some(error) = error {
                    warn!("VK returned {} for session {}", error, session_id);
                    self.abort_flow(&session_id).await.map_err(provider_error)?;
                    return Err(IdentityError::ProviderError(format!(
                        "{}: {}",
                        error,
                        error_description.as_deref().unwrap_or("No description")
                    )));
                }

                let code = code.ok_or(IdentityError::InvalidPayload)?;
                let (_, user) = self
                    .complete_flow(&session_id, &code, &state, device_id.as_deref())
                    .await
                    .map_err(provider_error)?;

                let identity = verified_identity(&user).map_err(provider_error)?;
                info!("Verified VK identity {}", identity.subject);
                Ok(identity)
            }
        }
    }
}
