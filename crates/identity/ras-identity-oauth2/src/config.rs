//! OAuth2 configuration types.

use serde::{Deserialize, Serialize};

/// Credentials issued to this application by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    /// Public (PKCE-only) clients have no secret.
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn with_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Config {
    pub http_timeout_seconds: u64,
    /// How long a value bridged across the redirect stays valid.
    pub state_ttl_seconds: u64,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            http_timeout_seconds: 30,
            state_ttl_seconds: 600, // 10 minutes
        }
    }
}

impl OAuth2Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_ttl_seconds = seconds;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }
}
