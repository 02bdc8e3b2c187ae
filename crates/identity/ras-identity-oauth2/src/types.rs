//! OAuth2 protocol types.

use crate::error::{OAuth2Error, OAuth2Result};
use crate::params::Params;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// A ready-to-redirect authorization request.
///
/// `code_verifier` is set when the provider generated a PKCE verifier for this
/// attempt. The caller must keep it until the token exchange and hand it back
/// through [`crate::TokenRequestContext`].
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
    pub code_verifier: Option<String>,
}

/// The grant traded for an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    AuthorizationCode { code: String },
    RefreshToken { refresh_token: String },
}

impl Grant {
    pub fn authorization_code(code: impl Into<String>) -> Self {
        Self::AuthorizationCode { code: code.into() }
    }

    pub fn refresh_token(refresh_token: impl Into<String>) -> Self {
        Self::RefreshToken {
            refresh_token: refresh_token.into(),
        }
    }

    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }

    pub(crate) fn apply(&self, params: &mut Params) {
        params.insert("grant_type", self.grant_type());
        match self {
            Self::AuthorizationCode { code } => params.insert("code", code.as_str()),
            Self::RefreshToken { refresh_token } => {
                params.insert("refresh_token", refresh_token.as_str())
            }
        };
    }
}

const RESERVED_TOKEN_FIELDS: [&str; 3] = ["access_token", "refresh_token", "expires_in"];

/// An issued access token plus every extra field the token endpoint returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    token: String,
    refresh_token: Option<String>,
    expires: Option<DateTime<Utc>>,
    values: Map<String, Value>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            refresh_token: None,
            expires: None,
            values: Map::new(),
        }
    }

    /// Builds a token from a decoded token-endpoint response.
    pub fn from_response(response: Value) -> OAuth2Result<Self> {
        let Value::Object(mut fields) = response else {
            return Err(OAuth2Error::InvalidTokenResponse(
                "token response is not a JSON object".to_string(),
            ));
        };

        let token = match fields.get("access_token") {
            Some(Value::String(token)) if !token.is_empty() => token.clone(),
            _ => {
                return Err(OAuth2Error::InvalidTokenResponse(
                    "missing access_token".to_string(),
                ));
            }
        };

        let refresh_token = fields
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(String::from);

        let expires_in = fields.get("expires_in").and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        });
        // Some providers use 0 for "never expires".
        let expires = match expires_in.filter(|seconds| *seconds > 0) {
            Some(seconds) => Some(
                Duration::try_seconds(seconds)
                    .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        OAuth2Error::InvalidTokenResponse(format!(
                            "expires_in out of range: {}",
                            seconds
                        ))
                    })?,
            ),
            None => None,
        };

        for key in RESERVED_TOKEN_FIELDS {
            fields.remove(key);
        }

        Ok(Self {
            token,
            refresh_token,
            expires,
            values: fields,
        })
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    /// Tokens without an expiry never report as expired.
    pub fn has_expired(&self) -> bool {
        self.expires.is_some_and(|expires| Utc::now() >= expires)
    }

    /// Extra fields from the token response, e.g. `email` or `user_id`.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// A provider reply as seen by the response check.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub reason: String,
    /// Raw `Content-Type` header, parameters included.
    pub content_type: Option<String>,
    /// Decoded JSON body, or the raw text when the body is not JSON.
    pub body: Value,
}

impl ProviderResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: Value) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Self {
            status,
            reason,
            content_type: content_type.map(String::from),
            body,
        }
    }

    pub async fn from_reqwest(response: reqwest::Response) -> OAuth2Result<Self> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let text = response.text().await?;
        let body = decode_body(text);

        Ok(Self {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body,
        })
    }

    /// The media type without parameters, e.g. `application/json` for
    /// `application/json; charset=utf-8`.
    pub fn primary_content_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .and_then(|raw| raw.split(';').next())
            .map(str::trim)
    }
}

fn decode_body(text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
