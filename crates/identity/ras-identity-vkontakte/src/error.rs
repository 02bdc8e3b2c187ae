//! VK adapter error types.

use ras_identity_oauth2::OAuth2Error;
use serde_json::Value;
use thiserror::Error;

pub type VkontakteResult<T> = Result<T, VkontakteError>;

#[derive(Debug, Error)]
pub enum VkontakteError {
    /// The caller did not supply enough to build the request.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Status above 399, or a body that is not JSON.
    #[error("HTTP error {code}: {message}")]
    HttpError {
        code: u16,
        message: String,
        body: Value,
    },

    /// Well-formed JSON that carries an application-level error.
    #[error("Provider error {code}: {message}")]
    ProviderError {
        code: i64,
        message: String,
        body: Value,
    },

    #[error("Secure random source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("OAuth2 error: {0}")]
    OAuth2(#[from] OAuth2Error),
}

impl VkontakteError {
    /// Numeric code of a classified HTTP or provider error.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::HttpError { code, .. } => Some(i64::from(*code)),
            Self::ProviderError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Raw provider payload of a classified HTTP or provider error.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::HttpError { body, .. } | Self::ProviderError { body, .. } => Some(body),
            _ => None,
        }
    }
}
