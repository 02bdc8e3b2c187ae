//! VK ID identity provider.
//!
//! Plugs VK's OAuth 2.1 flow into the generic grant engine of
//! `ras-identity-oauth2`. VK requires PKCE on every authorization request and
//! wraps both successes and failures in its own JSON envelope; this crate
//! supplies the verifier handling, the envelope validation and the mapping of
//! VK profiles, plus `users.get` / `friends.get` lookups.

mod client;
mod config;
mod error;
mod identity;
mod pkce;
mod provider;
mod session;
mod user;
mod validation;

#[cfg(test)]
mod tests;

pub use client::VkontakteClient;
pub use config::{
    DEFAULT_API_BASE_URI, DEFAULT_API_VERSION, DEFAULT_OAUTH_BASE_URI, FieldSet, ScopeSet,
    VkontakteConfig,
};
pub use error::{VkontakteError, VkontakteResult};
pub use identity::{
    PROVIDER_ID, STATE_SESSION_KEY, VkontakteAuthPayload, VkontakteIdentityProvider,
    VkontakteResponse, verified_identity,
};
pub use pkce::{
    CHALLENGE_METHOD, Challenge, DEFAULT_VERIFIER_LENGTH, Verifier, derive_challenge,
    generate_verifier,
};
pub use provider::Vkontakte;
pub use session::{PKCE_SESSION_KEY, VerifierSlot};
pub use user::{Sex, UserEntry, VkontakteUser, resource_owner_from_response};
pub use validation::check_response;

// Re-export common types for convenience
pub use ras_identity_core::{IdentityProvider, VerifiedIdentity};
pub use ras_identity_oauth2::{
    AccessToken, AuthorizationRequest, ClientCredentials, Grant, InMemorySessionStore,
    OAuth2Config, Params, SessionStore,
};
