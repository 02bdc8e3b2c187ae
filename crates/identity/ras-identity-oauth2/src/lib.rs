//! Generic OAuth2 authorization-code grant engine.
//!
//! The engine owns the parts of the flow every provider shares: default
//! authorization parameters, the token request, HTTP transport and token
//! parsing. Provider specifics plug in through the [`OAuth2Hooks`] trait, which
//! the engine calls at fixed points of the flow.

mod client;
mod config;
mod error;
mod hooks;
mod params;
mod state;
mod types;


pub use client::GrantFlow;
pub use config::{ClientCredentials, OAuth2Config};
pub use error::{OAuth2Error, OAuth2Result};
pub use hooks::{OAuth2Hooks, TokenRequestContext};
pub use params::Params;
pub use state::{InMemorySessionStore, SessionEntry, SessionStore};
pub use types::{AccessToken, AuthorizationRequest, Grant, ProviderResponse};
