//! Take-once verifier slot in session storage.

use crate::error::VkontakteResult;
use crate::pkce::Verifier;
use ras_identity_oauth2::SessionStore;
use tracing::debug;

/// Session key the verifier lives under.
pub const PKCE_SESSION_KEY: &str = "__pkce";

/// Carries one [`Verifier`] from the authorization request to the token
/// exchange of the same session.
///
/// `put` overwrites an unconsumed verifier, so overlapping authorization
/// attempts in one session invalidate each other.
pub struct VerifierSlot<'a> {
    store: &'a dyn SessionStore,
    session_id: &'a str,
}

impl<'a> VerifierSlot<'a> {
    pub fn new(store: &'a dyn SessionStore, session_id: &'a str) -> Self {
        Self { store, session_id }
    }

    pub async fn put(&self, verifier: &Verifier) -> VkontakteResult<()> {
        self.store
            .put(self.session_id, PKCE_SESSION_KEY, verifier.as_str().to_string())
            .await?;
        debug!(session_id = self.session_id, "Stored PKCE verifier");
        Ok(())
    }

    /// Reads and clears the slot in one step.
    pub async fn take(&self) -> VkontakteResult<Option<Verifier>> {
        let verifier = self
            .store
            .take(self.session_id, PKCE_SESSION_KEY)
            .await?
            .map(Verifier::from_raw);
        debug!(
            session_id = self.session_id,
            found = verifier.is_some(),
            "Consumed PKCE verifier"
        );
        Ok(verifier)
    }
}
