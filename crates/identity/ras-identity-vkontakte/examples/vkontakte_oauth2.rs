//! Example showing how to set up VK ID authentication
//!
//! This example demonstrates:
//! 1. Configuring the VK client (scopes, fields, language)
//! 2. Starting the flow and bridging the PKCE verifier through a session store
//! 3. Completing the flow once the redirect comes back
//! 4. Looking up the user's friends

use ras_identity_core::IdentityError;
use ras_identity_vkontakte::{
    ClientCredentials, IdentityProvider, InMemorySessionStore, OAuth2Config, Params, ScopeSet,
    SessionStore, VkontakteClient, VkontakteConfig, VkontakteIdentityProvider, VkontakteResponse,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let credentials = ClientCredentials::new(
        std::env::var("VK_CLIENT_ID").unwrap_or_else(|_| "your-vk-app-id".to_string()),
        "http://localhost:3000/auth/vk/callback",
    );

    let config = VkontakteConfig::new()
        .with_scopes(ScopeSet::new(["email", "friends"]))
        .with_language("en");

    let oauth2_config = OAuth2Config::new()
        .with_state_ttl(600) // 10 minutes
        .with_http_timeout(30); // 30 seconds

    let client = VkontakteClient::new(config, credentials, &oauth2_config)?;
    let store = Arc::new(InMemorySessionStore::new(oauth2_config.state_ttl_seconds));
    let provider = VkontakteIdentityProvider::new(client.clone(), store.clone());

    // Sweep entries left behind by abandoned flows
    let sweeper = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            if let Ok(removed) = sweeper.cleanup_expired().await {
                tracing::debug!("Removed {} expired session entries", removed);
            }
        }
    });

    println!("VK ID Example");
    println!("=============");

    // Step 1: Start the flow
    println!("\n1. Starting VK ID flow...");

    let start_payload = serde_json::json!({
        "type": "StartFlow",
        "session_id": "example-session"
    });

    let state = match provider.verify(start_payload).await {
        Err(IdentityError::ProviderError(json)) => {
            let response: VkontakteResponse = serde_json::from_str(&json)?;
            let VkontakteResponse::AuthorizationUrl { url, state } = response;
            println!("Authorization URL: {}", url);
            println!("State: {}", state);
            state
        }
        Ok(_) => {
            println!("Unexpected success from start flow");
            return Ok(());
        }
        Err(e) => {
            println!("Error starting VK ID flow: {}", e);
            return Ok(());
        }
    };

    // Step 2: Complete the flow with the code VK redirected back with
    let Ok(code) = std::env::var("VK_CODE") else {
        println!("\nSet VK_CODE (and VK_DEVICE_ID) from the redirect to complete the flow.");
        return Ok(());
    };

    println!("\n2. Completing VK ID flow...");
    let (token, user) = provider
        .complete_flow(
            "example-session",
            &code,
            &state,
            std::env::var("VK_DEVICE_ID").ok().as_deref(),
        )
        .await?;

    println!("User ID: {:?}", user.id());
    println!("Name: {:?}", user.full_name());
    println!("Email: {:?}", user.email());

    // Step 3: Friends of the authenticated user
    if let Some(user_id) = user.id() {
        println!("\n3. Fetching friends...");
        let friends = client
            .friends_get(user_id, Some(&token), Params::new().with("count", "10"))
            .await?;
        for friend in friends {
            println!("- {:?} {:?}", friend.id(), friend.full_name());
        }
    }

    Ok(())
}
