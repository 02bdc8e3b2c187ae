//! Integration tests against a mock VK.

#[cfg(test)]
mod integration_tests {
    use crate::{
        AccessToken, ClientCredentials, IdentityProvider, InMemorySessionStore, OAuth2Config,
        PKCE_SESSION_KEY, Params, STATE_SESSION_KEY, SessionStore, Verifier, VkontakteClient,
        VkontakteConfig, VkontakteError, VkontakteIdentityProvider, VkontakteResponse,
    };
    use ras_identity_core::IdentityError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use url::Url;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(mock_server: &MockServer) -> VkontakteClient {
        let config = VkontakteConfig::new()
            .with_oauth_base_uri(mock_server.uri())
            .with_api_base_uri(format!("{}/method", mock_server.uri()));

        VkontakteClient::new(
            config,
            ClientCredentials::new("51234567", "http://localhost:3000/auth/vk/callback"),
            &OAuth2Config::default(),
        )
        .unwrap()
    }

    fn query_of(url: &str) -> HashMap<String, String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn extract_authorization_url(
        result: Result<crate::VerifiedIdentity, IdentityError>,
    ) -> (String, String) {
        if let Err(IdentityError::ProviderError(json)) = result {
            let response: VkontakteResponse = serde_json::from_str(&json).unwrap();
            match response {
                VkontakteResponse::AuthorizationUrl { url, state } => (url, state),
            }
        } else {
            panic!("Expected provider error with auth URL");
        }
    }

    #[tokio::test]
    async fn test_full_vk_id_flow() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/auth"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("device_id=dev-1"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "vk_access_token",
                "refresh_token": "vk_refresh_token",
                "id_token": "header.payload.sig",
                "token_type": "Bearer",
                "expires_in": 3600,
                "user_id": 1,
                "email": "a@example.com",
                "state": "ignored",
                "scope": "email friends"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/method/users.get"))
            .and(query_param("access_token", "vk_access_token"))
            .and(query_param("v", "5.199"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": [{"id": 999, "first_name": "A", "last_name": "B"}]
            })))
            .mount(&mock_server)
            .await;

        let store = Arc::new(InMemorySessionStore::default());
        let provider = VkontakteIdentityProvider::new(client_for(&mock_server), store.clone());

        let start = provider
            .verify(serde_json::json!({"type": "StartFlow", "session_id": "sess-1"}))
            .await;
        let (url, state) = extract_authorization_url(start);

        assert!(url.starts_with(&format!("{}/authorize?", mock_server.uri())));
        let query = query_of(&url);
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["client_id"], "51234567");
        assert_eq!(query["scope"], "email,friends,offline");
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(query["state"], state);
        let challenge = query["code_challenge"].clone();

        let identity = provider
            .verify(serde_json::json!({
                "type": "Callback",
                "session_id": "sess-1",
                "code": "auth-code",
                "state": state,
                "device_id": "dev-1"
            }))
            .await
            .unwrap();

        // Token user_id wins over the profile id
        assert_eq!(identity.provider_id, "oauth2:vkontakte");
        assert_eq!(identity.subject, "1");
        assert_eq!(identity.email.as_deref(), Some("a@example.com"));
        assert_eq!(identity.display_name.as_deref(), Some("A B"));

        // The verifier sent to the token endpoint matches the challenge
        let requests = mock_server.received_requests().await.unwrap();
        let token_request = requests
            .iter()
            .find(|r| r.url.path() == "/oauth2/auth")
            .unwrap();
        let form: HashMap<String, String> = url::form_urlencoded::parse(&token_request.body)
            .into_owned()
            .collect();
        let verifier = Verifier::from_raw(form["code_verifier"].clone());
        assert_eq!(verifier.as_str().len(), 128);
        assert_eq!(verifier.challenge().as_str(), challenge);

        // Verifier and state were consumed
        assert_eq!(store.take("sess-1", PKCE_SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_replayed_callback_is_rejected() {
        let mock_server = MockServer::start().await;
        let store = Arc::new(InMemorySessionStore::default());
        let provider = VkontakteIdentityProvider::new(client_for(&mock_server), store);

        let (_, state) = extract_authorization_url(
            provider
                .verify(serde_json::json!({"type": "StartFlow", "session_id": "s"}))
                .await,
        );

        let wrong_state = provider.complete_flow("s", "code", "forged", None).await;
        assert!(matches!(wrong_state, Err(VkontakteError::InvalidArgument(_))));

        // The mismatch consumed the pending values, so the real state fails too
        let replay = provider.complete_flow("s", "code", &state, None).await;
        assert!(matches!(replay, Err(VkontakteError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_callback_error_is_surfaced() {
        let mock_server = MockServer::start().await;
        let store = Arc::new(InMemorySessionStore::default());
        let provider = VkontakteIdentityProvider::new(client_for(&mock_server), store.clone());

        let (_, state) = extract_authorization_url(
            provider
                .verify(serde_json::json!({"type": "StartFlow", "session_id": "s"}))
                .await,
        );

        let result = provider
            .verify(serde_json::json!({
                "type": "Callback",
                "session_id": "s",
                "state": state,
                "error": "access_denied",
                "error_description": "User denied access"
            }))
            .await;

        match result {
            Err(IdentityError::ProviderError(message)) => {
                assert_eq!(message, "access_denied: User denied access")
            }
            other => panic!("Expected provider error, got {:?}", other),
        }

        // The denied flow leaves nothing pending
        assert_eq!(store.take("s", PKCE_SESSION_KEY).await.unwrap(), None);
        assert_eq!(store.take("s", STATE_SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_callback_without_code_or_error_is_invalid() {
        let mock_server = MockServer::start().await;
        let provider = VkontakteIdentityProvider::new(
            client_for(&mock_server),
            Arc::new(InMemorySessionStore::default()),
        );

        let result = provider
            .verify(serde_json::json!({
                "type": "Callback",
                "session_id": "s",
                "state": "x"
            }))
            .await;

        assert!(matches!(result, Err(IdentityError::InvalidPayload)));
    }

    #[tokio::test]
    async fn test_caller_challenge_stores_no_verifier() {
        let mock_server = MockServer::start().await;
        let store = Arc::new(InMemorySessionStore::default());
        let provider = VkontakteIdentityProvider::new(client_for(&mock_server), store.clone());

        let response = provider
            .start_flow(
                "s",
                Params::new()
                    .with("code_challenge", "caller-challenge")
                    .with("code_challenge_method", "S256"),
            )
            .await
            .unwrap();

        let VkontakteResponse::AuthorizationUrl { url, .. } = response;
        let query = query_of(&url);
        assert_eq!(query["code_challenge"], "caller-challenge");
        assert_eq!(store.take("s", PKCE_SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_token_exchange_without_verifier() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/auth"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "code_verifier is missing"
            })))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server)
            .exchange_code("auth-code", None, Params::new())
            .await;

        match result {
            Err(VkontakteError::HttpError { code, message, .. }) => {
                assert_eq!(code, 400);
                assert_eq!(message, "code_verifier is missing");
            }
            other => panic!("Expected HttpError, got {:?}", other),
        }

        let requests = mock_server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body).to_string();
        assert!(!body.contains("code_verifier"));
    }

    #[tokio::test]
    async fn test_refresh_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/auth"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old"))
            .and(body_string_contains("device_id=dev-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new",
                "refresh_token": "newer",
                "expires_in": 3600
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let token = AccessToken::new("stale").with_refresh_token("old");
        let refreshed = client.refresh(&token, Some("dev-1")).await.unwrap();
        assert_eq!(refreshed.token(), "new");
        assert_eq!(refreshed.refresh_token(), Some("newer"));

        let no_refresh = client.refresh(&AccessToken::new("t"), None).await;
        assert!(matches!(no_refresh, Err(VkontakteError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_resource_owner_overlays_token_values() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/method/users.get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": [{"id": 1, "first_name": "A"}]
            })))
            .mount(&mock_server)
            .await;

        let token = AccessToken::new("tok").with_value("email", "a@example.com");
        let owner = client_for(&mock_server).resource_owner(&token).await.unwrap();

        assert_eq!(owner.email(), Some("a@example.com"));
        assert_eq!(owner.id(), Some(1));
    }

    #[tokio::test]
    async fn test_users_get_requires_ids_or_token() {
        let mock_server = MockServer::start().await;

        let result = client_for(&mock_server)
            .users_get(&[], None, Params::new())
            .await;
        assert!(matches!(result, Err(VkontakteError::InvalidArgument(_))));

        // Rejected before any request was made
        assert!(mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_users_get_by_ids_with_overrides() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/method/users.get"))
            .and(query_param("user_ids", "1,2"))
            .and(query_param("v", "5.131"))
            .and(query_param("lang", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": [
                    {"id": 1, "first_name": "A"},
                    {"id": 2, "first_name": "B"}
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut client = client_for(&mock_server);
        client.set_language("en");

        let users = client
            .users_get(&[1, 2], None, Params::new().with("v", "5.131"))
            .await
            .unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id(), Some(1));
        assert_eq!(users[1].first_name(), Some("B"));

        let requests = mock_server.received_requests().await.unwrap();
        let query: HashMap<_, _> = requests[0].url.query_pairs().collect();
        assert!(!query.contains_key("access_token"));
        assert!(query["fields"].contains("photo_max_orig"));
    }

    #[tokio::test]
    async fn test_users_get_unwraps_items_envelope() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/method/users.get"))
            .and(query_param("access_token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"count": 1, "items": [{"id": 5}]}
            })))
            .mount(&mock_server)
            .await;

        let users = client_for(&mock_server)
            .users_get(&[], Some(&AccessToken::new("tok")), Params::new())
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id(), Some(5));
    }

    #[tokio::test]
    async fn test_friends_get_mixed_entries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/method/friends.get"))
            .and(query_param("user_id", "7"))
            .and(query_param("access_token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"items": [123, {"id": 456, "first_name": "B"}]}
            })))
            .mount(&mock_server)
            .await;

        let friends = client_for(&mock_server)
            .friends_get(7, Some(&AccessToken::new("tok")), Params::new())
            .await
            .unwrap();

        assert_eq!(friends.len(), 2);
        assert_eq!(friends[0].id(), Some(123));
        assert_eq!(friends[0].as_map().len(), 1);
        assert_eq!(friends[1].id(), Some(456));
        assert_eq!(friends[1].first_name(), Some("B"));
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/method/friends.get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": {"error_code": 15, "error_msg": "Access denied"}
            })))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server)
            .friends_get(7, Some(&AccessToken::new("tok")), Params::new())
            .await;

        match result {
            Err(VkontakteError::ProviderError { code, message, body }) => {
                assert_eq!(code, 15);
                assert_eq!(message, "Access denied");
                assert_eq!(body["error"]["error_code"], 15);
            }
            other => panic!("Expected ProviderError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_html_page_with_success_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/method/users.get"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>Maintenance</body></html>", "text/html"),
            )
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server)
            .users_get(&[1], None, Params::new())
            .await;

        match result {
            Err(VkontakteError::HttpError { code, body, .. }) => {
                assert_eq!(code, 200);
                assert_eq!(body, "<html><body>Maintenance</body></html>");
            }
            other => panic!("Expected HttpError, got {:?}", other),
        }
    }
}
