//! Shared setup for the E2E suite.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use league_portal::auth::{GoTrueClient, IdentityProvider, SessionStore};
use league_portal::db::{PostgrestClient, RestStore};
use league_portal::models::{AuthUser, Session};
use secrecy::SecretString;
use tempfile::TempDir;

use super::mock_backend::MockBackend;

pub const ANON_KEY: &str = "anon-key-123";
pub const REDIRECT_URL: &str = "http://127.0.0.1:9000/auth/callback";

pub fn anon_key() -> SecretString {
    SecretString::from(ANON_KEY.to_string())
}

/// Store speaking to the mock with the anon key only.
pub fn anon_store(mock: &MockBackend) -> RestStore {
    RestStore::new(PostgrestClient::with_http(
        reqwest::Client::new(),
        mock.rest_url(),
        anon_key(),
    ))
}

/// Store that sends the provider's session token as the bearer.
pub fn authed_store(mock: &MockBackend, provider: Arc<dyn IdentityProvider>) -> RestStore {
    RestStore::new(
        PostgrestClient::with_http(reqwest::Client::new(), mock.rest_url(), anon_key())
            .with_auth(provider),
    )
}

/// Auth client with its session file in a fresh temp dir.
pub fn auth_client(mock: &MockBackend) -> (GoTrueClient, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let client = GoTrueClient::with_parts(
        reqwest::Client::new(),
        mock.auth_url(),
        anon_key(),
        REDIRECT_URL.to_string(),
        SessionStore::new(dir.path().join("session.json")),
    );
    (client, dir)
}

pub fn session_store(dir: &TempDir) -> SessionStore {
    SessionStore::new(dir.path().join("session.json"))
}

pub fn token_body(access: &str, refresh: &str, expires_in: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": expires_in,
        "user": {
            "id": "u1",
            "email": "keeper@example.com",
            "user_metadata": { "user_name": "keeper01" }
        }
    })
}

pub fn stored_session(access: &str, refresh: &str, expires_at: DateTime<Utc>) -> Session {
    Session {
        access_token: SecretString::from(access.to_string()),
        refresh_token: SecretString::from(refresh.to_string()),
        expires_at: Some(expires_at),
        user: AuthUser {
            id: "u1".to_string(),
            email: None,
            user_metadata: HashMap::new(),
        },
    }
}

/// Value of a query parameter in a URL.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| urlencoding::decode(value).unwrap().into_owned())
    })
}

/// Run the PKCE sign-in against the mock and return the issued session.
pub async fn sign_in(mock: &MockBackend, client: &GoTrueClient) -> Session {
    mock.respond("POST", "/auth/v1/token", 200, token_body("access-1", "refresh-1", 3600));
    client
        .authorize_url(league_portal::models::OAuthProvider::Discord)
        .expect("authorize url");
    client.exchange_code("code-abc").await.expect("code exchange")
}
