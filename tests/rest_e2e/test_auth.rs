//! E2E tests: PKCE sign-in, refresh and sign-out against the auth service.

use std::time::Duration;

use chrono::Utc;
use league_portal::auth::{IdentityProvider, PkcePair};
use league_portal::error::AppError;
use league_portal::models::{AuthEvent, OAuthProvider};
use secrecy::ExposeSecret;

use super::mock_backend::MockBackend;
use super::test_helpers::*;

/// (1) The authorize URL names the provider, the redirect and an S256 challenge.
#[actix_rt::test]
async fn test_authorize_url() {
    let mock = MockBackend::start().await;
    let (client, _dir) = auth_client(&mock);

    let url = client.authorize_url(OAuthProvider::Discord).unwrap();

    assert!(url.starts_with(&format!("{}/authorize?", mock.auth_url())));
    assert_eq!(query_param(&url, "provider").as_deref(), Some("discord"));
    assert_eq!(query_param(&url, "redirect_to").as_deref(), Some(REDIRECT_URL));
    assert_eq!(query_param(&url, "code_challenge_method").as_deref(), Some("s256"));
    let challenge = query_param(&url, "code_challenge").unwrap();
    assert_eq!(challenge.len(), 43);
}

/// (2) Code exchange sends the verifier matching the published challenge.
#[actix_rt::test]
async fn test_code_exchange_uses_matching_verifier() {
    let mock = MockBackend::start().await;
    let (client, dir) = auth_client(&mock);
    let mut events = client.subscribe();

    mock.respond("POST", "/auth/v1/token", 200, token_body("access-1", "refresh-1", 3600));
    let url = client.authorize_url(OAuthProvider::GitHub).unwrap();
    let challenge = query_param(&url, "code_challenge").unwrap();

    let session = client.exchange_code("code-abc").await.unwrap();
    assert_eq!(session.user.id, "u1");
    assert_eq!(session.user.user_name(), Some("keeper01"));
    assert_eq!(session.access_token.expose_secret(), "access-1");
    assert!(session.expires_at.unwrap() > Utc::now());

    let req = mock.last("POST", "/auth/v1/token");
    assert_eq!(req.query, "grant_type=pkce");
    assert_eq!(req.apikey.as_deref(), Some(ANON_KEY));
    let body = req.body.unwrap();
    assert_eq!(body["auth_code"], "code-abc");
    let verifier = body["code_verifier"].as_str().unwrap().to_string();
    assert_eq!(PkcePair::from_verifier(verifier).challenge, challenge);

    match events.try_recv() {
        Ok(AuthEvent::SignedIn(s)) => assert_eq!(s.user.id, "u1"),
        other => panic!("expected sign-in event, got {:?}", other),
    }

    let stored = session_store(&dir).load().await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.expose_secret(), "refresh-1");
    assert_eq!(
        client.access_token().map(|t| t.expose_secret().to_string()),
        Some("access-1".to_string())
    );
}

/// (3) A code without a started sign-in never reaches the service.
#[actix_rt::test]
async fn test_exchange_without_sign_in_in_progress() {
    let mock = MockBackend::start().await;
    let (client, _dir) = auth_client(&mock);

    let err = client.exchange_code("stray").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)), "got {:?}", err);
    assert!(mock.requests().is_empty());
}

/// (4) A rejected grant carries the service's description.
#[actix_rt::test]
async fn test_rejected_code() {
    let mock = MockBackend::start().await;
    let (client, dir) = auth_client(&mock);

    mock.respond(
        "POST",
        "/auth/v1/token",
        400,
        serde_json::json!({ "error": "invalid_grant", "error_description": "Invalid code" }),
    );
    client.authorize_url(OAuthProvider::Discord).unwrap();

    match client.exchange_code("bad").await.unwrap_err() {
        AppError::Auth(message) => assert_eq!(message, "Invalid code"),
        other => panic!("expected auth error, got {:?}", other),
    }
    assert!(session_store(&dir).load().await.unwrap().is_none());

    // The verifier is single use
    let err = client.exchange_code("bad").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

/// (5) An expired stored session is refreshed on lookup.
#[actix_rt::test]
async fn test_expired_session_is_refreshed() {
    let mock = MockBackend::start().await;
    let (client, dir) = auth_client(&mock);
    let mut events = client.subscribe();

    session_store(&dir)
        .save(&stored_session(
            "access-old",
            "refresh-old",
            Utc::now() - chrono::Duration::hours(1),
        ))
        .await
        .unwrap();
    mock.respond("POST", "/auth/v1/token", 200, token_body("access-2", "refresh-2", 3600));

    let session = client.current_session().await.unwrap().unwrap();
    assert_eq!(session.access_token.expose_secret(), "access-2");

    let req = mock.last("POST", "/auth/v1/token");
    assert_eq!(req.query, "grant_type=refresh_token");
    assert_eq!(req.body.unwrap()["refresh_token"], "refresh-old");

    assert!(matches!(events.try_recv(), Ok(AuthEvent::TokenRefreshed(_))));
    let stored = session_store(&dir).load().await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.expose_secret(), "refresh-2");
}

/// (6) A refresh token the service no longer accepts ends the session.
#[actix_rt::test]
async fn test_rejected_refresh_signs_out() {
    let mock = MockBackend::start().await;
    let (client, dir) = auth_client(&mock);
    let mut events = client.subscribe();

    session_store(&dir)
        .save(&stored_session(
            "access-old",
            "refresh-old",
            Utc::now() - chrono::Duration::minutes(5),
        ))
        .await
        .unwrap();
    mock.respond(
        "POST",
        "/auth/v1/token",
        400,
        serde_json::json!({ "error": "invalid_grant", "error_description": "Refresh Token Not Found" }),
    );

    assert!(client.current_session().await.unwrap().is_none());
    assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedOut)));
    assert!(session_store(&dir).load().await.unwrap().is_none());
    assert!(client.access_token().is_none());
}

/// (7) A valid stored session is used as is.
#[actix_rt::test]
async fn test_valid_stored_session_needs_no_request() {
    let mock = MockBackend::start().await;
    let (client, dir) = auth_client(&mock);

    session_store(&dir)
        .save(&stored_session(
            "access-ok",
            "refresh-ok",
            Utc::now() + chrono::Duration::hours(1),
        ))
        .await
        .unwrap();

    let session = client.current_session().await.unwrap().unwrap();
    assert_eq!(session.access_token.expose_secret(), "access-ok");
    assert!(mock.requests().is_empty());
}

/// (8) Refresh happens only inside the margin.
#[actix_rt::test]
async fn test_refresh_respects_margin() {
    let mock = MockBackend::start().await;
    let (client, _dir) = auth_client(&mock);
    sign_in(&mock, &client).await;

    let session = client
        .refresh_session(Duration::from_secs(60))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.access_token.expose_secret(), "access-1");
    assert_eq!(mock.requests_to("POST", "/auth/v1/token").len(), 1);

    mock.respond("POST", "/auth/v1/token", 200, token_body("access-2", "refresh-2", 3600));
    let session = client
        .refresh_session(Duration::from_secs(2 * 3600))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.access_token.expose_secret(), "access-2");
    assert_eq!(mock.requests_to("POST", "/auth/v1/token").len(), 2);
}

/// (9) Sign-out revokes upstream; an already invalid token is fine.
#[actix_rt::test]
async fn test_sign_out_revokes_and_clears() {
    let mock = MockBackend::start().await;
    let (client, dir) = auth_client(&mock);
    sign_in(&mock, &client).await;
    let mut events = client.subscribe();

    mock.respond(
        "POST",
        "/auth/v1/logout",
        401,
        serde_json::json!({ "msg": "invalid JWT" }),
    );
    client.sign_out().await.unwrap();

    let req = mock.last("POST", "/auth/v1/logout");
    assert_eq!(req.authorization.as_deref(), Some("Bearer access-1"));
    assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedOut)));
    assert!(client.access_token().is_none());
    assert!(session_store(&dir).load().await.unwrap().is_none());
}

/// (10) Upstream failure on sign-out is reported, but the local session is gone.
#[actix_rt::test]
async fn test_sign_out_upstream_failure() {
    let mock = MockBackend::start().await;
    let (client, dir) = auth_client(&mock);
    sign_in(&mock, &client).await;

    mock.respond(
        "POST",
        "/auth/v1/logout",
        502,
        serde_json::json!({ "msg": "bad gateway" }),
    );
    let err = client.sign_out().await.unwrap_err();
    assert!(matches!(err, AppError::Remote { status: 502, .. }), "got {:?}", err);
    assert!(client.access_token().is_none());
    assert!(session_store(&dir).load().await.unwrap().is_none());
}
