//! Identity provider client for the hosted auth service (`/auth/v1`).
//!
//! Sign-in uses the PKCE authorization-code flow:
//! 1. `authorize_url` builds the provider redirect with a fresh challenge
//! 2. the provider redirects back to the local callback with `?code=`
//! 3. `exchange_code` trades the code and verifier for a session
//!
//! Sessions are persisted through `SessionStore` and refreshed with the
//! refresh-token grant. Every change is broadcast as an `AuthEvent`.

use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{AuthEventBroadcaster, IdentityProvider, PkcePair, SessionStore};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{AuthEvent, AuthUser, OAuthProvider, Session};

/// HTTP connect timeout for auth calls.
const HTTP_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| {
                self.expires_in
                    .map(|secs| now + chrono::Duration::seconds(secs))
            });

        Session {
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            expires_at,
            user: self.user,
        }
    }
}

/// Auth service error body. Older deployments use `error`/`error_description`,
/// newer ones `msg`.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
}

fn classify_auth_error(status: u16, body: &str) -> AppError {
    let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.error)
        .unwrap_or_else(|| format!("HTTP {}", status));

    if (400..500).contains(&status) {
        AppError::Auth(message)
    } else {
        AppError::Remote { status, message }
    }
}

pub struct GoTrueClient {
    http: reqwest::Client,
    auth_url: String,
    anon_key: SecretString,
    redirect_url: String,
    store: SessionStore,
    current: RwLock<Option<Session>>,
    pending: Mutex<Option<PkcePair>>,
    events: AuthEventBroadcaster,
}

impl GoTrueClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(config.backend.http_timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_parts(
            http,
            config.backend.auth_url(),
            config.backend.anon_key.clone(),
            config.auth.redirect_url(),
            SessionStore::new(config.auth.session_file.clone()),
        ))
    }

    pub fn with_parts(
        http: reqwest::Client,
        auth_url: String,
        anon_key: SecretString,
        redirect_url: String,
        store: SessionStore,
    ) -> Self {
        Self {
            http,
            auth_url: auth_url.trim_end_matches('/').to_string(),
            anon_key,
            redirect_url,
            store,
            current: RwLock::new(None),
            pending: Mutex::new(None),
            events: AuthEventBroadcaster::new(),
        }
    }

    fn cached(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn cache(&self, session: Option<Session>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> AppResult<Session> {
        let url = format!("{}/token?grant_type={}", self.auth_url, grant_type);
        debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header("apikey", self.anon_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_auth_error(status.as_u16(), &body));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to parse token response: {}", e)))?;
        Ok(token.into_session(Utc::now()))
    }

    /// Run the refresh-token grant and adopt the new session.
    async fn refresh_with(&self, session: &Session) -> AppResult<Session> {
        let fresh = self
            .token_grant(
                "refresh_token",
                serde_json::json!({ "refresh_token": session.refresh_token.expose_secret() }),
            )
            .await?;

        self.store.save(&fresh).await?;
        self.cache(Some(fresh.clone()));
        self.events.send(AuthEvent::TokenRefreshed(fresh.clone()));
        info!(user_id = %fresh.user.id, "Session refreshed");
        Ok(fresh)
    }

    /// Drop a session that can no longer be refreshed.
    async fn expire(&self, reason: &AppError) -> AppResult<()> {
        warn!("Session expired: {}", reason);
        self.cache(None);
        self.store.clear().await?;
        self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn revoke(&self, session: &Session) -> AppResult<()> {
        let resp = self
            .http
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", self.anon_key.expose_secret())
            .header(
                "Authorization",
                format!("Bearer {}", session.access_token.expose_secret()),
            )
            .send()
            .await?;

        let status = resp.status();
        // An already invalid token has nothing left to revoke
        if status.is_success() || status.as_u16() == 401 {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_auth_error(status.as_u16(), &body))
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn current_session(&self) -> AppResult<Option<Session>> {
        let session = match self.cached() {
            Some(session) => session,
            None => match self.store.load().await? {
                Some(session) => session,
                None => return Ok(None),
            },
        };

        if !session.is_expired(Utc::now()) {
            self.cache(Some(session.clone()));
            return Ok(Some(session));
        }

        debug!(user_id = %session.user.id, "Stored session expired, refreshing");
        match self.refresh_with(&session).await {
            Ok(fresh) => Ok(Some(fresh)),
            Err(e @ AppError::Auth(_)) => {
                self.expire(&e).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn access_token(&self) -> Option<SecretString> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    fn authorize_url(&self, provider: OAuthProvider) -> AppResult<String> {
        let pair = PkcePair::generate();
        let url = format!(
            "{}/authorize?provider={}&redirect_to={}&code_challenge={}&code_challenge_method=s256",
            self.auth_url,
            provider.as_str(),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&pair.challenge),
        );

        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(pair);
        info!(provider = %provider, "Sign-in started");
        Ok(url)
    }

    async fn exchange_code(&self, code: &str) -> AppResult<Session> {
        let pair = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| AppError::InvalidInput("No sign-in in progress".to_string()))?;

        let session = self
            .token_grant(
                "pkce",
                serde_json::json!({
                    "auth_code": code,
                    "code_verifier": pair.verifier.expose_secret(),
                }),
            )
            .await?;

        self.store.save(&session).await?;
        self.cache(Some(session.clone()));
        self.events.send(AuthEvent::SignedIn(session.clone()));
        info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn refresh_session(&self, margin: std::time::Duration) -> AppResult<Option<Session>> {
        let Some(session) = self.cached() else {
            return Ok(None);
        };

        let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
        if !session.expires_within(Utc::now(), margin) {
            return Ok(Some(session));
        }

        match self.refresh_with(&session).await {
            Ok(fresh) => Ok(Some(fresh)),
            Err(e @ AppError::Auth(_)) => {
                self.expire(&e).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self) -> AppResult<()> {
        let session = self.cached();
        self.cache(None);

        let upstream = match session {
            Some(ref session) => self.revoke(session).await,
            None => Ok(()),
        };

        self.store.clear().await?;
        self.events.send(AuthEvent::SignedOut);
        info!("Signed out");
        upstream
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
