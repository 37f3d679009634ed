//! Identity and session models for the external identity provider.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Supported external sign-in providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OAuthProvider {
    #[default]
    Discord,
    GitHub,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::GitHub => "github",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "discord" => Some(Self::Discord),
            "github" => Some(Self::GitHub),
            _ => None,
        }
    }
}

impl std::fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User object returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: HashMap<String, serde_json::Value>,
}

impl AuthUser {
    /// Handle suggested by the provider (the Discord username).
    pub fn user_name(&self) -> Option<&str> {
        self.user_metadata
            .get("user_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Signed-in session: bearer tokens plus the provider's user object.
#[derive(Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

impl Session {
    /// Identity carried by this session.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.user.id.clone(),
            handle_hint: self.user.user_name().map(str::to_string),
            access_token: Some(self.access_token.clone()),
        }
    }

    /// True when the access token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - margin <= now,
            None => false,
        }
    }

    /// True when the access token is already expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_within(now, chrono::Duration::zero())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user.id)
            .finish()
    }
}

/// Authenticated user reference: provider user id plus optional bearer token.
#[derive(Clone)]
pub struct Identity {
    pub id: String,
    /// Display handle suggested by the provider, used to seed a new profile
    pub handle_hint: Option<String>,
    access_token: Option<SecretString>,
}

impl Identity {
    /// Identity without a bearer token.
    pub fn anonymous(id: &str) -> Self {
        Self {
            id: id.to_string(),
            handle_hint: None,
            access_token: None,
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token.as_ref().map(|t| t.expose_secret())
    }

    pub(crate) fn set_access_token(&mut self, token: SecretString) {
        self.access_token = Some(token);
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("handle_hint", &self.handle_hint)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Asynchronous events emitted by the identity provider.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}
