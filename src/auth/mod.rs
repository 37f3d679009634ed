//! Identity provider integration: redirect-based sign-in with PKCE, session
//! persistence, token refresh and auth event fan-out.

mod events;
mod gotrue;
mod pkce;
mod refresh;
mod session_store;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::broadcast;

use crate::error::AppResult;
use crate::models::{AuthEvent, OAuthProvider, Session};

pub use events::AuthEventBroadcaster;
pub use gotrue::GoTrueClient;
pub use pkce::PkcePair;
pub use refresh::start_refresh_task;
pub use session_store::SessionStore;

/// External identity provider.
///
/// Implementations emit `AuthEvent`s for every session change they make,
/// including the ones triggered by calls on this trait.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up the current session. An expired session is refreshed; a
    /// session that can no longer be refreshed is cleared and reported as
    /// `None`.
    async fn current_session(&self) -> AppResult<Option<Session>>;

    /// Bearer token of the cached session, without any I/O.
    fn access_token(&self) -> Option<SecretString>;

    /// Start a redirect-based sign-in and return the URL to open. Completion
    /// arrives later through `exchange_code`.
    fn authorize_url(&self, provider: OAuthProvider) -> AppResult<String>;

    /// Complete a sign-in with the code delivered to the redirect URL.
    async fn exchange_code(&self, code: &str) -> AppResult<Session>;

    /// Refresh the cached session when it expires within `margin`.
    async fn refresh_session(&self, margin: std::time::Duration) -> AppResult<Option<Session>>;

    /// Invalidate the session locally and upstream.
    async fn sign_out(&self) -> AppResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
