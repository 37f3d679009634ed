//! Session and role resolution.
//!
//! State machine: `Unknown` -> `SignedOut` | `SignedIn(pending roles)` ->
//! `SignedIn(resolved roles)`. Any sign-out or expiry returns to
//! `SignedOut`; any sign-in re-enters the pending path. Each transition into
//! `SignedIn` starts a new epoch so results from an older sign-in never land
//! on a newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures_util::future::join;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{SessionReader, SessionState};
use crate::auth::IdentityProvider;
use crate::db::LeagueStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthEvent, Identity, NewProfile, OAuthProvider, Profile, ProfileUpdate, RoleFlags, Session,
};
use crate::services::Notifier;

pub struct SessionResolver {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn LeagueStore>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionResolver {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn LeagueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Unknown);
        Arc::new(Self {
            provider,
            store,
            notifier,
            state,
            epoch: AtomicU64::new(0),
            listener: Mutex::new(None),
        })
    }

    /// Subscribe to provider events, then run the initial session lookup.
    ///
    /// Returns an error only when a found session could not get a profile;
    /// the state is `SignedOut` in that case.
    pub async fn start(self: &Arc<Self>) -> AppResult<()> {
        let events = self.provider.subscribe();
        let handle = tokio::spawn(listen(Arc::downgrade(self), events));
        if let Some(old) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            old.abort();
        }

        match self.provider.current_session().await {
            Ok(Some(session)) => self.enter_signed_in(session).await,
            Ok(None) => {
                debug!("No stored session");
                self.enter_signed_out();
                Ok(())
            }
            Err(e) => {
                warn!("Session lookup failed: {}", e);
                self.notifier.error("Could not restore your session");
                self.enter_signed_out();
                Ok(())
            }
        }
    }

    /// Stop listening for provider events.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until the state is `SignedOut` or has resolved roles.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(SessionState::is_settled).await {
            Ok(state) => state.clone(),
            // The sender lives as long as `self`
            Err(_) => self.state.borrow().clone(),
        }
    }

    /// Start a redirect-based sign-in. Completion arrives as a provider
    /// sign-in event, or through `complete_sign_in`.
    pub fn begin_sign_in(&self, provider: OAuthProvider) -> AppResult<String> {
        self.provider.authorize_url(provider).inspect_err(|e| {
            error!("Could not start sign-in: {}", e);
            self.notifier.error("Could not start sign-in");
        })
    }

    /// Exchange the redirect code and resolve the new session.
    pub async fn complete_sign_in(&self, code: &str) -> AppResult<()> {
        let session = match self.provider.exchange_code(code).await {
            Ok(session) => session,
            Err(e) => {
                error!("Sign-in failed: {}", e);
                self.notifier.error("Sign-in failed");
                return Err(e);
            }
        };
        self.enter_signed_in(session).await
    }

    /// Clear the session locally, then upstream.
    pub async fn sign_out(&self) -> AppResult<()> {
        self.enter_signed_out();
        self.provider.sign_out().await.inspect_err(|e| {
            warn!("Upstream sign-out failed: {}", e);
            self.notifier.error("Signed out locally, but the server could not be reached");
        })
    }

    /// Update the signed-in profile, then reload it from the store.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> AppResult<Profile> {
        let Some(identity) = self.current_identity() else {
            self.notifier.error("Sign in to edit your profile");
            return Err(AppError::Unauthorized("Not signed in".to_string()));
        };
        let epoch = self.epoch.load(Ordering::SeqCst);

        let result = async {
            self.store.update_profile(&identity.id, update).await?;
            self.store.fetch_profile(&identity.id).await
        }
        .await;

        match result {
            Ok(profile) => {
                self.apply(epoch, |state| {
                    if let SessionState::SignedIn { profile: slot, .. } = state {
                        *slot = Some(profile.clone());
                    }
                });
                info!(user_id = %identity.id, "Profile updated");
                self.notifier.success("Profile updated successfully");
                Ok(profile)
            }
            Err(e) => {
                error!(user_id = %identity.id, error = %e, "Profile update failed");
                self.notifier.error("Failed to update profile");
                Err(e)
            }
        }
    }

    async fn handle_event(&self, event: AuthEvent) -> AppResult<()> {
        match event {
            AuthEvent::SignedIn(session) => {
                if self.is_current(&session) {
                    debug!("Sign-in event for the current session, ignoring");
                    return Ok(());
                }
                self.enter_signed_in(session).await
            }
            AuthEvent::TokenRefreshed(session) => {
                self.adopt_token(&session);
                Ok(())
            }
            AuthEvent::SignedOut => {
                self.enter_signed_out();
                Ok(())
            }
        }
    }

    fn is_current(&self, session: &Session) -> bool {
        use secrecy::ExposeSecret;

        self.state.borrow().identity().is_some_and(|identity| {
            identity.id == session.user.id
                && identity.bearer_token() == Some(session.access_token.expose_secret())
        })
    }

    async fn enter_signed_in(&self, session: Session) -> AppResult<()> {
        let identity = session.identity();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!(user_id = %identity.id, "Signed in, resolving profile and roles");

        self.state.send_replace(SessionState::SignedIn {
            identity: identity.clone(),
            profile: None,
            roles: None,
        });

        let (profile, roles) = join(
            self.ensure_profile(&identity),
            self.resolve_roles(&identity.id),
        )
        .await;

        match profile {
            Ok(profile) => {
                let applied = self.apply(epoch, |state| {
                    if let SessionState::SignedIn {
                        profile: profile_slot,
                        roles: roles_slot,
                        ..
                    } = state
                    {
                        *profile_slot = Some(profile);
                        *roles_slot = Some(roles);
                    }
                });
                if applied {
                    info!(
                        user_id = %identity.id,
                        is_admin = roles.is_admin,
                        is_manager = roles.is_manager,
                        "Session resolved"
                    );
                } else {
                    debug!(user_id = %identity.id, "Session changed during resolution, result dropped");
                }
                Ok(())
            }
            Err(e) => {
                error!(user_id = %identity.id, error = %e, "Profile setup failed");
                if self.epoch.load(Ordering::SeqCst) == epoch {
                    self.notifier
                        .error(&format!("Could not set up your profile: {}", e));
                    self.enter_signed_out();
                }
                Err(e)
            }
        }
    }

    fn enter_signed_out(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let previous = self.state.send_replace(SessionState::SignedOut);
        if let Some(identity) = previous.identity() {
            info!(user_id = %identity.id, "Signed out");
        }
    }

    fn adopt_token(&self, session: &Session) {
        let adopted = self.state.send_if_modified(|state| match state {
            SessionState::SignedIn { identity, .. } if identity.id == session.user.id => {
                identity.set_access_token(session.access_token.clone());
                true
            }
            _ => false,
        });
        if adopted {
            debug!(user_id = %session.user.id, "Access token refreshed");
        }
    }

    /// Apply `f` to the state unless a newer transition happened since
    /// `epoch` was taken.
    fn apply(&self, epoch: u64, f: impl FnOnce(&mut SessionState)) -> bool {
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            f(state);
            true
        })
    }

    /// Fetch the identity's profile, creating it on first sign-in.
    ///
    /// A concurrent creator winning the insert is not an error: the row
    /// exists either way, so it is fetched again.
    async fn ensure_profile(&self, identity: &Identity) -> AppResult<Profile> {
        match self.store.fetch_profile(&identity.id).await {
            Ok(profile) => return Ok(profile),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let new_profile = NewProfile {
            id: identity.id.clone(),
            discord_username: identity.handle_hint.clone(),
        };
        match self.store.insert_profile(&new_profile).await {
            Ok(()) => info!(user_id = %identity.id, "Created profile"),
            Err(e) if e.is_conflict() => {
                debug!(user_id = %identity.id, "Profile created concurrently, reloading")
            }
            Err(e) => return Err(e),
        }

        self.store.fetch_profile(&identity.id).await
    }

    /// Look up both role sets. A failed lookup counts as "no role".
    async fn resolve_roles(&self, user_id: &str) -> RoleFlags {
        let (admin, manager) = join(self.store.is_admin(user_id), self.store.is_manager(user_id)).await;

        RoleFlags {
            is_admin: admin.unwrap_or_else(|e| {
                warn!(user_id, error = %e, "Admin role lookup failed");
                false
            }),
            is_manager: manager.unwrap_or_else(|e| {
                warn!(user_id, error = %e, "Manager role lookup failed");
                false
            }),
        }
    }
}

impl SessionReader for SessionResolver {
    fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }
}

impl Drop for SessionResolver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn listen(resolver: Weak<SessionResolver>, mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("Missed {} auth events", missed);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let Some(resolver) = resolver.upgrade() else {
            break;
        };
        if let Err(e) = resolver.handle_event(event).await {
            debug!("Auth event handling ended with: {}", e);
        }
    }
}
