//! Process-wide session state: who is signed in and what they may do.
//!
//! `SessionResolver` owns the state; views depend on the read-only
//! `SessionReader` view of it.

mod resolver;

pub use resolver::SessionResolver;

use crate::models::{Identity, Profile, Role, RoleFlags};

/// Session state. `SignedIn` with `roles: None` means role lookups are
/// still in flight.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Unknown,
    SignedOut,
    SignedIn {
        identity: Identity,
        profile: Option<Profile>,
        roles: Option<RoleFlags>,
    },
}

/// The four observable phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unknown,
    SignedOut,
    PendingRoles,
    ResolvedRoles,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Unknown => SessionPhase::Unknown,
            SessionState::SignedOut => SessionPhase::SignedOut,
            SessionState::SignedIn { roles: None, .. } => SessionPhase::PendingRoles,
            SessionState::SignedIn { roles: Some(_), .. } => SessionPhase::ResolvedRoles,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::SignedIn { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            SessionState::SignedIn { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }

    /// Deny by default: false unless roles are resolved and the flag is set.
    pub fn has_role(&self, role: Role) -> bool {
        match self {
            SessionState::SignedIn {
                roles: Some(flags), ..
            } => flags.has(role),
            _ => false,
        }
    }

    /// True once the state will not change without an external event.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.phase(),
            SessionPhase::SignedOut | SessionPhase::ResolvedRoles
        )
    }
}

/// Read-only access to the session, injected into views.
pub trait SessionReader: Send + Sync {
    fn state(&self) -> SessionState;

    fn phase(&self) -> SessionPhase {
        self.state().phase()
    }

    fn current_identity(&self) -> Option<Identity> {
        self.state().identity().cloned()
    }

    fn current_profile(&self) -> Option<Profile> {
        self.state().profile().cloned()
    }

    fn has_role(&self, role: Role) -> bool {
        self.state().has_role(role)
    }
}

/// What a role-gated view may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Session or roles not resolved yet: render a placeholder
    Loading,
    Denied,
    Granted,
}

/// Gate a view on a role.
pub fn access_for(session: &dyn SessionReader, role: Role) -> Access {
    let state = session.state();
    match state.phase() {
        SessionPhase::Unknown | SessionPhase::PendingRoles => Access::Loading,
        SessionPhase::SignedOut => Access::Denied,
        SessionPhase::ResolvedRoles if state.has_role(role) => Access::Granted,
        SessionPhase::ResolvedRoles => Access::Denied,
    }
}
