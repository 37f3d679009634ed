//! Navigation menu derived from the session.

use crate::models::Role;
use crate::session::{SessionPhase, SessionReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub label: &'static str,
    pub href: String,
}

impl NavLink {
    fn new(label: &'static str, href: impl Into<String>) -> Self {
        Self {
            label,
            href: href.into(),
        }
    }
}

/// Menu entries for the current session. Panel entries appear only once
/// the matching role has resolved true.
pub fn nav_links(session: &dyn SessionReader) -> Vec<NavLink> {
    let state = session.state();
    let mut links = vec![
        NavLink::new("Home", "/"),
        NavLink::new("Teams", "/teams"),
        NavLink::new("Players", "/players"),
    ];

    match state.phase() {
        SessionPhase::Unknown => {}
        SessionPhase::SignedOut => links.push(NavLink::new("Sign in", "/login")),
        SessionPhase::PendingRoles | SessionPhase::ResolvedRoles => {
            if let Some(identity) = state.identity() {
                links.push(NavLink::new("My Profile", format!("/player/{}", identity.id)));
            }
            if state.has_role(Role::Admin) {
                links.push(NavLink::new("Admin Panel", "/admin"));
            }
            if state.has_role(Role::Manager) {
                links.push(NavLink::new("Manager Panel", "/manager"));
            }
            links.push(NavLink::new("Sign out", "/logout"));
        }
    }

    links
}
