//! The portal's pages as view models over the store and the session.
//!
//! Public directories need no session. The admin and manager panels are
//! role gated: they report `Access::Loading` until the session settles, and
//! refuse actions before any remote call when access is not granted.

pub mod admin;
pub mod manager;
pub mod nav;
pub mod player;
pub mod players;
pub mod teams;

pub use admin::{AdminData, AdminPanel};
pub use manager::{ManagerData, ManagerPanel};
pub use nav::{NavLink, nav_links};
pub use player::PlayerProfileView;
pub use players::PlayersDirectory;
pub use teams::TeamsDirectory;

use crate::error::{AppError, AppResult};
use crate::models::Role;
use crate::services::Notifier;
use crate::session::{Access, SessionReader, access_for};

/// Refuse an action unless the session holds `role`.
pub(crate) fn ensure_granted(
    session: &dyn SessionReader,
    notifier: &dyn Notifier,
    role: Role,
    failure: &str,
) -> AppResult<()> {
    match access_for(session, role) {
        Access::Granted => Ok(()),
        access => {
            tracing::warn!(role = %role, ?access, "Action refused");
            notifier.error(failure);
            Err(AppError::Unauthorized(format!("{} role required", role)))
        }
    }
}

/// Presence check for action inputs: every named field must be non-blank.
pub(crate) fn require_present(fields: &[(&str, &str)]) -> AppResult<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Missing {}",
            missing.join(" and ")
        )))
    }
}
