//! Domain models for the league portal.
//!
//! Row types mirror the remote relations (`profiles`, `teams`,
//! `team_memberships`, `manager_assignments`, `free_agent_approvals`,
//! `admin_roles`); listing types mirror the joined shapes the views display.

use serde::{Deserialize, Deserializer};

pub mod approval;
pub mod manager;
pub mod player;
pub mod profile;
pub mod role;
pub mod session;
pub mod team;

// Re-export commonly used types
pub use approval::{ApprovalStatus, FreeAgent, FreeAgentApproval, FreeAgentDecision};
pub use manager::{ManagerAssignment, ManagerListing, ManagerProfile, NewManagerAssignment};
pub use player::{PlayerFilter, PlayerListing, PlayerOption, TeamFilter, POSITIONS};
pub use profile::{NewProfile, Profile, ProfileUpdate, StatLine};
pub use role::{Role, RoleFlags};
pub use session::{AuthEvent, AuthUser, Identity, OAuthProvider, Session};
pub use team::{
    ManagedTeam, NewMembership, RosterPlayer, SquadPlayer, Team, TeamDetail, TeamMembership,
    TeamOption,
};

/// Deserialize a nullable column into its type's default.
///
/// Rows created by a minimal insert carry NULL in columns that the views
/// treat as plain strings or numbers.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
