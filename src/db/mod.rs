//! Remote store access: the `LeagueStore` seam, its PostgREST implementation,
//! and an in-process implementation for tests.

pub mod admin_roles;
pub mod approvals;
pub mod managers;
pub mod memberships;
pub mod memory;
pub mod postgrest;
pub mod profiles;
pub mod teams;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::auth::IdentityProvider;
use crate::config::BackendSettings;
use crate::error::AppResult;
use crate::models::{
    ApprovalStatus, FreeAgent, FreeAgentDecision, ManagedTeam, ManagerListing, ManagerProfile,
    NewManagerAssignment, NewMembership, NewProfile, PlayerListing, PlayerOption, Profile,
    ProfileUpdate, RosterPlayer, Team,
};

pub use memory::{MemoryStore, StoreOp};
pub use postgrest::{PostgrestClient, Query};

/// Every read and write the portal issues against the remote store.
///
/// Absence is `AppError::NotFound` only where a single row is requested;
/// list reads return empty vectors.
#[async_trait]
pub trait LeagueStore: Send + Sync {
    async fn fetch_profile(&self, id: &str) -> AppResult<Profile>;
    async fn insert_profile(&self, profile: &NewProfile) -> AppResult<()>;
    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> AppResult<()>;
    async fn list_player_options(&self) -> AppResult<Vec<PlayerOption>>;
    async fn list_players(&self) -> AppResult<Vec<PlayerListing>>;

    async fn is_admin(&self, user_id: &str) -> AppResult<bool>;
    async fn is_manager(&self, user_id: &str) -> AppResult<bool>;

    async fn list_teams(&self) -> AppResult<Vec<Team>>;
    /// First manager assignment for a team, if any.
    async fn team_manager(&self, team_id: &str) -> AppResult<Option<ManagerProfile>>;
    async fn team_roster(&self, team_id: &str) -> AppResult<Vec<RosterPlayer>>;
    async fn managed_teams(&self, user_id: &str) -> AppResult<Vec<ManagedTeam>>;
    async fn add_to_team(&self, membership: &NewMembership) -> AppResult<()>;

    async fn list_managers(&self) -> AppResult<Vec<ManagerListing>>;
    async fn assign_manager(&self, assignment: &NewManagerAssignment) -> AppResult<()>;
    async fn remove_manager(&self, assignment_id: &str) -> AppResult<()>;

    async fn free_agents(&self, status: ApprovalStatus) -> AppResult<Vec<FreeAgent>>;
    /// Approved free agents with no team membership.
    async fn unsigned_free_agents(&self) -> AppResult<Vec<FreeAgent>>;
    async fn decide_free_agent(&self, decision: &FreeAgentDecision) -> AppResult<()>;
}

/// `LeagueStore` backed by the project's PostgREST endpoint.
#[derive(Clone)]
pub struct RestStore {
    client: PostgrestClient,
}

impl RestStore {
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }

    /// Build a store that authenticates as the provider's current session.
    pub fn connect(
        settings: &BackendSettings,
        auth: Arc<dyn IdentityProvider>,
    ) -> AppResult<Self> {
        Ok(Self::new(PostgrestClient::new(settings)?.with_auth(auth)))
    }

    pub fn client(&self) -> &PostgrestClient {
        &self.client
    }
}

#[async_trait]
impl LeagueStore for RestStore {
    async fn fetch_profile(&self, id: &str) -> AppResult<Profile> {
        profiles::find_by_id(&self.client, id).await
    }

    async fn insert_profile(&self, profile: &NewProfile) -> AppResult<()> {
        profiles::insert(&self.client, profile).await
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> AppResult<()> {
        profiles::update(&self.client, id, update).await
    }

    async fn list_player_options(&self) -> AppResult<Vec<PlayerOption>> {
        profiles::list_options(&self.client).await
    }

    async fn list_players(&self) -> AppResult<Vec<PlayerListing>> {
        profiles::list_with_teams(&self.client).await
    }

    async fn is_admin(&self, user_id: &str) -> AppResult<bool> {
        admin_roles::exists_for_user(&self.client, user_id).await
    }

    async fn is_manager(&self, user_id: &str) -> AppResult<bool> {
        managers::exists_for_user(&self.client, user_id).await
    }

    async fn list_teams(&self) -> AppResult<Vec<Team>> {
        teams::list(&self.client).await
    }

    async fn team_manager(&self, team_id: &str) -> AppResult<Option<ManagerProfile>> {
        managers::for_team(&self.client, team_id).await
    }

    async fn team_roster(&self, team_id: &str) -> AppResult<Vec<RosterPlayer>> {
        memberships::roster(&self.client, team_id).await
    }

    async fn managed_teams(&self, user_id: &str) -> AppResult<Vec<ManagedTeam>> {
        managers::managed_teams(&self.client, user_id).await
    }

    async fn add_to_team(&self, membership: &NewMembership) -> AppResult<()> {
        memberships::insert(&self.client, membership).await
    }

    async fn list_managers(&self) -> AppResult<Vec<ManagerListing>> {
        managers::list(&self.client).await
    }

    async fn assign_manager(&self, assignment: &NewManagerAssignment) -> AppResult<()> {
        managers::insert(&self.client, assignment).await
    }

    async fn remove_manager(&self, assignment_id: &str) -> AppResult<()> {
        managers::delete(&self.client, assignment_id).await
    }

    async fn free_agents(&self, status: ApprovalStatus) -> AppResult<Vec<FreeAgent>> {
        approvals::list_by_status(&self.client, status).await
    }

    async fn unsigned_free_agents(&self) -> AppResult<Vec<FreeAgent>> {
        approvals::unsigned_approved(&self.client).await
    }

    async fn decide_free_agent(&self, decision: &FreeAgentDecision) -> AppResult<()> {
        approvals::decide(&self.client, decision).await
    }
}

/// Row carrying only an id.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdRow {
    #[allow(dead_code)]
    pub id: String,
}

/// A one-to-many embed. PostgREST returns an object instead of an array
/// when the foreign key is also unique.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Embed<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Embed<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Embed::Many(items) => items,
            Embed::One(item) => vec![item],
        }
    }
}

/// Flatten an optional embed into a vector.
pub(crate) fn embedded<T>(embed: Option<Embed<T>>) -> Vec<T> {
    embed.map(Embed::into_vec).unwrap_or_default()
}
