//! Store operations for `profiles`.

use serde::Deserialize;
use tracing::warn;

use super::postgrest::{PostgrestClient, Query};
use super::{Embed, embedded};
use crate::error::AppResult;
use crate::models::{NewProfile, PlayerListing, PlayerOption, Profile, ProfileUpdate, TeamOption};

const RELATION: &str = "profiles";

/// Fetch one profile by identity id. Absence is `NotFound`.
pub async fn find_by_id(client: &PostgrestClient, id: &str) -> AppResult<Profile> {
    client
        .select_single(&Query::from(RELATION).eq("id", id))
        .await
}

/// Insert a minimal profile. A concurrent insert surfaces as `Conflict`.
pub async fn insert(client: &PostgrestClient, profile: &NewProfile) -> AppResult<()> {
    client.insert(RELATION, profile).await
}

pub async fn update(client: &PostgrestClient, id: &str, update: &ProfileUpdate) -> AppResult<()> {
    client
        .update(&Query::from(RELATION).eq("id", id), update)
        .await
}

/// All players as picker options, ordered by handle.
pub async fn list_options(client: &PostgrestClient) -> AppResult<Vec<PlayerOption>> {
    client
        .select(
            &Query::from(RELATION)
                .select("id, discord_username, pro_clubs_name")
                .order("discord_username"),
        )
        .await
}

#[derive(Debug, Deserialize)]
struct PlayerRow {
    #[serde(flatten)]
    profile: Profile,
    #[serde(default)]
    team_memberships: Option<Embed<MembershipTeam>>,
}

#[derive(Debug, Deserialize)]
struct MembershipTeam {
    #[serde(default)]
    teams: Option<TeamOption>,
}

/// Every profile with its team, ordered by in-game name.
pub async fn list_with_teams(client: &PostgrestClient) -> AppResult<Vec<PlayerListing>> {
    let rows: Vec<PlayerRow> = client
        .select(
            &Query::from(RELATION)
                .select("*, team_memberships(teams(id, name))")
                .order("pro_clubs_name"),
        )
        .await?;

    Ok(rows
        .into_iter()
        .filter(|row| {
            if row.profile.id.is_empty() {
                warn!("Skipping profile row without an id");
                return false;
            }
            true
        })
        .map(|row| PlayerListing {
            team: embedded(row.team_memberships)
                .into_iter()
                .find_map(|m| m.teams),
            profile: row.profile,
        })
        .collect())
}
