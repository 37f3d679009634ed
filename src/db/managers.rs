//! Store operations for `manager_assignments`.

use serde::Deserialize;
use tracing::warn;

use super::postgrest::{PostgrestClient, Query};
use super::{Embed, IdRow, embedded};
use crate::error::AppResult;
use crate::models::{
    ManagedTeam, ManagerListing, ManagerProfile, NewManagerAssignment, SquadPlayer,
};

const RELATION: &str = "manager_assignments";

/// An identity is a manager iff it holds at least one assignment.
pub async fn exists_for_user(client: &PostgrestClient, user_id: &str) -> AppResult<bool> {
    let rows: Vec<IdRow> = client
        .select(
            &Query::from(RELATION)
                .select("id")
                .eq("user_id", user_id)
                .limit(1),
        )
        .await?;
    Ok(!rows.is_empty())
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    id: String,
    user_id: String,
    team_id: String,
    #[serde(default)]
    profiles: Option<ManagerProfile>,
    #[serde(default)]
    teams: Option<TeamName>,
}

#[derive(Debug, Deserialize)]
struct TeamName {
    name: String,
}

/// Every assignment with the manager's names and the team name.
pub async fn list(client: &PostgrestClient) -> AppResult<Vec<ManagerListing>> {
    let rows: Vec<ListingRow> = client
        .select(&Query::from(RELATION).select(
            "id, user_id, team_id,
             profiles(discord_username, pro_clubs_name),
             teams(name)",
        ))
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let (Some(profile), Some(team)) = (row.profiles, row.teams) else {
                warn!(assignment_id = %row.id, "Skipping manager assignment with a dangling reference");
                return None;
            };
            Some(ManagerListing {
                id: row.id,
                user_id: row.user_id,
                team_id: row.team_id,
                discord_username: profile.discord_username,
                pro_clubs_name: profile.pro_clubs_name,
                team_name: team.name,
            })
        })
        .collect())
}

pub async fn insert(client: &PostgrestClient, assignment: &NewManagerAssignment) -> AppResult<()> {
    client.insert(RELATION, assignment).await
}

/// Delete by assignment id. Deleting an absent row is not an error.
pub async fn delete(client: &PostgrestClient, assignment_id: &str) -> AppResult<()> {
    client
        .delete(&Query::from(RELATION).eq("id", assignment_id))
        .await
}

#[derive(Debug, Deserialize)]
struct ManagerRow {
    #[serde(default)]
    profiles: Option<ManagerProfile>,
}

/// The team's manager. Only the first assignment is read back.
pub async fn for_team(client: &PostgrestClient, team_id: &str) -> AppResult<Option<ManagerProfile>> {
    let rows: Vec<ManagerRow> = client
        .select(
            &Query::from(RELATION)
                .select("profiles(discord_username, pro_clubs_name)")
                .eq("team_id", team_id)
                .limit(1),
        )
        .await?;
    Ok(rows.into_iter().next().and_then(|row| row.profiles))
}

#[derive(Debug, Deserialize)]
struct ManagedRow {
    #[serde(default)]
    teams: Option<ManagedTeamRow>,
}

#[derive(Debug, Deserialize)]
struct ManagedTeamRow {
    id: String,
    name: String,
    #[serde(default)]
    team_memberships: Option<Embed<SquadRow>>,
}

#[derive(Debug, Deserialize)]
struct SquadRow {
    #[serde(default)]
    profiles: Option<SquadPlayer>,
}

/// Teams the identity manages, each with its squad and stats.
pub async fn managed_teams(client: &PostgrestClient, user_id: &str) -> AppResult<Vec<ManagedTeam>> {
    let rows: Vec<ManagedRow> = client
        .select(
            &Query::from(RELATION)
                .select(
                    "teams(id, name,
                       team_memberships(
                         profiles(id, discord_username, pro_clubs_name, position,
                                  goals, assists, average_rating)))",
                )
                .eq("user_id", user_id),
        )
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| row.teams)
        .map(|team| ManagedTeam {
            id: team.id,
            name: team.name,
            players: embedded(team.team_memberships)
                .into_iter()
                .filter_map(|m| m.profiles)
                .collect(),
        })
        .collect())
}
