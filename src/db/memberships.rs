//! Store operations for `team_memberships`.

use serde::Deserialize;

use super::postgrest::{PostgrestClient, Query};
use crate::error::AppResult;
use crate::models::{NewMembership, RosterPlayer};

const RELATION: &str = "team_memberships";

/// Sign a player to a team.
pub async fn insert(client: &PostgrestClient, membership: &NewMembership) -> AppResult<()> {
    client.insert(RELATION, membership).await
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(default)]
    profiles: Option<RosterPlayer>,
}

/// Players signed to a team. Memberships whose profile is gone are skipped.
pub async fn roster(client: &PostgrestClient, team_id: &str) -> AppResult<Vec<RosterPlayer>> {
    let rows: Vec<RosterRow> = client
        .select(
            &Query::from(RELATION)
                .select("profiles(id, discord_username, pro_clubs_name, position)")
                .eq("team_id", team_id),
        )
        .await?;

    Ok(rows.into_iter().filter_map(|row| row.profiles).collect())
}
