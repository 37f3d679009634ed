//! Store operations for `free_agent_approvals`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::postgrest::{PostgrestClient, Query};
use super::{Embed, IdRow, embedded};
use crate::error::AppResult;
use crate::models::{ApprovalStatus, FreeAgent, FreeAgentDecision, null_as_default};

const RELATION: &str = "free_agent_approvals";

#[derive(Debug, Deserialize)]
struct ApprovalRow {
    status: ApprovalStatus,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    profiles: Option<ApplicantRow>,
}

#[derive(Debug, Deserialize)]
struct ApplicantRow {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    discord_username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pro_clubs_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    position: String,
    #[serde(default)]
    team_memberships: Option<Embed<IdRow>>,
}

impl ApprovalRow {
    fn into_free_agent(self) -> Option<(FreeAgent, bool)> {
        let applicant = self.profiles?;
        let signed = !embedded(applicant.team_memberships).is_empty();
        Some((
            FreeAgent {
                id: applicant.id,
                discord_username: applicant.discord_username,
                pro_clubs_name: applicant.pro_clubs_name,
                position: applicant.position,
                status: self.status,
                created_at: self.created_at,
            },
            signed,
        ))
    }
}

/// Applications in the given status, joined with the applicant's profile.
pub async fn list_by_status(
    client: &PostgrestClient,
    status: ApprovalStatus,
) -> AppResult<Vec<FreeAgent>> {
    let rows: Vec<ApprovalRow> = client
        .select(
            &Query::from(RELATION)
                .select(
                    "status, created_at,
                     profiles(id, discord_username, pro_clubs_name, position)",
                )
                .eq("status", status.as_str())
                .order("created_at"),
        )
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(ApprovalRow::into_free_agent)
        .map(|(agent, _)| agent)
        .collect())
}

/// Approved applicants that are not on any team.
pub async fn unsigned_approved(client: &PostgrestClient) -> AppResult<Vec<FreeAgent>> {
    let rows: Vec<ApprovalRow> = client
        .select(
            &Query::from(RELATION)
                .select(
                    "status, created_at,
                     profiles(id, discord_username, pro_clubs_name, position,
                              team_memberships(id))",
                )
                .eq("status", ApprovalStatus::Approved.as_str())
                .order("created_at"),
        )
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(ApprovalRow::into_free_agent)
        .filter(|(_, signed)| !signed)
        .map(|(agent, _)| agent)
        .collect())
}

/// Record an admin decision on a player's application.
pub async fn decide(client: &PostgrestClient, decision: &FreeAgentDecision) -> AppResult<()> {
    client
        .update(
            &Query::from(RELATION).eq("player_id", &decision.player_id),
            decision,
        )
        .await
}
