//! Manager assignment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Manager assignment row: one identity managing one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerAssignment {
    pub id: String,
    pub user_id: String,
    pub team_id: String,
    #[serde(default)]
    pub assigned_by: Option<String>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new assignment.
#[derive(Debug, Clone, Serialize)]
pub struct NewManagerAssignment {
    pub user_id: String,
    pub team_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_by: Option<String>,
}

/// Manager names embedded in team listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerProfile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub discord_username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pro_clubs_name: String,
}

/// Assignment joined with the manager's names and the team name.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerListing {
    pub id: String,
    pub user_id: String,
    pub team_id: String,
    pub discord_username: String,
    pub pro_clubs_name: String,
    pub team_name: String,
}
