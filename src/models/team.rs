//! Team, roster and membership models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;
use super::manager::ManagerProfile;

/// Team row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Team reference used in pickers and filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamOption {
    pub id: String,
    pub name: String,
}

impl From<&Team> for TeamOption {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id.clone(),
            name: team.name.clone(),
        }
    }
}

/// Membership row linking a profile to a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMembership {
    pub id: String,
    pub player_id: String,
    pub team_id: String,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

/// Insert payload for a roster signing.
#[derive(Debug, Clone, Serialize)]
pub struct NewMembership {
    pub player_id: String,
    pub team_id: String,
}

/// Roster entry shown in the public teams directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discord_username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pro_clubs_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: String,
}

/// Team with its manager and roster, as listed publicly.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamDetail {
    pub team: Team,
    pub manager: Option<ManagerProfile>,
    pub players: Vec<RosterPlayer>,
}

impl TeamDetail {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

/// Roster entry with stats, shown to the team's manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadPlayer {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discord_username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pro_clubs_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub goals: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assists: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub average_rating: f64,
}

/// A team run by the signed-in manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedTeam {
    pub id: String,
    pub name: String,
    pub players: Vec<SquadPlayer>,
}

impl ManagedTeam {
    /// Look up a player on this roster.
    pub fn player(&self, player_id: &str) -> Option<&SquadPlayer> {
        self.players.iter().find(|p| p.id == player_id)
    }
}
