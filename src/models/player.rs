//! Player directory models and filtering.

use serde::{Deserialize, Serialize};

use super::null_as_default;
use super::profile::Profile;
use super::team::TeamOption;

/// Positions offered by the position filter.
pub const POSITIONS: &[&str] = &[
    "GK", "LB", "CB", "RB", "LWB", "RWB", "CDM", "CM", "CAM", "LM", "RM", "LW", "RW", "ST", "CF",
];

/// Player reference used in the manager-assignment picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerOption {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discord_username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pro_clubs_name: String,
}

/// Player with the team they are signed to, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerListing {
    pub profile: Profile,
    pub team: Option<TeamOption>,
}

impl PlayerListing {
    pub fn is_free_agent(&self) -> bool {
        self.team.is_none()
    }
}

/// Team criterion of the directory filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TeamFilter {
    #[default]
    All,
    FreeAgent,
    Team(String),
}

impl TeamFilter {
    /// Parse the picker value: `All`, `Free Agent`, or a team id.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | "All" | "all" => Self::All,
            "Free Agent" | "free-agent" | "free_agent" => Self::FreeAgent,
            id => Self::Team(id.to_string()),
        }
    }
}

/// Client-side filter over the loaded player directory.
#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    /// Case-insensitive match on in-game name or handle
    pub search: String,
    /// Exact position; `None` means all positions
    pub position: Option<String>,
    pub team: TeamFilter,
}

impl PlayerFilter {
    pub fn matches(&self, player: &PlayerListing) -> bool {
        let search = self.search.trim().to_lowercase();
        if !search.is_empty() {
            let name = player.profile.pro_clubs_name.to_lowercase();
            let handle = player.profile.discord_username.to_lowercase();
            if !name.contains(&search) && !handle.contains(&search) {
                return false;
            }
        }

        if let Some(ref position) = self.position
            && position != "All"
            && &player.profile.position != position
        {
            return false;
        }

        match &self.team {
            TeamFilter::All => true,
            TeamFilter::FreeAgent => player.is_free_agent(),
            TeamFilter::Team(id) => player.team.as_ref().is_some_and(|t| &t.id == id),
        }
    }

    /// Apply the filter, keeping the directory order.
    pub fn apply<'a>(&self, players: &'a [PlayerListing]) -> Vec<&'a PlayerListing> {
        players.iter().filter(|p| self.matches(p)).collect()
    }
}
