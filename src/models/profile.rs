//! Player profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Profile row: one per identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
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
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Empty profile for an identity, as the store creates it on first sign-in.
    pub fn blank(id: &str) -> Self {
        Self {
            id: id.to_string(),
            discord_username: String::new(),
            pro_clubs_name: String::new(),
            position: String::new(),
            goals: 0,
            assists: 0,
            average_rating: 0.0,
            created_at: None,
            updated_at: None,
        }
    }

    /// Current stat line.
    pub fn stats(&self) -> StatLine {
        StatLine {
            goals: self.goals,
            assists: self.assists,
            average_rating: self.average_rating,
        }
    }

    /// Name shown in listings: in-game name, falling back to the chat handle.
    pub fn display_name(&self) -> &str {
        if self.pro_clubs_name.is_empty() {
            &self.discord_username
        } else {
            &self.pro_clubs_name
        }
    }
}

/// Minimal insert issued when a signed-in identity has no profile yet.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_username: Option<String>,
}

/// Partial profile update. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_clubs_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assists: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
}

impl ProfileUpdate {
    /// True when no field would be sent.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the set fields to a profile in place.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(ref v) = self.discord_username {
            profile.discord_username = v.clone();
        }
        if let Some(ref v) = self.pro_clubs_name {
            profile.pro_clubs_name = v.clone();
        }
        if let Some(ref v) = self.position {
            profile.position = v.clone();
        }
        if let Some(v) = self.goals {
            profile.goals = v;
        }
        if let Some(v) = self.assists {
            profile.assists = v;
        }
        if let Some(v) = self.average_rating {
            profile.average_rating = v;
        }
    }
}

/// Cumulative stats edited by a team manager.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub goals: i32,
    pub assists: i32,
    pub average_rating: f64,
}

impl From<StatLine> for ProfileUpdate {
    fn from(stats: StatLine) -> Self {
        Self {
            goals: Some(stats.goals),
            assists: Some(stats.assists),
            average_rating: Some(stats.average_rating),
            ..Default::default()
        }
    }
}
