//! Free-agent approval models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Approval status of a free-agent application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Outcome of an admin decision.
    pub fn decided(approve: bool) -> Self {
        if approve {
            Self::Approved
        } else {
            Self::Rejected
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Approval row: at most one per profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeAgentApproval {
    pub id: String,
    pub player_id: String,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Update payload applied to a player's approval row.
#[derive(Debug, Clone, Serialize)]
pub struct FreeAgentDecision {
    #[serde(skip)]
    pub player_id: String,
    pub status: ApprovalStatus,
    pub approved_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
}

/// Free agent as listed in the admin and manager panels.
///
/// `id` is the player's profile id, not the approval row id.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeAgent {
    pub id: String,
    pub discord_username: String,
    pub pro_clubs_name: String,
    pub position: String,
    pub status: ApprovalStatus,
    pub created_at: Option<DateTime<Utc>>,
}
