//! Public teams directory.

use std::sync::Arc;

use futures_util::future::{join, join_all};
use tracing::{error, warn};

use crate::db::LeagueStore;
use crate::error::AppResult;
use crate::models::{Team, TeamDetail};
use crate::services::ViewCache;

pub struct TeamsDirectory {
    store: Arc<dyn LeagueStore>,
    teams: ViewCache<Vec<TeamDetail>>,
}

impl TeamsDirectory {
    pub fn new(store: Arc<dyn LeagueStore>) -> Self {
        Self {
            store,
            teams: ViewCache::default(),
        }
    }

    /// Teams ordered by name, each with its manager and roster.
    pub fn teams(&self) -> Vec<TeamDetail> {
        self.teams.snapshot()
    }

    pub fn is_loaded(&self) -> bool {
        self.teams.is_loaded()
    }

    pub fn unmount(&self) {
        self.teams.unmount();
    }

    /// Load every team. Per-team lookups that fail leave that team without
    /// a manager or with an empty roster; only the team list itself is fatal.
    pub async fn load(&self) -> AppResult<()> {
        let teams = self.store.list_teams().await.inspect_err(|e| {
            error!(error = %e, "Error fetching teams");
        })?;

        let details = join_all(teams.into_iter().map(|team| self.detail(team))).await;
        self.teams.replace(details);
        Ok(())
    }

    async fn detail(&self, team: Team) -> TeamDetail {
        let (manager, roster) = join(
            self.store.team_manager(&team.id),
            self.store.team_roster(&team.id),
        )
        .await;

        let manager = manager.unwrap_or_else(|e| {
            warn!(team_id = %team.id, error = %e, "Manager lookup failed");
            None
        });
        let players = roster.unwrap_or_else(|e| {
            warn!(team_id = %team.id, error = %e, "Roster lookup failed");
            Vec::new()
        });

        TeamDetail {
            team,
            manager,
            players,
        }
    }
}
