//! Public players directory with client-side filtering.

use std::sync::Arc;

use tracing::error;

use crate::db::LeagueStore;
use crate::error::AppResult;
use crate::models::{PlayerFilter, PlayerListing, TeamOption};
use crate::services::ViewCache;

pub struct PlayersDirectory {
    store: Arc<dyn LeagueStore>,
    players: ViewCache<Vec<PlayerListing>>,
    teams: ViewCache<Vec<TeamOption>>,
}

impl PlayersDirectory {
    pub fn new(store: Arc<dyn LeagueStore>) -> Self {
        Self {
            store,
            players: ViewCache::default(),
            teams: ViewCache::default(),
        }
    }

    /// Load players (ordered by in-game name) and the team filter options.
    pub async fn load(&self) -> AppResult<()> {
        let (players, teams) =
            tokio::try_join!(self.store.list_players(), self.store.list_teams()).inspect_err(
                |e| {
                    error!(error = %e, "Error fetching players");
                },
            )?;

        self.players.replace(players);
        self.teams
            .replace(teams.iter().map(TeamOption::from).collect());
        Ok(())
    }

    pub fn players(&self) -> Vec<PlayerListing> {
        self.players.snapshot()
    }

    /// Options for the team filter.
    pub fn teams(&self) -> Vec<TeamOption> {
        self.teams.snapshot()
    }

    /// Players matching the filter, in directory order.
    pub fn visible(&self, filter: &PlayerFilter) -> Vec<PlayerListing> {
        self.players
            .read(|players| filter.apply(players).into_iter().cloned().collect())
    }

    pub fn unmount(&self) {
        self.players.unmount();
        self.teams.unmount();
    }
}
