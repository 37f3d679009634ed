//! Manager panel: the manager's squads, their stats, and unsigned free agents.

use std::sync::Arc;

use super::{ensure_granted, require_present};
use crate::db::LeagueStore;
use crate::error::{AppError, AppResult};
use crate::models::{FreeAgent, ManagedTeam, NewMembership, ProfileUpdate, Role, StatLine};
use crate::services::{Action, Notifier, Reconcile, ViewCache, load_into, mutate_then_reconcile};
use crate::session::{Access, SessionReader, access_for};

const LOAD_FAILURE: &str = "Failed to load manager data";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagerData {
    pub teams: Vec<ManagedTeam>,
    /// Approved and not on any team
    pub free_agents: Vec<FreeAgent>,
}

impl ManagerData {
    /// Current stats of a player on one of the manager's teams.
    pub fn stats_of(&self, player_id: &str) -> Option<StatLine> {
        self.teams
            .iter()
            .find_map(|team| team.player(player_id))
            .map(|p| StatLine {
                goals: p.goals,
                assists: p.assists,
                average_rating: p.average_rating,
            })
    }
}

pub struct ManagerPanel {
    store: Arc<dyn LeagueStore>,
    session: Arc<dyn SessionReader>,
    notifier: Arc<dyn Notifier>,
    data: ViewCache<ManagerData>,
}

async fn fetch_manager_data(store: &dyn LeagueStore, user_id: &str) -> AppResult<ManagerData> {
    let (teams, free_agents) =
        tokio::try_join!(store.managed_teams(user_id), store.unsigned_free_agents())?;
    Ok(ManagerData { teams, free_agents })
}

impl ManagerPanel {
    pub fn new(
        store: Arc<dyn LeagueStore>,
        session: Arc<dyn SessionReader>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            session,
            notifier,
            data: ViewCache::default(),
        }
    }

    pub fn access(&self) -> Access {
        access_for(self.session.as_ref(), Role::Manager)
    }

    pub fn data(&self) -> ManagerData {
        self.data.snapshot()
    }

    pub fn unmount(&self) {
        self.data.unmount();
    }

    fn manager_id(&self) -> AppResult<String> {
        self.session
            .current_identity()
            .map(|identity| identity.id)
            .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))
    }

    /// Load the panel when access is granted. Returns the access decision.
    pub async fn load(&self) -> AppResult<Access> {
        let access = self.access();
        if access == Access::Granted {
            let user_id = self.manager_id()?;
            load_into(
                &self.data,
                self.notifier.as_ref(),
                LOAD_FAILURE,
                fetch_manager_data(self.store.as_ref(), &user_id),
            )
            .await?;
        }
        Ok(access)
    }

    /// Sign a free agent to a team.
    pub async fn sign_player(&self, player_id: &str, team_id: &str) -> AppResult<()> {
        require_present(&[("player", player_id), ("team", team_id)])?;

        let action = Action::new(
            "sign_player",
            "Player assigned to team successfully",
            "Failed to assign player",
        )
        .on_reload_failure(LOAD_FAILURE);
        ensure_granted(
            self.session.as_ref(),
            self.notifier.as_ref(),
            Role::Manager,
            &action.failure,
        )?;
        let user_id = self.manager_id()?;

        let membership = NewMembership {
            player_id: player_id.to_string(),
            team_id: team_id.to_string(),
        };

        mutate_then_reconcile(
            &self.data,
            self.notifier.as_ref(),
            action,
            self.store.add_to_team(&membership),
            Reconcile::refetch(fetch_manager_data(self.store.as_ref(), &user_id)),
        )
        .await
    }

    /// Overwrite a player's cumulative stats.
    pub async fn update_stats(&self, player_id: &str, stats: StatLine) -> AppResult<()> {
        require_present(&[("player", player_id)])?;

        let action = Action::new(
            "update_stats",
            "Player stats updated successfully",
            "Failed to update player stats",
        )
        .on_reload_failure(LOAD_FAILURE);
        ensure_granted(
            self.session.as_ref(),
            self.notifier.as_ref(),
            Role::Manager,
            &action.failure,
        )?;
        let user_id = self.manager_id()?;
        let update = ProfileUpdate::from(stats);

        mutate_then_reconcile(
            &self.data,
            self.notifier.as_ref(),
            action,
            self.store.update_profile(player_id, &update),
            Reconcile::refetch(fetch_manager_data(self.store.as_ref(), &user_id)),
        )
        .await
    }
}
