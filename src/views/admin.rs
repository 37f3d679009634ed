//! Admin panel: free-agent approvals and manager assignments.

use std::sync::Arc;

use chrono::Utc;

use super::{ensure_granted, require_present};
use crate::db::LeagueStore;
use crate::error::AppResult;
use crate::models::{
    ApprovalStatus, FreeAgent, FreeAgentDecision, ManagerListing, NewManagerAssignment,
    PlayerOption, Role, TeamOption,
};
use crate::services::{Action, Notifier, Reconcile, ViewCache, load_into, mutate_then_reconcile};
use crate::session::{Access, SessionReader, access_for};

const LOAD_FAILURE: &str = "Failed to load admin data";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminData {
    /// Pending applications
    pub free_agents: Vec<FreeAgent>,
    pub managers: Vec<ManagerListing>,
    /// Ordered by name
    pub teams: Vec<TeamOption>,
    /// Ordered by handle
    pub players: Vec<PlayerOption>,
}

pub struct AdminPanel {
    store: Arc<dyn LeagueStore>,
    session: Arc<dyn SessionReader>,
    notifier: Arc<dyn Notifier>,
    data: ViewCache<AdminData>,
}

async fn fetch_admin_data(store: &dyn LeagueStore) -> AppResult<AdminData> {
    let (free_agents, managers, teams, players) = tokio::try_join!(
        store.free_agents(ApprovalStatus::Pending),
        store.list_managers(),
        store.list_teams(),
        store.list_player_options(),
    )?;

    Ok(AdminData {
        free_agents,
        managers,
        teams: teams.iter().map(TeamOption::from).collect(),
        players,
    })
}

impl AdminPanel {
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
        access_for(self.session.as_ref(), Role::Admin)
    }

    pub fn data(&self) -> AdminData {
        self.data.snapshot()
    }

    /// Leave the view; responses still in flight are dropped.
    pub fn unmount(&self) {
        self.data.unmount();
    }

    /// Load the panel when access is granted. Returns the access decision.
    pub async fn load(&self) -> AppResult<Access> {
        let access = self.access();
        if access == Access::Granted {
            load_into(
                &self.data,
                self.notifier.as_ref(),
                LOAD_FAILURE,
                fetch_admin_data(self.store.as_ref()),
            )
            .await?;
        }
        Ok(access)
    }

    pub async fn approve_free_agent(&self, player_id: &str) -> AppResult<()> {
        self.decide_free_agent(player_id, true).await
    }

    pub async fn reject_free_agent(&self, player_id: &str) -> AppResult<()> {
        self.decide_free_agent(player_id, false).await
    }

    /// Record a decision and drop the player from the pending list.
    pub async fn decide_free_agent(&self, player_id: &str, approve: bool) -> AppResult<()> {
        require_present(&[("player", player_id)])?;

        let status = ApprovalStatus::decided(approve);
        let action = Action::new(
            "decide_free_agent",
            format!("Free agent {} successfully", status),
            "Failed to update free agent status",
        );
        ensure_granted(
            self.session.as_ref(),
            self.notifier.as_ref(),
            Role::Admin,
            &action.failure,
        )?;

        let decision = FreeAgentDecision {
            player_id: player_id.to_string(),
            status,
            approved_at: Utc::now(),
            approved_by: self.session.current_identity().map(|identity| identity.id),
        };
        let decided = player_id.to_string();

        mutate_then_reconcile(
            &self.data,
            self.notifier.as_ref(),
            action,
            self.store.decide_free_agent(&decision),
            Reconcile::patch(move |data: &mut AdminData| {
                data.free_agents.retain(|agent| agent.id != decided)
            }),
        )
        .await
    }

    /// Assign a player as a team's manager. The listing needs the joined
    /// names, so the panel is refetched.
    pub async fn assign_manager(&self, player_id: &str, team_id: &str) -> AppResult<()> {
        require_present(&[("player", player_id), ("team", team_id)])?;

        let action = Action::new(
            "assign_manager",
            "Manager assigned successfully",
            "Failed to assign manager",
        )
        .on_reload_failure(LOAD_FAILURE);
        ensure_granted(
            self.session.as_ref(),
            self.notifier.as_ref(),
            Role::Admin,
            &action.failure,
        )?;

        let assignment = NewManagerAssignment {
            user_id: player_id.to_string(),
            team_id: team_id.to_string(),
            assigned_by: self.session.current_identity().map(|identity| identity.id),
        };

        mutate_then_reconcile(
            &self.data,
            self.notifier.as_ref(),
            action,
            self.store.assign_manager(&assignment),
            Reconcile::refetch(fetch_admin_data(self.store.as_ref())),
        )
        .await
    }

    /// Remove an assignment by id and drop it from the listing.
    pub async fn remove_manager(&self, assignment_id: &str) -> AppResult<()> {
        require_present(&[("assignment", assignment_id)])?;

        let action = Action::new(
            "remove_manager",
            "Manager removed successfully",
            "Failed to remove manager",
        );
        ensure_granted(
            self.session.as_ref(),
            self.notifier.as_ref(),
            Role::Admin,
            &action.failure,
        )?;

        let removed = assignment_id.to_string();
        mutate_then_reconcile(
            &self.data,
            self.notifier.as_ref(),
            action,
            self.store.remove_manager(assignment_id),
            Reconcile::patch(move |data: &mut AdminData| {
                data.managers.retain(|m| m.id != removed)
            }),
        )
        .await
    }
}
