//! In-process `LeagueStore` used by the test suites.
//!
//! Behaves like the remote store where the portal depends on it: the profile
//! primary key rejects duplicates with `Conflict`, single-row reads report
//! `NotFound`, and manager assignments carry no uniqueness constraint. Every
//! call yields to the scheduler first so concurrent callers interleave the
//! way network calls would.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::LeagueStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    ApprovalStatus, FreeAgent, FreeAgentApproval, FreeAgentDecision, ManagedTeam,
    ManagerAssignment, ManagerListing, ManagerProfile, NewManagerAssignment, NewMembership,
    NewProfile, PlayerListing, PlayerOption, Profile, ProfileUpdate, RosterPlayer, SquadPlayer,
    Team, TeamMembership, TeamOption,
};

/// Store operations, used to inject failures and to inspect call history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FetchProfile,
    InsertProfile,
    UpdateProfile,
    ListPlayerOptions,
    ListPlayers,
    IsAdmin,
    IsManager,
    ListTeams,
    TeamManager,
    TeamRoster,
    ManagedTeams,
    AddToTeam,
    ListManagers,
    AssignManager,
    RemoveManager,
    FreeAgents,
    UnsignedFreeAgents,
    DecideFreeAgent,
}

#[derive(Default)]
struct Tables {
    profiles: Vec<Profile>,
    teams: Vec<Team>,
    memberships: Vec<TeamMembership>,
    managers: Vec<ManagerAssignment>,
    approvals: Vec<FreeAgentApproval>,
    admins: Vec<String>,
}

impl Tables {
    fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    fn team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    fn is_signed(&self, player_id: &str) -> bool {
        self.memberships.iter().any(|m| m.player_id == player_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failures: Mutex<HashMap<StoreOp, Vec<AppError>>>,
    calls: Mutex<Vec<StoreOp>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding

    pub fn add_profile(&self, profile: Profile) {
        lock(&self.tables).profiles.push(profile);
    }

    /// Add a profile with a handle and in-game name; returns its id.
    pub fn add_player(&self, id: &str, handle: &str, name: &str, position: &str) -> String {
        let mut profile = Profile::blank(id);
        profile.discord_username = handle.to_string();
        profile.pro_clubs_name = name.to_string();
        profile.position = position.to_string();
        profile.created_at = Some(Utc::now());
        self.add_profile(profile);
        id.to_string()
    }

    pub fn add_team(&self, id: &str, name: &str) -> String {
        lock(&self.tables).teams.push(Team {
            id: id.to_string(),
            name: name.to_string(),
            logo_url: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        });
        id.to_string()
    }

    pub fn add_membership(&self, player_id: &str, team_id: &str) {
        lock(&self.tables).memberships.push(TeamMembership {
            id: Uuid::new_v4().to_string(),
            player_id: player_id.to_string(),
            team_id: team_id.to_string(),
            joined_at: Some(Utc::now()),
        });
    }

    /// Add a manager assignment; returns the assignment id.
    pub fn add_manager(&self, user_id: &str, team_id: &str) -> String {
        let id = Uuid::new_v4().to_string();
        lock(&self.tables).managers.push(ManagerAssignment {
            id: id.clone(),
            user_id: user_id.to_string(),
            team_id: team_id.to_string(),
            assigned_by: None,
            assigned_at: Some(Utc::now()),
        });
        id
    }

    pub fn add_application(&self, player_id: &str, status: ApprovalStatus) {
        lock(&self.tables).approvals.push(FreeAgentApproval {
            id: Uuid::new_v4().to_string(),
            player_id: player_id.to_string(),
            status,
            approved_by: None,
            approved_at: None,
            notes: None,
            created_at: Some(Utc::now()),
        });
    }

    pub fn grant_admin(&self, user_id: &str) {
        lock(&self.tables).admins.push(user_id.to_string());
    }

    // Failure injection

    /// Make the next call of `op` fail with `error`. Queued errors are
    /// consumed in order.
    pub fn fail_next(&self, op: StoreOp, error: AppError) {
        lock(&self.failures).entry(op).or_default().push(error);
    }

    // Inspection

    pub fn calls(&self) -> Vec<StoreOp> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, op: StoreOp) -> usize {
        lock(&self.calls).iter().filter(|c| **c == op).count()
    }

    pub fn profile_rows(&self, id: &str) -> usize {
        lock(&self.tables)
            .profiles
            .iter()
            .filter(|p| p.id == id)
            .count()
    }

    pub fn profile(&self, id: &str) -> Option<Profile> {
        lock(&self.tables).profile(id).cloned()
    }

    pub fn approval(&self, player_id: &str) -> Option<FreeAgentApproval> {
        lock(&self.tables)
            .approvals
            .iter()
            .find(|a| a.player_id == player_id)
            .cloned()
    }

    /// User ids assigned to manage a team, in assignment order.
    pub fn managers_of(&self, team_id: &str) -> Vec<String> {
        lock(&self.tables)
            .managers
            .iter()
            .filter(|m| m.team_id == team_id)
            .map(|m| m.user_id.clone())
            .collect()
    }

    pub fn team_of(&self, player_id: &str) -> Option<String> {
        lock(&self.tables)
            .memberships
            .iter()
            .find(|m| m.player_id == player_id)
            .map(|m| m.team_id.clone())
    }

    async fn enter(&self, op: StoreOp) -> AppResult<()> {
        tokio::task::yield_now().await;
        lock(&self.calls).push(op);

        let mut failures = lock(&self.failures);
        if let Some(queue) = failures.get_mut(&op)
            && !queue.is_empty()
        {
            return Err(queue.remove(0));
        }
        Ok(())
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        lock(&self.tables)
    }
}

fn roster_player(profile: &Profile) -> RosterPlayer {
    RosterPlayer {
        id: profile.id.clone(),
        discord_username: profile.discord_username.clone(),
        pro_clubs_name: profile.pro_clubs_name.clone(),
        position: profile.position.clone(),
    }
}

fn squad_player(profile: &Profile) -> SquadPlayer {
    SquadPlayer {
        id: profile.id.clone(),
        discord_username: profile.discord_username.clone(),
        pro_clubs_name: profile.pro_clubs_name.clone(),
        position: profile.position.clone(),
        goals: profile.goals,
        assists: profile.assists,
        average_rating: profile.average_rating,
    }
}

fn free_agent(approval: &FreeAgentApproval, profile: &Profile) -> FreeAgent {
    FreeAgent {
        id: profile.id.clone(),
        discord_username: profile.discord_username.clone(),
        pro_clubs_name: profile.pro_clubs_name.clone(),
        position: profile.position.clone(),
        status: approval.status,
        created_at: approval.created_at,
    }
}

#[async_trait]
impl LeagueStore for MemoryStore {
    async fn fetch_profile(&self, id: &str) -> AppResult<Profile> {
        self.enter(StoreOp::FetchProfile).await?;
        self.tables()
            .profile(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("profiles".to_string()))
    }

    async fn insert_profile(&self, profile: &NewProfile) -> AppResult<()> {
        self.enter(StoreOp::InsertProfile).await?;
        let mut tables = self.tables();
        if tables.profile(&profile.id).is_some() {
            return Err(AppError::Conflict(
                "duplicate key value violates unique constraint \"profiles_pkey\"".to_string(),
            ));
        }

        let mut row = Profile::blank(&profile.id);
        row.discord_username = profile.discord_username.clone().unwrap_or_default();
        row.created_at = Some(Utc::now());
        tables.profiles.push(row);
        Ok(())
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> AppResult<()> {
        self.enter(StoreOp::UpdateProfile).await?;
        for profile in self.tables().profiles.iter_mut().filter(|p| p.id == id) {
            update.apply_to(profile);
            profile.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_player_options(&self) -> AppResult<Vec<PlayerOption>> {
        self.enter(StoreOp::ListPlayerOptions).await?;
        let mut options: Vec<PlayerOption> = self
            .tables()
            .profiles
            .iter()
            .map(|p| PlayerOption {
                id: p.id.clone(),
                discord_username: p.discord_username.clone(),
                pro_clubs_name: p.pro_clubs_name.clone(),
            })
            .collect();
        options.sort_by(|a, b| a.discord_username.cmp(&b.discord_username));
        Ok(options)
    }

    async fn list_players(&self) -> AppResult<Vec<PlayerListing>> {
        self.enter(StoreOp::ListPlayers).await?;
        let tables = self.tables();
        let mut players: Vec<PlayerListing> = tables
            .profiles
            .iter()
            .map(|profile| PlayerListing {
                team: tables
                    .memberships
                    .iter()
                    .filter(|m| m.player_id == profile.id)
                    .find_map(|m| tables.team(&m.team_id))
                    .map(TeamOption::from),
                profile: profile.clone(),
            })
            .collect();
        players.sort_by(|a, b| a.profile.pro_clubs_name.cmp(&b.profile.pro_clubs_name));
        Ok(players)
    }

    async fn is_admin(&self, user_id: &str) -> AppResult<bool> {
        self.enter(StoreOp::IsAdmin).await?;
        Ok(self.tables().admins.iter().any(|a| a == user_id))
    }

    async fn is_manager(&self, user_id: &str) -> AppResult<bool> {
        self.enter(StoreOp::IsManager).await?;
        Ok(self.tables().managers.iter().any(|m| m.user_id == user_id))
    }

    async fn list_teams(&self) -> AppResult<Vec<Team>> {
        self.enter(StoreOp::ListTeams).await?;
        let mut teams = self.tables().teams.clone();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    async fn team_manager(&self, team_id: &str) -> AppResult<Option<ManagerProfile>> {
        self.enter(StoreOp::TeamManager).await?;
        let tables = self.tables();
        Ok(tables
            .managers
            .iter()
            .find(|m| m.team_id == team_id)
            .and_then(|m| tables.profile(&m.user_id))
            .map(|p| ManagerProfile {
                discord_username: p.discord_username.clone(),
                pro_clubs_name: p.pro_clubs_name.clone(),
            }))
    }

    async fn team_roster(&self, team_id: &str) -> AppResult<Vec<RosterPlayer>> {
        self.enter(StoreOp::TeamRoster).await?;
        let tables = self.tables();
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.team_id == team_id)
            .filter_map(|m| tables.profile(&m.player_id))
            .map(roster_player)
            .collect())
    }

    async fn managed_teams(&self, user_id: &str) -> AppResult<Vec<ManagedTeam>> {
        self.enter(StoreOp::ManagedTeams).await?;
        let tables = self.tables();
        Ok(tables
            .managers
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.team(&m.team_id))
            .map(|team| ManagedTeam {
                id: team.id.clone(),
                name: team.name.clone(),
                players: tables
                    .memberships
                    .iter()
                    .filter(|m| m.team_id == team.id)
                    .filter_map(|m| tables.profile(&m.player_id))
                    .map(squad_player)
                    .collect(),
            })
            .collect())
    }

    async fn add_to_team(&self, membership: &NewMembership) -> AppResult<()> {
        self.enter(StoreOp::AddToTeam).await?;
        self.add_membership(&membership.player_id, &membership.team_id);
        Ok(())
    }

    async fn list_managers(&self) -> AppResult<Vec<ManagerListing>> {
        self.enter(StoreOp::ListManagers).await?;
        let tables = self.tables();
        Ok(tables
            .managers
            .iter()
            .filter_map(|m| {
                let profile = tables.profile(&m.user_id)?;
                let team = tables.team(&m.team_id)?;
                Some(ManagerListing {
                    id: m.id.clone(),
                    user_id: m.user_id.clone(),
                    team_id: m.team_id.clone(),
                    discord_username: profile.discord_username.clone(),
                    pro_clubs_name: profile.pro_clubs_name.clone(),
                    team_name: team.name.clone(),
                })
            })
            .collect())
    }

    async fn assign_manager(&self, assignment: &NewManagerAssignment) -> AppResult<()> {
        self.enter(StoreOp::AssignManager).await?;
        self.tables().managers.push(ManagerAssignment {
            id: Uuid::new_v4().to_string(),
            user_id: assignment.user_id.clone(),
            team_id: assignment.team_id.clone(),
            assigned_by: assignment.assigned_by.clone(),
            assigned_at: Some(Utc::now()),
        });
        Ok(())
    }

    async fn remove_manager(&self, assignment_id: &str) -> AppResult<()> {
        self.enter(StoreOp::RemoveManager).await?;
        self.tables().managers.retain(|m| m.id != assignment_id);
        Ok(())
    }

    async fn free_agents(&self, status: ApprovalStatus) -> AppResult<Vec<FreeAgent>> {
        self.enter(StoreOp::FreeAgents).await?;
        let tables = self.tables();
        Ok(tables
            .approvals
            .iter()
            .filter(|a| a.status == status)
            .filter_map(|a| tables.profile(&a.player_id).map(|p| free_agent(a, p)))
            .collect())
    }

    async fn unsigned_free_agents(&self) -> AppResult<Vec<FreeAgent>> {
        self.enter(StoreOp::UnsignedFreeAgents).await?;
        let tables = self.tables();
        Ok(tables
            .approvals
            .iter()
            .filter(|a| a.status == ApprovalStatus::Approved && !tables.is_signed(&a.player_id))
            .filter_map(|a| tables.profile(&a.player_id).map(|p| free_agent(a, p)))
            .collect())
    }

    async fn decide_free_agent(&self, decision: &FreeAgentDecision) -> AppResult<()> {
        self.enter(StoreOp::DecideFreeAgent).await?;
        for approval in self
            .tables()
            .approvals
            .iter_mut()
            .filter(|a| a.player_id == decision.player_id)
        {
            approval.status = decision.status;
            approval.approved_at = Some(decision.approved_at);
            approval.approved_by = decision.approved_by.clone();
        }
        Ok(())
    }
}
