//! Public directories and the single player page.

use std::sync::Arc;

use league_portal::db::{LeagueStore, MemoryStore, StoreOp};
use league_portal::error::AppError;
use league_portal::models::{PlayerFilter, TeamFilter};
use league_portal::views::{PlayerProfileView, PlayersDirectory, TeamsDirectory};

fn league() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.add_team("t1", "Harbour FC");
    store.add_team("t2", "Albion Rovers");
    store.add_player("mgr-1", "gaffer", "Gaffer", "CM");
    store.add_manager("mgr-1", "t1");
    store.add_player("p1", "alv", "Alvarez", "ST");
    store.add_player("p2", "bfern", "Bruno", "CAM");
    store.add_player("p3", "case", "Casemiro", "CDM");
    store.add_player("p4", "dias", "Dias", "CB");
    store.add_membership("p1", "t1");
    store.add_membership("p2", "t1");
    store.add_membership("p4", "t2");
    Arc::new(store)
}

#[tokio::test]
async fn test_teams_directory_with_managers_and_rosters() {
    let store = league();
    let directory = TeamsDirectory::new(store.clone());

    directory.load().await.unwrap();

    let teams = directory.teams();
    let names: Vec<&str> = teams.iter().map(|t| t.team.name.as_str()).collect();
    assert_eq!(names, vec!["Albion Rovers", "Harbour FC"]);

    assert!(teams[0].manager.is_none());
    assert_eq!(teams[0].player_count(), 1);

    let harbour = &teams[1];
    assert_eq!(harbour.manager.as_ref().unwrap().pro_clubs_name, "Gaffer");
    let roster: Vec<&str> = harbour.players.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(roster, vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_teams_directory_first_manager_wins() {
    let store = league();
    store.add_player("p9", "second", "Second", "CM");
    store.add_manager("p9", "t1");
    let directory = TeamsDirectory::new(store.clone());

    directory.load().await.unwrap();

    let harbour = directory
        .teams()
        .into_iter()
        .find(|t| t.team.id == "t1")
        .unwrap();
    assert_eq!(harbour.manager.unwrap().discord_username, "gaffer");
}

#[tokio::test]
async fn test_team_lookup_failure_degrades_that_team() {
    let store = league();
    store.fail_next(StoreOp::TeamRoster, AppError::Transport("reset".into()));
    let directory = TeamsDirectory::new(store.clone());

    directory.load().await.unwrap();

    let teams = directory.teams();
    assert_eq!(teams.len(), 2);
    let total_players: usize = teams.iter().map(|t| t.player_count()).sum();
    assert!(total_players < 3);
    assert!(teams.iter().any(|t| t.players.is_empty()));
}

#[tokio::test]
async fn test_team_list_failure_is_fatal() {
    let store = league();
    store.fail_next(StoreOp::ListTeams, AppError::Transport("offline".into()));
    let directory = TeamsDirectory::new(store.clone());

    assert!(directory.load().await.is_err());
    assert!(!directory.is_loaded());
    assert!(directory.teams().is_empty());
}

#[tokio::test]
async fn test_players_directory_filters() {
    let store = league();
    let directory = PlayersDirectory::new(store.clone());
    directory.load().await.unwrap();

    assert_eq!(directory.players().len(), 5);
    assert_eq!(directory.teams().len(), 2);

    let free_agents = directory.visible(&PlayerFilter {
        team: TeamFilter::FreeAgent,
        ..Default::default()
    });
    let ids: Vec<&str> = free_agents.iter().map(|p| p.profile.id.as_str()).collect();
    assert_eq!(ids, vec!["p3", "mgr-1"]);

    let harbour_attack = directory.visible(&PlayerFilter {
        search: "AL".to_string(),
        position: Some("ST".to_string()),
        team: TeamFilter::parse("t1"),
    });
    assert_eq!(harbour_attack.len(), 1);
    assert_eq!(harbour_attack[0].team.as_ref().unwrap().name, "Harbour FC");

    let everyone = directory.visible(&PlayerFilter::default());
    let names: Vec<&str> = everyone
        .iter()
        .map(|p| p.profile.pro_clubs_name.as_str())
        .collect();
    assert_eq!(names, vec!["Alvarez", "Bruno", "Casemiro", "Dias", "Gaffer"]);
}

#[tokio::test]
async fn test_players_directory_needs_both_lists() {
    let store = league();
    store.fail_next(StoreOp::ListTeams, AppError::Transport("offline".into()));
    let directory = PlayersDirectory::new(store.clone());

    assert!(directory.load().await.is_err());
    assert!(directory.players().is_empty());
}

#[tokio::test]
async fn test_player_page() {
    let store = league();
    store
        .update_profile(
            "p2",
            &league_portal::models::ProfileUpdate {
                goals: Some(7),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let view = PlayerProfileView::new(store.clone());

    let profile = view.load("p2").await.unwrap().unwrap();
    assert_eq!(profile.display_name(), "Bruno");
    assert_eq!(profile.goals, 7);
    assert_eq!(view.profile(), Some(profile));

    assert!(view.load("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_player_page_remote_error() {
    let store = league();
    store.fail_next(
        StoreOp::FetchProfile,
        AppError::Remote {
            status: 503,
            message: "unavailable".into(),
        },
    );
    let view = PlayerProfileView::new(store.clone());

    assert!(view.load("p1").await.is_err());
}
