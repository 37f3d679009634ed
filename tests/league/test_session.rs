//! Session and role resolution.

use league_portal::db::{MemoryStore, StoreOp};
use league_portal::error::AppError;
use league_portal::models::{AuthEvent, ProfileUpdate, Role};
use league_portal::session::{Access, SessionPhase, SessionReader, access_for};
use league_portal::views::nav_links;

use super::support::*;

#[tokio::test]
async fn test_no_session_settles_signed_out() {
    let portal = Portal::new(MemoryStore::new(), FakeProvider::signed_out());
    assert_eq!(portal.resolver.phase(), SessionPhase::Unknown);

    portal.resolver.start().await.unwrap();

    assert_eq!(portal.resolver.phase(), SessionPhase::SignedOut);
    assert!(portal.notifier.errors().is_empty());
    assert!(portal.store.calls().is_empty());

    let labels: Vec<&str> = nav_links(portal.resolver.as_ref())
        .iter()
        .map(|l| l.label)
        .collect();
    assert_eq!(labels, vec!["Home", "Teams", "Players", "Sign in"]);
}

#[tokio::test]
async fn test_first_sign_in_creates_profile_from_handle() {
    let store = MemoryStore::new();
    let provider = FakeProvider::with_session(session_for("u1", "keeper01", "token-1"));
    let portal = Portal::new(store, provider);

    portal.resolver.start().await.unwrap();

    let state = portal.resolver.state();
    assert_eq!(state.phase(), SessionPhase::ResolvedRoles);
    assert_eq!(state.profile().unwrap().discord_username, "keeper01");
    assert_eq!(portal.store.profile_rows("u1"), 1);
    assert!(!portal.resolver.has_role(Role::Admin));
    assert!(!portal.resolver.has_role(Role::Manager));
}

#[tokio::test]
async fn test_existing_profile_is_not_recreated() {
    let store = MemoryStore::new();
    store.add_player("u1", "keeper01", "Keeper", "GK");

    let portal = Portal::signed_in(store, "u1").await;

    assert_eq!(portal.store.call_count(StoreOp::InsertProfile), 0);
    assert_eq!(portal.resolver.current_profile().unwrap().pro_clubs_name, "Keeper");
}

#[tokio::test]
async fn test_roles_are_denied_until_resolved() {
    let store = MemoryStore::new();
    store.add_player("admin-1", "boss", "Boss", "CM");
    store.grant_admin("admin-1");
    let provider = FakeProvider::with_session(session_for("admin-1", "boss", "token-1"));
    let portal = Portal::new(store, provider);

    let start = portal.resolver.start();
    tokio::pin!(start);
    assert!(futures_util::poll!(start.as_mut()).is_pending());

    assert_eq!(portal.resolver.phase(), SessionPhase::PendingRoles);
    assert!(!portal.resolver.has_role(Role::Admin));
    assert_eq!(access_for(portal.resolver.as_ref(), Role::Admin), Access::Loading);
    let labels: Vec<&str> = nav_links(portal.resolver.as_ref())
        .iter()
        .map(|l| l.label)
        .collect();
    assert!(!labels.contains(&"Admin Panel"));

    start.await.unwrap();

    assert!(portal.resolver.has_role(Role::Admin));
    assert_eq!(access_for(portal.resolver.as_ref(), Role::Admin), Access::Granted);
    let labels: Vec<&str> = nav_links(portal.resolver.as_ref())
        .iter()
        .map(|l| l.label)
        .collect();
    assert!(labels.contains(&"Admin Panel"));
    assert!(!labels.contains(&"Manager Panel"));
}

#[tokio::test]
async fn test_concurrent_sign_in_paths_create_one_profile() {
    let store = MemoryStore::new();
    let provider = FakeProvider::with_session(session_for("u1", "keeper01", "token-1"));
    provider.on_exchange(session_for("u1", "keeper01", "token-2"));
    let portal = Portal::new(store, provider);

    let (started, completed) = tokio::join!(
        portal.resolver.start(),
        portal.resolver.complete_sign_in("code-abc"),
    );
    started.unwrap();
    completed.unwrap();

    let state = portal.resolver.settled().await;
    assert_eq!(portal.store.profile_rows("u1"), 1);
    assert_eq!(state.profile().unwrap().id, "u1");
    assert_eq!(state.identity().unwrap().bearer_token(), Some("token-2"));
    assert!(portal.notifier.errors().is_empty());
}

#[tokio::test]
async fn test_role_lookup_failure_counts_as_no_role() {
    let store = MemoryStore::new();
    store.add_player("admin-1", "boss", "Boss", "CM");
    store.grant_admin("admin-1");
    store.fail_next(StoreOp::IsAdmin, AppError::Transport("connection reset".into()));

    let portal = Portal::signed_in(store, "admin-1").await;

    assert_eq!(portal.resolver.phase(), SessionPhase::ResolvedRoles);
    assert!(!portal.resolver.has_role(Role::Admin));
    assert_eq!(access_for(portal.resolver.as_ref(), Role::Admin), Access::Denied);
    assert!(portal.notifier.errors().is_empty());
}

#[tokio::test]
async fn test_profile_setup_failure_signs_out_locally() {
    let store = MemoryStore::new();
    store.fail_next(
        StoreOp::FetchProfile,
        AppError::Remote {
            status: 500,
            message: "internal".into(),
        },
    );
    let provider = FakeProvider::with_session(session_for("u1", "keeper01", "token-1"));
    let portal = Portal::new(store, provider);

    let err = portal.resolver.start().await.unwrap_err();
    assert!(matches!(err, AppError::Remote { status: 500, .. }));

    assert_eq!(portal.resolver.phase(), SessionPhase::SignedOut);
    assert_eq!(portal.provider.sign_out_count(), 0);
    let errors = portal.notifier.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Could not set up your profile"));
}

#[tokio::test]
async fn test_session_lookup_failure_settles_signed_out() {
    let provider = FakeProvider::failing_lookup(AppError::Transport("offline".into()));
    let portal = Portal::new(MemoryStore::new(), provider);

    portal.resolver.start().await.unwrap();

    assert_eq!(portal.resolver.phase(), SessionPhase::SignedOut);
    assert_eq!(portal.notifier.errors(), vec!["Could not restore your session"]);
}

#[tokio::test]
async fn test_sign_in_event_resolves_session() {
    let store = MemoryStore::new();
    store.add_player("u1", "keeper01", "Keeper", "GK");
    store.add_team("t1", "Harbour FC");
    store.add_manager("u1", "t1");
    let portal = Portal::new(store, FakeProvider::signed_out());
    portal.resolver.start().await.unwrap();

    portal
        .provider
        .emit(AuthEvent::SignedIn(session_for("u1", "keeper01", "token-1")));

    portal.wait_for_phase(SessionPhase::ResolvedRoles).await;
    assert!(portal.resolver.has_role(Role::Manager));
    assert!(!portal.resolver.has_role(Role::Admin));
}

#[tokio::test]
async fn test_sign_out_event_returns_to_signed_out() {
    let store = MemoryStore::new();
    store.add_player("u1", "keeper01", "Keeper", "GK");
    let portal = Portal::signed_in(store, "u1").await;

    portal.provider.emit(AuthEvent::SignedOut);

    portal.wait_for_phase(SessionPhase::SignedOut).await;
    assert!(portal.resolver.current_identity().is_none());
}

#[tokio::test]
async fn test_token_refresh_keeps_resolved_roles() {
    let store = MemoryStore::new();
    store.add_player("admin-1", "boss", "Boss", "CM");
    store.grant_admin("admin-1");
    let portal = Portal::signed_in(store, "admin-1").await;

    portal
        .provider
        .emit(AuthEvent::TokenRefreshed(session_for("admin-1", "boss", "token-2")));

    let state = portal.wait_for_token("token-2").await;
    assert_eq!(state.phase(), SessionPhase::ResolvedRoles);
    assert!(state.has_role(Role::Admin));
    assert_eq!(portal.store.call_count(StoreOp::IsAdmin), 1);
}

#[tokio::test]
async fn test_duplicate_sign_in_event_is_ignored() {
    let store = MemoryStore::new();
    store.add_player("u1", "keeper01", "Keeper", "GK");
    let portal = Portal::signed_in(store, "u1").await;
    let fetches = portal.store.call_count(StoreOp::FetchProfile);

    portal
        .provider
        .emit(AuthEvent::SignedIn(session_for("u1", "keeper01", "token-1")));
    portal.provider.emit(AuthEvent::SignedOut);

    // Events are handled in order, so once signed out the duplicate was seen
    portal.wait_for_phase(SessionPhase::SignedOut).await;
    assert_eq!(portal.store.call_count(StoreOp::FetchProfile), fetches);
}

#[tokio::test]
async fn test_sign_out_is_local_first_then_upstream() {
    let store = MemoryStore::new();
    store.add_player("u1", "keeper01", "Keeper", "GK");
    let portal = Portal::signed_in(store, "u1").await;

    portal.resolver.sign_out().await.unwrap();

    assert_eq!(portal.resolver.phase(), SessionPhase::SignedOut);
    assert_eq!(portal.provider.sign_out_count(), 1);
}

#[tokio::test]
async fn test_failed_code_exchange_notifies() {
    let portal = Portal::new(MemoryStore::new(), FakeProvider::signed_out());
    portal.resolver.start().await.unwrap();

    let err = portal.resolver.complete_sign_in("stale").await.unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
    assert_eq!(portal.resolver.phase(), SessionPhase::SignedOut);
    assert_eq!(portal.notifier.errors(), vec!["Sign-in failed"]);
}

#[tokio::test]
async fn test_update_own_profile() {
    let store = MemoryStore::new();
    store.add_player("u1", "keeper01", "", "");
    let portal = Portal::signed_in(store, "u1").await;

    let update = ProfileUpdate {
        pro_clubs_name: Some("Safe Hands".to_string()),
        position: Some("GK".to_string()),
        ..Default::default()
    };
    let profile = portal.resolver.update_profile(&update).await.unwrap();

    assert_eq!(profile.pro_clubs_name, "Safe Hands");
    assert_eq!(profile.discord_username, "keeper01");
    assert_eq!(portal.resolver.current_profile().unwrap().position, "GK");
    assert_eq!(portal.notifier.successes(), vec!["Profile updated successfully"]);
}

#[tokio::test]
async fn test_profile_update_requires_sign_in() {
    let portal = Portal::new(MemoryStore::new(), FakeProvider::signed_out());
    portal.resolver.start().await.unwrap();

    let update = ProfileUpdate {
        pro_clubs_name: Some("Nobody".to_string()),
        ..Default::default()
    };
    let err = portal.resolver.update_profile(&update).await.unwrap_err();

    assert!(matches!(err, AppError::Unauthorized(_)));
    assert_eq!(portal.store.call_count(StoreOp::UpdateProfile), 0);
}

#[tokio::test]
async fn test_failed_profile_update_keeps_state() {
    let store = MemoryStore::new();
    store.add_player("u1", "keeper01", "Keeper", "GK");
    let portal = Portal::signed_in(store, "u1").await;
    portal
        .store
        .fail_next(StoreOp::UpdateProfile, AppError::Unauthorized("rls".into()));

    let update = ProfileUpdate {
        pro_clubs_name: Some("Renamed".to_string()),
        ..Default::default()
    };
    assert!(portal.resolver.update_profile(&update).await.is_err());

    assert_eq!(portal.resolver.current_profile().unwrap().pro_clubs_name, "Keeper");
    assert_eq!(portal.notifier.errors(), vec!["Failed to update profile"]);
}
