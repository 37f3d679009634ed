//! E2E tests: store requests and error classification over HTTP.

use std::sync::Arc;

use chrono::Utc;
use league_portal::auth::IdentityProvider;
use league_portal::db::LeagueStore;
use league_portal::error::AppError;
use league_portal::models::{
    ApprovalStatus, FreeAgentDecision, NewManagerAssignment, NewProfile, ProfileUpdate,
};

use super::mock_backend::MockBackend;
use super::test_helpers::*;

/// (1) Single-row read carries both keys and asks for one object.
#[actix_rt::test]
async fn test_profile_read_headers_and_url() {
    let mock = MockBackend::start().await;
    let store = anon_store(&mock);

    mock.respond(
        "GET",
        "/rest/v1/profiles",
        200,
        serde_json::json!({
            "id": "u1",
            "discord_username": "keeper01",
            "pro_clubs_name": null,
            "position": "GK",
            "goals": null,
            "assists": 3,
            "average_rating": 7.5
        }),
    );

    let profile = store.fetch_profile("u1").await.unwrap();
    assert_eq!(profile.discord_username, "keeper01");
    assert_eq!(profile.pro_clubs_name, "");
    assert_eq!(profile.goals, 0);
    assert_eq!(profile.assists, 3);

    let req = mock.last("GET", "/rest/v1/profiles");
    assert_eq!(req.apikey.as_deref(), Some(ANON_KEY));
    assert_eq!(
        req.authorization.as_deref(),
        Some(format!("Bearer {}", ANON_KEY).as_str())
    );
    assert_eq!(
        req.accept.as_deref(),
        Some("application/vnd.pgrst.object+json")
    );
    assert_eq!(req.query, "select=*&id=eq.u1");
}

/// (2) Zero rows on a single-row read is NotFound, whichever way it is reported.
#[actix_rt::test]
async fn test_missing_profile_is_not_found() {
    let mock = MockBackend::start().await;
    let store = anon_store(&mock);

    mock.respond(
        "GET",
        "/rest/v1/profiles",
        406,
        serde_json::json!({
            "code": "PGRST116",
            "message": "JSON object requested, multiple (or no) rows returned",
            "details": "The result contains 0 rows"
        }),
    );
    mock.respond("GET", "/rest/v1/profiles", 406, serde_json::json!("Not Acceptable"));

    assert!(store.fetch_profile("ghost").await.unwrap_err().is_not_found());
    assert!(store.fetch_profile("ghost").await.unwrap_err().is_not_found());
}

/// (3) Duplicate insert surfaces as Conflict.
#[actix_rt::test]
async fn test_duplicate_profile_insert_is_conflict() {
    let mock = MockBackend::start().await;
    let store = anon_store(&mock);

    mock.respond(
        "POST",
        "/rest/v1/profiles",
        409,
        serde_json::json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"profiles_pkey\"",
            "details": "Key (id)=(u1) already exists."
        }),
    );

    let new_profile = NewProfile {
        id: "u1".to_string(),
        discord_username: Some("keeper01".to_string()),
    };
    let err = store.insert_profile(&new_profile).await.unwrap_err();
    assert!(err.is_conflict(), "expected conflict, got {:?}", err);
    assert!(err.to_string().contains("already exists"));

    let req = mock.last("POST", "/rest/v1/profiles");
    assert_eq!(req.prefer.as_deref(), Some("return=minimal"));
    assert_eq!(
        req.body,
        Some(serde_json::json!({ "id": "u1", "discord_username": "keeper01" }))
    );
}

/// (4) Row-level denials and server faults keep their own variants.
#[actix_rt::test]
async fn test_denied_and_remote_errors() {
    let mock = MockBackend::start().await;
    let store = anon_store(&mock);

    mock.respond(
        "PATCH",
        "/rest/v1/profiles",
        403,
        serde_json::json!({
            "code": "42501",
            "message": "new row violates row-level security policy for table \"profiles\""
        }),
    );
    mock.respond(
        "GET",
        "/rest/v1/teams",
        500,
        serde_json::json!({ "message": "connection pool exhausted" }),
    );

    let update = ProfileUpdate {
        goals: Some(3),
        ..Default::default()
    };
    let err = store.update_profile("p2", &update).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)), "got {:?}", err);

    match store.list_teams().await.unwrap_err() {
        AppError::Remote { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "connection pool exhausted");
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

/// (5) Decisions patch the applicant's row with the decision fields only.
#[actix_rt::test]
async fn test_free_agent_decision_patch() {
    let mock = MockBackend::start().await;
    let store = anon_store(&mock);
    mock.respond("PATCH", "/rest/v1/free_agent_approvals", 204, serde_json::Value::Null);

    let decision = FreeAgentDecision {
        player_id: "p3".to_string(),
        status: ApprovalStatus::Approved,
        approved_at: Utc::now(),
        approved_by: Some("admin-1".to_string()),
    };
    store.decide_free_agent(&decision).await.unwrap();

    let req = mock.last("PATCH", "/rest/v1/free_agent_approvals");
    assert_eq!(req.query, "player_id=eq.p3");
    let body = req.body.unwrap();
    assert_eq!(body["status"], "approved");
    assert_eq!(body["approved_by"], "admin-1");
    assert!(body["approved_at"].is_string());
    assert!(body.get("player_id").is_none());
}

/// (6) Manager assignment and removal hit the assignment relation.
#[actix_rt::test]
async fn test_manager_assign_and_remove() {
    let mock = MockBackend::start().await;
    let store = anon_store(&mock);
    mock.respond("DELETE", "/rest/v1/manager_assignments", 204, serde_json::Value::Null);

    let assignment = NewManagerAssignment {
        user_id: "p1".to_string(),
        team_id: "t1".to_string(),
        assigned_by: None,
    };
    store.assign_manager(&assignment).await.unwrap();
    store.remove_manager("m7").await.unwrap();

    let insert = mock.last("POST", "/rest/v1/manager_assignments");
    assert_eq!(
        insert.body,
        Some(serde_json::json!({ "user_id": "p1", "team_id": "t1" }))
    );

    let delete = mock.last("DELETE", "/rest/v1/manager_assignments");
    assert_eq!(delete.query, "id=eq.m7");
}

/// (7) Signed applicants are dropped from the manager's free-agent list.
#[actix_rt::test]
async fn test_unsigned_free_agents_filter() {
    let mock = MockBackend::start().await;
    let store = anon_store(&mock);

    mock.respond(
        "GET",
        "/rest/v1/free_agent_approvals",
        200,
        serde_json::json!([
            {
                "status": "approved",
                "created_at": "2025-04-01T10:00:00Z",
                "profiles": { "id": "p1", "discord_username": "alv", "position": "ST",
                              "team_memberships": [{ "id": "tm1" }] }
            },
            {
                "status": "approved",
                "created_at": "2025-04-02T10:00:00Z",
                "profiles": { "id": "p3", "discord_username": "case", "position": "CDM",
                              "team_memberships": [] }
            }
        ]),
    );

    let agents = store.unsigned_free_agents().await.unwrap();
    let ids: Vec<&str> = agents.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["p3"]);

    let req = mock.last("GET", "/rest/v1/free_agent_approvals");
    assert!(req.query.contains("status=eq.approved"), "query: {}", req.query);
    assert!(req.query.contains("order=created_at.asc"), "query: {}", req.query);
}

/// (8) Role lookups are existence checks limited to one row.
#[actix_rt::test]
async fn test_role_lookups() {
    let mock = MockBackend::start().await;
    let store = anon_store(&mock);
    mock.respond("GET", "/rest/v1/admin_roles", 200, serde_json::json!([{ "id": "r1" }]));

    assert!(store.is_admin("u1").await.unwrap());
    assert!(!store.is_manager("u1").await.unwrap());

    let req = mock.last("GET", "/rest/v1/manager_assignments");
    assert_eq!(req.query, "select=id&user_id=eq.u1&limit=1");
}

/// (9) A signed-in store sends the session's access token as the bearer.
#[actix_rt::test]
async fn test_session_token_is_bearer() {
    let mock = MockBackend::start().await;
    let (client, _dir) = auth_client(&mock);
    let client = Arc::new(client);
    let provider: Arc<dyn IdentityProvider> = client.clone();
    let store = authed_store(&mock, provider);

    store.list_teams().await.unwrap();
    assert_eq!(
        mock.last("GET", "/rest/v1/teams").authorization.as_deref(),
        Some(format!("Bearer {}", ANON_KEY).as_str())
    );

    sign_in(&mock, &client).await;
    store.list_teams().await.unwrap();

    let req = mock.last("GET", "/rest/v1/teams");
    assert_eq!(req.authorization.as_deref(), Some("Bearer access-1"));
    assert_eq!(req.apikey.as_deref(), Some(ANON_KEY));
}
