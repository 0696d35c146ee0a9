//! Handler-level tests of the HTTP API, driven through the router with
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use vouch_rpc::{RpcServer, RpcState};
use vouch_session::{CoordMetrics, LifecycleEngine};
use vouch_store::memory::MemorySessionStore;
use vouch_store::SessionStore;
use vouch_types::SessionStatus;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_app() -> (Arc<MemorySessionStore>, Router) {
    test_app_with_object_store(None)
}

fn test_app_with_object_store(
    object_store: Option<Arc<dyn vouch_session::ObjectStore>>,
) -> (Arc<MemorySessionStore>, Router) {
    let store = Arc::new(MemorySessionStore::new());
    let metrics = Arc::new(CoordMetrics::new());
    let engine = Arc::new(LifecycleEngine::new(store.clone(), metrics.clone()));
    let state = Arc::new(RpcState::new(
        store.clone(),
        engine,
        metrics,
        "http://localhost:3005",
        24 * 3600,
        None,
        object_store,
    ));
    (store, RpcServer::router(state))
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, staff: Option<(&str, &str)>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some((id, role)) = staff {
        builder = builder.header("x-staff-id", id).header("x-staff-role", role);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_req(uri: &str, staff: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some((id, role)) = staff {
        builder = builder.header("x-staff-id", id).header("x-staff-role", role);
    }
    builder.body(Body::empty()).unwrap()
}

async fn create_session(app: &Router, staff: (&str, &str)) -> serde_json::Value {
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/sessions",
            Some(staff),
            r#"{"name":"Asha Rao","phone":"+911234567890"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// ---------------------------------------------------------------------------
// Session creation and lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_requires_staff_identity() {
    let (_store, app) = test_app();
    let resp = app
        .oneshot(post_json("/api/sessions", None, r#"{"name":"Asha"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn agent_created_session_is_self_assigned() {
    let (_store, app) = test_app();
    let body = create_session(&app, ("alice", "agent")).await;
    let session = &body["session"];
    assert_eq!(session["status"], "not_started");
    assert_eq!(session["assignee"], "alice");
    let token = session["token"].as_str().unwrap();
    assert!(token.starts_with("sess_"));
    assert!(session["join_link"].as_str().unwrap().ends_with(token));
}

#[tokio::test]
async fn lookup_by_link_accepts_bare_token() {
    let (_store, app) = test_app();
    let body = create_session(&app, ("root", "admin")).await;
    let token = body["session"]["token"].as_str().unwrap();

    let resp = app
        .clone()
        .oneshot(get_req(&format!("/api/sessions/by-link/{token}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["session"]["token"], token);
}

#[tokio::test]
async fn agents_cannot_see_closed_sessions_admins_can() {
    let (store, app) = test_app();
    let body = create_session(&app, ("alice", "agent")).await;
    let token = body["session"]["token"].as_str().unwrap().to_string();

    let parsed = vouch_types::SessionToken::parse(&token).unwrap();
    store
        .update_conditional(&parsed, &|record| {
            record.status = SessionStatus::Completed;
            Ok(())
        })
        .unwrap();

    let resp = app
        .clone()
        .oneshot(get_req(
            &format!("/api/sessions/{token}"),
            Some(("alice", "agent")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .clone()
        .oneshot(get_req(
            &format!("/api/sessions/{token}"),
            Some(("root", "admin")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_claim_conflicts() {
    let (_store, app) = test_app();
    let body = create_session(&app, ("root", "admin")).await;
    let token = body["session"]["token"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{token}/claim"),
            Some(("staff-a", "agent")),
            "{}",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["session"]["assignee"], "staff-a");

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{token}/claim"),
            Some(("staff-b", "agent")),
            "{}",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["code"], "already_claimed");
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reject_without_reason_is_a_validation_error() {
    let (store, app) = test_app();
    let body = create_session(&app, ("alice", "agent")).await;
    let token = body["session"]["token"].as_str().unwrap().to_string();
    let parsed = vouch_types::SessionToken::parse(&token).unwrap();
    store
        .update_conditional(&parsed, &|record| {
            record.status = SessionStatus::PendingReview;
            Ok(())
        })
        .unwrap();

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{token}/status"),
            Some(("alice", "agent")),
            r#"{"status":"rejected"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{token}/status"),
            Some(("alice", "agent")),
            r#"{"status":"rejected","note":"document mismatch"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["session"]["status"], "rejected");
    assert!(body["session"]["notes"]
        .as_str()
        .unwrap()
        .contains("document mismatch"));
    assert!(body["session"]["completed_at"].is_number());
}

#[tokio::test]
async fn stale_transition_conflicts() {
    let (_store, app) = test_app();
    let body = create_session(&app, ("alice", "agent")).await;
    let token = body["session"]["token"].as_str().unwrap().to_string();

    // completed straight from not_started is not in the table.
    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{token}/status"),
            Some(("alice", "agent")),
            r#"{"status":"completed"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["code"], "stale_state");
}

#[tokio::test]
async fn expired_cannot_be_set_directly() {
    let (_store, app) = test_app();
    let body = create_session(&app, ("alice", "agent")).await;
    let token = body["session"]["token"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{token}/status"),
            Some(("alice", "agent")),
            r#"{"status":"expired"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Requester end-of-call
// ---------------------------------------------------------------------------

#[tokio::test]
async fn end_session_is_unauthenticated_and_idempotent() {
    let (store, app) = test_app();
    let body = create_session(&app, ("alice", "agent")).await;
    let token = body["session"]["token"].as_str().unwrap().to_string();
    let parsed = vouch_types::SessionToken::parse(&token).unwrap();

    let resp = app
        .clone()
        .oneshot(post_json(&format!("/api/sessions/{token}/end"), None, "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["session"]["status"], "expired");

    let first_completed = store.get(&parsed).unwrap().completed_at;
    assert!(first_completed.is_some());

    // Second end: success with a message, no state change.
    let resp = app
        .clone()
        .oneshot(post_json(&format!("/api/sessions/{token}/end"), None, "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "session already closed");
    assert_eq!(store.get(&parsed).unwrap().completed_at, first_completed);
}

// ---------------------------------------------------------------------------
// Listing policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listing_respects_agent_visibility() {
    let (store, app) = test_app();

    // alice's own session, an open one, bob's session, and a closed one.
    let own = create_session(&app, ("alice", "agent")).await;
    let open = create_session(&app, ("root", "admin")).await;
    let foreign = create_session(&app, ("bob", "agent")).await;
    let closed = create_session(&app, ("root", "admin")).await;
    let closed_token = vouch_types::SessionToken::parse(
        closed["session"]["token"].as_str().unwrap(),
    )
    .unwrap();
    store
        .update_conditional(&closed_token, &|record| {
            record.status = SessionStatus::Expired;
            Ok(())
        })
        .unwrap();

    let resp = app
        .clone()
        .oneshot(get_req("/api/sessions", Some(("alice", "agent"))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let tokens: Vec<&str> = body["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["token"].as_str().unwrap())
        .collect();
    assert!(tokens.contains(&own["session"]["token"].as_str().unwrap()));
    assert!(tokens.contains(&open["session"]["token"].as_str().unwrap()));
    assert!(!tokens.contains(&foreign["session"]["token"].as_str().unwrap()));
    assert!(!tokens.contains(&closed["session"]["token"].as_str().unwrap()));

    let resp = app
        .clone()
        .oneshot(get_req("/api/sessions", Some(("root", "admin"))))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["count"], 4);
}

// ---------------------------------------------------------------------------
// Artifacts and metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn artifacts_accumulate_without_touching_status() {
    let (store, app) = test_app();
    let body = create_session(&app, ("alice", "agent")).await;
    let token = body["session"]["token"].as_str().unwrap().to_string();
    let parsed = vouch_types::SessionToken::parse(&token).unwrap();

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{token}/artifacts"),
            Some(("alice", "agent")),
            r#"{"extracted_fields":{"name":"ASHA RAO","id_number":"X123"},"similarity_score":0.93,"recording_locator":"recordings/abc"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let record = store.get(&parsed).unwrap();
    assert_eq!(record.status, SessionStatus::NotStarted);
    assert_eq!(record.artifacts.similarity_score, Some(0.93));
    assert_eq!(record.artifacts.recordings, vec!["recordings/abc"]);
    assert_eq!(
        record.artifacts.extracted_fields.as_ref().unwrap()["id_number"],
        "X123"
    );
}

#[tokio::test]
async fn recordings_are_listed_with_signed_urls() {
    use async_trait::async_trait;
    use vouch_session::{ExternalError, ObjectStore};

    struct FakeObjectStore;

    #[async_trait]
    impl ObjectStore for FakeObjectStore {
        async fn put(&self, _bytes: &[u8]) -> Result<String, ExternalError> {
            Ok("recordings/new".into())
        }
        async fn get(&self, _locator: &str) -> Result<Vec<u8>, ExternalError> {
            Ok(Vec::new())
        }
        async fn signed_url(&self, locator: &str, ttl_secs: u64) -> Result<String, ExternalError> {
            Ok(format!("https://store.example/{locator}?ttl={ttl_secs}"))
        }
    }

    let (_store, app) = test_app_with_object_store(Some(Arc::new(FakeObjectStore)));
    let body = create_session(&app, ("alice", "agent")).await;
    let token = body["session"]["token"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{token}/artifacts"),
            Some(("alice", "agent")),
            r#"{"recording_locator":"recordings/abc"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(get_req(
            &format!("/api/sessions/{token}/recordings"),
            Some(("alice", "agent")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let recordings = body["recordings"].as_array().unwrap();
    assert_eq!(recordings.len(), 1);
    assert_eq!(recordings[0]["locator"], "recordings/abc");
    assert_eq!(
        recordings[0]["url"],
        "https://store.example/recordings/abc?ttl=3600"
    );
}

#[tokio::test]
async fn health_and_metrics_respond() {
    let (_store, app) = test_app();

    let resp = app.clone().oneshot(get_req("/health", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.clone().oneshot(get_req("/metrics", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("vouch_sessions_created_total"));
}
