//! HTTP surface tests driven through `tower::ServiceExt::oneshot`

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use forum_core::ChatMessage;
use forum_hub::{
    DuplicateLoginPolicy, Hub, HubConfig,
    http::{AppState, IdentityResolver, PassthroughResolver, router},
};
use forum_store::InMemoryMessageStore;
use rstest::rstest;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tower::ServiceExt;

/// Fixed session table standing in for the forum's login sessions.
struct StaticSessions(HashMap<String, String>);

#[async_trait::async_trait]
impl IdentityResolver for StaticSessions {
    async fn resolve(&self, session_id: &str) -> Option<String> {
        self.0.get(session_id).cloned()
    }
}

fn hub_with(policy: DuplicateLoginPolicy) -> Hub {
    let config = HubConfig::builder().duplicate_login(policy).build();
    Hub::new(config, Arc::new(InMemoryMessageStore::new()))
}

fn app(hub: &Hub) -> Router {
    let state = AppState::new(hub.clone(), Arc::new(PassthroughResolver)).with_history_max_limit(5);
    router(state, true)
}

async fn get(app: Router, uri: &str, session: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(session) = session {
        request = request.header("x-session-id", session);
    }
    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn route_and_persist(hub: &Hub, message: ChatMessage) {
    let outcome = hub.route(message).await;
    assert!(outcome.follow_up.await.unwrap().persisted);
}

#[tokio::test]
async fn test_health_reports_online_count() {
    let hub = hub_with(DuplicateLoginPolicy::ReplaceExisting);
    let _alice = hub.connect("alice").await.unwrap();

    let (status, body) = get(app(&hub), "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["online"], 1);
}

#[tokio::test]
async fn test_online_users_anonymous_is_alphabetical() {
    let hub = hub_with(DuplicateLoginPolicy::ReplaceExisting);
    let _carol = hub.connect("carol").await.unwrap();
    let _alice = hub.connect("alice").await.unwrap();

    let (status, body) = get(app(&hub), "/api/online-users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["online_users"], serde_json::json!(["alice", "carol"]));
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_online_users_for_caller_is_recency_sorted() {
    let hub = hub_with(DuplicateLoginPolicy::ReplaceExisting);
    let _alice = hub.connect("alice").await.unwrap();
    let _bob = hub.connect("bob").await.unwrap();
    let _zoe = hub.connect("zoe").await.unwrap();
    let outcome = hub.route(ChatMessage::new("zoe", "alice", "hey")).await;
    outcome.follow_up.await.unwrap();

    let (_, body) = get(app(&hub), "/api/online-users", Some("alice")).await;
    assert_eq!(body["online_users"], serde_json::json!(["zoe", "bob"]));

    let (_, body) = get(app(&hub), "/api/online-users?session_id=bob", None).await;
    assert_eq!(body["online_users"], serde_json::json!(["alice", "zoe"]));
}

#[rstest]
#[case("/api/chat/history?with=bob", None, StatusCode::UNAUTHORIZED)]
#[case("/api/chat/history", Some("alice"), StatusCode::BAD_REQUEST)]
#[case("/api/chat/history?with=", Some("alice"), StatusCode::BAD_REQUEST)]
#[case("/ws", None, StatusCode::UNAUTHORIZED)]
#[case("/ws?session_id=all", None, StatusCode::UNAUTHORIZED)]
#[tokio::test]
async fn test_request_rejections(
    #[case] uri: &str,
    #[case] session: Option<&str>,
    #[case] expected: StatusCode,
) {
    let hub = hub_with(DuplicateLoginPolicy::ReplaceExisting);
    let (status, body) = get(app(&hub), uri, session).await;
    assert_eq!(status, expected);
    assert!(body["code"].is_string());
}

#[tokio::test]
async fn test_ws_conflict_under_reject_policy() {
    let hub = hub_with(DuplicateLoginPolicy::RejectNew);
    let _alice = hub.connect("alice").await.unwrap();

    let (status, body) = get(app(&hub), "/ws", Some("alice")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_connected");
}

#[tokio::test]
async fn test_history_page_is_chronological_and_clamped() {
    let hub = hub_with(DuplicateLoginPolicy::ReplaceExisting);
    for i in 0..8 {
        route_and_persist(&hub, ChatMessage::new("alice", "bob", format!("m{i}"))).await;
    }
    route_and_persist(&hub, ChatMessage::new("alice", "carol", "elsewhere")).await;

    let (status, body) = get(app(&hub), "/api/chat/history?with=alice&limit=50", Some("bob")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 5);

    let contents: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["m3", "m4", "m5", "m6", "m7"]);

    let (_, body) = get(
        app(&hub),
        "/api/chat/history?with=alice&limit=5&offset=5",
        Some("bob"),
    )
    .await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_opaque_session_cookie_resolves_to_identity() {
    let hub = hub_with(DuplicateLoginPolicy::ReplaceExisting);
    let _bob = hub.connect("bob").await.unwrap();
    let _carol = hub.connect("carol").await.unwrap();

    let sessions = StaticSessions(HashMap::from([(
        "opaque-token".to_string(),
        "carol".to_string(),
    )]));
    let app = router(AppState::new(hub.clone(), Arc::new(sessions)), false);

    let request = Request::builder()
        .uri("/api/online-users")
        .header("cookie", "session_id=opaque-token")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["online_users"], serde_json::json!(["bob"]));

    let (status, _) = get(app, "/api/chat/history?with=bob", Some("carol")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
