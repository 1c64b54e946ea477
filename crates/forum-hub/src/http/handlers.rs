//! Route handlers

use super::{AppState, error::ApiError, identity::session_id};
use crate::config::DuplicateLoginPolicy;
use axum::{
    Json,
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use forum_core::{ChatMessage, validate_identity};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub with: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineUsersResponse {
    pub online_users: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub with: String,
    pub messages: Vec<ChatMessage>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub online: usize,
}

async fn caller(state: &AppState, headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    let id = session_id(headers, query)?;
    state.identities.resolve(&id).await
}

/// `GET /ws`
pub async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let identity = caller(&state, &headers, query.session_id.as_deref())
        .await
        .ok_or(ApiError::Unauthorized)?;
    validate_identity(&identity).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if state.hub.config().duplicate_login == DuplicateLoginPolicy::RejectNew
        && state.hub.is_online(&identity).await
    {
        return Err(ApiError::Conflict(format!(
            "'{identity}' already has an open connection"
        )));
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    info!(identity = %identity, "WebSocket upgrade accepted");
    let hub = state.hub.clone();
    Ok(ws.on_upgrade(move |socket| serve(hub, identity, socket)))
}

async fn serve(hub: crate::Hub, identity: String, socket: WebSocket) {
    let session = match hub.connect(&identity).await {
        Ok(session) => session,
        Err(e) => {
            warn!(identity = %identity, error = %e, "Connection refused after upgrade");
            return;
        }
    };

    let (sink, stream) = socket.split();
    hub.serve_socket(session, stream, sink).await;
}

/// `GET /api/online-users`
pub async fn online_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Json<OnlineUsersResponse> {
    let online_users = match caller(&state, &headers, query.session_id.as_deref()).await {
        Some(identity) => state.hub.presence_view(&identity).await,
        None => state.hub.online_identities().await,
    };

    Json(OnlineUsersResponse {
        count: online_users.len(),
        online_users,
    })
}

/// `GET /api/chat/history`
pub async fn chat_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let identity = caller(&state, &headers, query.session_id.as_deref())
        .await
        .ok_or(ApiError::Unauthorized)?;

    let with = query
        .with
        .filter(|w| !w.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing 'with' parameter".to_string()))?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, state.history_max_limit);
    let offset = query.offset.unwrap_or(0);

    let messages = state.hub.history(&identity, &with, limit, offset).await?;

    Ok(Json(HistoryResponse {
        with,
        messages,
        limit,
        offset,
    }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        online: state.hub.connection_count().await,
    })
}
