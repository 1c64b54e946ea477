//! HTTP surface: WebSocket upgrade entrypoint and read-only chat queries

pub mod error;
pub mod handlers;
pub mod identity;

pub use error::ApiError;
pub use identity::{IdentityResolver, PassthroughResolver};

use crate::hub::Hub;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared state of every route
#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
    pub identities: Arc<dyn IdentityResolver>,
    pub history_max_limit: usize,
}

impl AppState {
    pub fn new(hub: Hub, identities: Arc<dyn IdentityResolver>) -> Self {
        Self {
            hub,
            identities,
            history_max_limit: 100,
        }
    }

    pub fn with_history_max_limit(mut self, limit: usize) -> Self {
        self.history_max_limit = limit.max(1);
        self
    }
}

/// Build the router with tracing; CORS is permissive when enabled.
pub fn router(state: AppState, enable_cors: bool) -> Router {
    let mut router = Router::new()
        .route("/ws", get(handlers::ws_handler))
        .route("/api/online-users", get(handlers::online_users))
        .route("/api/chat/history", get(handlers::chat_history))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
