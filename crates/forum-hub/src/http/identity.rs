//! Identity resolution for HTTP requests
//!
//! Locating the session id on a request, plus a development resolver that
//! trusts it as the identity.

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use forum_core::validate_identity;

pub use forum_core::IdentityResolver;

/// Header carrying the session id
pub const SESSION_HEADER: &str = "x-session-id";
/// Query parameter and cookie name carrying the session id
pub const SESSION_PARAM: &str = "session_id";

/// Treats the session id itself as the identity. Development only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughResolver;

#[async_trait]
impl IdentityResolver for PassthroughResolver {
    async fn resolve(&self, session_id: &str) -> Option<String> {
        validate_identity(session_id)
            .ok()
            .map(|()| session_id.to_string())
    }
}

/// Session id of a request: header first, then query parameter, then cookie.
pub fn session_id(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    let from_header = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(id) = from_header {
        return Some(id.to_string());
    }

    if let Some(id) = query.map(str::trim).filter(|s| !s.is_empty()) {
        return Some(id.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_PARAM && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_passthrough_validates() {
        assert_eq!(
            PassthroughResolver.resolve("alice").await.as_deref(),
            Some("alice")
        );
        assert!(PassthroughResolver.resolve("all").await.is_none());
    }

    #[test]
    fn test_session_id_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_id=from-cookie"),
        );
        assert_eq!(session_id(&headers, None).as_deref(), Some("from-cookie"));
        assert_eq!(
            session_id(&headers, Some("from-query")).as_deref(),
            Some("from-query")
        );

        headers.insert(SESSION_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(
            session_id(&headers, Some("from-query")).as_deref(),
            Some("from-header")
        );
        assert!(session_id(&HeaderMap::new(), Some("  ")).is_none());
    }
}
