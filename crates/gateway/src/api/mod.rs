pub mod auth;
pub mod health;
pub mod mcp;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router: `/health` is public, `/mcp` and
/// `/v1/metrics` require authentication (enforced per-route by the
/// `AuthenticatedPrincipal` extractor, not a blanket middleware layer,
/// since `/mcp` needs the mint-and-stash correlation id step that runs
/// before that extractor even resolves).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/mcp", post(mcp::mcp))
        .route("/v1/metrics", get(health::metrics))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use wmcp_browser::{BrowserPool, SessionStore};
    use wmcp_domain::config::Config;
    use wmcp_domain::trace::AuditSink;
    use wmcp_protocol::McpHandler;

    use crate::state::{AppState, Metrics};

    fn test_app(mut config: Config) -> axum::Router {
        config.auth.api_keys = HashMap::from([
            ("admin-key".to_string(), "admin".to_string()),
            ("viewer-key".to_string(), "viewer".to_string()),
        ]);
        let config = Arc::new(config);
        let pool =
            BrowserPool::new(config.browser.max_browsers, config.browser.network_egress_control, config.browser.policy.clone());
        let sessions = SessionStore::new(pool.clone());
        let audit = AuditSink::new(config.audit.level);
        let handler = Arc::new(McpHandler::new(sessions.clone(), pool.clone(), config.clone(), audit.clone()));
        let state = AppState { config, pool, sessions, handler, audit, metrics: Arc::new(Metrics::default()) };
        router().with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public_and_ok() {
        let app = test_app(Config::default());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn metrics_requires_auth() {
        let app = test_app(Config::default());
        let response = app
            .oneshot(Request::builder().uri("/v1/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn metrics_reports_pool_session_and_audit_figures() {
        let app = test_app(Config::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/metrics")
                    .header("api-key", "admin-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["sessions"]["active"], 0);
        assert!(body["pool"]["max"].is_number());
        assert!(body["toolCalls"]["served"].is_number());
        assert!(body["audit"]["eventsEmitted"].is_number());
    }

    #[tokio::test]
    async fn mcp_echoes_correlation_id_only_at_full_audit_level() {
        let mut config = Config::default();
        config.audit.level = wmcp_domain::trace::AuditLevel::Full;
        let app = test_app(config);
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("api-key", "admin-key")
            .body(Body::from(json!({"jsonrpc":"2.0","id":1,"method":"ping"}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert!(body["meta"]["correlationId"].is_string());
    }

    #[tokio::test]
    async fn mcp_records_request_and_response_bodies_at_full_audit_level() {
        let mut config = Config::default();
        config.audit.level = wmcp_domain::trace::AuditLevel::Full;
        config.auth.api_keys = HashMap::from([("admin-key".to_string(), "admin".to_string())]);
        let config = Arc::new(config);
        let pool =
            BrowserPool::new(config.browser.max_browsers, config.browser.network_egress_control, config.browser.policy.clone());
        let sessions = SessionStore::new(pool.clone());
        let audit = AuditSink::new(config.audit.level);
        let handler = Arc::new(McpHandler::new(sessions.clone(), pool.clone(), config.clone(), audit.clone()));
        let state = AppState { config, pool, sessions, handler, audit: audit.clone(), metrics: Arc::new(Metrics::default()) };
        let app = router().with_state(state);

        let before = audit.events_emitted();
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("api-key", "admin-key")
            .body(Body::from(json!({"jsonrpc":"2.0","id":1,"method":"ping"}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        // RequestAdmitted + RequestBody + ResponseBody, at minimum.
        assert!(audit.events_emitted() >= before + 3);
    }

    #[tokio::test]
    async fn mcp_omits_meta_below_full_audit_level() {
        let app = test_app(Config::default());
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("api-key", "admin-key")
            .body(Body::from(json!({"jsonrpc":"2.0","id":1,"method":"ping"}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert!(body.get("meta").is_none());
    }

    #[tokio::test]
    async fn mcp_rejects_unauthenticated_requests() {
        let app = test_app(Config::default());
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(Body::from(json!({"jsonrpc":"2.0","id":1,"method":"ping"}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn mcp_dispatches_ping_for_an_authenticated_admin() {
        let app = test_app(Config::default());
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("api-key", "admin-key")
            .body(Body::from(json!({"jsonrpc":"2.0","id":1,"method":"ping"}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"], json!({}));
    }

    #[tokio::test]
    async fn mcp_denies_viewer_session_open_with_http_forbidden() {
        let app = test_app(Config::default());
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("api-key", "viewer-key")
            .body(Body::from(
                json!({"jsonrpc":"2.0","id":1,"method":"session/open","params":{"url":"https://example.com"}})
                    .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn mcp_malformed_body_is_a_parse_error_over_http_200() {
        let app = test_app(Config::default());
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("api-key", "admin-key")
            .body(Body::from("not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], wmcp_protocol::JsonRpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn mcp_oversized_body_is_rejected_before_parsing() {
        let mut config = Config::default();
        config.server.max_body_bytes = 8;
        let app = test_app(config);
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("api-key", "admin-key")
            .body(Body::from(json!({"jsonrpc":"2.0","id":1,"method":"ping"}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], wmcp_protocol::JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn mcp_unknown_method_is_method_not_found() {
        let app = test_app(Config::default());
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("api-key", "admin-key")
            .body(Body::from(json!({"jsonrpc":"2.0","id":1,"method":"frobnicate"}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], wmcp_protocol::JsonRpcError::METHOD_NOT_FOUND);
    }
}
