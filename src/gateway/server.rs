//! HTTP/WebSocket server
//!
//! - `GET /ws/agent_stream/{session_id}?is_audio=<bool>` upgrades to the relay stream
//! - `GET /health` reports liveness and the number of live sessions

use std::future::Future;
use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, Method};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::relay::{run_session, ConnectParams, RelayContext};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayContext>,
}

/// Query parameters accepted on the stream endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub is_audio: bool,
}

/// Build the router
pub fn router(relay: Arc<RelayContext>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/ws/agent_stream/{session_id}", get(agent_stream))
        .route("/health", get(health_check))
        .layer(build_cors(&config.allowed_origins))
        .with_state(AppState { relay })
}

/// Bind `config.listen_addr()` and serve until `shutdown` resolves
pub async fn serve<F>(relay: Arc<RelayContext>, config: &ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;
    serve_on(listener, relay, config, shutdown).await
}

/// Serve on an already-bound listener
pub async fn serve_on<F>(
    listener: TcpListener,
    relay: Arc<RelayContext>,
    config: &ServerConfig,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "Relay listening");
    axum::serve(listener, router(relay, config))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn agent_stream(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!(session_id = %session_id, is_audio = query.is_audio, "WebSocket connection attempt");
    let params = ConnectParams::new(session_id, query.is_audio);
    ws.on_upgrade(move |socket| handle_socket(socket, state.relay, params))
}

async fn handle_socket(socket: WebSocket, relay: Arc<RelayContext>, params: ConnectParams) {
    let (sink, stream) = socket.split();
    run_session(relay, params, sink, stream).await;
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "engine": state.relay.engine.name(),
        "sessions": state.relay.sessions.len().await,
    }))
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::LoopbackEngine;
    use crate::config::Config;
    use crate::tools::{StaticProfileProvider, ToolPipeline, ToolRegistry};
    use axum::http::StatusCode;

    fn relay() -> Arc<RelayContext> {
        let config = Config::default();
        let pipeline = ToolPipeline::from_config(
            &config.guard,
            ToolRegistry::new(),
            Arc::new(StaticProfileProvider::with_demo_customer("123")),
        );
        Arc::new(RelayContext::new(
            &config,
            Arc::new(LoopbackEngine::new()),
            Arc::new(pipeline),
        ))
    }

    #[tokio::test]
    async fn test_health_check() {
        let state = AppState { relay: relay() };
        let resp = health_check(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_router_serves_health_and_rejects_plain_stream_request() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let app = router(relay(), &ServerConfig::default());

        let resp = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["engine"], "loopback");
        assert_eq!(health["sessions"], 0);

        // No upgrade headers: the extractor refuses before any session exists.
        let resp = app
            .oneshot(Request::get("/ws/agent_stream/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }

    #[test]
    fn test_query_defaults() {
        let query: StreamQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.is_audio);

        // Identity is never taken from the client.
        let query: StreamQuery = serde_json::from_str(r#"{"is_audio": true, "customer_id": "999"}"#).unwrap();
        assert!(query.is_audio);
    }
}
