//! JSON API in front of the graph builder and a shared graph session.
//!
//! The browser-side renderer polls or posts here instead of fetching entity
//! documents itself.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::builder::GraphBuilder;
use crate::config::HttpServerConfig;
use crate::error::{GraphError, Result};
use crate::graph::{Graph, Node};
use crate::session::{GraphSession, SessionUpdate};

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    builder: GraphBuilder,
    session: Arc<GraphSession>,
}

#[derive(Deserialize)]
struct GraphQuery {
    /// Comma-separated entity names
    entities: String,
}

#[derive(Deserialize)]
struct SearchRequest {
    entity: String,
}

#[derive(Serialize)]
struct SessionSnapshot {
    /// Latest ticket issued, including requests still in flight.
    sequence: u64,
    /// Ticket of the update that produced `graph`.
    committed: u64,
    graph: Graph,
}

#[derive(Serialize)]
struct UpdateResponse {
    applied: bool,
    sequence: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    graph: Option<Graph>,
}

impl From<SessionUpdate> for UpdateResponse {
    fn from(update: SessionUpdate) -> Self {
        match update {
            SessionUpdate::Applied { sequence, graph } => Self {
                applied: true,
                sequence,
                graph: Some(graph),
            },
            SessionUpdate::Stale { sequence, .. } => Self {
                applied: false,
                sequence,
                graph: None,
            },
        }
    }
}

pub struct GraphServer {
    state: AppState,
    allowed_origins: Vec<String>,
}

impl GraphServer {
    pub fn new(builder: GraphBuilder, session: Arc<GraphSession>, config: &HttpServerConfig) -> Self {
        Self {
            state: AppState { builder, session },
            allowed_origins: config.allowed_origins.clone(),
        }
    }

    /// Run the HTTP server on 127.0.0.1:`port`
    pub async fn run(&self, port: u16) -> Result<()> {
        let app = self.router();
        let addr = format!("127.0.0.1:{}", port);

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            GraphError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;

        log::info!("Serving graph API on http://{}", addr);

        axum::serve(listener, app).await.map_err(|e| {
            GraphError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }

    /// Create the axum router
    pub fn router(&self) -> Router {
        // Empty allowed_origins means any origin (local dev).
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/health", get(handle_health))
            .route("/api/graph", get(handle_graph))
            .route("/api/session", get(handle_session))
            .route("/api/session/search", post(handle_search))
            .route("/api/session/expand", post(handle_expand))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }
}

fn error_response(err: GraphError) -> Response {
    let status = match &err {
        GraphError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    log::error!("Request failed: {}", err);
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_graph(State(state): State<AppState>, Query(query): Query<GraphQuery>) -> Response {
    let names: Vec<&str> = query
        .entities
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();

    match state.builder.build_graph(&names).await {
        Ok(graph) => Json(graph).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(SessionSnapshot {
        sequence: state.session.sequence(),
        committed: state.session.committed(),
        graph: state.session.current(),
    })
}

async fn handle_search(State(state): State<AppState>, Json(request): Json<SearchRequest>) -> Response {
    match state.session.search(&request.entity).await {
        Ok(update) => Json(UpdateResponse::from(update)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_expand(State(state): State<AppState>, Json(node): Json<Node>) -> Response {
    match state.session.expand(&node).await {
        Ok(update) => Json(UpdateResponse::from(update)).into_response(),
        Err(e) => error_response(e),
    }
}
