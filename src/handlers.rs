// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the sharegate service.
//!
//! The JSON API publishes and lists documents; `/d/:id` serves the
//! sanitized markup itself for embedding or direct viewing.

use crate::config::Config;
use crate::document::{is_document_id, DocumentSummary, SharedDocument, Submission};
use crate::error::{AppError, Result};
use crate::identity::subject_from_request;
use crate::pipeline::Publisher;
use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Default size of the recent documents list.
const DEFAULT_RECENT_LIMIT: usize = 10;

/// Delivery-time isolation for markup that kept its active content.
const PERMISSIVE_CSP: &str = "sandbox allow-scripts";

/// Shared application state.
pub struct AppState {
    pub publisher: Publisher,
    pub config: Config,
}

impl AppState {
    fn subject(&self, headers: &HeaderMap, peer: Option<ConnectInfo<SocketAddr>>) -> String {
        subject_from_request(
            headers,
            peer.map(|ConnectInfo(addr)| addr),
            self.config.identity.trust_forwarded_headers,
        )
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Recent list query.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/documents", post(publish).get(recent))
        .route("/api/documents/:id", get(get_document))
        .route("/d/:id", get(render_document));

    let metrics_path = state.config.metrics.path.as_str();
    if state.config.metrics.enabled {
        if metrics_path.starts_with('/') {
            app = app.route(metrics_path, get(metrics));
        } else {
            warn!(path = %metrics_path, "Metrics path must start with '/', endpoint disabled");
        }
    }

    app.layer(cors_layer(&state.config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "sharegate",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response> {
    let body = state
        .publisher
        .metrics()
        .render()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// Publish a document.
pub async fn publish(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(submission): Json<Submission>,
) -> Result<(StatusCode, Json<SharedDocument>)> {
    let subject = state.subject(&headers, peer);
    debug!(subject = %subject, title = %submission.title, "Processing publish request");

    let document = state.publisher.publish(&subject, submission).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// List recent public documents.
pub async fn recent(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<DocumentSummary>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(Json(state.publisher.recent(limit).await?))
}

/// Fetch one document as JSON, counting a view.
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<SharedDocument>> {
    if !is_document_id(&id) {
        return Err(AppError::NotFound(id));
    }
    let subject = state.subject(&headers, peer);
    Ok(Json(state.publisher.view(&subject, &id).await?))
}

/// Serve a document's markup, counting a view.
pub async fn render_document(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response> {
    if !is_document_id(&id) {
        return Err(AppError::NotFound(id));
    }
    let subject = state.subject(&headers, peer);
    let document = state.publisher.view(&subject, &id).await?;
    let sandboxed = document.needs_sandbox();

    let mut response = (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        document.content,
    )
        .into_response();

    if sandboxed {
        response.headers_mut().insert(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(PERMISSIVE_CSP),
        );
    }
    Ok(response)
}
