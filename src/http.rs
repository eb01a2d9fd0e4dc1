//! HTTP query surface (§6): `GET /health`, `GET /metrics`, `GET /search`.

use crate::errors::AppError;
use crate::search;
use crate::store::Store;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

pub fn router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(cors_origin.parse().expect("CORS_ORIGIN must be a valid header value")))
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/search", get(search_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[tracing::instrument(skip(state))]
async fn metrics(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppErrorResponse> {
    let stats = state.store.get_crawler_stats().await.map_err(AppError::from)?;
    Ok(Json(json!({ "metrics": stats })))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[tracing::instrument(skip(state, params), fields(q = params.q.as_deref().unwrap_or("")))]
async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<search::SearchResponse>, AppErrorResponse> {
    let start = Instant::now();
    let q = params.q.ok_or_else(|| AppError::BadRequest("missing query parameter 'q'".to_string()))?;
    let response = search::search(&state.store, &q, params.limit, params.offset).await?;
    tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, results = response.results.len(), "search completed");
    Ok(Json(response))
}

/// Wraps `AppError` so handlers can use `?` and still produce the 400/500
/// split §7 mandates for query-time errors.
pub struct AppErrorResponse(AppError);

impl From<AppError> for AppErrorResponse {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppErrorResponse {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error handling request");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let resp = AppErrorResponse::from(AppError::BadRequest("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
