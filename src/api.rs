// src/api.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregator::{AggregateError, Aggregator};
use crate::ingest::types::Listing;
use crate::store::ExclusiveOrder;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/opportunities", get(opportunities))
        .route("/api/exclusive-opportunities", get(exclusive_opportunities))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Store failures are the only errors that reach a client.
struct ApiError {
    message: &'static str,
    source: AggregateError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.source, "request failed");
        let body = Json(serde_json::json!({ "message": self.message }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

async fn opportunities(State(state): State<AppState>) -> Result<Json<Vec<Listing>>, ApiError> {
    let all = state
        .aggregator
        .get_all_listings()
        .await
        .map_err(|source| ApiError {
            message: "Server error while fetching opportunities",
            source,
        })?;
    tracing::info!(total = all.len(), "opportunities served");
    Ok(Json(all))
}

async fn exclusive_opportunities(
    State(state): State<AppState>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let rows = state
        .aggregator
        .exclusive_listings(ExclusiveOrder::CreatedAtDesc)
        .await
        .map_err(|source| ApiError {
            message: "Server error",
            source,
        })?;
    Ok(Json(rows))
}
