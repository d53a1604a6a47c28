use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /health` - liveness check.
///
/// Returns `200 OK` with the row snapshot summary when sales rows are
/// available, `503 Service Unavailable` when none could be loaded.
///
/// Response shape:
/// ```json
/// { "status": "ok", "version": "0.1.0", "rows": { "source": "file:...", "row_count": 1200, "last_updated": "..." } }
/// ```
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.service.status().await {
        Ok(status) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "rows": status
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check: sales data unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
                .into_response()
        }
    }
}
