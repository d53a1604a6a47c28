use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde_json::json;
use tracing::info;

use crate::{auth::middleware::AuthContext, error::AppError, state::AppState};

/// `POST /api/admin/refresh` - refetch sales rows and drop cached results.
#[tracing::instrument(skip(state, auth))]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let status = state.service.refresh().await?;
    info!(
        by = %auth.subject,
        rows = status.row_count,
        "Sales data refreshed on request"
    );
    Ok(Json(json!({ "data": status })))
}
