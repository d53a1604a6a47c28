use std::sync::Arc;

use axum::{extract::State, response::Response, Extension};

use salesdash_core::filter::FilterSpec;

use crate::{auth::middleware::AuthContext, error::AppError, routes::data_response, state::AppState};

/// `GET /api/filters/options` - values for the dashboard's filter pickers,
/// limited to what the caller may see.
#[tracing::instrument(skip(state, auth))]
pub async fn options(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Response, AppError> {
    let spec = FilterSpec::default().with_scope(&auth.scope);
    Ok(data_response(state.service.get_filter_options(&spec).await?))
}
