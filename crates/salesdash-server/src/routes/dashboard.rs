use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Response,
    Extension,
};

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    routes::{data_response, query::AnalyticsQuery},
    state::AppState,
};

/// `GET /api/dashboard/overview` - aggregates plus the monthly revenue trend
/// in one round trip.
#[tracing::instrument(skip(state, auth))]
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(state.service.get_overview(&spec).await?))
}
