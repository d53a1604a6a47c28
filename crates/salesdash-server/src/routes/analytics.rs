use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Response,
    Extension,
};

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    routes::{data_response, page_response, query::AnalyticsQuery},
    state::AppState,
};

const DEFAULT_DIMENSION: &str = "businessArea";
const DEFAULT_ROWS_PAGE: usize = 100;

/// `GET /api/analytics/aggregates` - headline totals.
#[tracing::instrument(skip(state, auth))]
pub async fn get_aggregates(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    let result = state.service.get_aggregates(&spec).await?;
    Ok(data_response(result))
}

/// `GET /api/analytics/data` - filtered raw rows, paginated.
#[tracing::instrument(skip(state, auth))]
pub async fn get_data(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    let limit = query.limit()?.unwrap_or(DEFAULT_ROWS_PAGE);
    let result = state
        .service
        .get_filtered_rows(&spec, limit, query.offset()?)
        .await?;
    Ok(page_response(result))
}

/// `GET /api/analytics/top-performers` - groups ranked by `metric`.
///
/// `offset` is a page index, not an item offset.
#[tracing::instrument(skip(state, auth))]
pub async fn get_top_performers(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    let result = state
        .service
        .get_top_performers(
            &spec,
            query.metric.as_deref(),
            query.dimension.as_deref().unwrap_or(DEFAULT_DIMENSION),
            query.limit()?,
            query.offset()?,
        )
        .await?;
    Ok(page_response(result))
}

/// `GET /api/analytics/risk` - groups classified by margin, trend and volume.
#[tracing::instrument(skip(state, auth))]
pub async fn get_risk(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    let result = state
        .service
        .get_risk_analysis(
            &spec,
            query.dimension.as_deref().unwrap_or(DEFAULT_DIMENSION),
            query.limit()?,
            query.offset()?,
        )
        .await?;
    Ok(page_response(result))
}

/// `GET /api/analytics/trends` - monthly series for `metric`.
#[tracing::instrument(skip(state, auth))]
pub async fn get_trends(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    let result = state
        .service
        .get_trend_analysis(&spec, query.metric.as_deref())
        .await?;
    Ok(data_response(result))
}

/// `GET /api/analytics/variance` - margin variance decomposition.
#[tracing::instrument(skip(state, auth))]
pub async fn get_variance(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    let result = state.service.get_variance(&spec).await?;
    Ok(data_response(result))
}
