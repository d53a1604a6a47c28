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

/// `GET /api/analytics/performance/business-area`
#[tracing::instrument(skip(state, auth))]
pub async fn business_area(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(
        state.service.get_business_area_performance(&spec).await?,
    ))
}

/// `GET /api/analytics/performance/channel`
#[tracing::instrument(skip(state, auth))]
pub async fn channel(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(
        state.service.get_channel_performance(&spec).await?,
    ))
}

/// `GET /api/analytics/performance/category`
#[tracing::instrument(skip(state, auth))]
pub async fn category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(
        state.service.get_category_performance(&spec).await?,
    ))
}

/// `GET /api/analytics/performance/sub-category`
#[tracing::instrument(skip(state, auth))]
pub async fn sub_category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(
        state.service.get_sub_category_performance(&spec).await?,
    ))
}

/// `GET /api/analytics/performance/customer`
#[tracing::instrument(skip(state, auth))]
pub async fn customer(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(
        state.service.get_customer_performance(&spec).await?,
    ))
}
