//! Year-over-year report endpoints. Each returns leaf rows, any combined
//! rows and a grand total for the requested (or latest) year against the
//! year before.

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

/// `GET /api/reports/business-area`
#[tracing::instrument(skip(state, auth))]
pub async fn business_area(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(
        state.service.get_business_area_yoy_report(&spec).await?,
    ))
}

/// `GET /api/reports/channel`
#[tracing::instrument(skip(state, auth))]
pub async fn channel(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(state.service.get_channel_yoy_report(&spec).await?))
}

/// `GET /api/reports/brand`
#[tracing::instrument(skip(state, auth))]
pub async fn brand(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(state.service.get_brand_yoy_report(&spec).await?))
}

/// `GET /api/reports/customer`
#[tracing::instrument(skip(state, auth))]
pub async fn customer(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(state.service.get_customer_yoy_report(&spec).await?))
}

/// `GET /api/reports/monthly-trend`
#[tracing::instrument(skip(state, auth))]
pub async fn monthly_trend(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let spec = query.filter_spec(&auth.scope)?;
    Ok(data_response(
        state.service.get_monthly_trend_yoy_report(&spec).await?,
    ))
}
