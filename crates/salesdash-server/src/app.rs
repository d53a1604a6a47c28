use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::middleware::{require_admin, require_auth},
    routes,
    state::AppState,
};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// `/health` is public. Everything under `/api` passes through
/// [`require_auth`], and `/api/admin/*` additionally through
/// [`require_admin`].
pub fn build_app(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/api/admin/refresh", post(routes::admin::refresh))
        .route_layer(middleware::from_fn(require_admin));

    let api = Router::new()
        .route(
            "/api/analytics/aggregates",
            get(routes::analytics::get_aggregates),
        )
        .route("/api/analytics/data", get(routes::analytics::get_data))
        .route(
            "/api/analytics/top-performers",
            get(routes::analytics::get_top_performers),
        )
        .route("/api/analytics/risk", get(routes::analytics::get_risk))
        .route("/api/analytics/trends", get(routes::analytics::get_trends))
        .route(
            "/api/analytics/variance",
            get(routes::analytics::get_variance),
        )
        .route(
            "/api/analytics/performance/business-area",
            get(routes::performance::business_area),
        )
        .route(
            "/api/analytics/performance/channel",
            get(routes::performance::channel),
        )
        .route(
            "/api/analytics/performance/category",
            get(routes::performance::category),
        )
        .route(
            "/api/analytics/performance/sub-category",
            get(routes::performance::sub_category),
        )
        .route(
            "/api/analytics/performance/customer",
            get(routes::performance::customer),
        )
        .route(
            "/api/reports/business-area",
            get(routes::reports::business_area),
        )
        .route("/api/reports/channel", get(routes::reports::channel))
        .route("/api/reports/brand", get(routes::reports::brand))
        .route("/api/reports/customer", get(routes::reports::customer))
        .route(
            "/api/reports/monthly-trend",
            get(routes::reports::monthly_trend),
        )
        .route("/api/dashboard/overview", get(routes::dashboard::overview))
        .route("/api/filters/options", get(routes::filters::options))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_auth,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

/// Any origin when none are configured, otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .filter_map(|o| o.parse().ok())
        .collect();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}
