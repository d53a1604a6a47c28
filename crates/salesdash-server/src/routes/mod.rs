pub mod admin;
pub mod analytics;
pub mod dashboard;
pub mod filters;
pub mod health;
pub mod performance;
pub mod query;
pub mod reports;

use axum::{
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use salesdash_core::pagination::Paginated;
use salesdash_core::source::FetchMetadata;

use crate::service::Computed;

pub const DATA_SOURCE_HEADER: &str = "x-data-source";
pub const DATA_ROW_COUNT_HEADER: &str = "x-data-row-count";
pub const DATA_LAST_UPDATED_HEADER: &str = "x-data-last-updated";

fn provenance_headers(meta: &FetchMetadata) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let mut put = |name: &'static str, value: String| {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    };
    put(DATA_SOURCE_HEADER, meta.source.as_str().to_string());
    put(DATA_ROW_COUNT_HEADER, meta.row_count.to_string());
    if let Some(updated) = meta.last_updated {
        put(DATA_LAST_UPDATED_HEADER, updated.to_rfc3339());
    }
    headers
}

/// `{"data": value}` plus provenance headers.
pub(crate) fn data_response<T: Serialize>(computed: Computed<T>) -> Response {
    (
        provenance_headers(&computed.meta),
        Json(json!({ "data": computed.value })),
    )
        .into_response()
}

/// `{"data": [...], "pagination": {...}}` plus provenance headers.
pub(crate) fn page_response<T: Serialize>(computed: Computed<Paginated<T>>) -> Response {
    (provenance_headers(&computed.meta), Json(computed.value)).into_response()
}
