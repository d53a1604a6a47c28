//! Seams between the analytics engine and the outside world.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::row::Row;

/// Where analytics rows come from.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Load every row. Implementations report data problems per row and only
    /// fail when the source itself is unreachable or unreadable.
    async fn fetch_rows(&self) -> anyhow::Result<Vec<Row>>;

    /// Cheap change marker (mtime, ETag, ...). `None` means "unknown", which
    /// forces a full reload whenever the snapshot expires.
    async fn fingerprint(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Short label for logs and the `X-Data-Source` detail.
    fn describe(&self) -> String;
}

/// Key/value store for computed results.
#[async_trait]
pub trait ResultCache: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Option<serde_json::Value>;
    async fn set(&self, key: &str, value: serde_json::Value, ttl_secs: u64);
    async fn clear(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    Primary,
    Cache,
}

impl ResultOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Cache => "cache",
        }
    }
}

/// Provenance of a computed result, surfaced as response headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchMetadata {
    pub source: ResultOrigin,
    pub row_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

impl FetchMetadata {
    pub fn primary(row_count: usize, last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            source: ResultOrigin::Primary,
            row_count,
            last_updated,
        }
    }
}
