use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Raw-row fetch failed and the empty-result fallback is disabled.
    #[error("data source unavailable: {0}")]
    DataSourceUnavailable(#[source] anyhow::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
