//! Row sources: CSV/JSON ingestion plus file, HTTP and in-memory backends.

pub mod file;
pub mod http;
pub mod ingest;
pub mod memory;

use std::sync::Arc;

use salesdash_core::config::DataSourceConfig;
use salesdash_core::source::DataSource;

pub use file::FileSource;
pub use http::HttpSource;
pub use ingest::{parse_csv, parse_json, LoadReport};
pub use memory::MemorySource;

/// Build the configured source.
pub fn from_config(config: &DataSourceConfig) -> anyhow::Result<Arc<dyn DataSource>> {
    Ok(match config {
        DataSourceConfig::File(path) => Arc::new(FileSource::new(path)),
        DataSourceConfig::Http { url, token } => Arc::new(HttpSource::new(url, token.clone())?),
    })
}
