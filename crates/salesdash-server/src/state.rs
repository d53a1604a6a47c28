use std::sync::Arc;

use tracing::{info, warn};

use salesdash_core::source::{DataSource, ResultCache};

use crate::cache::MemoryCache;
use crate::config::Config;
use crate::service::AnalyticsService;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Cache-fronted analytics operations over the configured source.
    pub service: AnalyticsService,
}

impl AppState {
    /// Construct state over `source` with the in-process result cache.
    pub fn new(config: Config, source: Arc<dyn DataSource>) -> Self {
        Self::new_with_cache(config, source, Arc::new(MemoryCache::new()))
    }

    /// Construct state with an injected result cache.
    pub fn new_with_cache(
        config: Config,
        source: Arc<dyn DataSource>,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            service: AnalyticsService::new(source, cache, Arc::clone(&config)),
            config,
        }
    }

    /// Load rows once at startup so the first dashboard request is fast. A
    /// failure is logged, not fatal: requests retry the load lazily.
    pub async fn warm_up(&self) {
        match self.service.refresh().await {
            Ok(status) => info!(
                source = %status.source,
                rows = status.row_count,
                "Sales data ready"
            ),
            Err(e) => warn!(error = %e, "Initial sales data load failed"),
        }
    }
}
