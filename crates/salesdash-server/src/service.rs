//! Cache-fronted analytics operations.
//!
//! Every operation follows the same pipeline: hash the request into a cache
//! key, return a cached result when present, otherwise filter the current row
//! snapshot, compute, and store the result for `cache_ttl_secs`.
//!
//! Rows are held in a single shared snapshot. Once `rows_refresh_secs` has
//! elapsed the source is asked for a fingerprint; an unchanged fingerprint
//! keeps the snapshot, anything else triggers a refetch and drops every
//! cached result.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use salesdash_core::aggregate::distinct_count;
use salesdash_core::filter::{apply_filters, apply_filters_with, FilterOptions, FilterSpec};
use salesdash_core::pagination::{paginate, Paginated};
use salesdash_core::reports::{
    aggregates, performance, risk_items, top_performers, trend_analysis, Aggregates,
    PerformanceRow, RiskItem, TopPerformer, TrendPoint,
};
use salesdash_core::row::{Dimension, Metric, Month, Row};
use salesdash_core::source::{DataSource, FetchMetadata, ResultCache, ResultOrigin};
use salesdash_core::variance::{previous_period_spec, variance_with_fallback, VarianceResult};
use salesdash_core::yoy::{dimension_report, monthly_report, report_year, YoyReport};
use salesdash_core::AnalyticsError;

use crate::config::Config;

/// A computed value plus the provenance routes expose as headers.
#[derive(Debug, Clone)]
pub struct Computed<T> {
    pub value: T,
    pub meta: FetchMetadata,
}

#[derive(Clone)]
struct RowSnapshot {
    rows: Arc<Vec<Row>>,
    fingerprint: Option<String>,
    checked_at: Instant,
    loaded_at: DateTime<Utc>,
    origin: ResultOrigin,
}

impl RowSnapshot {
    fn meta(&self) -> FetchMetadata {
        FetchMetadata {
            source: self.origin,
            row_count: self.rows.len(),
            last_updated: Some(self.loaded_at),
        }
    }
}

/// Health view of the row snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStatus {
    pub source: String,
    pub row_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub aggregates: Aggregates,
    pub revenue_trend: Vec<TrendPoint>,
}

/// Distinct values a caller may pick from, limited to their scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterChoices {
    pub years: Vec<i32>,
    pub months: Vec<Month>,
    pub business_areas: Vec<String>,
    pub channels: Vec<String>,
    pub brands: Vec<String>,
    pub categories: Vec<String>,
    pub sub_categories: Vec<String>,
    pub customers: Vec<String>,
    pub customer_count: usize,
}

pub struct AnalyticsService {
    source: Arc<dyn DataSource>,
    cache: Arc<dyn ResultCache>,
    config: Arc<Config>,
    snapshot: RwLock<Option<RowSnapshot>>,
    /// Serializes fingerprint checks and refetches.
    reload: Mutex<()>,
}

/// `"{operation}:{sha256-hex(JSON(spec, params))}"`.
pub fn cache_key<P: Serialize>(
    operation: &str,
    spec: &FilterSpec,
    params: &P,
) -> Result<String, AnalyticsError> {
    let payload = serde_json::to_vec(&json!({ "spec": spec, "params": params }))?;
    Ok(format!("{operation}:{}", hex::encode(Sha256::digest(&payload))))
}

impl AnalyticsService {
    pub fn new(
        source: Arc<dyn DataSource>,
        cache: Arc<dyn ResultCache>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            source,
            cache,
            config,
            snapshot: RwLock::new(None),
            reload: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current snapshot, refreshed from the source when it is due.
    async fn rows(&self) -> anyhow::Result<RowSnapshot> {
        let interval = self.config.rows_refresh_interval();
        if let Some(snap) = self.snapshot.read().await.as_ref() {
            if snap.checked_at.elapsed() < interval {
                return Ok(snap.clone());
            }
        }

        let _guard = self.reload.lock().await;
        let current = self.snapshot.read().await.clone();
        let Some(current) = current else {
            return self.load(false).await;
        };
        if current.checked_at.elapsed() < interval {
            return Ok(current);
        }

        match self.source.fingerprint().await {
            Ok(Some(fp)) if current.fingerprint.as_deref() == Some(fp.as_str()) => {
                debug!(source = %self.source.describe(), "Row snapshot unchanged");
                let mut slot = self.snapshot.write().await;
                let refreshed = RowSnapshot {
                    checked_at: Instant::now(),
                    ..current
                };
                *slot = Some(refreshed.clone());
                return Ok(refreshed);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Fingerprint check failed, reloading rows"),
        }

        match self.load(true).await {
            Ok(snap) => Ok(snap),
            Err(e) => {
                // Keep serving the last good rows and retry after another
                // interval.
                warn!(error = %e, "Row reload failed, serving previous snapshot");
                let stale = RowSnapshot {
                    checked_at: Instant::now(),
                    origin: ResultOrigin::Cache,
                    ..current
                };
                *self.snapshot.write().await = Some(stale.clone());
                Ok(stale)
            }
        }
    }

    /// Fetch rows from the source and install them. Caller holds `reload`.
    async fn load(&self, replacing: bool) -> anyhow::Result<RowSnapshot> {
        let fingerprint = self.source.fingerprint().await.unwrap_or_else(|e| {
            debug!(error = %e, "Fingerprint unavailable");
            None
        });
        let rows = self.source.fetch_rows().await?;
        let snap = RowSnapshot {
            rows: Arc::new(rows),
            fingerprint,
            checked_at: Instant::now(),
            loaded_at: Utc::now(),
            origin: ResultOrigin::Primary,
        };
        info!(
            source = %self.source.describe(),
            rows = snap.rows.len(),
            "Row snapshot loaded"
        );
        *self.snapshot.write().await = Some(snap.clone());
        if replacing {
            self.cache.clear().await;
        }
        Ok(snap)
    }

    /// Force a refetch and drop every cached result.
    pub async fn refresh(&self) -> Result<SnapshotStatus, AnalyticsError> {
        let _guard = self.reload.lock().await;
        let snap = self
            .load(true)
            .await
            .map_err(AnalyticsError::DataSourceUnavailable)?;
        Ok(self.status_of(&snap))
    }

    /// Snapshot status, loading rows first if none are held yet.
    pub async fn status(&self) -> Result<SnapshotStatus, AnalyticsError> {
        let snap = self
            .rows()
            .await
            .map_err(AnalyticsError::DataSourceUnavailable)?;
        Ok(self.status_of(&snap))
    }

    fn status_of(&self, snap: &RowSnapshot) -> SnapshotStatus {
        SnapshotStatus {
            source: self.source.describe(),
            row_count: snap.rows.len(),
            last_updated: Some(snap.loaded_at),
        }
    }

    async fn cached<T, P, F>(
        &self,
        operation: &str,
        spec: &FilterSpec,
        params: &P,
        compute: F,
    ) -> Result<Computed<T>, AnalyticsError>
    where
        T: Serialize + DeserializeOwned,
        P: Serialize,
        F: FnOnce(&[Row]) -> T,
    {
        let key = cache_key(operation, spec, params)?;
        // Resolving the snapshot first lets a detected upstream change clear
        // the result cache before the lookup below.
        let rows = self.rows().await;

        if let Some(hit) = self.cache.get(&key).await {
            match serde_json::from_value::<T>(hit) {
                Ok(value) => {
                    debug!(operation, "Result cache hit");
                    let mut meta = match &rows {
                        Ok(snap) => snap.meta(),
                        Err(_) => FetchMetadata::primary(0, None),
                    };
                    meta.source = ResultOrigin::Cache;
                    return Ok(Computed { value, meta });
                }
                Err(e) => warn!(operation, error = %e, "Discarding unreadable cache entry"),
            }
        }

        match rows {
            Ok(snap) => {
                let value = compute(&snap.rows);
                self.cache
                    .set(&key, serde_json::to_value(&value)?, self.config.cache_ttl_secs)
                    .await;
                Ok(Computed {
                    value,
                    meta: snap.meta(),
                })
            }
            Err(e) if self.config.allow_empty_on_failure => {
                warn!(operation, error = %e, "Data source unavailable, serving empty result");
                Ok(Computed {
                    value: compute(&[]),
                    meta: FetchMetadata::primary(0, None),
                })
            }
            Err(e) => Err(AnalyticsError::DataSourceUnavailable(e)),
        }
    }

    pub async fn get_aggregates(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<Aggregates>, AnalyticsError> {
        self.cached("aggregates", spec, &(), |rows| {
            aggregates(&apply_filters(rows, spec))
        })
        .await
    }

    pub async fn get_filtered_rows(
        &self,
        spec: &FilterSpec,
        limit: usize,
        offset: usize,
    ) -> Result<Computed<Paginated<Row>>, AnalyticsError> {
        self.cached("rows", spec, &(limit, offset), |rows| {
            paginate(&apply_filters(rows, spec), limit, offset)
        })
        .await
    }

    /// Unknown metrics rank by revenue; unknown dimensions group everything
    /// under an empty name.
    pub async fn get_top_performers(
        &self,
        spec: &FilterSpec,
        metric: Option<&str>,
        dimension: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Computed<Paginated<TopPerformer>>, AnalyticsError> {
        let metric = Metric::parse_or_revenue(metric);
        let dimension = Dimension::parse(dimension);
        let limit = limit.unwrap_or(self.config.thresholds.top_n_default_limit);
        self.cached(
            "top-performers",
            spec,
            &(metric, dimension, limit, offset),
            |rows| top_performers(&apply_filters(rows, spec), metric, dimension, limit, offset),
        )
        .await
    }

    pub async fn get_risk_analysis(
        &self,
        spec: &FilterSpec,
        dimension: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Computed<Paginated<RiskItem>>, AnalyticsError> {
        let dimension = Dimension::parse(dimension);
        let thresholds = self.config.thresholds;
        let limit = limit.unwrap_or(thresholds.top_n_default_limit);
        self.cached("risk", spec, &(dimension, limit, offset), |rows| {
            risk_items(&apply_filters(rows, spec), dimension, &thresholds, limit, offset)
        })
        .await
    }

    pub async fn get_trend_analysis(
        &self,
        spec: &FilterSpec,
        metric: Option<&str>,
    ) -> Result<Computed<Vec<TrendPoint>>, AnalyticsError> {
        let metric = Metric::parse_or_revenue(metric);
        self.cached("trends", spec, &metric, |rows| {
            trend_analysis(&apply_filters(rows, spec), metric)
        })
        .await
    }

    /// Margin variance against the natural previous period of `spec`, or the
    /// best available fallback.
    pub async fn get_variance(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<VarianceResult>, AnalyticsError> {
        let weights = self.config.variance_weights;
        self.cached("variance", spec, &(), |rows| {
            let current = apply_filters(rows, spec);
            let previous = previous_period_spec(spec).map(|prev| apply_filters(rows, &prev));
            variance_with_fallback(&current, previous.as_deref(), &weights)
        })
        .await
    }

    async fn performance_by(
        &self,
        operation: &str,
        spec: &FilterSpec,
        dimension: Dimension,
    ) -> Result<Computed<Vec<PerformanceRow>>, AnalyticsError> {
        self.cached(operation, spec, &(), |rows| {
            performance(&apply_filters(rows, spec), dimension)
        })
        .await
    }

    pub async fn get_business_area_performance(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<Vec<PerformanceRow>>, AnalyticsError> {
        self.performance_by("performance-business-area", spec, Dimension::BusinessArea)
            .await
    }

    pub async fn get_channel_performance(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<Vec<PerformanceRow>>, AnalyticsError> {
        self.performance_by("performance-channel", spec, Dimension::Channel)
            .await
    }

    pub async fn get_category_performance(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<Vec<PerformanceRow>>, AnalyticsError> {
        self.performance_by("performance-category", spec, Dimension::Category)
            .await
    }

    pub async fn get_sub_category_performance(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<Vec<PerformanceRow>>, AnalyticsError> {
        self.performance_by("performance-sub-category", spec, Dimension::SubCategory)
            .await
    }

    pub async fn get_customer_performance(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<Vec<PerformanceRow>>, AnalyticsError> {
        self.performance_by("performance-customer", spec, Dimension::Customer)
            .await
    }

    /// YoY reports drop the year restriction so both years survive filtering,
    /// then split the rows by year themselves.
    async fn yoy_report<F>(
        &self,
        operation: &str,
        spec: &FilterSpec,
        build: F,
    ) -> Result<Computed<YoyReport>, AnalyticsError>
    where
        F: FnOnce(&[Row], i32) -> YoyReport,
    {
        self.cached(operation, spec, &(), |rows| {
            let filtered = apply_filters_with(
                rows,
                spec,
                FilterOptions {
                    skip_year_filter: true,
                },
            );
            let year = report_year(&filtered, spec.year).unwrap_or_else(|| Utc::now().year());
            build(&filtered, year)
        })
        .await
    }

    pub async fn get_business_area_yoy_report(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<YoyReport>, AnalyticsError> {
        let combined = self.config.combined_rows.clone();
        self.yoy_report("yoy-business-area", spec, move |rows, year| {
            dimension_report(rows, Dimension::BusinessArea, year, &combined)
        })
        .await
    }

    pub async fn get_channel_yoy_report(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<YoyReport>, AnalyticsError> {
        self.yoy_report("yoy-channel", spec, |rows, year| {
            dimension_report(rows, Dimension::Channel, year, &[])
        })
        .await
    }

    pub async fn get_brand_yoy_report(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<YoyReport>, AnalyticsError> {
        self.yoy_report("yoy-brand", spec, |rows, year| {
            dimension_report(rows, Dimension::Brand, year, &[])
        })
        .await
    }

    pub async fn get_customer_yoy_report(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<YoyReport>, AnalyticsError> {
        self.yoy_report("yoy-customer", spec, |rows, year| {
            dimension_report(rows, Dimension::Customer, year, &[])
        })
        .await
    }

    pub async fn get_monthly_trend_yoy_report(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<YoyReport>, AnalyticsError> {
        self.yoy_report("yoy-monthly-trend", spec, monthly_report)
            .await
    }

    /// Headline aggregates and the monthly revenue trend, computed side by side.
    pub async fn get_overview(&self, spec: &FilterSpec) -> Result<Computed<Overview>, AnalyticsError> {
        let (aggregates, trend) = tokio::join!(
            self.get_aggregates(spec),
            self.get_trend_analysis(spec, Some("revenue"))
        );
        let aggregates = aggregates?;
        let trend = trend?;
        Ok(Computed {
            value: Overview {
                aggregates: aggregates.value,
                revenue_trend: trend.value,
            },
            meta: aggregates.meta,
        })
    }

    /// Only the caller's allow-lists apply; every other filter is ignored so
    /// the options never collapse to the current selection.
    pub async fn get_filter_options(
        &self,
        spec: &FilterSpec,
    ) -> Result<Computed<FilterChoices>, AnalyticsError> {
        let scoped = FilterSpec {
            allowed_business_areas: spec.allowed_business_areas.clone(),
            allowed_channels: spec.allowed_channels.clone(),
            allowed_brands: spec.allowed_brands.clone(),
            allowed_customers: spec.allowed_customers.clone(),
            ..FilterSpec::default()
        };
        self.cached("filter-options", &scoped, &(), |rows| {
            filter_choices(&apply_filters(rows, &scoped))
        })
        .await
    }
}

fn filter_choices(rows: &[Row]) -> FilterChoices {
    let distinct = |dimension: Dimension| -> Vec<String> {
        let mut values: Vec<String> = rows
            .iter()
            .map(|r| dimension.value(r))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        values.sort();
        values.dedup();
        values
    };
    let mut years: Vec<i32> = rows.iter().map(|r| r.year).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    let mut months: Vec<Month> = rows.iter().map(|r| r.month).collect();
    months.sort();
    months.dedup();

    FilterChoices {
        years,
        months,
        business_areas: distinct(Dimension::BusinessArea),
        channels: distinct(Dimension::Channel),
        brands: distinct(Dimension::Brand),
        categories: distinct(Dimension::Category),
        sub_categories: distinct(Dimension::SubCategory),
        customers: distinct(Dimension::Customer),
        customer_count: distinct_count(rows, Dimension::Customer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use salesdash_source::MemorySource;

    fn sale(year: i32, month: Month, ba: &str, gsales: f64, fgp: f64) -> Row {
        let mut r = Row::new(year, month);
        r.business_area = ba.to_string();
        r.customer = format!("{ba} customer");
        r.gross_sales = gsales;
        r.fgp = fgp;
        r
    }

    fn sample() -> Vec<Row> {
        vec![
            sale(2024, Month::Jan, "Grocery ROI", 1000.0, 200.0),
            sale(2024, Month::Feb, "Grocery ROI", 1500.0, 225.0),
            sale(2023, Month::Jan, "Wholesale ROI", 800.0, 100.0),
        ]
    }

    fn service(source: Arc<MemorySource>, allow_empty: bool) -> (AnalyticsService, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let config = Config {
            allow_empty_on_failure: allow_empty,
            ..Config::default()
        };
        let svc = AnalyticsService::new(source, cache.clone(), Arc::new(config));
        (svc, cache)
    }

    #[test]
    fn cache_key_is_stable_and_param_sensitive() {
        let spec = FilterSpec {
            year: Some(2024),
            ..Default::default()
        };
        let a = cache_key("risk", &spec, &(1, 2)).unwrap();
        let b = cache_key("risk", &spec.clone(), &(1, 2)).unwrap();
        let c = cache_key("risk", &spec, &(1, 3)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("risk:"));
        assert_eq!(a.len(), "risk:".len() + 64);
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let source = Arc::new(MemorySource::new(sample()));
        let (svc, cache) = service(source.clone(), true);
        let spec = FilterSpec::default();

        let first = svc.get_aggregates(&spec).await.unwrap();
        assert_eq!(first.meta.source, ResultOrigin::Primary);
        assert_eq!(first.meta.row_count, 3);
        assert_eq!(cache.len().await, 1);

        // The cached value wins even though the source now fails.
        source.set_offline(true);
        let second = svc.get_aggregates(&spec).await.unwrap();
        assert_eq!(second.meta.source, ResultOrigin::Cache);
        assert_eq!(second.value, first.value);
    }

    #[tokio::test]
    async fn outage_yields_zeroed_result_when_allowed() {
        let source = Arc::new(MemorySource::new(sample()));
        source.set_offline(true);
        let (svc, cache) = service(source, true);

        let result = svc.get_aggregates(&FilterSpec::default()).await.unwrap();
        assert_eq!(result.value, Aggregates::default());
        assert_eq!(result.meta.row_count, 0);
        // Empty fallbacks are not cached.
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn outage_is_an_error_when_empty_fallback_disabled() {
        let source = Arc::new(MemorySource::new(sample()));
        source.set_offline(true);
        let (svc, _) = service(source, false);

        let err = svc.get_variance(&FilterSpec::default()).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::DataSourceUnavailable(_)));
    }

    #[tokio::test]
    async fn refresh_reloads_rows_and_clears_results() {
        let source = Arc::new(MemorySource::new(sample()));
        let (svc, cache) = service(source.clone(), true);
        let spec = FilterSpec::default();
        svc.get_aggregates(&spec).await.unwrap();

        source.replace(sample()[..1].to_vec()).await;
        let status = svc.refresh().await.unwrap();
        assert_eq!(status.row_count, 1);
        assert_eq!(status.source, "memory");
        assert_eq!(cache.len().await, 0);

        let after = svc.get_aggregates(&spec).await.unwrap();
        assert_eq!(after.value.total_revenue, 1000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn changed_fingerprint_after_interval_reloads() {
        let source = Arc::new(MemorySource::new(sample()));
        let (svc, cache) = service(source.clone(), true);
        let spec = FilterSpec::default();
        assert_eq!(svc.get_aggregates(&spec).await.unwrap().meta.row_count, 3);

        source.replace(sample()[..2].to_vec()).await;
        // Within the refresh interval the snapshot is kept.
        cache.clear().await;
        assert_eq!(svc.get_aggregates(&spec).await.unwrap().meta.row_count, 3);

        tokio::time::advance(svc.config().rows_refresh_interval()).await;
        let after = svc.get_aggregates(&spec).await.unwrap();
        assert_eq!(after.meta.row_count, 2);
        assert_eq!(after.value.record_count, 2);
    }

    #[tokio::test]
    async fn yoy_report_keeps_both_years() {
        let source = Arc::new(MemorySource::new(sample()));
        let (svc, _) = service(source, true);
        let spec = FilterSpec {
            year: Some(2024),
            ..Default::default()
        };
        let report = svc.get_business_area_yoy_report(&spec).await.unwrap().value;
        assert_eq!(report.year, 2024);
        assert_eq!(report.total.gsales, 2500.0);
        assert_eq!(report.total.gsales_ly, 800.0);
        assert_eq!(report.combined.len(), 1);
        assert_eq!(report.combined[0].gsales, 2500.0);
    }

    #[tokio::test]
    async fn filter_options_follow_scope_only() {
        let source = Arc::new(MemorySource::new(sample()));
        let (svc, _) = service(source, true);
        let spec = FilterSpec {
            year: Some(2023),
            allowed_business_areas: Some(["Grocery ROI".to_string()].into()),
            ..Default::default()
        };
        let options = svc.get_filter_options(&spec).await.unwrap().value;
        assert_eq!(options.years, vec![2024]);
        assert_eq!(options.months, vec![Month::Jan, Month::Feb]);
        assert_eq!(options.business_areas, vec!["Grocery ROI".to_string()]);
        assert_eq!(options.customer_count, 1);
    }

    #[tokio::test]
    async fn overview_combines_aggregates_and_trend() {
        let source = Arc::new(MemorySource::new(sample()));
        let (svc, _) = service(source, true);
        let spec = FilterSpec {
            year: Some(2024),
            ..Default::default()
        };
        let overview = svc.get_overview(&spec).await.unwrap().value;
        assert_eq!(overview.aggregates.total_revenue, 2500.0);
        assert_eq!(overview.revenue_trend.len(), 2);
    }
}
