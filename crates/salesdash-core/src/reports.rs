//! Report builders over an already-filtered row set.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::aggregate::{
    distinct_count, group_by, group_by_month, growth_rate, margin_percent, market_share,
    metric_value, percent_change, sum_by,
};
use crate::config::Thresholds;
use crate::pagination::{paginate, Paginated};
use crate::row::{Dimension, Metric, Row};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub total_revenue: f64,
    pub total_volume: f64,
    pub total_margin: f64,
    pub avg_margin: f64,
    pub growth_rate: f64,
    pub customer_count: usize,
    pub brand_count: usize,
    pub category_count: usize,
    pub record_count: usize,
}

pub fn aggregates(rows: &[Row]) -> Aggregates {
    Aggregates {
        total_revenue: sum_by(rows, Metric::Revenue),
        total_volume: sum_by(rows, Metric::Volume),
        total_margin: sum_by(rows, Metric::Margin),
        avg_margin: margin_percent(rows),
        growth_rate: growth_rate(rows),
        customer_count: distinct_count(rows, Dimension::Customer),
        brand_count: distinct_count(rows, Dimension::Brand),
        category_count: distinct_count(rows, Dimension::Category),
        record_count: rows.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPerformer {
    pub name: String,
    pub value: f64,
    pub growth: f64,
    pub market_share: f64,
}

/// Groups ranked by `metric`, highest first. Equal values keep the order in
/// which their group first appeared in `rows`.
pub fn top_performers(
    rows: &[Row],
    metric: Metric,
    dimension: Dimension,
    limit: usize,
    offset: usize,
) -> Paginated<TopPerformer> {
    let total = metric_value(rows, metric);
    let mut ranked: Vec<TopPerformer> = group_by(rows, dimension)
        .into_iter()
        .map(|group| {
            let value = metric_value(group.rows.iter().copied(), metric);
            TopPerformer {
                name: group.key,
                value,
                growth: growth_rate(group.rows.iter().copied()),
                market_share: market_share(value, total),
            }
        })
        .collect();
    // `sort_by` is stable, which gives the tie-break documented above.
    ranked.sort_by(|a, b| desc(a.value, b.value));
    paginate(&ranked, limit, offset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskItem {
    pub name: String,
    /// Total gross sales of the group.
    pub value: f64,
    pub margin: f64,
    pub growth: f64,
    pub risk_level: RiskLevel,
    pub reason: String,
}

/// First matching rule wins: margin, then trend, then volume.
pub fn classify_risk(
    total_sales: f64,
    margin: f64,
    growth: f64,
    thresholds: &Thresholds,
) -> (RiskLevel, &'static str) {
    if margin < thresholds.risk_low_margin {
        (RiskLevel::High, "Low margin")
    } else if growth < thresholds.risk_declining_trend {
        (RiskLevel::Medium, "Declining trend")
    } else if total_sales < thresholds.risk_low_volume {
        (RiskLevel::Medium, "Low volume")
    } else {
        (RiskLevel::Low, "Healthy performance")
    }
}

/// Groups ordered smallest-value first so the weakest surface at the top.
pub fn risk_items(
    rows: &[Row],
    dimension: Dimension,
    thresholds: &Thresholds,
    limit: usize,
    offset: usize,
) -> Paginated<RiskItem> {
    let mut items: Vec<RiskItem> = group_by(rows, dimension)
        .into_iter()
        .map(|group| {
            let value = sum_by(group.rows.iter().copied(), Metric::Revenue);
            let margin = margin_percent(group.rows.iter().copied());
            let growth = growth_rate(group.rows.iter().copied());
            let (risk_level, reason) = classify_risk(value, margin, growth, thresholds);
            RiskItem {
                name: group.key,
                value,
                margin,
                growth,
                risk_level,
                reason: reason.to_string(),
            }
        })
        .collect();
    items.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal));
    paginate(&items, limit, offset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String,
    pub value: f64,
    pub change: f64,
    pub change_percent: f64,
    pub trend: TrendDirection,
}

/// Month-by-month series in canonical month order. `margin` reads as margin %
/// and `customers` as distinct customers; everything else is summed.
pub fn trend_analysis(rows: &[Row], metric: Metric) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = Vec::new();
    let mut previous: Option<f64> = None;
    for (month, month_rows) in group_by_month(rows) {
        let value = match metric {
            Metric::Margin => margin_percent(month_rows.iter().copied()),
            _ => metric_value(month_rows.iter().copied(), metric),
        };
        let (change, change_percent) = match previous {
            Some(prev) => (value - prev, percent_change(value, prev)),
            None => (0.0, 0.0),
        };
        let trend = if change_percent > 5.0 {
            TrendDirection::Up
        } else if change_percent < -5.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };
        points.push(TrendPoint {
            period: month.label().to_string(),
            value,
            change,
            change_percent,
            trend,
        });
        previous = Some(value);
    }
    points
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub name: String,
    pub revenue: f64,
    pub volume: f64,
    pub margin: f64,
    pub margin_percent: f64,
    pub market_share: f64,
    pub growth: f64,
    pub record_count: usize,
}

/// Per-group revenue, volume, margin and share, highest revenue first.
pub fn performance(rows: &[Row], dimension: Dimension) -> Vec<PerformanceRow> {
    let total_revenue = sum_by(rows, Metric::Revenue);
    let mut out: Vec<PerformanceRow> = group_by(rows, dimension)
        .into_iter()
        .map(|group| {
            let revenue = sum_by(group.rows.iter().copied(), Metric::Revenue);
            PerformanceRow {
                revenue,
                volume: sum_by(group.rows.iter().copied(), Metric::Volume),
                margin: sum_by(group.rows.iter().copied(), Metric::Margin),
                margin_percent: margin_percent(group.rows.iter().copied()),
                market_share: market_share(revenue, total_revenue),
                growth: growth_rate(group.rows.iter().copied()),
                record_count: group.rows.len(),
                name: group.key,
            }
        })
        .collect();
    out.sort_by(|a, b| desc(a.revenue, b.revenue));
    out
}

/// Descending float order; NaN never occurs here but compares equal.
fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
