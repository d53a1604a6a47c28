//! Grouping and summation primitives shared by every report.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::row::{Dimension, Metric, Month, Row};

/// Division that resolves a zero (or non-finite) outcome to `0.0`.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let out = numerator / denominator;
    if out.is_finite() {
        out
    } else {
        0.0
    }
}

/// Percentage change from `previous` to `current`, 0 when `previous` is 0.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    safe_divide(current - previous, previous) * 100.0
}

pub fn sum_by<'a, I>(rows: I, metric: Metric) -> f64
where
    I: IntoIterator<Item = &'a Row>,
{
    rows.into_iter().map(|r| metric.value(r)).sum()
}

/// Sum for plain measures, distinct non-empty customers for
/// [`Metric::Customers`].
pub fn metric_value<'a, I>(rows: I, metric: Metric) -> f64
where
    I: IntoIterator<Item = &'a Row>,
{
    match metric {
        Metric::Customers => distinct_count(rows, Dimension::Customer) as f64,
        _ => sum_by(rows, metric),
    }
}

/// fGP / gSales × 100.
pub fn margin_percent<'a, I>(rows: I) -> f64
where
    I: IntoIterator<Item = &'a Row>,
{
    let (fgp, sales) = rows
        .into_iter()
        .fold((0.0, 0.0), |(f, s), r| (f + r.fgp, s + r.gross_sales));
    safe_divide(fgp, sales) * 100.0
}

pub fn market_share(subset_revenue: f64, total_revenue: f64) -> f64 {
    safe_divide(subset_revenue, total_revenue) * 100.0
}

/// Number of distinct non-empty values of `dimension`.
pub fn distinct_count<'a, I>(rows: I, dimension: Dimension) -> usize
where
    I: IntoIterator<Item = &'a Row>,
{
    rows.into_iter()
        .map(|r| dimension.value(r))
        .filter(|v| !v.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

/// One bucket of [`group_by`].
#[derive(Debug, Clone)]
pub struct Group<'a> {
    pub key: String,
    pub rows: Vec<&'a Row>,
}

/// Partition rows by `dimension`, keeping buckets in first-occurrence order.
/// Missing values collect under `""`.
pub fn group_by<'a, I>(rows: I, dimension: Dimension) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();
    for row in rows {
        let key = dimension.value(row);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                key: key.to_string(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }
    groups
}

/// Rows bucketed by month label in canonical month order. Years are not
/// separated.
pub fn group_by_month<'a, I>(rows: I) -> BTreeMap<Month, Vec<&'a Row>>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut months: BTreeMap<Month, Vec<&'a Row>> = BTreeMap::new();
    for row in rows {
        months.entry(row.month).or_default().push(row);
    }
    months
}

/// Two-point revenue growth between the last two months present, in percent.
///
/// The months need not be calendar-adjacent. Returns 0 with fewer than two
/// months or a zero previous month.
pub fn growth_rate<'a, I>(rows: I) -> f64
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut by_month: BTreeMap<Month, f64> = BTreeMap::new();
    for row in rows {
        *by_month.entry(row.month).or_default() += row.gross_sales;
    }
    let mut latest = by_month.values().rev();
    match (latest.next(), latest.next()) {
        (Some(&last), Some(&prev)) => percent_change(last, prev),
        _ => 0.0,
    }
}
