//! Margin variance between two periods, split into volume, price, cost and
//! mix components.
//!
//! The split is a fixed-weight heuristic, not a Laspeyres or Paasche index:
//! volume is `weights.volume` × revenue % change, price is `weights.price` ×
//! average-unit-price % change, cost is `-weights.cost` × cost % change, and
//! mix is whatever remains of the total. Every component is clamped to
//! `[-50, 50]`.

use serde::{Deserialize, Serialize};

use crate::aggregate::{margin_percent, percent_change, safe_divide};
use crate::config::VarianceWeights;
use crate::filter::FilterSpec;
use crate::period::Period;
use crate::row::Row;

pub const VARIANCE_CLAMP: f64 = 50.0;

/// Where the comparison baseline came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "previous-period")]
    PreviousPeriod,
    #[serde(rename = "month-over-month")]
    MonthOverMonth,
    #[serde(rename = "half-split")]
    HalfSplit,
    /// Synthetic: derived from the dispersion of observed margins.
    #[serde(rename = "statistical-estimate")]
    StatisticalEstimate,
    #[serde(rename = "insufficient-data")]
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceResult {
    pub total_variance: f64,
    pub volume_variance: f64,
    pub price_variance: f64,
    pub cost_variance: f64,
    pub mix_variance: f64,
    pub current_margin: f64,
    pub previous_margin: f64,
    pub comparison: Comparison,
}

impl VarianceResult {
    pub fn insufficient() -> Self {
        Self {
            total_variance: 0.0,
            volume_variance: 0.0,
            price_variance: 0.0,
            cost_variance: 0.0,
            mix_variance: 0.0,
            current_margin: 0.0,
            previous_margin: 0.0,
            comparison: Comparison::InsufficientData,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    revenue: f64,
    volume: f64,
    cost: f64,
    margin_pct: f64,
}

impl Totals {
    fn of<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Row> + Clone,
    {
        let mut t = rows.clone().into_iter().fold(Totals::default(), |mut t, r| {
            t.revenue += r.gross_sales;
            t.volume += r.cases;
            t.cost += r.group_cost;
            t
        });
        t.margin_pct = margin_percent(rows);
        t
    }

    fn unit_price(&self) -> f64 {
        safe_divide(self.revenue, self.volume)
    }
}

fn clamp(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(-VARIANCE_CLAMP, VARIANCE_CLAMP)
    } else {
        0.0
    }
}

fn decompose(current: Totals, previous: Totals, weights: &VarianceWeights, comparison: Comparison) -> VarianceResult {
    let total = percent_change(current.margin_pct, previous.margin_pct);
    let volume = weights.volume * percent_change(current.revenue, previous.revenue);
    let price = weights.price * percent_change(current.unit_price(), previous.unit_price());
    let cost = -weights.cost * percent_change(current.cost, previous.cost);
    let mix = total - (volume + price + cost);
    VarianceResult {
        total_variance: clamp(total),
        volume_variance: clamp(volume),
        price_variance: clamp(price),
        cost_variance: clamp(cost),
        mix_variance: clamp(mix),
        current_margin: current.margin_pct,
        previous_margin: previous.margin_pct,
        comparison,
    }
}

/// Decompose `current` against `previous`.
pub fn variance(
    current: &[Row],
    previous: &[Row],
    weights: &VarianceWeights,
    comparison: Comparison,
) -> VarianceResult {
    decompose(Totals::of(current), Totals::of(previous), weights, comparison)
}

/// Best-effort variance. Uses `previous` when it has revenue; otherwise walks
/// the fallback tiers month-over-month, half-split, statistical estimate, and
/// finally reports insufficient data. Each tier labels `comparison`.
pub fn variance_with_fallback(
    current: &[Row],
    previous: Option<&[Row]>,
    weights: &VarianceWeights,
) -> VarianceResult {
    if let Some(prev) = previous {
        let prev_totals = Totals::of(prev);
        if prev_totals.revenue != 0.0 {
            return decompose(Totals::of(current), prev_totals, weights, Comparison::PreviousPeriod);
        }
    }

    let mut ordered: Vec<&Row> = current.iter().collect();
    ordered.sort_by_key(|r| r.period_key());

    if let Some(result) = month_over_month(&ordered, weights) {
        return result;
    }
    if let Some(result) = half_split(&ordered, weights) {
        return result;
    }
    statistical_estimate(current, weights)
}

fn month_over_month(ordered: &[&Row], weights: &VarianceWeights) -> Option<VarianceResult> {
    let last = ordered.last()?.period_key();
    let prior = ordered.iter().rev().map(|r| r.period_key()).find(|k| *k != last)?;
    let current = Totals::of(ordered.iter().copied().filter(|r| r.period_key() == last));
    let previous = Totals::of(ordered.iter().copied().filter(|r| r.period_key() == prior));
    (previous.revenue != 0.0)
        .then(|| decompose(current, previous, weights, Comparison::MonthOverMonth))
}

fn half_split(ordered: &[&Row], weights: &VarianceWeights) -> Option<VarianceResult> {
    if ordered.len() < 2 {
        return None;
    }
    let (first, second) = ordered.split_at(ordered.len() / 2);
    let previous = Totals::of(first.iter().copied());
    let current = Totals::of(second.iter().copied());
    (previous.revenue != 0.0).then(|| decompose(current, previous, weights, Comparison::HalfSplit))
}

/// Deterministic stand-in for a missing baseline: the coefficient of
/// variation of per-row margins, spread across components by the weights.
fn statistical_estimate(rows: &[Row], weights: &VarianceWeights) -> VarianceResult {
    let margins: Vec<f64> = rows
        .iter()
        .filter(|r| r.gross_sales != 0.0)
        .map(|r| safe_divide(r.fgp, r.gross_sales) * 100.0)
        .collect();
    if margins.is_empty() {
        return VarianceResult::insufficient();
    }
    let n = margins.len() as f64;
    let mean = margins.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return VarianceResult::insufficient();
    }
    let var = margins.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n;
    let cv = safe_divide(var.sqrt(), mean.abs());
    let total = clamp(cv * 100.0);
    let volume = total * weights.volume;
    let price = total * weights.price;
    let cost = total * weights.cost;
    let current_margin = margin_percent(rows);
    VarianceResult {
        total_variance: total,
        volume_variance: clamp(volume),
        price_variance: clamp(price),
        cost_variance: clamp(cost),
        mix_variance: clamp(total - (volume + price + cost)),
        current_margin,
        previous_margin: current_margin,
        comparison: Comparison::StatisticalEstimate,
    }
}

/// The natural comparison baseline of a request: the same-point-last-year
/// token for to-date periods, or the prior year for an explicit year.
pub fn previous_period_spec(spec: &FilterSpec) -> Option<FilterSpec> {
    match spec.parsed_period() {
        Some(period) => {
            if let Some(ly) = period.last_year() {
                return Some(FilterSpec {
                    period: Some(ly.token().to_string()),
                    ..spec.clone()
                });
            }
            match (period, spec.year) {
                (Period::Quarter(_), Some(year)) => Some(FilterSpec {
                    year: Some(year.saturating_sub(1)),
                    ..spec.clone()
                }),
                _ => None,
            }
        }
        None => spec.year.map(|year| FilterSpec {
            year: Some(year.saturating_sub(1)),
            ..spec.clone()
        }),
    }
}
