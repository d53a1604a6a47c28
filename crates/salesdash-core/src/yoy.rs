//! Year-over-year report rows with spreadsheet (SUMIFS) parity.
//!
//! Every row holds absolute sums for the report year and the year before.
//! Variance percentages are always derived from those sums, so combined and
//! total rows recompute them instead of averaging per-row percentages.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::aggregate::safe_divide;
use crate::config::CombinedRow;
use crate::row::{Dimension, Month, Row};

/// SUMIFS-equivalent sums for one side of a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct YoyTotals {
    pub cases: f64,
    pub gsales: f64,
    pub fgp: f64,
}

impl YoyTotals {
    pub fn sum<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Row>,
    {
        rows.into_iter().fold(Self::default(), |acc, r| Self {
            cases: acc.cases + r.cases,
            gsales: acc.gsales + r.gross_sales,
            fgp: acc.fgp + r.fgp,
        })
    }

    pub fn fgp_percent(&self) -> f64 {
        safe_divide(self.fgp, self.gsales) * 100.0
    }
}

impl std::ops::Add for YoyTotals {
    type Output = YoyTotals;

    fn add(self, rhs: YoyTotals) -> YoyTotals {
        YoyTotals {
            cases: self.cases + rhs.cases,
            gsales: self.gsales + rhs.gsales,
            fgp: self.fgp + rhs.fgp,
        }
    }
}

/// `current - previous` and that difference relative to `|previous|`.
pub fn ly_variance(current: f64, previous: f64) -> (f64, f64) {
    let var = current - previous;
    (var, safe_divide(var, previous.abs()) * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YoyRowKind {
    Leaf,
    Combined,
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoyRow {
    pub label: String,
    pub kind: YoyRowKind,
    pub cases: f64,
    pub cases_ly: f64,
    pub cases_ly_var: f64,
    pub cases_ly_var_percent: f64,
    pub gsales: f64,
    pub gsales_ly: f64,
    pub gsales_ly_var: f64,
    pub gsales_ly_var_percent: f64,
    pub fgp: f64,
    pub fgp_ly: f64,
    pub fgp_ly_var: f64,
    pub fgp_ly_var_percent: f64,
    pub fgp_percent: f64,
    pub fgp_percent_ly: f64,
    /// Percentage-point difference of fGP %.
    pub fgp_percent_var: f64,
}

impl YoyRow {
    pub fn from_totals(
        label: impl Into<String>,
        kind: YoyRowKind,
        current: YoyTotals,
        previous: YoyTotals,
    ) -> Self {
        let (cases_ly_var, cases_ly_var_percent) = ly_variance(current.cases, previous.cases);
        let (gsales_ly_var, gsales_ly_var_percent) = ly_variance(current.gsales, previous.gsales);
        let (fgp_ly_var, fgp_ly_var_percent) = ly_variance(current.fgp, previous.fgp);
        let fgp_percent = current.fgp_percent();
        let fgp_percent_ly = previous.fgp_percent();
        Self {
            label: label.into(),
            kind,
            cases: current.cases,
            cases_ly: previous.cases,
            cases_ly_var,
            cases_ly_var_percent,
            gsales: current.gsales,
            gsales_ly: previous.gsales,
            gsales_ly_var,
            gsales_ly_var_percent,
            fgp: current.fgp,
            fgp_ly: previous.fgp,
            fgp_ly_var,
            fgp_ly_var_percent,
            fgp_percent,
            fgp_percent_ly,
            fgp_percent_var: fgp_percent - fgp_percent_ly,
        }
    }

    pub fn current(&self) -> YoyTotals {
        YoyTotals {
            cases: self.cases,
            gsales: self.gsales,
            fgp: self.fgp,
        }
    }

    pub fn previous(&self) -> YoyTotals {
        YoyTotals {
            cases: self.cases_ly,
            gsales: self.gsales_ly,
            fgp: self.fgp_ly,
        }
    }

    /// Sum several rows into one, recomputing every percentage from the
    /// combined absolute values.
    pub fn combine<'a, I>(label: impl Into<String>, kind: YoyRowKind, rows: I) -> Self
    where
        I: IntoIterator<Item = &'a YoyRow>,
    {
        let (current, previous) = rows.into_iter().fold(
            (YoyTotals::default(), YoyTotals::default()),
            |(c, p), row| (c + row.current(), p + row.previous()),
        );
        Self::from_totals(label, kind, current, previous)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoyReport {
    pub year: i32,
    pub previous_year: i32,
    pub rows: Vec<YoyRow>,
    pub combined: Vec<YoyRow>,
    pub total: YoyRow,
}

/// Report year: the explicit one, else the latest year in the rows.
pub fn report_year(rows: &[Row], explicit: Option<i32>) -> Option<i32> {
    explicit.or_else(|| rows.iter().map(|r| r.year).max())
}

/// One leaf row per distinct value of `dimension`, ordered by current-year
/// gSales descending (ties by first appearance), followed by `combined` rows
/// whose members appear in the data and a grand total over the leaves.
///
/// `rows` must already be filtered with the year restriction skipped.
pub fn dimension_report(
    rows: &[Row],
    dimension: Dimension,
    year: i32,
    combined: &[CombinedRow],
) -> YoyReport {
    let previous_year = year.saturating_sub(1);
    let mut labels: Vec<&str> = Vec::new();
    for row in rows {
        let value = dimension.value(row);
        if (row.year == year || row.year == previous_year) && !labels.contains(&value) {
            labels.push(value);
        }
    }

    let mut leaves: Vec<YoyRow> = labels
        .into_iter()
        .map(|label| {
            let in_group = |y: i32| {
                YoyTotals::sum(
                    rows.iter()
                        .filter(move |r| r.year == y && dimension.value(r) == label),
                )
            };
            YoyRow::from_totals(label, YoyRowKind::Leaf, in_group(year), in_group(previous_year))
        })
        .collect();
    leaves.sort_by(|a, b| b.gsales.partial_cmp(&a.gsales).unwrap_or(Ordering::Equal));

    let combined_rows = combined
        .iter()
        .filter_map(|spec| {
            let members: Vec<&YoyRow> = leaves
                .iter()
                .filter(|row| spec.members.iter().any(|m| m == &row.label))
                .collect();
            (!members.is_empty())
                .then(|| YoyRow::combine(spec.label.clone(), YoyRowKind::Combined, members))
        })
        .collect();

    let total = YoyRow::combine("Total", YoyRowKind::Total, &leaves);
    YoyReport {
        year,
        previous_year,
        rows: leaves,
        combined: combined_rows,
        total,
    }
}

/// One row per calendar month that has data in either year, in month order.
pub fn monthly_report(rows: &[Row], year: i32) -> YoyReport {
    let previous_year = year.saturating_sub(1);
    let leaves: Vec<YoyRow> = Month::ALL
        .iter()
        .filter_map(|&month| {
            let in_month = |y: i32| {
                let hits: Vec<&Row> = rows
                    .iter()
                    .filter(|r| r.year == y && r.month == month)
                    .collect();
                (!hits.is_empty()).then(|| YoyTotals::sum(hits))
            };
            let (current, previous) = (in_month(year), in_month(previous_year));
            if current.is_none() && previous.is_none() {
                return None;
            }
            Some(YoyRow::from_totals(
                month.label(),
                YoyRowKind::Leaf,
                current.unwrap_or_default(),
                previous.unwrap_or_default(),
            ))
        })
        .collect();
    let total = YoyRow::combine("Total", YoyRowKind::Total, &leaves);
    YoyReport {
        year,
        previous_year,
        rows: leaves,
        combined: Vec::new(),
        total,
    }
}
