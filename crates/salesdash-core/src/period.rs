//! Fiscal period tokens and their resolution into row predicates.

use serde::{Deserialize, Serialize};

use crate::row::{Month, Row};

/// Symbolic period token. `Q1`..`Q4` carry their quarter number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Ytd,
    Mtd,
    Qtd,
    Lytd,
    Lmtd,
    Lqtd,
    Quarter(u32),
}

impl Period {
    /// Case-insensitive. Unrecognized tokens return `None` and callers treat
    /// them as "no period restriction".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "YTD" => Some(Period::Ytd),
            "MTD" => Some(Period::Mtd),
            "QTD" => Some(Period::Qtd),
            "LYTD" => Some(Period::Lytd),
            "LMTD" => Some(Period::Lmtd),
            "LQTD" => Some(Period::Lqtd),
            "Q1" => Some(Period::Quarter(1)),
            "Q2" => Some(Period::Quarter(2)),
            "Q3" => Some(Period::Quarter(3)),
            "Q4" => Some(Period::Quarter(4)),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Period::Ytd => "YTD",
            Period::Mtd => "MTD",
            Period::Qtd => "QTD",
            Period::Lytd => "LYTD",
            Period::Lmtd => "LMTD",
            Period::Lqtd => "LQTD",
            Period::Quarter(1) => "Q1",
            Period::Quarter(2) => "Q2",
            Period::Quarter(3) => "Q3",
            Period::Quarter(_) => "Q4",
        }
    }

    /// Same-point-last-year counterpart of a to-date token.
    pub fn last_year(self) -> Option<Self> {
        match self {
            Period::Ytd => Some(Period::Lytd),
            Period::Mtd => Some(Period::Lmtd),
            Period::Qtd => Some(Period::Lqtd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    /// Months `1..=m`.
    ToDate(Option<Month>),
    /// Exactly one month.
    Month(Option<Month>),
    /// Months of the reference month's quarter up to the reference month.
    QuarterToDate(Option<Month>),
    /// Every month of quarter `q`.
    Quarter(u32),
}

impl Window {
    fn contains(self, month: Month) -> bool {
        match self {
            Window::ToDate(limit) => month.index() <= limit.map_or(12, Month::index),
            Window::Month(None) | Window::QuarterToDate(None) => true,
            Window::Month(Some(selected)) => month == selected,
            Window::QuarterToDate(Some(selected)) => {
                month.quarter() == selected.quarter() && month.index() <= selected.index()
            }
            Window::Quarter(q) => month.quarter() == q,
        }
    }
}

/// Resolved row predicate for a period request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodPredicate {
    year: Option<i32>,
    window: Option<Window>,
}

impl PeriodPredicate {
    pub const ACCEPT_ALL: PeriodPredicate = PeriodPredicate {
        year: None,
        window: None,
    };

    pub fn matches(&self, row: &Row) -> bool {
        if let Some(year) = self.year {
            if row.year != year {
                return false;
            }
        }
        self.window.map_or(true, |w| w.contains(row.month))
    }

    /// Year the predicate pins rows to, if any.
    pub fn year(&self) -> Option<i32> {
        self.year
    }
}

/// Anchor a period request is measured from: the target year and the
/// reference month inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodAnchor {
    pub year: i32,
    pub month: Option<Month>,
}

/// Determine the target year (explicit, else the latest year present) and the
/// reference month (explicit unless `All`, else the latest month present in
/// the target year). `None` when there is nothing to anchor on.
pub fn resolve_anchor(
    rows: &[Row],
    explicit_year: Option<i32>,
    explicit_month: Option<&str>,
) -> Option<PeriodAnchor> {
    let year = explicit_year.or_else(|| rows.iter().map(|r| r.year).max())?;
    let month = explicit_month
        .filter(|m| !m.trim().eq_ignore_ascii_case("all"))
        .and_then(Month::parse)
        .or_else(|| {
            rows.iter()
                .filter(|r| r.year == year)
                .map(|r| r.month)
                .max()
        });
    Some(PeriodAnchor { year, month })
}

/// Turn a period token into a row predicate.
///
/// With `skip_year_filter` the year pin is dropped and only the month window
/// applies, so year-over-year builders can see both years at once.
pub fn resolve_period(
    rows: &[Row],
    period: Option<&str>,
    explicit_year: Option<i32>,
    explicit_month: Option<&str>,
    skip_year_filter: bool,
) -> PeriodPredicate {
    let Some(period) = period.and_then(Period::parse) else {
        return PeriodPredicate::ACCEPT_ALL;
    };
    if rows.is_empty() {
        return PeriodPredicate::ACCEPT_ALL;
    }
    match resolve_anchor(rows, explicit_year, explicit_month) {
        Some(anchor) => predicate_for(period, anchor, skip_year_filter),
        None => PeriodPredicate::ACCEPT_ALL,
    }
}

/// Predicate for a period measured from an already-resolved anchor.
pub fn predicate_for(period: Period, anchor: PeriodAnchor, skip_year_filter: bool) -> PeriodPredicate {
    let (year_offset, window) = match period {
        Period::Ytd => (Some(0), Window::ToDate(anchor.month)),
        Period::Mtd => (Some(0), Window::Month(anchor.month)),
        Period::Qtd => (Some(0), Window::QuarterToDate(anchor.month)),
        Period::Lytd => (Some(1), Window::ToDate(anchor.month)),
        Period::Lmtd => (Some(1), Window::Month(anchor.month)),
        Period::Lqtd => (Some(1), Window::QuarterToDate(anchor.month)),
        Period::Quarter(q) => (None, Window::Quarter(q)),
    };
    let year = if skip_year_filter {
        None
    } else {
        year_offset.map(|offset| anchor.year.saturating_sub(offset))
    };
    PeriodPredicate {
        year,
        window: Some(window),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(spec: &[(i32, Month)]) -> Vec<Row> {
        spec.iter().map(|(y, m)| Row::new(*y, *m)).collect()
    }

    fn count(rows: &[Row], pred: PeriodPredicate) -> usize {
        rows.iter().filter(|r| pred.matches(r)).count()
    }

    fn two_years() -> Vec<Row> {
        let mut out = Vec::new();
        for year in [2023, 2024] {
            for month in Month::ALL {
                if year == 2024 && month > Month::Jun {
                    break;
                }
                out.push(Row::new(year, month));
            }
        }
        out
    }

    #[test]
    fn ytd_defaults_to_latest_year_and_month() {
        let data = two_years();
        let pred = resolve_period(&data, Some("YTD"), None, None, false);
        assert_eq!(pred.year(), Some(2024));
        assert_eq!(count(&data, pred), 6);
    }

    #[test]
    fn ytd_respects_explicit_month() {
        let data = two_years();
        let pred = resolve_period(&data, Some("ytd"), None, Some("Mar"), false);
        assert_eq!(count(&data, pred), 3);
    }

    #[test]
    fn ytd_month_all_uses_latest() {
        let data = two_years();
        let pred = resolve_period(&data, Some("YTD"), Some(2023), Some("All"), false);
        assert_eq!(count(&data, pred), 12);
    }

    #[test]
    fn mtd_selects_single_month() {
        let data = two_years();
        let pred = resolve_period(&data, Some("MTD"), None, None, false);
        let hits: Vec<_> = data.iter().filter(|r| pred.matches(r)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].month, Month::Jun);
        assert_eq!(hits[0].year, 2024);
    }

    #[test]
    fn qtd_stops_at_reference_month() {
        let data = two_years();
        let pred = resolve_period(&data, Some("QTD"), None, Some("May"), false);
        let months: Vec<_> = data
            .iter()
            .filter(|r| pred.matches(r))
            .map(|r| r.month)
            .collect();
        assert_eq!(months, vec![Month::Apr, Month::May]);
    }

    #[test]
    fn last_year_tokens_reuse_current_reference() {
        let data = two_years();
        let lytd = resolve_period(&data, Some("LYTD"), None, None, false);
        assert_eq!(lytd.year(), Some(2023));
        assert_eq!(count(&data, lytd), 6);

        let lmtd = resolve_period(&data, Some("LMTD"), None, None, false);
        let hit: Vec<_> = data.iter().filter(|r| lmtd.matches(r)).collect();
        assert_eq!(hit.len(), 1);
        assert_eq!((hit[0].year, hit[0].month), (2023, Month::Jun));

        let lqtd = resolve_period(&data, Some("LQTD"), None, None, false);
        assert_eq!(count(&data, lqtd), 3);
    }

    #[test]
    fn quarter_tokens_span_all_years() {
        let data = two_years();
        let pred = resolve_period(&data, Some("Q2"), None, None, false);
        assert_eq!(count(&data, pred), 6);
        let q4 = resolve_period(&data, Some("q4"), None, None, false);
        assert_eq!(count(&data, q4), 3);
    }

    #[test]
    fn unknown_or_missing_token_passes_everything() {
        let data = two_years();
        assert_eq!(count(&data, resolve_period(&data, Some("H1"), None, None, false)), 18);
        assert_eq!(count(&data, resolve_period(&data, None, None, None, false)), 18);
    }

    #[test]
    fn empty_rows_accept_all() {
        assert_eq!(
            resolve_period(&[], Some("YTD"), None, None, false),
            PeriodPredicate::ACCEPT_ALL
        );
    }

    #[test]
    fn missing_month_degrades_to_year_only() {
        // Explicit year with no rows in it: no reference month can be found.
        let data = rows(&[(2024, Month::Jan), (2024, Month::Feb)]);
        let pred = resolve_period(&data, Some("MTD"), Some(2022), None, false);
        assert_eq!(pred.year(), Some(2022));
        let mut candidate = Row::new(2022, Month::Nov);
        assert!(pred.matches(&candidate));
        candidate.year = 2024;
        assert!(!pred.matches(&candidate));
    }

    #[test]
    fn skip_year_filter_keeps_month_window_only() {
        let data = two_years();
        let pred = resolve_period(&data, Some("YTD"), None, Some("Feb"), true);
        assert_eq!(pred.year(), None);
        assert_eq!(count(&data, pred), 4);
    }

    #[test]
    fn ytd_count_is_monotonic_in_month() {
        let data = two_years();
        let mut previous = 0;
        for month in Month::ALL {
            let pred = resolve_period(&data, Some("YTD"), Some(2023), Some(month.label()), false);
            let n = count(&data, pred);
            assert!(n >= previous, "YTD shrank at {month}");
            previous = n;
        }
        assert_eq!(previous, 12);
    }

    #[test]
    fn last_year_anchor_saturates_at_minimum_year() {
        let anchor = PeriodAnchor {
            year: i32::MIN,
            month: Some(Month::Mar),
        };
        let pred = predicate_for(Period::Lytd, anchor, false);
        assert_eq!(pred.year(), Some(i32::MIN));
    }
}
