//! Request filters and row-level-security scopes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::period::{resolve_period, Period};
use crate::row::{Dimension, Month, Row};

/// Per-request filter. `None`, `""` and `"All"` all mean "no restriction".
///
/// Allow-lists are sorted sets so the serialized form is stable and can be
/// hashed into cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub year: Option<i32>,
    pub month: Option<String>,
    pub period: Option<String>,
    pub business_area: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub channel: Option<String>,
    pub customer: Option<String>,
    pub allowed_business_areas: Option<BTreeSet<String>>,
    pub allowed_channels: Option<BTreeSet<String>>,
    pub allowed_brands: Option<BTreeSet<String>>,
    pub allowed_customers: Option<BTreeSet<String>>,
}

/// Caller allow-lists derived by the auth layer. All `None` means the caller
/// sees every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessScope {
    pub business_areas: Option<BTreeSet<String>>,
    pub channels: Option<BTreeSet<String>>,
    pub brands: Option<BTreeSet<String>>,
    pub customers: Option<BTreeSet<String>>,
}

impl AccessScope {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        [
            &self.business_areas,
            &self.channels,
            &self.brands,
            &self.customers,
        ]
        .iter()
        .all(|list| list.as_ref().map_or(true, BTreeSet::is_empty))
    }
}

impl FilterSpec {
    /// Merge the caller's scope into this spec. Scope lists replace whatever
    /// allow-lists the request carried.
    pub fn with_scope(mut self, scope: &AccessScope) -> Self {
        if scope.business_areas.is_some() {
            self.allowed_business_areas = scope.business_areas.clone();
        }
        if scope.channels.is_some() {
            self.allowed_channels = scope.channels.clone();
        }
        if scope.brands.is_some() {
            self.allowed_brands = scope.brands.clone();
        }
        if scope.customers.is_some() {
            self.allowed_customers = scope.customers.clone();
        }
        self
    }

    pub fn parsed_period(&self) -> Option<Period> {
        self.period.as_deref().and_then(Period::parse)
    }

    /// Direct equality filters, in application order.
    fn equality_filters(&self) -> [(Dimension, Option<&str>); 6] {
        [
            (Dimension::BusinessArea, active(&self.business_area)),
            (Dimension::Brand, active(&self.brand)),
            (Dimension::Category, active(&self.category)),
            (Dimension::SubCategory, active(&self.sub_category)),
            (Dimension::Channel, active(&self.channel)),
            (Dimension::Customer, active(&self.customer)),
        ]
    }

    fn allow_lists(&self) -> [(Dimension, Option<&BTreeSet<String>>); 4] {
        [
            (Dimension::BusinessArea, non_empty(&self.allowed_business_areas)),
            (Dimension::Channel, non_empty(&self.allowed_channels)),
            (Dimension::Brand, non_empty(&self.allowed_brands)),
            (Dimension::Customer, non_empty(&self.allowed_customers)),
        ]
    }
}

/// `true` when a filter value means "no restriction".
pub fn is_unrestricted(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("all")
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !is_unrestricted(v))
}

fn non_empty(list: &Option<BTreeSet<String>>) -> Option<&BTreeSet<String>> {
    list.as_ref().filter(|l| !l.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Drop every year restriction (period pin and explicit `year`) so both
    /// years of a year-over-year comparison stay in the view.
    pub skip_year_filter: bool,
}

/// Apply `spec` to `rows` with default options. Never mutates the input.
pub fn apply_filters(rows: &[Row], spec: &FilterSpec) -> Vec<Row> {
    apply_filters_with(rows, spec, FilterOptions::default())
}

/// Filter order: period, then direct equality, then allow-lists.
///
/// A to-date period token (`YTD`, `LQTD`, ...) consumes `year` and `month` as
/// its anchor, so those two only act as plain equality filters when no such
/// token is in effect. Quarter tokens leave them in place.
pub fn apply_filters_with(rows: &[Row], spec: &FilterSpec, options: FilterOptions) -> Vec<Row> {
    let period = resolve_period(
        rows,
        spec.period.as_deref(),
        spec.year,
        spec.month.as_deref(),
        options.skip_year_filter,
    );
    let period_active = spec
        .parsed_period()
        .is_some_and(|p| !matches!(p, Period::Quarter(_)));

    let year = spec
        .year
        .filter(|_| !period_active && !options.skip_year_filter);
    let month = if period_active {
        None
    } else {
        spec.month
            .as_deref()
            .filter(|m| !is_unrestricted(m))
            .map(|m| Month::parse(m).ok_or(()))
    };

    let equality = spec.equality_filters();
    let allow_lists = spec.allow_lists();

    rows.iter()
        .filter(|row| period.matches(row))
        .filter(|row| year.map_or(true, |y| row.year == y))
        .filter(|row| match month {
            None => true,
            Some(Ok(m)) => row.month == m,
            // An unparseable month label matches nothing.
            Some(Err(())) => false,
        })
        .filter(|row| {
            equality
                .iter()
                .all(|(dim, wanted)| wanted.map_or(true, |w| dim.value(row) == w))
        })
        .filter(|row| {
            allow_lists.iter().all(|(dim, list)| {
                list.map_or(true, |l| {
                    let value = dim.value(row);
                    !value.is_empty() && l.contains(value)
                })
            })
        })
        .cloned()
        .collect()
}
