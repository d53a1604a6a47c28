use serde::Deserialize;

use salesdash_core::filter::{is_unrestricted, AccessScope, FilterSpec};
use salesdash_core::row::YEAR_RANGE;

use crate::error::AppError;

/// Query string shared by every analytics route, named as the dashboard
/// sends it. Numbers arrive as strings so bad input gets the JSON error
/// envelope instead of a bare extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub year: Option<String>,
    pub month: Option<String>,
    pub period: Option<String>,
    pub business_area: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub channel: Option<String>,
    pub customer: Option<String>,
    pub metric: Option<String>,
    pub dimension: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl AnalyticsQuery {
    /// The request's filters with the caller's scope merged in.
    pub fn filter_spec(&self, scope: &AccessScope) -> Result<FilterSpec, AppError> {
        let spec = FilterSpec {
            year: parse_year(self.year.as_deref())?,
            month: self.month.clone(),
            period: self.period.clone(),
            business_area: self.business_area.clone(),
            brand: self.brand.clone(),
            category: self.category.clone(),
            sub_category: self.sub_category.clone(),
            channel: self.channel.clone(),
            customer: self.customer.clone(),
            ..FilterSpec::default()
        };
        Ok(spec.with_scope(scope))
    }

    pub fn limit(&self) -> Result<Option<usize>, AppError> {
        parse_optional_usize(self.limit.as_deref(), "limit")
    }

    pub fn offset(&self) -> Result<usize, AppError> {
        Ok(parse_optional_usize(self.offset.as_deref(), "offset")?.unwrap_or(0))
    }
}

/// `""` and `"All"` mean no year filter. Other values must fall in
/// [`YEAR_RANGE`].
pub(crate) fn parse_year(value: Option<&str>) -> Result<Option<i32>, AppError> {
    let Some(raw) = value.filter(|v| !is_unrestricted(v)) else {
        return Ok(None);
    };
    let year = raw
        .trim()
        .parse::<i32>()
        .map_err(|_| AppError::invalid("year", "year must be a number or 'All'"))?;
    if !YEAR_RANGE.contains(&year) {
        return Err(AppError::invalid(
            "year",
            format!(
                "year must be between {} and {}",
                YEAR_RANGE.start(),
                YEAR_RANGE.end()
            ),
        ));
    }
    Ok(Some(year))
}

pub(crate) fn parse_optional_usize(
    value: Option<&str>,
    field: &'static str,
) -> Result<Option<usize>, AppError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<usize>()
        .map(Some)
        .map_err(|_| AppError::invalid(field, format!("{field} must be a non-negative integer")))
}
