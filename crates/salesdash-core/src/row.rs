//! Sales record model and the closed vocabularies used to address it.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Years accepted from data files and request parameters.
pub const YEAR_RANGE: RangeInclusive<i32> = 1900..=9999;

/// Canonical month vocabulary. Every month label seen at ingestion is
/// normalized to one of these twelve variants; ordering follows the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    /// Parse any of the label schemes found in source extracts: `Jan`,
    /// `January`, `JAN`, `Sept`, `1`, `01`. Returns `None` for anything else,
    /// including the empty string.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(n) = s.parse::<u32>() {
            return Self::from_index(n);
        }
        let lower = s.to_ascii_lowercase();
        let prefix = lower.get(..3)?;
        let month = match prefix {
            "jan" => Month::Jan,
            "feb" => Month::Feb,
            "mar" => Month::Mar,
            "apr" => Month::Apr,
            "may" => Month::May,
            "jun" => Month::Jun,
            "jul" => Month::Jul,
            "aug" => Month::Aug,
            "sep" => Month::Sep,
            "oct" => Month::Oct,
            "nov" => Month::Nov,
            "dec" => Month::Dec,
            _ => return None,
        };
        // Reject labels that merely share a prefix ("marketing", "decade").
        let full = month.full_name().to_ascii_lowercase();
        if full.starts_with(&lower) || (month == Month::Sep && lower == "sept") {
            Some(month)
        } else {
            None
        }
    }

    /// 1-based calendar index.
    pub fn index(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index.checked_sub(1)? as usize).copied()
    }

    /// Quarter number, 1–4.
    pub fn quarter(self) -> u32 {
        (self.index() + 2) / 3
    }

    pub fn label(self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }

    fn full_name(self) -> &'static str {
        match self {
            Month::Jan => "January",
            Month::Feb => "February",
            Month::Mar => "March",
            Month::Apr => "April",
            Month::May => "May",
            Month::Jun => "June",
            Month::Jul => "July",
            Month::Aug => "August",
            Month::Sep => "September",
            Month::Oct => "October",
            Month::Nov => "November",
            Month::Dec => "December",
        }
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One sales record. Dimensions default to `""` and measures to `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub year: i32,
    pub month: Month,
    #[serde(default)]
    pub business_area: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub customer_group: String,
    #[serde(default)]
    pub board_category: String,
    #[serde(default)]
    pub sku_channel: String,
    #[serde(default)]
    pub cases: f64,
    #[serde(default)]
    pub gross_sales: f64,
    #[serde(default)]
    pub price_downs: f64,
    #[serde(default)]
    pub perm_disc: f64,
    #[serde(default)]
    pub group_cost: f64,
    #[serde(default)]
    pub lta: f64,
    #[serde(default)]
    pub fgp: f64,
    #[serde(default)]
    pub avg_cost: f64,
}

impl Row {
    /// A row with the given period and every other field defaulted.
    pub fn new(year: i32, month: Month) -> Self {
        Self {
            year,
            month,
            business_area: String::new(),
            channel: String::new(),
            brand: String::new(),
            category: String::new(),
            sub_category: String::new(),
            customer: String::new(),
            customer_group: String::new(),
            board_category: String::new(),
            sku_channel: String::new(),
            cases: 0.0,
            gross_sales: 0.0,
            price_downs: 0.0,
            perm_disc: 0.0,
            group_cost: 0.0,
            lta: 0.0,
            fgp: 0.0,
            avg_cost: 0.0,
        }
    }

    /// Chronological sort key.
    pub fn period_key(&self) -> (i32, u32) {
        (self.year, self.month.index())
    }
}

/// Grouping dimensions. Each variant selects a typed accessor over [`Row`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    BusinessArea,
    Channel,
    Brand,
    Category,
    SubCategory,
    Customer,
    CustomerGroup,
    BoardCategory,
    SkuChannel,
    /// Any name not recognized above. Every row groups under `""`.
    Unknown,
}

impl Dimension {
    /// Never fails: unrecognized names map to [`Dimension::Unknown`].
    pub fn parse(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "business" | "businessarea" | "ba" => Dimension::BusinessArea,
            "channel" => Dimension::Channel,
            "brand" => Dimension::Brand,
            "category" | "cat" => Dimension::Category,
            "subcategory" | "subcat" => Dimension::SubCategory,
            "customer" => Dimension::Customer,
            "customergroup" => Dimension::CustomerGroup,
            "boardcategory" => Dimension::BoardCategory,
            "skuchannel" => Dimension::SkuChannel,
            _ => Dimension::Unknown,
        }
    }

    pub fn value(self, row: &Row) -> &str {
        match self {
            Dimension::BusinessArea => &row.business_area,
            Dimension::Channel => &row.channel,
            Dimension::Brand => &row.brand,
            Dimension::Category => &row.category,
            Dimension::SubCategory => &row.sub_category,
            Dimension::Customer => &row.customer,
            Dimension::CustomerGroup => &row.customer_group,
            Dimension::BoardCategory => &row.board_category,
            Dimension::SkuChannel => &row.sku_channel,
            Dimension::Unknown => "",
        }
    }
}

/// Numeric selectors for rankings and trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    Volume,
    Margin,
    PriceDowns,
    PermDisc,
    GroupCost,
    Lta,
    AvgCost,
    /// Distinct customer count rather than a sum.
    Customers,
}

impl Metric {
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let metric = match key.as_str() {
            "revenue" | "gsales" | "sales" | "grosssales" => Metric::Revenue,
            "volume" | "cases" => Metric::Volume,
            "margin" | "fgp" | "profit" | "grossprofit" => Metric::Margin,
            "pricedowns" => Metric::PriceDowns,
            "permdisc" | "permanentdiscount" => Metric::PermDisc,
            "groupcost" | "cost" => Metric::GroupCost,
            "lta" => Metric::Lta,
            "avgcost" | "averagecost" => Metric::AvgCost,
            "customers" => Metric::Customers,
            _ => return None,
        };
        Some(metric)
    }

    /// Lenient parse used at the HTTP boundary: unknown names fall back to
    /// revenue.
    pub fn parse_or_revenue(raw: Option<&str>) -> Self {
        match raw {
            None => Metric::Revenue,
            Some(name) => Self::parse(name).unwrap_or_else(|| {
                tracing::debug!(metric = name, "unrecognized metric, using revenue");
                Metric::Revenue
            }),
        }
    }

    /// Per-row measure. [`Metric::Customers`] has no per-row value and reads 0.
    pub fn value(self, row: &Row) -> f64 {
        match self {
            Metric::Revenue => row.gross_sales,
            Metric::Volume => row.cases,
            Metric::Margin => row.fgp,
            Metric::PriceDowns => row.price_downs,
            Metric::PermDisc => row.perm_disc,
            Metric::GroupCost => row.group_cost,
            Metric::Lta => row.lta,
            Metric::AvgCost => row.avg_cost,
            Metric::Customers => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_labels_normalize_to_canonical() {
        assert_eq!(Month::parse("Jan"), Some(Month::Jan));
        assert_eq!(Month::parse("JANUARY"), Some(Month::Jan));
        assert_eq!(Month::parse("Sept"), Some(Month::Sep));
        assert_eq!(Month::parse("September"), Some(Month::Sep));
        assert_eq!(Month::parse("09"), Some(Month::Sep));
        assert_eq!(Month::parse(" dec "), Some(Month::Dec));
        assert_eq!(Month::parse(""), None);
        assert_eq!(Month::parse("13"), None);
        assert_eq!(Month::parse("Marketing"), None);
    }

    #[test]
    fn month_quarters() {
        assert_eq!(Month::Jan.quarter(), 1);
        assert_eq!(Month::Mar.quarter(), 1);
        assert_eq!(Month::Apr.quarter(), 2);
        assert_eq!(Month::Sep.quarter(), 3);
        assert_eq!(Month::Dec.quarter(), 4);
    }

    #[test]
    fn unknown_dimension_reads_empty() {
        let mut row = Row::new(2024, Month::Jan);
        row.brand = "Acme".to_string();
        assert_eq!(Dimension::parse("Brand").value(&row), "Acme");
        assert_eq!(Dimension::parse("Business").value(&row), "");
        assert_eq!(Dimension::parse("flavour"), Dimension::Unknown);
        assert_eq!(Dimension::Unknown.value(&row), "");
    }

    #[test]
    fn metric_aliases() {
        assert_eq!(Metric::parse("gSales"), Some(Metric::Revenue));
        assert_eq!(Metric::parse("fGP"), Some(Metric::Margin));
        assert_eq!(Metric::parse("Cases"), Some(Metric::Volume));
        assert_eq!(Metric::parse("bogus"), None);
        assert_eq!(Metric::parse_or_revenue(Some("bogus")), Metric::Revenue);
    }
}
