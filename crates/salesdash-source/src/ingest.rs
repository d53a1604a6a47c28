//! Turning spreadsheet extracts into [`Row`]s.
//!
//! Headers are matched loosely (case, spacing and punctuation ignored) so the
//! same loader handles `Sub-Cat`, `sub_category` and `SubCategory`.
//!
//! Two validation rules apply, and they deliberately differ:
//!
//! - a row whose year or month is missing or unreadable is dropped;
//! - a measure that cannot be read as a number becomes `0.0` and the row is
//!   kept. Each such field is counted in [`LoadReport::coerced_fields`].

use std::io::Read;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::debug;

use salesdash_core::row::{Month, Row, YEAR_RANGE};

/// Outcome counters for one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
    pub coerced_fields: usize,
}

/// Payload encodings a source may deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    /// Pick a format from a content type (when known) or a path/URL suffix.
    /// Defaults to CSV.
    pub fn detect(location: &str, content_type: Option<&str>) -> Self {
        if content_type.is_some_and(|ct| ct.contains("json")) {
            return Self::Json;
        }
        let path = location.split(['?', '#']).next().unwrap_or(location);
        if path.to_ascii_lowercase().ends_with(".json") {
            Self::Json
        } else {
            Self::Csv
        }
    }
}

pub fn parse_payload(bytes: &[u8], format: Format) -> Result<(Vec<Row>, LoadReport)> {
    match format {
        Format::Csv => parse_csv(bytes),
        Format::Json => parse_json(bytes),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Year,
    Month,
    BusinessArea,
    Channel,
    Brand,
    Category,
    SubCategory,
    Customer,
    CustomerGroup,
    BoardCategory,
    SkuChannel,
    Cases,
    GrossSales,
    PriceDowns,
    PermDisc,
    GroupCost,
    Lta,
    Fgp,
    AvgCost,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        let key: String = header
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Some(match key.as_str() {
            "year" | "fy" | "fiscalyear" => Self::Year,
            "month" | "period" | "mth" => Self::Month,
            "businessarea" | "ba" => Self::BusinessArea,
            "channel" => Self::Channel,
            "brand" => Self::Brand,
            "category" | "cat" => Self::Category,
            "subcategory" | "subcat" => Self::SubCategory,
            "customer" | "customername" => Self::Customer,
            "customergroup" => Self::CustomerGroup,
            "boardcategory" => Self::BoardCategory,
            "skuchannel" => Self::SkuChannel,
            "cases" | "volume" => Self::Cases,
            "gsales" | "grosssales" | "revenue" => Self::GrossSales,
            "pricedowns" => Self::PriceDowns,
            "permdisc" | "permdiscount" => Self::PermDisc,
            "groupcost" => Self::GroupCost,
            "lta" => Self::Lta,
            "fgp" | "margin" => Self::Fgp,
            "avgcost" | "averagecost" => Self::AvgCost,
            _ => return None,
        })
    }
}

/// Read a loosely formatted number: thousands separators, currency symbols,
/// trailing `%` and accounting-style `(123)` negatives are accepted, blanks
/// are zero. Returns `None` only when nothing numeric remains.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '$' | '€' | '£' | '%'))
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return Some(0.0);
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

fn parse_year(raw: &str) -> Option<i32> {
    let value = raw.trim().parse::<f64>().ok()?;
    if value.fract() != 0.0 {
        return None;
    }
    let year = value as i32;
    YEAR_RANGE.contains(&year).then_some(year)
}

/// Assemble a row from `(column, text)` pairs. `None` means the row must be
/// skipped.
fn build_row<'a, I>(fields: I, report: &mut LoadReport) -> Option<Row>
where
    I: IntoIterator<Item = (Column, &'a str)>,
{
    let mut year = None;
    let mut month = None;
    let mut row = Row::new(0, Month::Jan);
    let mut coerced = 0;

    for (column, text) in fields {
        let mut number = || {
            parse_number(text).unwrap_or_else(|| {
                coerced += 1;
                0.0
            })
        };
        match column {
            Column::Year => year = parse_year(text),
            Column::Month => month = Month::parse(text),
            Column::BusinessArea => row.business_area = text.trim().to_string(),
            Column::Channel => row.channel = text.trim().to_string(),
            Column::Brand => row.brand = text.trim().to_string(),
            Column::Category => row.category = text.trim().to_string(),
            Column::SubCategory => row.sub_category = text.trim().to_string(),
            Column::Customer => row.customer = text.trim().to_string(),
            Column::CustomerGroup => row.customer_group = text.trim().to_string(),
            Column::BoardCategory => row.board_category = text.trim().to_string(),
            Column::SkuChannel => row.sku_channel = text.trim().to_string(),
            Column::Cases => row.cases = number(),
            Column::GrossSales => row.gross_sales = number(),
            Column::PriceDowns => row.price_downs = number(),
            Column::PermDisc => row.perm_disc = number(),
            Column::GroupCost => row.group_cost = number(),
            Column::Lta => row.lta = number(),
            Column::Fgp => row.fgp = number(),
            Column::AvgCost => row.avg_cost = number(),
        }
    }

    let (Some(year), Some(month)) = (year, month) else {
        return None;
    };
    report.coerced_fields += coerced;
    row.year = year;
    row.month = month;
    Some(row)
}

/// Parse a CSV extract with a header line. Fails only when the header itself
/// is unreadable or lacks a year or month column; bad records are skipped.
pub fn parse_csv<R: Read>(reader: R) -> Result<(Vec<Row>, LoadReport)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<Option<Column>> = csv_reader
        .headers()
        .context("failed to read CSV header")?
        .iter()
        .map(Column::from_header)
        .collect();
    for required in [Column::Year, Column::Month] {
        if !columns.contains(&Some(required)) {
            bail!("CSV header has no {required:?} column");
        }
    }

    let mut rows = Vec::new();
    let mut report = LoadReport::default();
    for (line, record) in csv_reader.records().enumerate() {
        report.total_rows += 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                debug!(line = line + 2, error = %e, "Skipping unreadable CSV record");
                report.skipped_rows += 1;
                continue;
            }
        };
        let fields = columns
            .iter()
            .zip(record.iter())
            .filter_map(|(column, text)| column.map(|c| (c, text)));
        match build_row(fields, &mut report) {
            Some(row) => rows.push(row),
            None => {
                debug!(line = line + 2, "Skipping row without a valid year and month");
                report.skipped_rows += 1;
            }
        }
    }
    report.loaded_rows = rows.len();
    Ok((rows, report))
}

/// Parse a JSON array of objects, or an object wrapping one under `rows` or
/// `data`. Keys are matched like CSV headers.
pub fn parse_json(bytes: &[u8]) -> Result<(Vec<Row>, LoadReport)> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).context("payload is not valid JSON")?;
    let records = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map
            .remove("rows")
            .or_else(|| map.remove("data"))
        {
            Some(serde_json::Value::Array(items)) => items,
            _ => bail!("JSON payload has no `rows` or `data` array"),
        },
        _ => bail!("JSON payload must be an array of records"),
    };

    let mut rows = Vec::new();
    let mut report = LoadReport::default();
    for record in &records {
        report.total_rows += 1;
        let Some(object) = record.as_object() else {
            report.skipped_rows += 1;
            continue;
        };
        let texts: Vec<(Column, String)> = object
            .iter()
            .filter_map(|(key, value)| {
                let column = Column::from_header(key)?;
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                Some((column, text))
            })
            .collect();
        match build_row(texts.iter().map(|(c, t)| (*c, t.as_str())), &mut report) {
            Some(row) => rows.push(row),
            None => report.skipped_rows += 1,
        }
    }
    report.loaded_rows = rows.len();
    Ok((rows, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
Year,Month,Business Area,Channel,Brand,Sub-Cat,Customer,Cases,gSales,fGP,Group Cost
2024,January,Grocery ROI,Retail,Acme,Snacks,Tesco,50,\"1,000\",200,700
2024,Feb,Grocery ROI,Retail,Acme,Snacks,Dunnes,60,€1500,225,n/a
,Mar,Grocery ROI,Retail,Acme,Snacks,Tesco,1,1,1,1
2024,Smarch,Grocery ROI,Retail,Acme,Snacks,Tesco,1,1,1,1
2023,12,Wholesale ROI,Wholesale,Acme,Drinks,Musgrave,10,(250),-20,
";

    #[test]
    fn loads_valid_rows_and_reports_the_rest() {
        let (rows, report) = parse_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(
            report,
            LoadReport {
                total_rows: 5,
                loaded_rows: 3,
                skipped_rows: 2,
                coerced_fields: 1,
            }
        );
        assert_eq!(rows[0].gross_sales, 1000.0);
        assert_eq!(rows[0].month, Month::Jan);
        assert_eq!(rows[0].sub_category, "Snacks");
        assert_eq!(rows[1].gross_sales, 1500.0);
        // Unreadable measure is coerced, the row survives.
        assert_eq!(rows[1].group_cost, 0.0);
        assert_eq!((rows[2].year, rows[2].month), (2023, Month::Dec));
        assert_eq!(rows[2].gross_sales, -250.0);
    }

    #[test]
    fn header_without_period_columns_fails() {
        let err = parse_csv("Brand,gSales\nAcme,1\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Year"));
    }

    #[test]
    fn number_formats() {
        assert_eq!(parse_number(" 1,234.50 "), Some(1234.5));
        assert_eq!(parse_number("(12)"), Some(-12.0));
        assert_eq!(parse_number("£7"), Some(7.0));
        assert_eq!(parse_number("12.5%"), Some(12.5));
        assert_eq!(parse_number(""), Some(0.0));
        assert_eq!(parse_number("-"), Some(0.0));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn json_records_use_the_same_rules() {
        let payload = br#"{"rows": [
            {"year": 2024, "month": "Mar", "businessArea": "Export", "gSales": 10.5, "cases": null},
            {"year": "2024", "month": "Apr", "gSales": "oops"},
            {"month": "May", "gSales": 1},
            "not an object"
        ]}"#;
        let (rows, report) = parse_json(payload).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.skipped_rows, 2);
        assert_eq!(report.coerced_fields, 1);
        assert_eq!(rows[0].business_area, "Export");
        assert_eq!(rows[0].gross_sales, 10.5);
        assert_eq!(rows[0].cases, 0.0);
    }

    #[test]
    fn format_detection() {
        assert_eq!(Format::detect("https://x/y.json?sig=1", None), Format::Json);
        assert_eq!(Format::detect("data/sales.csv", None), Format::Csv);
        assert_eq!(
            Format::detect("https://x/export", Some("application/json; charset=utf-8")),
            Format::Json
        );
    }
}
