use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_source: DataSourceConfig,
    pub auth_mode: AuthMode,
    pub cors_origins: Vec<String>,
    pub cache_ttl_secs: u64,
    pub rows_refresh_secs: u64,
    /// Serve zeroed results instead of failing when the data source is down.
    pub allow_empty_on_failure: bool,
    pub thresholds: Thresholds,
    pub variance_weights: VarianceWeights,
    pub combined_rows: Vec<CombinedRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceConfig {
    File(String),
    Http { url: String, token: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthMode {
    None,
    /// Holds the HS256 secret read from `SALESDASH_JWT_SECRET`.
    Jwt(String),
}

/// Report-builder tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub top_n_default_limit: usize,
    /// Margin % below which a group is high risk.
    pub risk_low_margin: f64,
    /// Growth % below which a group is medium risk.
    pub risk_declining_trend: f64,
    /// Revenue below which a group is medium risk.
    pub risk_low_volume: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            top_n_default_limit: 20,
            risk_low_margin: 15.0,
            risk_declining_trend: -5.0,
            risk_low_volume: 10_000.0,
        }
    }
}

/// Fixed weights of the heuristic margin-variance split. Mix takes whatever
/// the three weighted terms leave unexplained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceWeights {
    pub volume: f64,
    pub price: f64,
    pub cost: f64,
}

impl Default for VarianceWeights {
    fn default() -> Self {
        Self {
            volume: 0.4,
            price: 0.3,
            cost: 0.2,
        }
    }
}

/// A YoY report row summing several named groups.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRow {
    pub label: String,
    pub members: Vec<String>,
}

impl CombinedRow {
    /// Parse `label=member|member;label=member|member`.
    pub fn parse_list(raw: &str) -> Vec<CombinedRow> {
        raw.split(';')
            .filter_map(|entry| {
                let (label, members) = entry.split_once('=')?;
                let members: Vec<String> = members
                    .split('|')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect();
                let label = label.trim();
                if label.is_empty() || members.is_empty() {
                    return None;
                }
                Some(CombinedRow {
                    label: label.to_string(),
                    members,
                })
            })
            .collect()
    }
}

const DEFAULT_COMBINED_ROWS: &str = "Grocery + Wholesale ROI=Grocery ROI|Wholesale ROI";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            data_source: DataSourceConfig::File("./data/sales.csv".to_string()),
            auth_mode: AuthMode::None,
            cors_origins: Vec::new(),
            cache_ttl_secs: 1800,
            rows_refresh_secs: 300,
            allow_empty_on_failure: true,
            thresholds: Thresholds::default(),
            variance_weights: VarianceWeights::default(),
            combined_rows: CombinedRow::parse_list(DEFAULT_COMBINED_ROWS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Thresholds::default();
        Ok(Self {
            port: std::env::var("SALESDASH_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_source: {
                let raw = std::env::var("SALESDASH_DATA_SOURCE")
                    .unwrap_or_else(|_| "./data/sales.csv".to_string());
                if raw.starts_with("http://") || raw.starts_with("https://") {
                    DataSourceConfig::Http {
                        url: raw,
                        token: std::env::var("SALESDASH_DATA_TOKEN").ok(),
                    }
                } else {
                    DataSourceConfig::File(raw)
                }
            },
            auth_mode: {
                let raw = std::env::var("SALESDASH_AUTH").unwrap_or_else(|_| "none".to_string());
                match raw.as_str() {
                    "jwt" => {
                        let secret = std::env::var("SALESDASH_JWT_SECRET").map_err(|_| {
                            "SALESDASH_JWT_SECRET required when AUTH=jwt".to_string()
                        })?;
                        AuthMode::Jwt(secret)
                    }
                    _ => AuthMode::None,
                }
            },
            cors_origins: std::env::var("SALESDASH_CORS_ORIGINS")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            cache_ttl_secs: env_or("SALESDASH_CACHE_TTL_SECS", 1800),
            rows_refresh_secs: env_or("SALESDASH_ROWS_REFRESH_SECS", 300),
            allow_empty_on_failure: std::env::var("SALESDASH_ALLOW_EMPTY")
                .map(|v| v != "false")
                .unwrap_or(true),
            thresholds: Thresholds {
                top_n_default_limit: env_or("SALESDASH_TOP_N_LIMIT", defaults.top_n_default_limit),
                risk_low_margin: env_or("SALESDASH_RISK_LOW_MARGIN", defaults.risk_low_margin),
                risk_declining_trend: env_or(
                    "SALESDASH_RISK_DECLINING_TREND",
                    defaults.risk_declining_trend,
                ),
                risk_low_volume: env_or("SALESDASH_RISK_LOW_VOLUME", defaults.risk_low_volume),
            },
            variance_weights: VarianceWeights::default(),
            combined_rows: CombinedRow::parse_list(
                &std::env::var("SALESDASH_COMBINED_ROWS")
                    .unwrap_or_else(|_| DEFAULT_COMBINED_ROWS.to_string()),
            ),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rows_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.rows_refresh_secs)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_rows_parse() {
        let rows = CombinedRow::parse_list("A + B=A|B; Solo=C ;broken;Empty=");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "A + B");
        assert_eq!(rows[0].members, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(rows[1].label, "Solo");
    }

    #[test]
    fn defaults_match_documented_thresholds() {
        let cfg = Config::default();
        assert_eq!(cfg.thresholds.top_n_default_limit, 20);
        assert_eq!(cfg.thresholds.risk_low_margin, 15.0);
        assert_eq!(cfg.thresholds.risk_declining_trend, -5.0);
        assert_eq!(cfg.thresholds.risk_low_volume, 10_000.0);
        assert_eq!(cfg.cache_ttl_secs, 1800);
        assert_eq!(cfg.combined_rows[0].label, "Grocery + Wholesale ROI");
    }
}
