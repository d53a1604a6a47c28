pub mod aggregate;
pub mod config;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod period;
pub mod reports;
pub mod row;
pub mod source;
pub mod variance;
pub mod yoy;

pub use error::AnalyticsError;
pub use filter::{apply_filters, apply_filters_with, AccessScope, FilterOptions, FilterSpec};
pub use row::{Dimension, Metric, Month, Row};
pub use source::{DataSource, FetchMetadata, ResultCache, ResultOrigin};
