use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use salesdash_core::row::Row;
use salesdash_core::source::DataSource;

use crate::ingest::{parse_payload, Format};

/// Rows read from a CSV or JSON file on local disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileSource {
    async fn fetch_rows(&self) -> Result<Vec<Row>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let format = Format::detect(&self.path.to_string_lossy(), None);
        let (rows, report) = tokio::task::spawn_blocking(move || parse_payload(&bytes, format))
            .await
            .context("ingestion task panicked")??;
        info!(
            path = %self.path.display(),
            loaded = report.loaded_rows,
            skipped = report.skipped_rows,
            coerced = report.coerced_fields,
            "Loaded sales rows from file"
        );
        Ok(rows)
    }

    /// Modification time and size; either changing forces a reload.
    async fn fingerprint(&self) -> Result<Option<String>> {
        let meta = tokio::fs::metadata(&self.path)
            .await
            .with_context(|| format!("failed to stat {}", self.path.display()))?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos());
        Ok(modified.map(|m| format!("{m}:{}", meta.len())))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("salesdash-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn reads_rows_and_tracks_changes() {
        let path = temp_path("rows.csv");
        tokio::fs::write(&path, "Year,Month,gSales\n2024,Jan,10\n")
            .await
            .unwrap();
        let source = FileSource::new(&path);

        let rows = source.fetch_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        let first = source.fingerprint().await.unwrap();
        assert!(first.is_some());

        tokio::fs::write(&path, "Year,Month,gSales\n2024,Jan,10\n2024,Feb,20\n")
            .await
            .unwrap();
        let second = source.fingerprint().await.unwrap();
        assert_ne!(first, second);
        assert_eq!(source.fetch_rows().await.unwrap().len(), 2);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = FileSource::new(temp_path("does-not-exist.csv"));
        assert!(source.fetch_rows().await.is_err());
        assert!(source.describe().starts_with("file:"));
    }
}
