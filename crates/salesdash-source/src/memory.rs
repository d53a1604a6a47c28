use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use salesdash_core::row::Row;
use salesdash_core::source::DataSource;

/// Fixed in-process rows. Replacing them bumps the fingerprint; `set_offline`
/// makes every fetch fail, to exercise outage handling.
#[derive(Default)]
pub struct MemorySource {
    rows: RwLock<Vec<Row>>,
    version: AtomicU64,
    offline: AtomicBool,
}

impl MemorySource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: RwLock::new(rows),
            version: AtomicU64::new(0),
            offline: AtomicBool::new(false),
        }
    }

    pub async fn replace(&self, rows: Vec<Row>) {
        *self.rows.write().await = rows;
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn fetch_rows(&self) -> Result<Vec<Row>> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("memory source is offline");
        }
        Ok(self.rows.read().await.clone())
    }

    async fn fingerprint(&self) -> Result<Option<String>> {
        Ok(Some(self.version.load(Ordering::SeqCst).to_string()))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesdash_core::row::Month;

    #[tokio::test]
    async fn replace_changes_fingerprint() {
        let source = MemorySource::new(vec![Row::new(2024, Month::Jan)]);
        let before = source.fingerprint().await.unwrap();
        source.replace(Vec::new()).await;
        assert_ne!(before, source.fingerprint().await.unwrap());
        assert!(source.fetch_rows().await.unwrap().is_empty());

        source.set_offline(true);
        assert!(source.fetch_rows().await.is_err());
    }
}
