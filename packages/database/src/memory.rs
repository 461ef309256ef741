//! In-process record store. Backs tests and one-shot runs without a data
//! directory.

use std::collections::{BTreeMap, BTreeSet};

use arrest_leads_arrest_models::{ArrestRecord, County};
use arrest_leads_source_models::SourceAdapterConfig;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{RecordStore, StoreError, Upserted, apply_upsert, index_configs};

/// Records held in a map per county.
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<County, BTreeMap<String, ArrestRecord>>>,
    configs: BTreeMap<County, SourceAdapterConfig>,
}

impl MemoryRecordStore {
    /// Creates an empty store serving `configs`.
    #[must_use]
    pub fn new(configs: impl IntoIterator<Item = SourceAdapterConfig>) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            configs: index_configs(configs),
        }
    }

    /// Number of records stored for `county`.
    pub async fn len(&self, county: County) -> usize {
        self.records.read().await.get(&county).map_or(0, BTreeMap::len)
    }

    /// The record stored under `key`, if any.
    pub async fn get(&self, county: County, key: &str) -> Option<ArrestRecord> {
        self.records
            .read()
            .await
            .get(&county)
            .and_then(|table| table.get(key))
            .cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load_existing_keys(&self, county: County) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(&county)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_record(
        &self,
        county: County,
        key: &str,
        record: &ArrestRecord,
    ) -> Result<Upserted, StoreError> {
        let mut records = self.records.write().await;
        Ok(apply_upsert(records.entry(county).or_default(), key, record))
    }

    async fn load_records(&self, county: County) -> Result<Vec<ArrestRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(&county)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn load_config(&self, county: County) -> Result<SourceAdapterConfig, StoreError> {
        self.configs
            .get(&county)
            .cloned()
            .ok_or(StoreError::MissingConfig { county })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counties_are_independent() {
        let store = MemoryRecordStore::new(Vec::new());
        let mut record = ArrestRecord::new(County::Lee);
        record.booking_number = "1".to_string();

        store.upsert_record(County::Lee, "Lee|1", &record).await.unwrap();

        assert_eq!(store.len(County::Lee).await, 1);
        assert_eq!(store.len(County::Collier).await, 0);
        assert!(store.load_existing_keys(County::Collier).await.unwrap().is_empty());
        assert!(store.get(County::Lee, "Lee|1").await.is_some());
    }

    #[tokio::test]
    async fn missing_config_is_an_error() {
        let store = MemoryRecordStore::new(Vec::new());
        assert!(matches!(
            store.load_config(County::Charlotte).await,
            Err(StoreError::MissingConfig {
                county: County::Charlotte
            })
        ));
    }
}
