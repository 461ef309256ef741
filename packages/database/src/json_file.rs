//! One JSON document per county under a data directory.
//!
//! Each county file is a map of natural key to record. Tables are loaded on
//! first use and kept in memory; every upsert rewrites the county file by
//! writing a sibling temp file and renaming it over the original, so a
//! crash mid-write leaves the previous version intact.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use arrest_leads_arrest_models::{ArrestRecord, County};
use arrest_leads_source_models::SourceAdapterConfig;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::paths::county_records_path;
use crate::{RecordStore, StoreError, UpsertAction, Upserted, index_configs, merge_upsert};

type Table = BTreeMap<String, ArrestRecord>;

/// File-backed record store.
pub struct JsonFileRecordStore {
    dir: PathBuf,
    tables: Mutex<BTreeMap<County, Table>>,
    configs: BTreeMap<County, SourceAdapterConfig>,
}

impl JsonFileRecordStore {
    /// Creates a store rooted at `dir`. The directory is created on first
    /// write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, configs: impl IntoIterator<Item = SourceAdapterConfig>) -> Self {
        Self {
            dir: dir.into(),
            tables: Mutex::new(BTreeMap::new()),
            configs: index_configs(configs),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_table(&self, county: County) -> Result<Table, StoreError> {
        let path = county_records_path(&self.dir, county);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let table: Table = serde_json::from_slice(&bytes)?;
                log::debug!("Loaded {} record(s) from {}", table.len(), path.display());
                Ok(table)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Table::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_table(&self, county: County, table: &Table) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = county_records_path(&self.dir, county);
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(table)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// The county table, loaded from disk on first use.
    async fn table<'a>(
        &self,
        tables: &'a mut BTreeMap<County, Table>,
        county: County,
    ) -> Result<&'a mut Table, StoreError> {
        if !tables.contains_key(&county) {
            let table = self.read_table(county).await?;
            tables.insert(county, table);
        }
        Ok(tables.entry(county).or_default())
    }
}

#[async_trait]
impl RecordStore for JsonFileRecordStore {
    async fn load_existing_keys(&self, county: County) -> Result<BTreeSet<String>, StoreError> {
        let mut tables = self.tables.lock().await;
        let table = self.table(&mut tables, county).await?;
        Ok(table.keys().cloned().collect())
    }

    async fn upsert_record(
        &self,
        county: County,
        key: &str,
        record: &ArrestRecord,
    ) -> Result<Upserted, StoreError> {
        let mut tables = self.tables.lock().await;
        let table = self.table(&mut tables, county).await?;

        let upserted = merge_upsert(table.get(key), record);
        if upserted.action == UpsertAction::Skipped {
            return Ok(upserted);
        }

        let previous = table.insert(key.to_string(), upserted.stored.clone());
        if let Err(e) = self.write_table(county, table).await {
            // Cache mirrors the file: roll back.
            match previous {
                Some(previous) => table.insert(key.to_string(), previous),
                None => table.remove(key),
            };
            return Err(e);
        }
        Ok(upserted)
    }

    async fn load_records(&self, county: County) -> Result<Vec<ArrestRecord>, StoreError> {
        let mut tables = self.tables.lock().await;
        let table = self.table(&mut tables, county).await?;
        Ok(table.values().cloned().collect())
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
    use arrest_leads_arrest_models::CustodyStatus;

    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("arrest-leads-store-{}", uuid::Uuid::new_v4()))
    }

    fn record(status: CustodyStatus) -> ArrestRecord {
        let mut record = ArrestRecord::new(County::Collier);
        record.booking_number = "202400123".to_string();
        record.full_name = "Doe, Jane".to_string();
        record.status = status;
        record
    }

    #[tokio::test]
    async fn persists_across_instances() {
        let dir = temp_dir();
        let key = "Collier|202400123";

        let store = JsonFileRecordStore::new(&dir, Vec::new());
        assert_eq!(
            store.upsert_record(County::Collier, key, &record(CustodyStatus::InCustody)).await.unwrap().action,
            UpsertAction::Inserted
        );

        let reopened = JsonFileRecordStore::new(&dir, Vec::new());
        let keys = reopened.load_existing_keys(County::Collier).await.unwrap();
        assert!(keys.contains(key));
        assert_eq!(
            reopened.upsert_record(County::Collier, key, &record(CustodyStatus::Released)).await.unwrap().action,
            UpsertAction::Updated
        );

        let records = JsonFileRecordStore::new(&dir, Vec::new())
            .load_records(County::Collier)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, CustodyStatus::Released);
        assert!(!county_records_path(&dir, County::Collier).with_extension("json.tmp").exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn failed_write_is_not_cached() {
        let dir = temp_dir();
        let key = "Collier|202400123";
        let tmp = county_records_path(&dir, County::Collier).with_extension("json.tmp");
        tokio::fs::create_dir_all(&tmp).await.unwrap();

        let store = JsonFileRecordStore::new(&dir, Vec::new());
        let held = record(CustodyStatus::InCustody);
        assert!(store.upsert_record(County::Collier, key, &held).await.is_err());
        assert!(store.load_existing_keys(County::Collier).await.unwrap().is_empty());

        tokio::fs::remove_dir(&tmp).await.unwrap();
        assert_eq!(
            store.upsert_record(County::Collier, key, &held).await.unwrap().action,
            UpsertAction::Inserted
        );
        let reopened = JsonFileRecordStore::new(&dir, Vec::new());
        assert!(reopened.load_existing_keys(County::Collier).await.unwrap().contains(key));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn failed_update_keeps_the_previous_record() {
        let dir = temp_dir();
        let key = "Collier|202400123";
        let store = JsonFileRecordStore::new(&dir, Vec::new());
        store
            .upsert_record(County::Collier, key, &record(CustodyStatus::InCustody))
            .await
            .unwrap();

        let tmp = county_records_path(&dir, County::Collier).with_extension("json.tmp");
        tokio::fs::create_dir_all(&tmp).await.unwrap();
        let released = record(CustodyStatus::Released);
        assert!(store.upsert_record(County::Collier, key, &released).await.is_err());
        assert_eq!(
            store.load_records(County::Collier).await.unwrap()[0].status,
            CustodyStatus::InCustody
        );

        tokio::fs::remove_dir(&tmp).await.unwrap();
        assert_eq!(
            store.upsert_record(County::Collier, key, &released).await.unwrap().action,
            UpsertAction::Updated
        );

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn missing_directory_reads_as_empty() {
        let store = JsonFileRecordStore::new(temp_dir(), Vec::new());
        assert!(store.load_existing_keys(County::Lee).await.unwrap().is_empty());
        assert!(store.load_records(County::Lee).await.unwrap().is_empty());
    }
}
