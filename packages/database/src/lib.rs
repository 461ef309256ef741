#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record persistence.
//!
//! [`RecordStore`] is the narrow interface the pipeline writes through.
//! Records are stored per county under their natural key. A store assumes
//! at most one writer per county at a time; the orchestrator's run lock
//! provides that.

pub mod json_file;
pub mod memory;
pub mod paths;

use std::collections::{BTreeMap, BTreeSet};

use arrest_leads_arrest_models::{ArrestRecord, County};
use arrest_leads_source_models::SourceAdapterConfig;
use async_trait::async_trait;
use strum_macros::{AsRefStr, Display};

pub use json_file::JsonFileRecordStore;
pub use memory::MemoryRecordStore;

/// Errors that can occur while reading or writing records.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No source configuration is registered for the county.
    #[error("no configuration for county '{county}'")]
    MissingConfig {
        /// The county that was requested.
        county: County,
    },
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum UpsertAction {
    /// The key was new.
    Inserted,
    /// The key existed and at least one field changed.
    Updated,
    /// The key existed and nothing new arrived.
    Skipped,
}

/// What an upsert did, and the record stored under the key afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    pub action: UpsertAction,
    /// The merged record, which is what scoring and notification see.
    pub stored: ArrestRecord,
}

/// Persistence for normalized records and per-county configuration.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every natural key stored for `county`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be read.
    async fn load_existing_keys(&self, county: County) -> Result<BTreeSet<String>, StoreError>;

    /// Stores `record` under `key`, merging into an existing record with
    /// merge-not-overwrite semantics.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be written. A
    /// failed write leaves the stored record as it was.
    async fn upsert_record(
        &self,
        county: County,
        key: &str,
        record: &ArrestRecord,
    ) -> Result<Upserted, StoreError>;

    /// Every stored record for `county`, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be read.
    async fn load_records(&self, county: County) -> Result<Vec<ArrestRecord>, StoreError>;

    /// The source configuration for `county`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingConfig`] if none is registered.
    async fn load_config(&self, county: County) -> Result<SourceAdapterConfig, StoreError>;
}

/// Merges `record` into what is stored under a key without touching the
/// table. `None` when nothing is stored yet.
#[must_use]
pub fn merge_upsert(existing: Option<&ArrestRecord>, record: &ArrestRecord) -> Upserted {
    match existing {
        None => Upserted {
            action: UpsertAction::Inserted,
            stored: record.clone(),
        },
        Some(existing) => {
            let mut stored = existing.clone();
            let action = if stored.merge_from(record) {
                UpsertAction::Updated
            } else {
                UpsertAction::Skipped
            };
            Upserted { action, stored }
        }
    }
}

/// Applies one upsert to an in-memory county table.
pub fn apply_upsert(
    table: &mut BTreeMap<String, ArrestRecord>,
    key: &str,
    record: &ArrestRecord,
) -> Upserted {
    let upserted = merge_upsert(table.get(key), record);
    if upserted.action != UpsertAction::Skipped {
        table.insert(key.to_string(), upserted.stored.clone());
    }
    upserted
}

/// Indexes configurations by county. Later entries win.
#[must_use]
pub fn index_configs(
    configs: impl IntoIterator<Item = SourceAdapterConfig>,
) -> BTreeMap<County, SourceAdapterConfig> {
    configs.into_iter().map(|c| (c.county, c)).collect()
}

#[cfg(test)]
mod tests {
    use arrest_leads_arrest_models::CustodyStatus;

    use super::*;

    fn record(status: CustodyStatus) -> ArrestRecord {
        let mut record = ArrestRecord::new(County::Lee);
        record.booking_number = "12345".to_string();
        record.full_name = "SMITH, JOHN".to_string();
        record.status = status;
        record
    }

    #[test]
    fn insert_then_skip_then_update() {
        let mut table = BTreeMap::new();
        let held = record(CustodyStatus::InCustody);

        assert_eq!(apply_upsert(&mut table, "Lee|12345", &held).action, UpsertAction::Inserted);
        assert_eq!(apply_upsert(&mut table, "Lee|12345", &held).action, UpsertAction::Skipped);
        assert_eq!(
            apply_upsert(&mut table, "Lee|12345", &record(CustodyStatus::Released)).action,
            UpsertAction::Updated
        );
        assert_eq!(table["Lee|12345"].status, CustodyStatus::Released);
        assert_eq!(table["Lee|12345"].full_name, "SMITH, JOHN");
    }

    #[test]
    fn partial_update_returns_the_merged_record() {
        let mut table = BTreeMap::new();
        let mut full = record(CustodyStatus::Released);
        full.facility = "CORE".to_string();
        apply_upsert(&mut table, "Lee|12345", &full);

        let mut partial = ArrestRecord::new(County::Lee);
        partial.booking_number = "12345".to_string();
        partial.status = CustodyStatus::InCustody;

        let upserted = apply_upsert(&mut table, "Lee|12345", &partial);
        assert_eq!(upserted.action, UpsertAction::Updated);
        assert_eq!(upserted.stored.status, CustodyStatus::InCustody);
        assert_eq!(upserted.stored.full_name, "SMITH, JOHN");
        assert_eq!(upserted.stored.facility, "CORE");
        assert_eq!(table["Lee|12345"], upserted.stored);
    }

    #[test]
    fn merge_upsert_leaves_the_source_untouched() {
        let stored = record(CustodyStatus::InCustody);
        let upserted = merge_upsert(Some(&stored), &record(CustodyStatus::Released));
        assert_eq!(upserted.action, UpsertAction::Updated);
        assert_eq!(stored.status, CustodyStatus::InCustody);
    }
}
