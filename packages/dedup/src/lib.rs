#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deduplication of arrest records by natural key.
//!
//! The primary key is `County|bookingNumber`. Without a booking number the
//! fallback `County|fullName|bookingDate` is used; two people with the same
//! name booked the same day collide under it, and that is accepted.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use arrest_leads_arrest_models::{ArrestRecord, County};
use arrest_leads_database::{RecordStore, StoreError, merge_upsert};
use serde::{Deserialize, Serialize};

pub use arrest_leads_database::{UpsertAction, Upserted};

/// A record's composite natural key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaturalKey(String);

impl NaturalKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the weaker name-and-date key.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.0.matches('|').count() > 1
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the natural key for `record` in `county`, or `None` when the
/// record has neither a booking number nor a name plus booking date.
#[must_use]
pub fn natural_key(county: County, record: &ArrestRecord) -> Option<NaturalKey> {
    let prefix = county.display_name();
    let booking_number = record.booking_number.trim();
    if !booking_number.is_empty() {
        return Some(NaturalKey(format!("{prefix}|{booking_number}")));
    }

    let name = record.full_name.trim();
    let booked = record.booking_date.trim();
    (!name.is_empty() && !booked.is_empty()).then(|| NaturalKey(format!("{prefix}|{name}|{booked}")))
}

/// Insert/update/skip engine for one county's run.
///
/// Existing keys are loaded once when the store is opened, not per record.
/// Records written during the run are remembered, so a booking that shows
/// up again unchanged is skipped without another store round-trip.
pub struct DeduplicationStore {
    store: Arc<dyn RecordStore>,
    county: County,
    known: BTreeSet<String>,
    written: BTreeMap<String, ArrestRecord>,
}

impl DeduplicationStore {
    /// Loads the county's existing keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the keys cannot be read.
    pub async fn open(store: Arc<dyn RecordStore>, county: County) -> Result<Self, StoreError> {
        let known = store.load_existing_keys(county).await?;
        log::debug!("{county}: {} existing key(s)", known.len());
        Ok(Self {
            store,
            county,
            known,
            written: BTreeMap::new(),
        })
    }

    /// Number of keys known to the store, including ones inserted this run.
    #[must_use]
    pub fn known_keys(&self) -> usize {
        self.known.len()
    }

    /// Whether `key` was stored before this call.
    #[must_use]
    pub fn contains(&self, key: &NaturalKey) -> bool {
        self.known.contains(key.as_str())
    }

    /// Inserts a new key, or merges into the stored record with
    /// merge-not-overwrite semantics. The returned record is the merged one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails. Nothing is cached for a
    /// failed write.
    pub async fn upsert(
        &mut self,
        key: &NaturalKey,
        record: &ArrestRecord,
    ) -> Result<Upserted, StoreError> {
        if let Some(cached) = self.written.get(key.as_str()) {
            let local = merge_upsert(Some(cached), record);
            if local.action == UpsertAction::Skipped {
                log::trace!("{}: {} {key} (cached)", self.county, local.action);
                return Ok(local);
            }
        }

        let expected_new = !self.contains(key);
        let upserted = self
            .store
            .upsert_record(self.county, key.as_str(), record)
            .await?;

        if expected_new != (upserted.action == UpsertAction::Inserted) {
            log::warn!("{}: key cache disagreed with store for {key}", self.county);
        }
        self.known.insert(key.as_str().to_string());
        self.written
            .insert(key.as_str().to_string(), upserted.stored.clone());

        log::trace!("{}: {} {key}", self.county, upserted.action);
        Ok(upserted)
    }
}
