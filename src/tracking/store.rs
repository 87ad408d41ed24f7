//! Read-only tracking lookup

use super::record::{TrackingRecord, TrackingStatus};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read tracking data: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid tracking data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid tracking number key: {0}")]
    InvalidKey(String),
    #[error("Duplicate tracking number key: {0}")]
    DuplicateKey(String),
}

/// Exact-key lookup of tracking records
pub trait TrackingLookup: Send + Sync {
    /// Look up a record. Keys are uppercased before matching; there is no fuzzy matching.
    fn lookup(&self, tracking_number: &str) -> Option<TrackingRecord>;
}

impl<T: TrackingLookup + ?Sized> TrackingLookup for std::sync::Arc<T> {
    fn lookup(&self, tracking_number: &str) -> Option<TrackingRecord> {
        (**self).lookup(tracking_number)
    }
}

/// In-memory tracking dataset
#[derive(Debug, Clone, Default)]
pub struct InMemoryTrackingStore {
    records: HashMap<String, TrackingRecord>,
}

impl InMemoryTrackingStore {
    /// Build a store, rejecting keys that are not tracking numbers or that
    /// collide once uppercased
    pub fn new(
        records: impl IntoIterator<Item = (String, TrackingRecord)>,
    ) -> Result<Self, StoreError> {
        let mut map = HashMap::new();
        for (key, record) in records {
            let normalized = key.to_ascii_uppercase();
            if !is_tracking_number(&normalized) {
                return Err(StoreError::InvalidKey(key));
            }
            match map.entry(normalized) {
                Entry::Occupied(_) => return Err(StoreError::DuplicateKey(key)),
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
        }
        Ok(Self { records: map })
    }

    /// The demo dataset
    pub fn seeded() -> Self {
        let records = [
            (
                "TRK123456789",
                TrackingRecord::new(TrackingStatus::InTransit)
                    .with_location("Chicago Distribution Center")
                    .with_eta("2 days")
                    .with_last_update("2025-04-02T14:30:00Z"),
            ),
            (
                "TRK987654321",
                TrackingRecord::new(TrackingStatus::Delayed)
                    .with_location("Denver Sorting Facility")
                    .with_reason("Weather conditions")
                    .with_eta("4 days")
                    .with_last_update("2025-04-01T09:15:00Z"),
            ),
            (
                "TRK555555555",
                TrackingRecord::new(TrackingStatus::Lost)
                    .with_last_seen("Atlanta Hub")
                    .with_eta("Unknown")
                    .with_reason("Unknown")
                    .with_last_update("2025-03-22T2:30:00Z"),
            ),
            (
                "TRK473902030",
                TrackingRecord::new(TrackingStatus::Delivered)
                    .with_last_seen("On Delivery Vehicle")
                    .with_last_update("2025-03-25T6:45:00Z"),
            ),
        ];

        Self {
            records: records
                .into_iter()
                .map(|(key, record)| (key.to_string(), record))
                .collect(),
        }
    }

    /// Load a JSON object of `tracking number -> record`
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let records: HashMap<String, TrackingRecord> = serde_json::from_str(&raw)?;
        Self::new(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TrackingLookup for InMemoryTrackingStore {
    fn lookup(&self, tracking_number: &str) -> Option<TrackingRecord> {
        self.records
            .get(&tracking_number.to_ascii_uppercase())
            .cloned()
    }
}

fn is_tracking_number(key: &str) -> bool {
    key.len() == 12
        && key.starts_with("TRK")
        && key.bytes().skip(3).all(|b| b.is_ascii_digit())
}
