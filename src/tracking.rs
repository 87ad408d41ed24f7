//! Tracking lookup
//!
//! Read-only mapping from tracking number to shipment record.

mod record;
mod store;

pub use record::{KnownStatus, TrackingDataError, TrackingRecord, TrackingStatus};
pub use store::{InMemoryTrackingStore, StoreError, TrackingLookup};
