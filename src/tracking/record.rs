//! Tracking record types

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Shipment status as stored in the tracking dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    InTransit,
    Delayed,
    Lost,
    Delivered,
    /// Any stored value outside the four known statuses
    #[serde(other)]
    Unrecognized,
}

/// A status that passed the data-integrity check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownStatus {
    InTransit,
    Delayed,
    Lost,
    Delivered,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackingDataError {
    #[error("Unknown status for tracking number {tracking_number}")]
    UnknownStatus { tracking_number: String },
}

/// Immutable tracking record owned by the lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    pub status: TrackingStatus,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub eta: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub items: Vec<String>,
}

impl TrackingRecord {
    pub fn new(status: TrackingStatus) -> Self {
        Self {
            status,
            location: None,
            eta: None,
            last_update: None,
            reason: None,
            last_seen: None,
            order_id: None,
            tracking_number: None,
            items: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_eta(mut self, eta: impl Into<String>) -> Self {
        self.eta = Some(eta.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_last_seen(mut self, last_seen: impl Into<String>) -> Self {
        self.last_seen = Some(last_seen.into());
        self
    }

    pub fn with_last_update(mut self, raw: &str) -> Self {
        self.last_update = parse_timestamp(raw);
        self
    }

    /// Check the stored status, rejecting values outside the known set
    pub fn known_status(&self, tracking_number: &str) -> Result<KnownStatus, TrackingDataError> {
        match self.status {
            TrackingStatus::InTransit => Ok(KnownStatus::InTransit),
            TrackingStatus::Delayed => Ok(KnownStatus::Delayed),
            TrackingStatus::Lost => Ok(KnownStatus::Lost),
            TrackingStatus::Delivered => Ok(KnownStatus::Delivered),
            TrackingStatus::Unrecognized => Err(TrackingDataError::UnknownStatus {
                tracking_number: tracking_number.to_string(),
            }),
        }
    }
}

/// Parse an RFC 3339 timestamp, also accepting the single-digit hour
/// (`2025-03-22T2:30:00Z`) present in the demo dataset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ")
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|value| {
        let parsed = parse_timestamp(value);
        if parsed.is_none() {
            tracing::warn!(value = %value, "Ignoring unparseable lastUpdate timestamp");
        }
        parsed
    }))
}
