//! Dose report ingestion.
//!
//! Turns a partial report from a device into a complete [`DoseEvent`],
//! substituting defaults for every optional field that is absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::event::{DoseEvent, DoseStatus};

/// Device identifier used when a report does not name its device.
pub const DEFAULT_DEVICE_ID: &str = "ESP32_MED_REMINDER_001";

/// A dose report as submitted by a producer.
///
/// Only `status` is needed to build an event. Every other field is
/// defaulted when missing, empty or of the wrong JSON type, and a
/// caller-supplied `createdAt` is never accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseReport {
    /// Compliance status, matched case-insensitively.
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    /// Medicine identifier.
    #[serde(default, deserialize_with = "lenient_string")]
    pub medicine: Option<String>,
    /// Event time in seconds since the Unix epoch.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<i64>,
    /// Display date, `YYYY-MM-DD`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    /// Display time, `HH:MM:SS`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: Option<String>,
    /// Originating device.
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_id: Option<String>,
}

/// Accept any JSON value, keeping it only if it is a string.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => {
            debug!(value = %other, "Ignoring non-string report field");
            None
        }
    })
}

/// Accept integers, whole floats and numeric strings as epoch seconds.
#[allow(clippy::cast_possible_truncation)]
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if parsed.is_none() && !value.is_null() {
        debug!(value = %value, "Ignoring unusable report timestamp");
    }
    Ok(parsed)
}

impl DoseReport {
    /// Create a report with just a status and medicine.
    #[must_use]
    pub fn new(status: impl Into<String>, medicine: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            medicine: Some(medicine.into()),
            ..Self::default()
        }
    }
}

/// Normalizes dose reports into dose events.
#[derive(Debug, Clone)]
pub struct Ingestor {
    default_device_id: String,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_ID)
    }
}

impl Ingestor {
    /// Create an ingestor that assigns `default_device_id` to anonymous reports.
    #[must_use]
    pub fn new(default_device_id: impl Into<String>) -> Self {
        Self {
            default_device_id: default_device_id.into(),
        }
    }

    /// The device identifier assigned to reports without one.
    #[must_use]
    pub fn default_device_id(&self) -> &str {
        &self.default_device_id
    }

    /// Normalize a report using the current time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the status is missing or is not one
    /// of `COMPLIANCE`, `LATE` or `MISSED`.
    pub fn ingest(&self, report: DoseReport) -> Result<DoseEvent> {
        self.ingest_at(report, Utc::now())
    }

    /// Normalize a report as if it arrived at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the status is missing or is not one
    /// of `COMPLIANCE`, `LATE` or `MISSED`.
    pub fn ingest_at(&self, report: DoseReport, now: DateTime<Utc>) -> Result<DoseEvent> {
        let status = match non_empty(report.status) {
            Some(raw) => raw.parse::<DoseStatus>()?,
            None => return Err(Error::validation("status", "status is required")),
        };

        let medicine = non_empty(report.medicine).unwrap_or_else(|| {
            warn!(%status, "Dose report without a medicine, storing it unnamed");
            String::new()
        });

        Ok(DoseEvent {
            status,
            medicine,
            timestamp: report.timestamp.unwrap_or_else(|| now.timestamp()),
            date: non_empty(report.date).unwrap_or_else(|| now.format("%Y-%m-%d").to_string()),
            time: non_empty(report.time).unwrap_or_else(|| now.format("%H:%M:%S").to_string()),
            device_id: non_empty(report.device_id)
                .unwrap_or_else(|| self.default_device_id.clone()),
            created_at: now,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
