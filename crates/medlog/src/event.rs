//! Core dose event types for medlog.
//!
//! This module defines the record produced for every observed
//! medicine-taking occurrence and its compliance status.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The compliance outcome of a scheduled dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoseStatus {
    /// The dose was taken on time.
    Compliance,
    /// The dose was taken, but late.
    Late,
    /// The dose was not taken.
    Missed,
}

impl DoseStatus {
    /// All statuses, in display order.
    pub const ALL: [Self; 3] = [Self::Compliance, Self::Late, Self::Missed];

    /// The canonical wire form of this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliance => "COMPLIANCE",
            Self::Late => "LATE",
            Self::Missed => "MISSED",
        }
    }
}

impl std::fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoseStatus {
    type Err = Error;

    /// Parse a status leniently: surrounding whitespace and letter case are
    /// ignored, anything outside the three statuses is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                Error::validation(
                    "status",
                    format!("unknown status '{trimmed}', expected one of COMPLIANCE, LATE, MISSED"),
                )
            })
    }
}

/// A single recorded dose event.
///
/// Events are immutable once stored. `timestamp`, `date` and `time` describe
/// when the dose happened according to the device; `created_at` is when the
/// service ingested it and is the only field queries filter and sort on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseEvent {
    /// Compliance outcome.
    pub status: DoseStatus,

    /// Medicine identifier as reported by the device.
    pub medicine: String,

    /// Event time in seconds since the Unix epoch.
    pub timestamp: i64,

    /// Display date, `YYYY-MM-DD`.
    pub date: String,

    /// Display time, `HH:MM:SS`.
    pub time: String,

    /// Identifier of the originating device.
    pub device_id: String,

    /// Server-assigned ingestion time.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl DoseEvent {
    /// Check whether this event reports a missed dose.
    #[must_use]
    pub fn is_missed(&self) -> bool {
        self.status == DoseStatus::Missed
    }
}
