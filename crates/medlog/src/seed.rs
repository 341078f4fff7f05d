//! Demo fixture data.
//!
//! A day of dose events that can be preloaded so a fresh dashboard has
//! something to show.

use chrono::{DateTime, TimeZone, Utc};
use tracing::info;

use crate::event::{DoseEvent, DoseStatus};
use crate::ingest::DEFAULT_DEVICE_ID;
use crate::store::LogStore;

/// (status, medicine, device timestamp, hour, minute) for each demo dose on
/// 2024-01-01. The device timestamps are fixed values as reported, not derived
/// from the display time; the hour and minute set the display time and the
/// ingestion time.
const DEMO_DOSES: &[(DoseStatus, &str, i64, u32, u32)] = &[
    (DoseStatus::Compliance, "MedA", 1_704_067_200, 9, 0),
    (DoseStatus::Compliance, "MedB", 1_704_082_200, 14, 30),
    (DoseStatus::Late, "MedC", 1_704_101_700, 21, 15),
];

/// The demo events, oldest first.
#[must_use]
pub fn demo_events() -> Vec<DoseEvent> {
    DEMO_DOSES
        .iter()
        .filter_map(|&(status, medicine, timestamp, hour, minute)| {
            let at: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).single()?;
            Some(DoseEvent {
                status,
                medicine: medicine.to_string(),
                timestamp,
                date: at.format("%Y-%m-%d").to_string(),
                time: at.format("%H:%M:%S").to_string(),
                device_id: DEFAULT_DEVICE_ID.to_string(),
                created_at: at,
            })
        })
        .collect()
}

/// Insert the demo events into `store`, oldest first.
pub fn seed_store(store: &mut LogStore) {
    let events = demo_events();
    let count = events.len();
    for event in events {
        store.insert(event);
    }
    info!(count, "Seeded log store with demo data");
}
