//! Bounded in-memory log store for medlog.
//!
//! The store keeps the most recent dose events, newest first, and a
//! [`StatsView`] that is recomputed from the full contents after every
//! insert so it can never drift from what is stored.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::event::{DoseEvent, DoseStatus};
use crate::query::DateRange;

/// Default number of events retained by a [`LogStore`].
pub const DEFAULT_CAPACITY: usize = 100;

/// Largest capacity a [`LogStore`] accepts.
pub const MAX_CAPACITY: usize = 100_000;

/// Default number of alerts returned by [`LogStore::recent_missed`] callers.
pub const DEFAULT_ALERT_LIMIT: usize = 10;

/// Aggregate compliance statistics over the current store contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    /// Number of events currently stored.
    pub total_logs: usize,
    /// Percentage of stored events that were on time, rounded half-up.
    pub compliance_rate: u32,
    /// Number of `MISSED` events.
    pub missed_count: usize,
    /// Number of `LATE` events.
    pub late_count: usize,
    /// Number of `COMPLIANCE` events.
    pub compliance_count: usize,
}

impl StatsView {
    /// Compute the view over a set of events.
    #[must_use]
    pub fn compute<'a>(events: impl IntoIterator<Item = &'a DoseEvent>) -> Self {
        let mut view = Self::default();
        for event in events {
            view.total_logs += 1;
            match event.status {
                DoseStatus::Compliance => view.compliance_count += 1,
                DoseStatus::Late => view.late_count += 1,
                DoseStatus::Missed => view.missed_count += 1,
            }
        }
        view.compliance_rate = compliance_rate(view.compliance_count, view.total_logs);
        view
    }
}

/// `round(compliant / total * 100)` with halves rounded up, 0 when empty.
fn compliance_rate(compliant: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rate = (200 * compliant + total) / (2 * total);
    u32::try_from(rate).unwrap_or(100)
}

/// Capacity-bounded, newest-first collection of dose events.
#[derive(Debug, Clone)]
pub struct LogStore {
    capacity: usize,
    events: VecDeque<DoseEvent>,
    stats: StatsView,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogStore {
    /// Create an empty store that retains at most `capacity` events.
    ///
    /// `capacity` is clamped to `1..=MAX_CAPACITY`; configuration validation
    /// rejects values outside that range before they get here. Storage grows
    /// with the contents rather than being reserved up front.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        Self {
            capacity,
            events: VecDeque::new(),
            stats: StatsView::default(),
        }
    }

    /// Maximum number of events retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the store holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Insert an event as the newest entry.
    ///
    /// Events beyond capacity are dropped from the oldest end, then the
    /// stats view is recomputed over what remains.
    pub fn insert(&mut self, event: DoseEvent) {
        self.events.push_front(event);
        if self.events.len() > self.capacity {
            let evicted = self.events.len() - self.capacity;
            self.events.truncate(self.capacity);
            debug!(evicted, capacity = self.capacity, "Evicted oldest dose events");
        }
        self.stats = StatsView::compute(&self.events);
        trace!(total = self.stats.total_logs, "Recomputed compliance stats");
    }

    /// All stored events, newest first.
    #[must_use]
    pub fn all(&self) -> Vec<DoseEvent> {
        self.events.iter().cloned().collect()
    }

    /// Iterate over stored events, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &DoseEvent> {
        self.events.iter()
    }

    /// Events whose ingestion time falls within `range`, newest first.
    ///
    /// Both bounds are inclusive. An unbounded range returns everything; an
    /// inverted or invalid range returns nothing.
    #[must_use]
    pub fn in_range(&self, range: &DateRange) -> Vec<DoseEvent> {
        self.events
            .iter()
            .filter(|event| range.contains(event.created_at))
            .cloned()
            .collect()
    }

    /// The most recent `MISSED` events by ingestion time, at most `limit`.
    #[must_use]
    pub fn recent_missed(&self, limit: usize) -> Vec<DoseEvent> {
        let mut missed: Vec<DoseEvent> = self
            .events
            .iter()
            .filter(|event| event.is_missed())
            .cloned()
            .collect();
        missed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        missed.truncate(limit);
        missed
    }

    /// Current compliance statistics.
    #[must_use]
    pub fn stats(&self) -> StatsView {
        self.stats
    }
}
