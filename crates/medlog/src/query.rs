//! Date range parsing for log queries.
//!
//! Range bounds arrive as free-form query strings. Parsing is deliberately
//! tolerant: absent bounds disable filtering, and unparseable bounds match
//! nothing instead of failing the request.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

/// Naive date-time layouts accepted in addition to RFC 3339.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// An inclusive window over event ingestion times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    /// No filtering.
    Unbounded,
    /// Events with `start <= createdAt <= end`.
    Between {
        /// Inclusive lower bound.
        start: DateTime<Utc>,
        /// Inclusive upper bound.
        end: DateTime<Utc>,
    },
    /// A bound was supplied but could not be parsed; matches nothing.
    Invalid,
}

impl DateRange {
    /// Build a range from the optional `startDate` / `endDate` parameters.
    ///
    /// Filtering only applies when both bounds are present and non-empty.
    #[must_use]
    pub fn from_params(start: Option<&str>, end: Option<&str>) -> Self {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());

        let (Some(start), Some(end)) = (start, end) else {
            return Self::Unbounded;
        };

        match (parse_bound(start), parse_bound(end)) {
            (Some(start), Some(end)) => Self::Between { start, end },
            _ => {
                warn!(start, end, "Unparseable date range, matching no events");
                Self::Invalid
            }
        }
    }

    /// Check whether `instant` falls inside this range.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Between { start, end } => *start <= instant && instant <= *end,
            Self::Invalid => false,
        }
    }
}

/// Parse a single range bound.
///
/// Accepts RFC 3339, naive date-times (taken as UTC), and bare dates
/// (midnight UTC).
#[must_use]
pub fn parse_bound(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
