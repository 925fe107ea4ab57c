//! # Report Timeline
//!
//! The reference spot's wind series defines which hours the report covers.
//! Its timestamps are taken as-is: no other spot can extend or truncate the
//! timeline, and an empty reference series yields an empty report.

use crate::WindRecord;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::collections::HashMap;

/// Ordered local report hours.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    hours: Vec<DateTime<FixedOffset>>,
}

impl Timeline {
    /// Build the timeline from the reference spot's wind series.
    pub fn from_reference(reference: &[WindRecord]) -> Self {
        Self {
            hours: reference.iter().map(|r| r.time).collect(),
        }
    }

    pub fn hours(&self) -> &[DateTime<FixedOffset>] {
        &self.hours
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    /// Hour starts as UTC instants, in timeline order.
    pub fn utc_hours(&self) -> Vec<DateTime<Utc>> {
        self.hours.iter().map(|h| h.with_timezone(&Utc)).collect()
    }

    /// Instants needed to classify the first `limit` hours: each hour start
    /// and the instant one hour later, sorted and without repeats.
    pub fn tide_instants(&self, limit: usize) -> Vec<DateTime<Utc>> {
        let mut instants: Vec<_> = self
            .utc_hours()
            .into_iter()
            .take(limit)
            .flat_map(|h| [h, h + Duration::hours(1)])
            .collect();
        instants.sort();
        instants.dedup();
        instants
    }

    /// Instants covering the whole timeline.
    pub fn full_tide_instants(&self) -> Vec<DateTime<Utc>> {
        self.tide_instants(self.hours.len())
    }

    /// Align another spot's records to the timeline by exact instant.
    ///
    /// Hours the spot has no record for come back as `None`.
    pub fn align<'a>(&self, records: &'a [WindRecord]) -> Vec<Option<&'a WindRecord>> {
        let by_instant: HashMap<DateTime<Utc>, &WindRecord> = records
            .iter()
            .map(|r| (r.time.with_timezone(&Utc), r))
            .collect();
        self.hours
            .iter()
            .map(|h| by_instant.get(&h.with_timezone(&Utc)).copied())
            .collect()
    }
}
