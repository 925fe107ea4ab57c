//! # Spot Check Core Library
//!
//! This library turns hourly wind forecasts and sparse water-level data into
//! go/no-go advisories for a handful of river kiting spots.
//!
//! ## Design Philosophy
//!
//! ### Degrade, never abort
//! Every upstream call may fail. A failed wind fetch leaves `None` fields for
//! that spot, a failed tide probe counts as zero coverage, and a run with no
//! usable tide anywhere still produces a well-formed report full of
//! [`TidePhase::Unknown`]. Nothing in the core returns an error to the caller.
//!
//! ### One tide source per run
//! Tide data is only available at some coordinates. Spots that cannot be
//! queried directly borrow their phase from a single baseline coordinate,
//! shifted in time by per-spot offsets (see [`propagation`]).
//!
//! ### Data Flow
//! 1. **Timeline**: the reference spot's wind series defines the report hours
//! 2. **Baseline**: spots are queried for tide directly; only if some come
//!    back empty are candidate coordinates probed, and the best one wins
//! 3. **Classify**: consecutive level samples become rising/falling/slack
//! 4. **Propagate**: baseline phase is time-shifted to spots without data
//! 5. **Rules**: each spot's predicate yields a go flag per hour
//! 6. **Assemble**: rows plus run metadata form the [`report::ForecastReport`]
//!
//! ## Core Types
//!
//! - [`Coordinate`]: a latitude/longitude pair
//! - [`TidePhase`]: the four-valued tide label
//! - [`WindRecord`]: one hour of forecast wind
//! - [`TideLevelSeries`]: ordered water-level samples from one coordinate

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod baseline;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod propagation;
pub mod providers;
pub mod report;
pub mod rules;
pub mod tide_source;
pub mod tide_trend;
pub mod timeline;

#[cfg(test)]
mod tests;

/// A geographic point in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

/// Coarse direction of water-level change over one hour.
///
/// Serialized in lowercase (`"rising"`, `"falling"`, `"slack"`, `"unknown"`)
/// both in configuration files and in the produced report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TidePhase {
    Rising,
    Falling,
    Slack,
    Unknown,
}

impl TidePhase {
    /// All labels in report order.
    pub const ALL: [TidePhase; 4] = [
        TidePhase::Rising,
        TidePhase::Falling,
        TidePhase::Slack,
        TidePhase::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TidePhase::Rising => "rising",
            TidePhase::Falling => "falling",
            TidePhase::Slack => "slack",
            TidePhase::Unknown => "unknown",
        }
    }

    pub fn is_known(self) -> bool {
        self != TidePhase::Unknown
    }
}

impl fmt::Display for TidePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hour of forecast wind at a spot.
///
/// Every measurement is optional: providers return `null` for hours they
/// cannot forecast, and those stay `None` all the way into the report.
///
/// # Example
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use spot_check::WindRecord;
///
/// let tz = FixedOffset::west_opt(4 * 3600).unwrap();
/// let record = WindRecord {
///     time: tz.with_ymd_and_hms(2025, 7, 1, 14, 0, 0).unwrap(),
///     mean_kn: Some(11.2),
///     gust_kn: Some(17.5),
///     direction_deg: Some(225.0),
/// };
///
/// assert!(record.gust_kn.unwrap() > record.mean_kn.unwrap());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindRecord {
    /// Hour start in the run's local time zone
    pub time: DateTime<FixedOffset>,
    /// Mean wind speed in knots
    pub mean_kn: Option<f64>,
    /// Gust speed in knots
    pub gust_kn: Option<f64>,
    /// Direction the wind blows from, degrees clockwise from north
    pub direction_deg: Option<f64>,
}

/// Ordered water-level samples from a single coordinate.
///
/// Construction sorts by instant, drops non-finite levels and keeps the first
/// value when an instant repeats, so lookups can rely on strict ordering.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use spot_check::TideLevelSeries;
///
/// let t0 = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();
/// let t1 = Utc.with_ymd_and_hms(2025, 7, 1, 13, 0, 0).unwrap();
/// let series = TideLevelSeries::from_pairs(vec![(t1, 1.4), (t0, 1.1), (t1, 9.9)]);
///
/// assert_eq!(series.len(), 2);
/// assert_eq!(series.exact(t1), Some(1.4));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TideLevelSeries {
    samples: Vec<(DateTime<Utc>, f64)>,
}

impl TideLevelSeries {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (DateTime<Utc>, f64)>) -> Self {
        let mut samples: Vec<_> = pairs.into_iter().filter(|(_, v)| v.is_finite()).collect();
        // Stable sort keeps the first occurrence of a repeated instant in front
        samples.sort_by_key(|(t, _)| *t);
        samples.dedup_by_key(|(t, _)| *t);
        Self { samples }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[(DateTime<Utc>, f64)] {
        &self.samples
    }

    /// Level recorded at exactly `at`, if any.
    pub fn exact(&self, at: DateTime<Utc>) -> Option<f64> {
        self.samples
            .binary_search_by_key(&at, |(t, _)| *t)
            .ok()
            .map(|i| self.samples[i].1)
    }

    /// Level of the sample closest to `at`, provided it lies within
    /// `tolerance` on either side. Equal distances prefer the earlier sample.
    pub fn nearest(&self, at: DateTime<Utc>, tolerance: chrono::Duration) -> Option<f64> {
        let idx = self.samples.partition_point(|(t, _)| *t < at);
        let before = idx.checked_sub(1).map(|i| self.samples[i]);
        let after = self.samples.get(idx).copied();

        let best = match (before, after) {
            (Some(b), Some(a)) => {
                if at - b.0 <= a.0 - at {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };

        let distance = if best.0 >= at { best.0 - at } else { at - best.0 };
        (distance <= tolerance).then_some(best.1)
    }
}
