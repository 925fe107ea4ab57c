//! # Forecast Report
//!
//! The document a run produces, plus the assembler that builds it from the
//! per-spot columns computed by the pipeline.
//!
//! ## Shape
//!
//! ```text
//! {
//!   "generatedAt": "2025-07-24T08:00:00-04:00",
//!   "hours": [
//!     { "time": "...",
//!       "beauport": { "windGustKn": 14.2, "windMeanKn": 9.1, "dirDeg": 225,
//!                     "tide": "rising",
//!                     "go": { "beauport": true, "ste_anne": null, ... } },
//!       ... }
//!   ],
//!   "tideBaseline": { "lat": 46.81, "lon": -71.19, "note": "..." },
//!   "debugCounts": { "beauport": { "rising": 30, "falling": 40, ... } }
//! }
//! ```
//!
//! Spot keys appear in configuration order everywhere. Every `go` map lists
//! all spots so rows share one shape; only the row's own spot is non-null.

use crate::timeline::Timeline;
use crate::{Coordinate, TidePhase, WindRecord};
use chrono::{DateTime, FixedOffset};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// String-keyed entries serialized as a JSON object in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keyed<V>(pub Vec<(String, V)>);

impl<V> Keyed<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: Serialize> Serialize for Keyed<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One spot at one hour.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotHour {
    pub wind_gust_kn: Option<f64>,
    pub wind_mean_kn: Option<f64>,
    /// Whole degrees
    pub dir_deg: Option<i64>,
    pub tide: TidePhase,
    pub go: Keyed<Option<bool>>,
}

/// One report hour across all spots.
#[derive(Clone, Debug, PartialEq)]
pub struct HourRow {
    pub time: DateTime<FixedOffset>,
    pub spots: Keyed<SpotHour>,
}

impl Serialize for HourRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.spots.len() + 1))?;
        map.serialize_entry("time", &self.time)?;
        for (key, hour) in &self.spots.0 {
            map.serialize_entry(key, hour)?;
        }
        map.end()
    }
}

/// Which coordinate supplied baseline tide timing, if any.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TideBaselineInfo {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub note: String,
}

impl TideBaselineInfo {
    pub fn selected(at: Coordinate, note: impl Into<String>) -> Self {
        Self {
            lat: Some(at.lat),
            lon: Some(at.lon),
            note: note.into(),
        }
    }

    pub fn none(note: impl Into<String>) -> Self {
        Self {
            lat: None,
            lon: None,
            note: note.into(),
        }
    }
}

/// How often each phase occurred for one spot over the horizon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PhaseCounts {
    pub rising: usize,
    pub falling: usize,
    pub slack: usize,
    pub unknown: usize,
}

impl PhaseCounts {
    pub fn from_phases(phases: &[TidePhase]) -> Self {
        let mut counts = Self::default();
        for &phase in phases {
            counts.add(phase);
        }
        counts
    }

    pub fn add(&mut self, phase: TidePhase) {
        match phase {
            TidePhase::Rising => self.rising += 1,
            TidePhase::Falling => self.falling += 1,
            TidePhase::Slack => self.slack += 1,
            TidePhase::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.rising + self.falling + self.slack + self.unknown
    }
}

/// The full run output.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastReport {
    pub generated_at: DateTime<FixedOffset>,
    pub hours: Vec<HourRow>,
    pub tide_baseline: TideBaselineInfo,
    pub debug_counts: Keyed<PhaseCounts>,
}

/// Computed values for one spot, aligned to the timeline.
#[derive(Clone, Debug)]
pub struct SpotColumn {
    pub key: String,
    pub wind: Vec<Option<WindRecord>>,
    pub tide: Vec<TidePhase>,
    pub go: Vec<bool>,
}

impl SpotColumn {
    fn hour(&self, i: usize, keys: &[&str]) -> SpotHour {
        let wind = self.wind.get(i).and_then(|w| w.as_ref());
        let go = self.go.get(i).copied().unwrap_or(false);
        SpotHour {
            wind_gust_kn: wind.and_then(|w| w.gust_kn).map(round_tenth),
            wind_mean_kn: wind.and_then(|w| w.mean_kn).map(round_tenth),
            dir_deg: wind.and_then(|w| w.direction_deg).map(|d| d.round() as i64),
            tide: self.tide.get(i).copied().unwrap_or(TidePhase::Unknown),
            go: Keyed(
                keys.iter()
                    .map(|&k| (k.to_string(), (k == self.key).then_some(go)))
                    .collect(),
            ),
        }
    }
}

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Merge spot columns into the report, one row per timeline hour.
pub fn assemble(
    generated_at: DateTime<FixedOffset>,
    timeline: &Timeline,
    columns: &[SpotColumn],
    tide_baseline: TideBaselineInfo,
) -> ForecastReport {
    let keys: Vec<&str> = columns.iter().map(|c| c.key.as_str()).collect();

    let hours = timeline
        .hours()
        .iter()
        .enumerate()
        .map(|(i, &time)| HourRow {
            time,
            spots: Keyed(
                columns
                    .iter()
                    .map(|c| (c.key.clone(), c.hour(i, &keys)))
                    .collect(),
            ),
        })
        .collect();

    let debug_counts = Keyed(
        columns
            .iter()
            .map(|c| {
                let phases = &c.tide[..c.tide.len().min(timeline.len())];
                (c.key.clone(), PhaseCounts::from_phases(phases))
            })
            .collect(),
    );

    ForecastReport {
        generated_at,
        hours,
        tide_baseline,
        debug_counts,
    }
}
