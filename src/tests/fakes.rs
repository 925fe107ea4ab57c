//! Deterministic providers for tests. No network access anywhere.

use crate::providers::{ProviderError, TideProvider, WindProvider};
use crate::{Coordinate, TideLevelSeries, WindRecord};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Midnight UTC on the day every fixture starts.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 24, 0, 0, 0).unwrap()
}

/// `n` consecutive hour starts from [`t0`].
pub fn hourly_instants(n: usize) -> Vec<DateTime<Utc>> {
    (0..n as i64).map(|i| t0() + Duration::hours(i)).collect()
}

pub fn eastern() -> FixedOffset {
    FixedOffset::west_opt(4 * 3600).unwrap()
}

enum TideBehaviour {
    /// Resolve only the first `n` requested instants
    Coverage(usize),
    /// Resolve every instant with the given level curve
    Levels(fn(DateTime<Utc>) -> f64),
    /// Answer requests of up to `n` instants, fail anything longer
    TrialOnly(usize),
    Fail,
}

/// Tide provider answering per coordinate.
pub struct FakeTide {
    behaviours: Vec<(Coordinate, TideBehaviour)>,
    calls: AtomicUsize,
}

impl FakeTide {
    /// Provider that knows no coordinate: every query returns nothing.
    pub fn new() -> Self {
        Self {
            behaviours: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_coverage(mut self, at: Coordinate, n: usize) -> Self {
        self.behaviours.push((at, TideBehaviour::Coverage(n)));
        self
    }

    pub fn with_levels(mut self, at: Coordinate, curve: fn(DateTime<Utc>) -> f64) -> Self {
        self.behaviours.push((at, TideBehaviour::Levels(curve)));
        self
    }

    pub fn failing(mut self, at: Coordinate) -> Self {
        self.behaviours.push((at, TideBehaviour::Fail));
        self
    }

    /// Serves the short trial request at `at` but fails the longer full-horizon query.
    pub fn trial_only(mut self, at: Coordinate, max_instants: usize) -> Self {
        self.behaviours.push((at, TideBehaviour::TrialOnly(max_instants)));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TideProvider for FakeTide {
    async fn fetch_levels(
        &self,
        at: Coordinate,
        instants: &[DateTime<Utc>],
    ) -> Result<TideLevelSeries, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self
            .behaviours
            .iter()
            .find(|(c, _)| *c == at)
            .map(|(_, b)| b);

        match behaviour {
            None => Ok(TideLevelSeries::empty()),
            Some(TideBehaviour::Fail) => Err(ProviderError::Payload("unreachable".into())),
            Some(TideBehaviour::Coverage(n)) => Ok(TideLevelSeries::from_pairs(
                instants.iter().take(*n).map(|&t| (t, 1.0)),
            )),
            Some(TideBehaviour::Levels(curve)) => Ok(TideLevelSeries::from_pairs(
                instants.iter().map(|&t| (t, curve(t))),
            )),
            Some(TideBehaviour::TrialOnly(n)) if instants.len() <= *n => Ok(
                TideLevelSeries::from_pairs(instants.iter().map(|&t| (t, 1.0))),
            ),
            Some(TideBehaviour::TrialOnly(_)) => {
                Err(ProviderError::Payload("request too long".into()))
            }
        }
    }
}

/// Wind provider serving canned series per coordinate.
pub struct FakeWind {
    series: Vec<(Coordinate, Result<Vec<WindRecord>, ()>)>,
}

impl FakeWind {
    pub fn new() -> Self {
        Self { series: Vec::new() }
    }

    pub fn with_series(mut self, at: Coordinate, records: Vec<WindRecord>) -> Self {
        self.series.push((at, Ok(records)));
        self
    }

    pub fn failing(mut self, at: Coordinate) -> Self {
        self.series.push((at, Err(())));
        self
    }
}

#[async_trait]
impl WindProvider for FakeWind {
    async fn fetch_hourly(
        &self,
        at: Coordinate,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<WindRecord>, ProviderError> {
        match self.series.iter().find(|(c, _)| *c == at) {
            None => Ok(Vec::new()),
            Some((_, Err(()))) => Err(ProviderError::Payload("timeout".into())),
            Some((_, Ok(records))) => Ok(records
                .iter()
                .filter(|r| r.time >= start && r.time < end)
                .cloned()
                .collect()),
        }
    }
}

/// `n` hourly records from [`t0`] in eastern time with a constant wind.
pub fn steady_wind(n: usize, gust: f64, direction: f64) -> Vec<WindRecord> {
    hourly_instants(n)
        .into_iter()
        .map(|t| WindRecord {
            time: t.with_timezone(&eastern()),
            mean_kn: Some(gust - 5.0),
            gust_kn: Some(gust),
            direction_deg: Some(direction),
        })
        .collect()
}
