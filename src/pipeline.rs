//! # Forecast Pipeline
//!
//! One run, start to finish, as a sequential batch:
//!
//! 1. Fetch hourly wind for every spot, in configuration order
//! 2. Build the timeline from the reference spot (empty → empty report)
//! 3. Query each spot's own coordinates for tide levels over the horizon
//! 4. If any spot came back without usable data, select a baseline and
//!    propagate its phase to those spots
//! 5. Evaluate each spot's rule per hour
//! 6. Assemble the report
//!
//! Every upstream failure degrades to missing data; [`Pipeline::run`] cannot
//! fail.

use crate::baseline::{coverage_floor, BaselineSelector};
use crate::config::{Config, SpotConfig};
use crate::propagation::BaselinePhases;
use crate::providers::{TideProvider, WindProvider};
use crate::report::{assemble, ForecastReport, SpotColumn, TideBaselineInfo};
use crate::rules::HourConditions;
use crate::tide_trend::TrendClassifier;
use crate::timeline::Timeline;
use crate::{TideLevelSeries, TidePhase, WindRecord};
use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use tracing::{debug, info, warn};

/// Wires configuration and providers together for one run.
pub struct Pipeline<'a> {
    config: &'a Config,
    wind: &'a dyn WindProvider,
    tide: &'a dyn TideProvider,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, wind: &'a dyn WindProvider, tide: &'a dyn TideProvider) -> Self {
        Self { config, wind, tide }
    }

    /// Produce the report for the horizon starting at the hour containing
    /// `now`. That hour start is also the report's `generatedAt`.
    pub async fn run(&self, now: DateTime<FixedOffset>) -> ForecastReport {
        let start = hour_floor(now);
        let end = start
            .checked_add_signed(Duration::hours(i64::from(self.config.run.horizon_hours)))
            .unwrap_or(start);
        info!(%start, %end, spots = self.config.spots.len(), "starting forecast run");

        let winds = self.fetch_winds(start, end).await;

        let reference = self
            .config
            .spots
            .iter()
            .position(|s| s.key == self.config.run.reference_spot);
        let timeline = reference
            .map(|i| Timeline::from_reference(&winds[i]))
            .unwrap_or_default();

        if timeline.is_empty() {
            warn!(
                reference = %self.config.run.reference_spot,
                "reference spot has no wind data, emitting empty report"
            );
            let columns: Vec<_> = self
                .config
                .spots
                .iter()
                .map(|s| SpotColumn {
                    key: s.key.clone(),
                    wind: Vec::new(),
                    tide: Vec::new(),
                    go: Vec::new(),
                })
                .collect();
            return assemble(
                start,
                &timeline,
                &columns,
                TideBaselineInfo::none("reference spot has no wind data"),
            );
        }
        info!(hours = timeline.len(), "timeline built");

        let (tides, baseline_info) = self.resolve_tides(&timeline).await;

        let columns: Vec<SpotColumn> = self
            .config
            .spots
            .iter()
            .zip(winds.iter())
            .zip(tides)
            .map(|((spot, wind), tide)| evaluate_spot(spot, &timeline, wind, tide))
            .collect();

        for column in &columns {
            let go_hours = column.go.iter().filter(|&&g| g).count();
            info!(spot = %column.key, go_hours, "spot evaluated");
        }

        assemble(start, &timeline, &columns, baseline_info)
    }

    async fn fetch_winds(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Vec<Vec<WindRecord>> {
        let mut winds = Vec::with_capacity(self.config.spots.len());
        for spot in &self.config.spots {
            let records = match self.wind.fetch_hourly(spot.coordinate(), start, end).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(spot = %spot.key, error = %e, "wind fetch failed");
                    Vec::new()
                }
            };
            debug!(spot = %spot.key, hours = records.len(), "wind series");
            winds.push(records);
        }
        winds
    }

    /// Tide phase per spot, plus the baseline metadata for the report.
    async fn resolve_tides(&self, timeline: &Timeline) -> (Vec<Vec<TidePhase>>, TideBaselineInfo) {
        let tide_config = &self.config.tide;
        let classifier = TrendClassifier::new(tide_config.epsilon, tide_config.matching);
        let hours = timeline.utc_hours();
        let full = timeline.full_tide_instants();
        let floor = coverage_floor(full.len());

        let mut resolved: Vec<Option<Vec<TidePhase>>> = Vec::with_capacity(self.config.spots.len());
        for spot in &self.config.spots {
            let direct = self
                .direct_series(spot, &full, floor)
                .await
                .map(|series| classifier.classify_hours(&series, &hours));
            resolved.push(direct);
        }

        let missing: Vec<&str> = self
            .config
            .spots
            .iter()
            .zip(&resolved)
            .filter(|(_, r)| r.is_none())
            .map(|(s, _)| s.key.as_str())
            .collect();

        if missing.is_empty() {
            info!("every spot resolved tide directly, no baseline needed");
            let tides = resolved.into_iter().flatten().collect();
            return (
                tides,
                TideBaselineInfo::none("not needed: every spot resolved tide directly"),
            );
        }
        info!(spots = ?missing, "spots need a tide baseline");

        let trial_hours = usize::try_from(tide_config.trial_hours).unwrap_or(usize::MAX);
        let trial = timeline.tide_instants(trial_hours);
        let candidates = tide_config.source.candidates();
        let outcome = BaselineSelector::new(self.tide, tide_config.matching)
            .select(&candidates, &trial, &full)
            .await;

        let (baseline, baseline_info) = match &outcome.baseline {
            Some(b) => (
                BaselinePhases::new(&hours, &classifier.classify_hours(&b.series, &hours)),
                TideBaselineInfo::selected(b.coordinate, outcome.note()),
            ),
            None => (BaselinePhases::default(), TideBaselineInfo::none(outcome.note())),
        };

        let tides = self
            .config
            .spots
            .iter()
            .zip(resolved)
            .map(|(spot, direct)| {
                direct.unwrap_or_else(|| {
                    debug!(spot = %spot.key, offset = ?spot.phase_offset(), "propagating baseline");
                    baseline.propagate_all(&hours, spot.phase_offset())
                })
            })
            .collect();

        (tides, baseline_info)
    }

    /// The spot's own level series, if it clears the coverage floor.
    async fn direct_series(
        &self,
        spot: &SpotConfig,
        full: &[DateTime<Utc>],
        floor: usize,
    ) -> Option<TideLevelSeries> {
        match self.tide.fetch_levels(spot.coordinate(), full).await {
            Ok(series) => {
                let coverage = self.config.tide.matching.coverage(&series, full);
                debug!(spot = %spot.key, coverage, floor, "direct tide coverage");
                (coverage >= floor).then_some(series)
            }
            Err(e) => {
                warn!(spot = %spot.key, error = %e, "direct tide query failed");
                None
            }
        }
    }
}

/// Align wind to the timeline and apply the spot's rule hour by hour.
fn evaluate_spot(
    spot: &SpotConfig,
    timeline: &Timeline,
    wind: &[WindRecord],
    tide: Vec<TidePhase>,
) -> SpotColumn {
    let rule = spot.rule();
    let wind: Vec<Option<WindRecord>> = timeline.align(wind).into_iter().map(|w| w.cloned()).collect();

    let go = wind
        .iter()
        .zip(&tide)
        .map(|(w, &phase)| {
            rule.evaluate(&HourConditions {
                gust_kn: w.as_ref().and_then(|w| w.gust_kn),
                direction_deg: w.as_ref().and_then(|w| w.direction_deg),
                tide: phase,
            })
        })
        .collect();

    SpotColumn {
        key: spot.key.clone(),
        wind,
        tide,
        go,
    }
}

/// Start of the local hour containing `t`.
fn hour_floor(t: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
