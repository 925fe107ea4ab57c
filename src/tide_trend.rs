//! # Tide Trend Classification
//!
//! Turns pairs of water-level samples into a [`TidePhase`]. For every report
//! hour the level at the hour start and one hour later are looked up in a
//! [`TideLevelSeries`]; the difference decides the label.
//!
//! ## Level Matching
//!
//! Marine providers do not always return samples exactly on the requested
//! instants. [`LevelMatching::Exact`] only accepts a sample recorded at the
//! instant itself, while [`LevelMatching::Nearest`] accepts the closest sample
//! within a tolerance window (±75 minutes by default, at most a day).
//!
//! ## Thresholds
//!
//! A change larger than `epsilon` metres either way is rising or falling;
//! anything smaller is slack. The default of 0.02 m follows the slack band
//! used for hourly river gauges.

use crate::{TideLevelSeries, TidePhase};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default slack band in metres.
pub const DEFAULT_EPSILON: f64 = 0.02;

/// Default nearest-neighbour tolerance in minutes.
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 75;

/// Largest tolerance honoured, one day either side.
pub const MAX_TOLERANCE_MINUTES: i64 = 24 * 60;

/// How a requested instant is matched against the samples of a series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LevelMatching {
    /// Only a sample at exactly the requested instant counts
    Exact,
    /// The closest sample within `tolerance_minutes` either side counts
    Nearest { tolerance_minutes: i64 },
}

impl Default for LevelMatching {
    fn default() -> Self {
        LevelMatching::Nearest {
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
        }
    }
}

impl LevelMatching {
    /// Resolve the level at `at`, or `None` if no sample qualifies.
    pub fn resolve(&self, series: &TideLevelSeries, at: DateTime<Utc>) -> Option<f64> {
        match *self {
            LevelMatching::Exact => series.exact(at),
            LevelMatching::Nearest { tolerance_minutes } => {
                let minutes = tolerance_minutes.clamp(0, MAX_TOLERANCE_MINUTES);
                series.nearest(at, Duration::minutes(minutes))
            }
        }
    }

    /// Number of `instants` that resolve against `series`.
    pub fn coverage(&self, series: &TideLevelSeries, instants: &[DateTime<Utc>]) -> usize {
        instants
            .iter()
            .filter(|&&at| self.resolve(series, at).is_some())
            .count()
    }
}

/// Classify the change from `v0` to `v1`.
///
/// # Example
/// ```
/// use spot_check::tide_trend::classify;
/// use spot_check::TidePhase;
///
/// assert_eq!(classify(Some(1.00), Some(1.05), 0.02), TidePhase::Rising);
/// assert_eq!(classify(Some(1.00), None, 0.02), TidePhase::Unknown);
/// ```
pub fn classify(v0: Option<f64>, v1: Option<f64>, epsilon: f64) -> TidePhase {
    let (Some(v0), Some(v1)) = (v0, v1) else {
        return TidePhase::Unknown;
    };

    let delta = v1 - v0;
    if !delta.is_finite() {
        TidePhase::Unknown
    } else if delta > epsilon {
        TidePhase::Rising
    } else if delta < -epsilon {
        TidePhase::Falling
    } else {
        TidePhase::Slack
    }
}

/// Classifies hours against one level series.
#[derive(Clone, Copy, Debug)]
pub struct TrendClassifier {
    pub epsilon: f64,
    pub matching: LevelMatching,
}

impl Default for TrendClassifier {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            matching: LevelMatching::default(),
        }
    }
}

impl TrendClassifier {
    pub fn new(epsilon: f64, matching: LevelMatching) -> Self {
        Self { epsilon, matching }
    }

    /// Phase of the hour starting at `hour_start`.
    pub fn classify_hour(&self, series: &TideLevelSeries, hour_start: DateTime<Utc>) -> TidePhase {
        let v0 = self.matching.resolve(series, hour_start);
        let v1 = self.matching.resolve(series, hour_start + Duration::hours(1));
        classify(v0, v1, self.epsilon)
    }

    /// Phase of each hour in `hours`, in the same order.
    pub fn classify_hours(
        &self,
        series: &TideLevelSeries,
        hours: &[DateTime<Utc>],
    ) -> Vec<TidePhase> {
        hours
            .iter()
            .map(|&h| self.classify_hour(series, h))
            .collect()
    }
}
