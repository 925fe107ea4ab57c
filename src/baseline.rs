//! # Tide Baseline Selection
//!
//! Picks the single coordinate whose tide data the run treats as
//! authoritative. Candidates are probed in order with a short trial window;
//! the best-covered one wins if it clears a minimum coverage floor, and only
//! then is the full horizon fetched from it.
//!
//! ## Coverage
//!
//! A candidate's coverage is the number of trial instants that resolve to a
//! level under the configured [`LevelMatching`]. A failed probe is zero
//! coverage, never an error.
//!
//! ## Thresholds
//! - **Floor**: `max(6, trial / 6)` resolved instants, below which nothing is
//!   selected
//! - **Adequate**: at least half the trial set, which stops the scan early

use crate::providers::TideProvider;
use crate::tide_trend::LevelMatching;
use crate::{Coordinate, TideLevelSeries};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Smallest floor regardless of trial size.
const MIN_COVERAGE: usize = 6;

/// Minimum coverage a winner needs for a trial of `trial_size` instants.
pub fn coverage_floor(trial_size: usize) -> usize {
    MIN_COVERAGE.max(trial_size / 6)
}

/// Whether `coverage` is good enough to stop probing further candidates.
pub fn is_adequate(coverage: usize, trial_size: usize) -> bool {
    trial_size > 0 && coverage * 2 >= trial_size
}

/// A probed coordinate and how many trial instants it resolved.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BaselineCandidate {
    pub coordinate: Coordinate,
    pub coverage: usize,
}

/// Index of the best candidate, if it clears the floor. Ties go to the
/// earlier candidate.
pub fn pick_best(probed: &[BaselineCandidate], trial_size: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, candidate) in probed.iter().enumerate() {
        if best.map_or(true, |b| candidate.coverage > probed[b].coverage) {
            best = Some(i);
        }
    }
    best.filter(|&b| probed[b].coverage >= coverage_floor(trial_size))
}

/// The winning coordinate and its full-horizon series.
#[derive(Clone, Debug)]
pub struct Baseline {
    pub coordinate: Coordinate,
    pub trial_coverage: usize,
    pub series: TideLevelSeries,
}

/// Everything the selector learned, whether or not it found a baseline.
#[derive(Clone, Debug)]
pub struct SelectionOutcome {
    pub baseline: Option<Baseline>,
    pub probed: Vec<BaselineCandidate>,
    pub trial_size: usize,
    /// Winner of the trial whose full-horizon fetch came back empty or failed
    pub unfetched: Option<BaselineCandidate>,
}

impl SelectionOutcome {
    pub fn floor(&self) -> usize {
        coverage_floor(self.trial_size)
    }

    /// One-line explanation for the report.
    pub fn note(&self) -> String {
        match (&self.baseline, &self.unfetched) {
            (Some(b), _) => format!(
                "baseline {} selected with {}/{} trial samples after probing {} candidate(s)",
                b.coordinate,
                b.trial_coverage,
                self.trial_size,
                self.probed.len()
            ),
            (None, Some(w)) => format!(
                "no baseline: {} resolved {}/{} trial samples but the full-horizon fetch failed",
                w.coordinate, w.coverage, self.trial_size
            ),
            (None, None) => {
                let best = self.probed.iter().map(|c| c.coverage).max().unwrap_or(0);
                format!(
                    "no baseline: best of {} candidate(s) resolved {}/{} trial samples, floor is {}",
                    self.probed.len(),
                    best,
                    self.trial_size,
                    self.floor()
                )
            }
        }
    }
}

/// Probes candidates against a [`TideProvider`].
pub struct BaselineSelector<'a> {
    provider: &'a dyn TideProvider,
    matching: LevelMatching,
}

impl<'a> BaselineSelector<'a> {
    pub fn new(provider: &'a dyn TideProvider, matching: LevelMatching) -> Self {
        Self { provider, matching }
    }

    /// Coverage of one candidate over `trial`; failures count as zero.
    async fn probe(&self, at: Coordinate, trial: &[DateTime<Utc>]) -> usize {
        match self.provider.fetch_levels(at, trial).await {
            Ok(series) => self.matching.coverage(&series, trial),
            Err(e) => {
                warn!(%at, error = %e, "tide probe failed");
                0
            }
        }
    }

    /// Probe `candidates` over `trial` and fetch `full` from the winner.
    pub async fn select(
        &self,
        candidates: &[Coordinate],
        trial: &[DateTime<Utc>],
        full: &[DateTime<Utc>],
    ) -> SelectionOutcome {
        let trial_size = trial.len();
        let mut probed = Vec::with_capacity(candidates.len());

        for &coordinate in candidates {
            let coverage = self.probe(coordinate, trial).await;
            debug!(at = %coordinate, coverage, trial_size, "probed tide candidate");
            probed.push(BaselineCandidate {
                coordinate,
                coverage,
            });
            if is_adequate(coverage, trial_size) {
                break;
            }
        }

        let winner = pick_best(&probed, trial_size).map(|i| probed[i]);
        let baseline = match winner {
            Some(w) => self.fetch_full(w, full).await,
            None => None,
        };
        let unfetched = if baseline.is_none() { winner } else { None };

        let outcome = SelectionOutcome {
            baseline,
            probed,
            trial_size,
            unfetched,
        };
        match &outcome.baseline {
            Some(b) => info!(at = %b.coordinate, coverage = b.trial_coverage, "tide baseline selected"),
            None => warn!(note = %outcome.note(), "no tide baseline"),
        }
        outcome
    }

    async fn fetch_full(
        &self,
        winner: BaselineCandidate,
        full: &[DateTime<Utc>],
    ) -> Option<Baseline> {
        match self.provider.fetch_levels(winner.coordinate, full).await {
            Ok(series) if !series.is_empty() => Some(Baseline {
                coordinate: winner.coordinate,
                trial_coverage: winner.coverage,
                series,
            }),
            Ok(_) => {
                warn!(at = %winner.coordinate, "baseline returned no samples for the full horizon");
                None
            }
            Err(e) => {
                warn!(at = %winner.coordinate, error = %e, "baseline full-horizon fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::{hourly_instants, FakeTide};

    fn candidates(n: usize) -> Vec<Coordinate> {
        (0..n)
            .map(|i| Coordinate::new(46.8 + i as f64 * 0.1, -71.0))
            .collect()
    }

    #[test]
    fn floor_and_adequacy() {
        assert_eq!(coverage_floor(0), 6);
        assert_eq!(coverage_floor(24), 6);
        assert_eq!(coverage_floor(48), 8);
        assert_eq!(coverage_floor(74), 12);
        assert!(is_adequate(24, 48));
        assert!(!is_adequate(23, 48));
        assert!(!is_adequate(0, 0));
    }

    #[test]
    fn pick_best_prefers_first_on_tie() {
        let c = candidates(3);
        let probed: Vec<_> = c
            .iter()
            .zip([7, 9, 9])
            .map(|(&coordinate, coverage)| BaselineCandidate {
                coordinate,
                coverage,
            })
            .collect();
        assert_eq!(pick_best(&probed, 24), Some(1));
        assert_eq!(pick_best(&[], 24), None);
    }

    #[tokio::test]
    async fn selects_best_covered_candidate() {
        let trial = hourly_instants(24);
        let full = hourly_instants(48);
        let c = candidates(3);
        let tide = FakeTide::new()
            .with_coverage(c[0], 3)
            .with_coverage(c[1], 9)
            .with_coverage(c[2], 2);

        let outcome = BaselineSelector::new(&tide, LevelMatching::Exact)
            .select(&c, &trial, &full)
            .await;

        let baseline = outcome.baseline.as_ref().unwrap();
        assert_eq!(baseline.coordinate, c[1]);
        assert_eq!(baseline.trial_coverage, 9);
        assert_eq!(outcome.probed.len(), 3);
        assert!(outcome.note().contains("9/24"));
    }

    #[tokio::test]
    async fn fails_below_floor() {
        let trial = hourly_instants(48);
        let c = candidates(3);
        let tide = FakeTide::new()
            .with_coverage(c[0], 2)
            .with_coverage(c[1], 3)
            .with_coverage(c[2], 1);

        let outcome = BaselineSelector::new(&tide, LevelMatching::Exact)
            .select(&c, &trial, &trial)
            .await;

        assert!(outcome.baseline.is_none());
        assert_eq!(outcome.floor(), 8);
        assert!(outcome.note().contains("floor is 8"));
    }

    #[tokio::test]
    async fn failing_candidate_counts_as_zero() {
        let trial = hourly_instants(24);
        let c = candidates(2);
        let tide = FakeTide::new().failing(c[0]).with_coverage(c[1], 8);

        let outcome = BaselineSelector::new(&tide, LevelMatching::Exact)
            .select(&c, &trial, &trial)
            .await;

        assert_eq!(outcome.probed[0].coverage, 0);
        assert_eq!(outcome.baseline.unwrap().coordinate, c[1]);
    }

    #[tokio::test]
    async fn failed_full_horizon_fetch_means_no_baseline() {
        let trial = hourly_instants(24);
        let full = hourly_instants(48);
        let c = candidates(2);
        let tide = FakeTide::new().trial_only(c[0], trial.len());

        let outcome = BaselineSelector::new(&tide, LevelMatching::Exact)
            .select(&c, &trial, &full)
            .await;

        assert!(outcome.baseline.is_none());
        assert_eq!(outcome.probed.len(), 1);
        assert_eq!(outcome.unfetched.map(|w| w.coordinate), Some(c[0]));
        assert_eq!(tide.calls(), 2);

        let note = outcome.note();
        assert!(note.contains("full-horizon fetch failed"), "{note}");
        assert!(note.contains("24/24"), "{note}");
        assert!(!note.contains("floor"), "{note}");
    }

    #[tokio::test]
    async fn stops_early_on_adequate_candidate() {
        let trial = hourly_instants(24);
        let c = candidates(3);
        let tide = FakeTide::new()
            .with_coverage(c[0], 12)
            .with_coverage(c[1], 24)
            .with_coverage(c[2], 24);

        let outcome = BaselineSelector::new(&tide, LevelMatching::Exact)
            .select(&c, &trial, &trial)
            .await;

        assert_eq!(outcome.probed.len(), 1);
        assert_eq!(outcome.baseline.unwrap().coordinate, c[0]);
        assert_eq!(tide.calls(), 2);
    }
}
