//! # Go/No-Go Rule Evaluation
//!
//! Each spot carries a small declarative predicate: a gust threshold, an
//! optional wind-direction sector and an optional tide-phase requirement.
//! Evaluation never fails; any missing input simply means "no go".

use crate::TidePhase;
use serde::{Deserialize, Serialize};

/// A wind-direction sector in degrees from north.
///
/// When `lo > hi` the sector wraps through north, so `Sector::new(300.0, 60.0)`
/// covers north-west through north-east. Both bounds are members.
///
/// # Example
/// ```
/// use spot_check::rules::Sector;
///
/// let northerly = Sector::new(300.0, 60.0);
/// assert!(northerly.contains(350.0));
/// assert!(northerly.contains(10.0));
/// assert!(!northerly.contains(150.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub lo: f64,
    pub hi: f64,
}

impl Sector {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Both bounds lie in `[0, 360)`.
    pub fn is_valid(&self) -> bool {
        let in_range = |d: f64| d.is_finite() && (0.0..360.0).contains(&d);
        in_range(self.lo) && in_range(self.hi)
    }

    pub fn wraps(&self) -> bool {
        self.lo > self.hi
    }

    /// Whether `deg` falls inside the sector, bounds included.
    ///
    /// Directions are normalised into `[0, 360)` first, so 360 behaves as 0
    /// and -10 as 350. Non-finite directions are never inside.
    pub fn contains(&self, deg: f64) -> bool {
        if !deg.is_finite() {
            return false;
        }
        let deg = deg.rem_euclid(360.0);
        if self.wraps() {
            deg >= self.lo || deg <= self.hi
        } else {
            self.lo <= deg && deg <= self.hi
        }
    }
}

/// The go/no-go predicate of one spot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotRule {
    pub gust_threshold_kn: f64,
    pub sector: Option<Sector>,
    pub required_phase: Option<TidePhase>,
}

/// Inputs for one spot at one hour.
#[derive(Clone, Copy, Debug)]
pub struct HourConditions {
    pub gust_kn: Option<f64>,
    pub direction_deg: Option<f64>,
    pub tide: TidePhase,
}

impl SpotRule {
    /// Evaluate the rule for one hour.
    ///
    /// All three clauses must hold: the gust is known and at least the
    /// threshold, the direction is known and inside the sector (when a sector
    /// is configured), and the tide phase equals the required phase (when one
    /// is configured).
    pub fn evaluate(&self, hour: &HourConditions) -> bool {
        let gust_ok = matches!(
            hour.gust_kn,
            Some(g) if g.is_finite() && g >= self.gust_threshold_kn
        );

        let direction_ok = match self.sector {
            None => true,
            Some(sector) => hour.direction_deg.is_some_and(|d| sector.contains(d)),
        };

        let tide_ok = match self.required_phase {
            None => true,
            Some(required) => hour.tide == required,
        };

        gust_ok && direction_ok && tide_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sw_rising() -> SpotRule {
        SpotRule {
            gust_threshold_kn: 10.0,
            sector: Some(Sector::new(200.0, 250.0)),
            required_phase: Some(TidePhase::Rising),
        }
    }

    fn hour(gust: Option<f64>, dir: Option<f64>, tide: TidePhase) -> HourConditions {
        HourConditions {
            gust_kn: gust,
            direction_deg: dir,
            tide,
        }
    }

    #[test]
    fn sector_bounds_are_inclusive() {
        for (lo, hi) in [(200.0, 250.0), (30.0, 70.0), (300.0, 60.0), (0.0, 359.0)] {
            let sector = Sector::new(lo, hi);
            assert!(sector.contains(lo), "lo {lo} should be inside ({lo},{hi})");
            assert!(sector.contains(hi), "hi {hi} should be inside ({lo},{hi})");
        }
    }

    #[test]
    fn wrapping_sector_membership() {
        let sector = Sector::new(300.0, 60.0);
        assert!(sector.wraps());
        assert!(sector.contains(350.0));
        assert!(sector.contains(10.0));
        assert!(sector.contains(0.0));
        assert!(!sector.contains(150.0));
        assert!(!sector.contains(299.0));
        assert!(!sector.contains(61.0));
    }

    #[test]
    fn directions_are_normalised() {
        let sector = Sector::new(300.0, 60.0);
        assert!(sector.contains(360.0));
        assert!(sector.contains(-10.0));
        assert!(!sector.contains(f64::NAN));

        let plain = Sector::new(200.0, 250.0);
        assert!(plain.contains(580.0));
    }

    #[test]
    fn sector_validity() {
        assert!(Sector::new(0.0, 359.9).is_valid());
        assert!(!Sector::new(-1.0, 20.0).is_valid());
        assert!(!Sector::new(10.0, 360.0).is_valid());
    }

    #[test]
    fn go_only_when_every_clause_holds() {
        let rule = sw_rising();
        assert!(rule.evaluate(&hour(Some(10.0), Some(225.0), TidePhase::Rising)));
        assert!(rule.evaluate(&hour(Some(25.0), Some(200.0), TidePhase::Rising)));

        // Each clause failing on its own
        assert!(!rule.evaluate(&hour(Some(9.9), Some(225.0), TidePhase::Rising)));
        assert!(!rule.evaluate(&hour(Some(15.0), Some(260.0), TidePhase::Rising)));
        assert!(!rule.evaluate(&hour(Some(15.0), Some(225.0), TidePhase::Falling)));
        assert!(!rule.evaluate(&hour(Some(15.0), Some(225.0), TidePhase::Slack)));
        assert!(!rule.evaluate(&hour(Some(15.0), Some(225.0), TidePhase::Unknown)));
    }

    #[test]
    fn missing_inputs_mean_no_go() {
        let rule = sw_rising();
        assert!(!rule.evaluate(&hour(None, Some(225.0), TidePhase::Rising)));
        assert!(!rule.evaluate(&hour(Some(15.0), None, TidePhase::Rising)));
        assert!(!rule.evaluate(&hour(Some(f64::NAN), Some(225.0), TidePhase::Rising)));
    }

    #[test]
    fn gust_only_rule_ignores_direction_and_tide() {
        let rule = SpotRule {
            gust_threshold_kn: 10.0,
            sector: None,
            required_phase: None,
        };
        assert!(rule.evaluate(&hour(Some(10.0), None, TidePhase::Unknown)));
        assert!(!rule.evaluate(&hour(Some(9.0), Some(45.0), TidePhase::Rising)));
    }
}
