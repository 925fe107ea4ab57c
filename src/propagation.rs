//! # Tide Phase Propagation
//!
//! Tidal timing shifts as the wave travels up a river: high water reaches an
//! upstream quay later than a downstream one. Spots without their own tide
//! data borrow the baseline's hourly phase, shifted by two per-spot offsets:
//! one tuned for the rising limb and one for the falling limb.
//!
//! This is a deliberate approximation. The offsets are configuration and the
//! probes snap to whole baseline hours; nothing here models the tide itself.
//!
//! ## Combining the probes
//!
//! For target hour `H` the baseline is read at `H - rise` and `H - fall`:
//! 1. rise-probe rising → rising
//! 2. fall-probe falling → falling
//! 3. either probe slack → slack
//! 4. the first known probe (rise before fall), otherwise unknown

use crate::TidePhase;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minutes by which a spot's tide lags the baseline, per limb.
///
/// Positive values mean the spot sees the phase later than the baseline;
/// negative values mean earlier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOffset {
    pub rise_minutes: i64,
    pub fall_minutes: i64,
}

impl PhaseOffset {
    pub fn new(rise_minutes: i64, fall_minutes: i64) -> Self {
        Self {
            rise_minutes,
            fall_minutes,
        }
    }
}

/// Round a minute offset to whole hours, halves away from zero.
///
/// Report hours are hour-aligned, so shifting by the rounded offset is the
/// same as snapping `H - offset` to the nearest baseline hour.
pub fn snap_to_hours(minutes: i64) -> i64 {
    (minutes as f64 / 60.0).round() as i64
}

/// Combine a rise-probe and a fall-probe into one phase.
pub fn combine_probes(rise_probe: TidePhase, fall_probe: TidePhase) -> TidePhase {
    if rise_probe == TidePhase::Rising {
        TidePhase::Rising
    } else if fall_probe == TidePhase::Falling {
        TidePhase::Falling
    } else if rise_probe == TidePhase::Slack || fall_probe == TidePhase::Slack {
        TidePhase::Slack
    } else if rise_probe.is_known() {
        rise_probe
    } else {
        fall_probe
    }
}

/// Classified phase of the baseline coordinate, keyed by UTC hour start.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BaselinePhases {
    phases: BTreeMap<DateTime<Utc>, TidePhase>,
}

impl BaselinePhases {
    pub fn new(hours: &[DateTime<Utc>], phases: &[TidePhase]) -> Self {
        Self {
            phases: hours.iter().copied().zip(phases.iter().copied()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Phase at `hour`; hours outside the baseline horizon are unknown.
    pub fn at(&self, hour: DateTime<Utc>) -> TidePhase {
        self.phases
            .get(&hour)
            .copied()
            .unwrap_or(TidePhase::Unknown)
    }

    /// Estimate the phase at a spot with `offset` for report hour `hour`.
    pub fn propagate(&self, hour: DateTime<Utc>, offset: PhaseOffset) -> TidePhase {
        let rise_probe = self.probe(hour, offset.rise_minutes);
        let fall_probe = self.probe(hour, offset.fall_minutes);
        combine_probes(rise_probe, fall_probe)
    }

    /// Baseline phase at `hour - minutes`, snapped. Shifts chrono cannot
    /// represent land outside the horizon.
    fn probe(&self, hour: DateTime<Utc>, minutes: i64) -> TidePhase {
        Duration::try_hours(snap_to_hours(minutes))
            .and_then(|shift| hour.checked_sub_signed(shift))
            .map_or(TidePhase::Unknown, |at| self.at(at))
    }

    /// Propagated phase for every hour of `hours`.
    pub fn propagate_all(&self, hours: &[DateTime<Utc>], offset: PhaseOffset) -> Vec<TidePhase> {
        hours.iter().map(|&h| self.propagate(h, offset)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use TidePhase::*;

    fn hours(n: i64) -> Vec<DateTime<Utc>> {
        let t0 = Utc.with_ymd_and_hms(2025, 7, 24, 0, 0, 0).unwrap();
        (0..n).map(|i| t0 + Duration::hours(i)).collect()
    }

    #[test]
    fn snapping_rounds_half_away_from_zero() {
        assert_eq!(snap_to_hours(0), 0);
        assert_eq!(snap_to_hours(15), 0);
        assert_eq!(snap_to_hours(29), 0);
        assert_eq!(snap_to_hours(30), 1);
        assert_eq!(snap_to_hours(89), 1);
        assert_eq!(snap_to_hours(90), 2);
        assert_eq!(snap_to_hours(-30), -1);
        assert_eq!(snap_to_hours(-15), 0);
    }

    #[test]
    fn probe_priority() {
        assert_eq!(combine_probes(Rising, Falling), Rising);
        assert_eq!(combine_probes(Falling, Falling), Falling);
        assert_eq!(combine_probes(Slack, Falling), Falling);
        assert_eq!(combine_probes(Slack, Rising), Slack);
        assert_eq!(combine_probes(Unknown, Slack), Slack);
        assert_eq!(combine_probes(Falling, Rising), Falling);
        assert_eq!(combine_probes(Falling, Unknown), Falling);
        assert_eq!(combine_probes(Unknown, Rising), Rising);
        assert_eq!(combine_probes(Unknown, Unknown), Unknown);
    }

    #[test]
    fn rising_to_falling_boundary_shifts_by_snapped_offset() {
        let hours = hours(6);
        let baseline =
            BaselinePhases::new(&hours, &[Rising, Rising, Rising, Falling, Falling, Falling]);

        // rise 30 min snaps to one hour, fall 15 min snaps to none
        let propagated = baseline.propagate_all(&hours, PhaseOffset::new(30, 15));
        assert_eq!(
            propagated,
            vec![Rising, Rising, Rising, Rising, Falling, Falling]
        );

        let boundary = |p: &[TidePhase]| p.iter().position(|&x| x == Falling).unwrap();
        assert_eq!(
            boundary(&propagated) - boundary(&[Rising, Rising, Rising, Falling]),
            1
        );
    }

    #[test]
    fn zero_offset_follows_baseline() {
        let hours = hours(4);
        let phases = [Rising, Slack, Falling, Unknown];
        let baseline = BaselinePhases::new(&hours, &phases);
        assert_eq!(
            baseline.propagate_all(&hours, PhaseOffset::default()),
            phases.to_vec()
        );
    }

    #[test]
    fn negative_offsets_look_ahead() {
        let hours = hours(4);
        let baseline = BaselinePhases::new(&hours, &[Rising, Rising, Falling, Falling]);
        let propagated = baseline.propagate_all(&hours, PhaseOffset::new(-60, -60));
        // Last hour probes past the baseline horizon
        assert_eq!(propagated, vec![Rising, Falling, Falling, Unknown]);
    }

    #[test]
    fn extreme_offsets_read_as_unknown() {
        let hours = hours(3);
        let baseline = BaselinePhases::new(&hours, &[Falling, Falling, Rising]);

        // Rise shift is unrepresentable; the fall probe still answers
        let propagated = baseline.propagate_all(&hours, PhaseOffset::new(i64::MAX, 0));
        assert_eq!(propagated, vec![Falling, Falling, Rising]);

        let propagated = baseline.propagate_all(&hours, PhaseOffset::new(i64::MIN, i64::MIN));
        assert_eq!(propagated, vec![Unknown; 3]);
    }

    #[test]
    fn empty_baseline_is_unknown_everywhere() {
        let hours = hours(3);
        let baseline = BaselinePhases::default();
        assert!(baseline.is_empty());
        assert!(baseline
            .propagate_all(&hours, PhaseOffset::new(30, 15))
            .iter()
            .all(|&p| p == Unknown));
    }
}
