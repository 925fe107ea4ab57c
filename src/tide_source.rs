//! # Tide Source Strategies
//!
//! Where to look for baseline tide data. Marine models only resolve water
//! level over open water cells, so a spot on a quay often returns nothing and
//! the selector has to try nearby points instead. The strategy decides which
//! points, in which order:
//!
//! - `fixed`: a single known-good seed
//! - `candidates`: an explicit, ordered list
//! - `ring`: points on a circle around a centre, starting due north and going
//!   clockwise, optionally preceded by the centre itself

use crate::Coordinate;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
const EARTH_MEAN_RADIUS_KM: f64 = 6371.0088;

/// How baseline candidate coordinates are produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum TideSourceStrategy {
    Fixed {
        seed: Coordinate,
    },
    Candidates {
        candidates: Vec<Coordinate>,
    },
    Ring {
        center: Coordinate,
        radius_km: f64,
        points: usize,
        #[serde(default = "default_true")]
        include_center: bool,
    },
}

fn default_true() -> bool {
    true
}

impl TideSourceStrategy {
    /// Candidate coordinates in probe order.
    pub fn candidates(&self) -> Vec<Coordinate> {
        match self {
            TideSourceStrategy::Fixed { seed } => vec![*seed],
            TideSourceStrategy::Candidates { candidates } => candidates.clone(),
            TideSourceStrategy::Ring {
                center,
                radius_km,
                points,
                include_center,
            } => {
                let mut out = Vec::with_capacity(points + 1);
                if *include_center {
                    out.push(*center);
                }
                for i in 0..*points {
                    let bearing = 360.0 * i as f64 / *points as f64;
                    out.push(destination_point(*center, *radius_km, bearing));
                }
                out
            }
        }
    }
}

/// Great-circle destination from `origin` after `distance_km` on `bearing_deg`.
fn destination_point(origin: Coordinate, distance_km: f64, bearing_deg: f64) -> Coordinate {
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let bearing = bearing_deg.to_radians();
    let delta = distance_km / EARTH_MEAN_RADIUS_KM;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    Coordinate::new(lat2.to_degrees(), lon2.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_and_list_strategies() {
        let seed = Coordinate::new(46.81, -71.19);
        assert_eq!(TideSourceStrategy::Fixed { seed }.candidates(), vec![seed]);

        let list = vec![seed, Coordinate::new(47.0, -70.8)];
        let strategy = TideSourceStrategy::Candidates {
            candidates: list.clone(),
        };
        assert_eq!(strategy.candidates(), list);
    }

    #[test]
    fn ring_starts_north_and_goes_clockwise() {
        let center = Coordinate::new(46.9, -71.0);
        let strategy = TideSourceStrategy::Ring {
            center,
            radius_km: 10.0,
            points: 4,
            include_center: true,
        };
        let points = strategy.candidates();
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], center);

        // North, east, south, west
        assert!(points[1].lat > center.lat);
        assert!((points[1].lon - center.lon).abs() < 1e-9);
        assert!(points[2].lon > center.lon);
        assert!(points[3].lat < center.lat);
        assert!(points[4].lon < center.lon);

        // 10 km is roughly 0.09 degrees of latitude
        assert!((points[1].lat - center.lat - 0.0899).abs() < 0.001);
    }

    #[test]
    fn ring_parses_from_toml() {
        let strategy: TideSourceStrategy = toml::from_str(
            r#"
strategy = "ring"
center = { lat = 46.9, lon = -71.0 }
radius_km = 5.0
points = 6
"#,
        )
        .unwrap();
        // include_center defaults on
        assert_eq!(strategy.candidates().len(), 7);
    }
}
