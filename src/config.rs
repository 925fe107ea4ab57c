//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! `spot-config.toml` file. Everything a run needs that is not fetched from a
//! provider lives here: the spot list with each spot's go/no-go rule, the tide
//! source strategy and classifier tuning, and the retry budget for upstream
//! calls.
//!
//! The whole [`Config`] is built once at startup and passed by reference into
//! every component; nothing reads configuration from globals.

use crate::propagation::PhaseOffset;
use crate::rules::{Sector, SpotRule};
use crate::tide_source::TideSourceStrategy;
use crate::tide_trend::{LevelMatching, DEFAULT_EPSILON, MAX_TOLERANCE_MINUTES};
use crate::{Coordinate, TidePhase};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "spot-config.toml";

/// Longest forecast window the providers serve.
pub const MAX_HORIZON_HOURS: u32 = 16 * 24;

/// Largest propagation offset, either limb, either direction.
pub const MAX_OFFSET_MINUTES: i64 = 24 * 60;

/// Errors raised while reading or validating a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("config IO: {0}")]
    Read(#[from] io::Error),

    /// The file is not valid TOML for [`Config`]
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but describes an unusable setup
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Application configuration loaded from spot-config.toml
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Run-wide settings
    pub run: RunConfig,
    /// Tide acquisition and classification
    pub tide: TideConfig,
    /// Upstream HTTP settings
    pub fetch: FetchConfig,
    /// Spots to report on, in report order
    pub spots: Vec<SpotConfig>,
}

/// Run-wide settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RunConfig {
    /// IANA time zone used for the local timeline (e.g. "America/Toronto")
    pub timezone: String,
    /// Number of hours to look ahead from the current hour
    pub horizon_hours: u32,
    /// Key of the spot whose wind series defines the report timeline
    pub reference_spot: String,
    /// Where the binary writes the report
    pub output_path: PathBuf,
}

impl RunConfig {
    /// The configured zone, parsed.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown time zone '{}'", self.timezone)))
    }

    /// `at` as wall-clock time in the configured zone.
    pub fn local_time(&self, at: DateTime<Utc>) -> Result<DateTime<FixedOffset>, ConfigError> {
        let local = at.with_timezone(&self.tz()?);
        Ok(local.with_timezone(&local.offset().fix()))
    }
}

/// Tide acquisition and classification settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TideConfig {
    /// Level change in metres below which an hour counts as slack
    pub epsilon: f64,
    /// How requested instants are matched against returned samples
    pub matching: LevelMatching,
    /// Hours at the start of the timeline used to probe baseline candidates
    pub trial_hours: u32,
    /// Marine API variable holding the water level
    pub variable: String,
    /// Where baseline candidates come from
    pub source: TideSourceStrategy,
}

/// Upstream HTTP settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Extra attempts after the first failure
    pub retries: u32,
    /// Fixed pause between attempts
    pub retry_pause_secs: u64,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Open-Meteo forecast endpoint
    pub wind_url: String,
    /// Open-Meteo marine endpoint
    pub marine_url: String,
}

/// One kiting spot and its go/no-go rule.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SpotConfig {
    /// Stable key used in the report (e.g. "ste_anne")
    pub key: String,
    /// Human-readable name
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Minimum gust in knots for a go
    pub gust_threshold_kn: f64,
    /// Acceptable wind directions, if the spot cares
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
    /// Required tide phase, if the spot cares
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tide: Option<TidePhase>,
    /// Time shift from the baseline when the spot has no direct tide data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsets: Option<PhaseOffset>,
}

impl SpotConfig {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    pub fn rule(&self) -> SpotRule {
        SpotRule {
            gust_threshold_kn: self.gust_threshold_kn,
            sector: self.sector,
            required_phase: self.tide,
        }
    }

    /// Offsets used for propagation; spots without any follow the baseline
    /// hour for hour.
    pub fn phase_offset(&self) -> PhaseOffset {
        self.offsets.unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            run: RunConfig {
                timezone: "America/Toronto".to_string(),
                horizon_hours: 96,
                reference_spot: "beauport".to_string(),
                output_path: PathBuf::from("forecast.json"),
            },
            tide: TideConfig {
                epsilon: DEFAULT_EPSILON,
                matching: LevelMatching::default(),
                trial_hours: 36,
                variable: "sea_level_height_msl".to_string(),
                // Upper estuary, from Quebec harbour downstream past Ile d'Orleans
                source: TideSourceStrategy::Candidates {
                    candidates: vec![
                        Coordinate::new(46.8100, -71.1900),
                        Coordinate::new(46.8500, -71.1000),
                        Coordinate::new(46.9000, -70.9500),
                        Coordinate::new(47.0000, -70.8000),
                        Coordinate::new(47.1000, -70.6500),
                    ],
                },
            },
            fetch: FetchConfig {
                retries: 2,
                retry_pause_secs: 2,
                timeout_secs: 20,
                wind_url: "https://api.open-meteo.com/v1/forecast".to_string(),
                marine_url: "https://marine-api.open-meteo.com/v1/marine".to_string(),
            },
            spots: vec![
                SpotConfig {
                    key: "beauport".to_string(),
                    name: "Baie de Beauport".to_string(),
                    lat: 46.8598,
                    lon: -71.2006,
                    gust_threshold_kn: 10.0,
                    sector: None,
                    tide: None,
                    offsets: None,
                },
                SpotConfig {
                    key: "ste_anne".to_string(),
                    name: "Quai Ste-Anne-de-Beaupré".to_string(),
                    lat: 47.0153,
                    lon: -70.9280,
                    gust_threshold_kn: 12.0,
                    sector: Some(Sector::new(200.0, 250.0)),
                    tide: Some(TidePhase::Rising),
                    offsets: Some(PhaseOffset::new(-45, -30)),
                },
                SpotConfig {
                    key: "st_jean".to_string(),
                    name: "Quai St-Jean, Île d'Orléans".to_string(),
                    lat: 46.8577,
                    lon: -70.8169,
                    gust_threshold_kn: 12.0,
                    sector: Some(Sector::new(30.0, 70.0)),
                    tide: Some(TidePhase::Falling),
                    offsets: Some(PhaseOffset::new(-30, -20)),
                },
            ],
        }
    }
}

impl Config {
    /// Load configuration from spot-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from_path(&path) {
            Ok(config) => {
                info!(
                    path = %path.as_ref().display(),
                    spots = config.spots.len(),
                    "loaded configuration"
                );
                config
            }
            Err(ConfigError::Read(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!("no config file found, using built-in spots");
                Self::default()
            }
            Err(e) => {
                warn!(error = %e, "unusable config file, using built-in spots");
                Self::default()
            }
        }
    }

    /// Strict variant of [`Config::load_from_path`]: any problem is an error.
    pub fn try_load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save current configuration as pretty TOML.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spots.is_empty() {
            return Err(ConfigError::Invalid("no spots configured".into()));
        }

        let mut keys = HashSet::new();
        for spot in &self.spots {
            if !keys.insert(spot.key.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate spot key '{}'",
                    spot.key
                )));
            }
            if !spot.gust_threshold_kn.is_finite() || spot.gust_threshold_kn < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "spot '{}': gust threshold must be a non-negative number",
                    spot.key
                )));
            }
            if let Some(sector) = spot.sector {
                if !sector.is_valid() {
                    return Err(ConfigError::Invalid(format!(
                        "spot '{}': sector bounds must lie in [0, 360)",
                        spot.key
                    )));
                }
            }
            if let Some(offset) = spot.offsets {
                let in_range = |m: i64| (-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&m);
                if !in_range(offset.rise_minutes) || !in_range(offset.fall_minutes) {
                    return Err(ConfigError::Invalid(format!(
                        "spot '{}': offsets must lie within ±{} minutes",
                        spot.key, MAX_OFFSET_MINUTES
                    )));
                }
            }
        }

        self.run.tz()?;
        if self.run.horizon_hours == 0 || self.run.horizon_hours > MAX_HORIZON_HOURS {
            return Err(ConfigError::Invalid(format!(
                "horizon must be 1..={MAX_HORIZON_HOURS} hours"
            )));
        }

        if self.spot(&self.run.reference_spot).is_none() {
            return Err(ConfigError::Invalid(format!(
                "reference spot '{}' is not in the spot list",
                self.run.reference_spot
            )));
        }
        if !self.tide.epsilon.is_finite() || self.tide.epsilon < 0.0 {
            return Err(ConfigError::Invalid("tide epsilon must be >= 0".into()));
        }
        if let LevelMatching::Nearest { tolerance_minutes } = self.tide.matching {
            if !(0..=MAX_TOLERANCE_MINUTES).contains(&tolerance_minutes) {
                return Err(ConfigError::Invalid(format!(
                    "tide tolerance must be 0..={MAX_TOLERANCE_MINUTES} minutes"
                )));
            }
        }

        Ok(())
    }

    pub fn spot(&self, key: &str) -> Option<&SpotConfig> {
        self.spots.iter().find(|s| s.key == key)
    }
}
