//! # Open-Meteo Providers
//!
//! Wind comes from the forecast API, water level from the marine API.
//!
//! ## Requests
//! - **Wind**: `hourly=wind_speed_10m,wind_gusts_10m,wind_direction_10m` in
//!   knots, with `timeformat=unixtime` so every hour is an unambiguous instant
//!   and `utc_offset_seconds` gives the local offset for display
//! - **Tide**: `hourly=<variable>` (default `sea_level_height_msl`) over the
//!   UTC dates spanning the requested instants
//!
//! Both requests ask for whole days; records outside the requested window are
//! dropped after decoding.
//!
//! ## Payload Tolerance
//! Open-Meteo returns `null` for hours it cannot compute and omits the
//! `hourly` block entirely for coordinates outside its grid (a common answer
//! from the marine model for points on land). Nulls become `None`, a missing
//! block becomes an empty result, and neither is an error.

use super::{with_retry, ProviderError, RetryPolicy, TideProvider, WindProvider};
use crate::config::Config;
use crate::{Coordinate, TideLevelSeries, WindRecord};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Wind and tide client for the Open-Meteo APIs.
#[derive(Clone, Debug)]
pub struct OpenMeteo {
    client: Client,
    wind_url: String,
    marine_url: String,
    timezone: String,
    tide_variable: String,
    retry: RetryPolicy,
}

impl OpenMeteo {
    /// Build a client from the run configuration.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.fetch.timeout_secs))
            .user_agent(concat!("spot-check/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            wind_url: config.fetch.wind_url.clone(),
            marine_url: config.fetch.marine_url.clone(),
            timezone: config.run.timezone.clone(),
            tide_variable: config.tide.variable.clone(),
            retry: RetryPolicy {
                retries: config.fetch.retries,
                pause: std::time::Duration::from_secs(config.fetch.retry_pause_secs),
            },
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl WindProvider for OpenMeteo {
    async fn fetch_hourly(
        &self,
        at: Coordinate,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<WindRecord>, ProviderError> {
        // Dates are read in the configured zone; pad a day each side so the
        // window is covered whatever that zone is
        let (first, last) = padded_dates(start.with_timezone(&Utc), end.with_timezone(&Utc));
        let query = [
            ("latitude", at.lat.to_string()),
            ("longitude", at.lon.to_string()),
            (
                "hourly",
                "wind_speed_10m,wind_gusts_10m,wind_direction_10m".to_string(),
            ),
            ("wind_speed_unit", "kn".to_string()),
            ("timezone", self.timezone.clone()),
            ("timeformat", "unixtime".to_string()),
            ("start_date", first.to_string()),
            ("end_date", last.to_string()),
        ];

        let what = format!("wind {at}");
        let body: WindResponse =
            with_retry(self.retry, &what, || self.get_json(&self.wind_url, &query)).await?;
        let records = body.into_records(start, end)?;
        debug!(%at, hours = records.len(), "wind fetched");
        Ok(records)
    }
}

#[async_trait]
impl TideProvider for OpenMeteo {
    async fn fetch_levels(
        &self,
        at: Coordinate,
        instants: &[DateTime<Utc>],
    ) -> Result<TideLevelSeries, ProviderError> {
        let (Some(&first), Some(&last)) = (instants.iter().min(), instants.iter().max()) else {
            return Ok(TideLevelSeries::empty());
        };

        let query = [
            ("latitude", at.lat.to_string()),
            ("longitude", at.lon.to_string()),
            ("hourly", self.tide_variable.clone()),
            ("timezone", "GMT".to_string()),
            ("timeformat", "unixtime".to_string()),
            ("start_date", first.date_naive().to_string()),
            ("end_date", last.date_naive().to_string()),
        ];

        let what = format!("tide {at}");
        let body: MarineResponse =
            with_retry(self.retry, &what, || self.get_json(&self.marine_url, &query)).await?;
        let series = body.into_series(&self.tide_variable, first, last)?;
        debug!(%at, samples = series.len(), "tide levels fetched");
        Ok(series)
    }
}

fn padded_dates(start: DateTime<Utc>, end: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    (
        (start - Duration::days(1)).date_naive(),
        (end + Duration::days(1)).date_naive(),
    )
}

fn instant(unix: i64) -> Result<DateTime<Utc>, ProviderError> {
    Utc.timestamp_opt(unix, 0)
        .single()
        .ok_or_else(|| ProviderError::Payload(format!("timestamp {unix} out of range")))
}

/// Forecast API response, restricted to the fields we read.
#[derive(Debug, Deserialize)]
struct WindResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    #[serde(default)]
    hourly: Option<WindHourly>,
}

#[derive(Debug, Deserialize)]
struct WindHourly {
    #[serde(default)]
    time: Vec<i64>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_gusts_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
}

impl WindResponse {
    fn into_records(
        self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<WindRecord>, ProviderError> {
        let Some(hourly) = self.hourly else {
            return Ok(Vec::new());
        };
        let offset = FixedOffset::east_opt(self.utc_offset_seconds).ok_or_else(|| {
            ProviderError::Payload(format!("bad utc offset {}", self.utc_offset_seconds))
        })?;

        // Short value arrays read as null for the missing tail
        let value = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();

        let mut records = Vec::with_capacity(hourly.time.len());
        for (i, &unix) in hourly.time.iter().enumerate() {
            let time = instant(unix)?.with_timezone(&offset);
            if time < start || time >= end {
                continue;
            }
            records.push(WindRecord {
                time,
                mean_kn: value(&hourly.wind_speed_10m, i),
                gust_kn: value(&hourly.wind_gusts_10m, i),
                direction_deg: value(&hourly.wind_direction_10m, i),
            });
        }
        records.sort_by_key(|r| r.time);
        records.dedup_by_key(|r| r.time);
        Ok(records)
    }
}

/// Marine API response. The level variable name is configurable, so the
/// hourly block is read as a map of columns.
#[derive(Debug, Deserialize)]
struct MarineResponse {
    #[serde(default)]
    hourly: Option<MarineHourly>,
}

#[derive(Debug, Deserialize)]
struct MarineHourly {
    #[serde(default)]
    time: Vec<i64>,
    #[serde(flatten)]
    columns: HashMap<String, Vec<Option<f64>>>,
}

impl MarineResponse {
    fn into_series(
        self,
        variable: &str,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
    ) -> Result<TideLevelSeries, ProviderError> {
        let Some(hourly) = self.hourly else {
            return Ok(TideLevelSeries::empty());
        };
        let Some(levels) = hourly.columns.get(variable) else {
            return Ok(TideLevelSeries::empty());
        };

        let mut pairs = Vec::new();
        for (i, &unix) in hourly.time.iter().enumerate() {
            let t = instant(unix)?;
            if t < first || t > last {
                continue;
            }
            if let Some(level) = levels.get(i).copied().flatten() {
                pairs.push((t, level));
            }
        }
        Ok(TideLevelSeries::from_pairs(pairs))
    }
}
