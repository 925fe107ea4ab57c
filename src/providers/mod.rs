//! # Forecast Providers
//!
//! The core never talks HTTP directly. It consumes two provider traits:
//!
//! - [`WindProvider`]: hourly wind for a coordinate over a time window
//! - [`TideProvider`]: water levels for a coordinate at a set of instants
//!
//! [`open_meteo::OpenMeteo`] implements both against the public Open-Meteo
//! APIs. Tests substitute deterministic fakes.
//!
//! ## Error Handling
//!
//! Providers report failures through [`ProviderError`], but the pipeline never
//! propagates them: a failed wind fetch is an empty series and a failed tide
//! probe is an empty level series. Retrying is the provider's job; see
//! [`with_retry`].

use crate::{Coordinate, TideLevelSeries, WindRecord};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub mod open_meteo;

/// Errors that can occur while fetching upstream data.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request failed (network, timeout, status or body decoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response decoded but does not have the expected shape
    #[error("malformed payload: {0}")]
    Payload(String),
}

/// Source of hourly wind forecasts.
#[async_trait]
pub trait WindProvider: Send + Sync {
    /// Hourly records for `at` with hour starts in `[start, end)`, ordered
    /// by time. An empty vector means the provider had nothing.
    async fn fetch_hourly(
        &self,
        at: Coordinate,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<WindRecord>, ProviderError>;
}

/// Source of water levels.
#[async_trait]
pub trait TideProvider: Send + Sync {
    /// Level samples at or around `instants`. Instants the provider cannot
    /// resolve are simply absent from the returned series.
    async fn fetch_levels(
        &self,
        at: Coordinate,
        instants: &[DateTime<Utc>],
    ) -> Result<TideLevelSeries, ProviderError>;
}

/// Bounded retry with a fixed pause between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub retries: u32,
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            pause: Duration::from_secs(2),
        }
    }
}

/// Run `op` until it succeeds or the retry budget is spent.
///
/// The last error is returned when every attempt fails.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                debug!(%what, attempt, error = %e, "retrying after failure");
                tokio::time::sleep(policy.pause).await;
            }
            Err(e) => {
                warn!(%what, attempts = attempt + 1, error = %e, "giving up");
                return Err(e);
            }
        }
    }
}
