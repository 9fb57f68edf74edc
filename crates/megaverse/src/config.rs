//! Configuration loading and resolution.
//!
//! Values resolve once at startup: explicit override > environment > default.
//! The result is immutable and handed to the fetcher and dispatcher.

use std::time::Duration;

use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES};
use crate::types::{MegaverseError, MegaverseResult};

pub const GOAL_URL_ENV: &str = "GOAL_URL";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const CANDIDATE_ID_ENV: &str = "CANDIDATE_ID";
pub const MAX_RETRIES_ENV: &str = "MEGAVERSE_MAX_RETRIES";
pub const BASE_DELAY_MS_ENV: &str = "MEGAVERSE_BASE_DELAY_MS";

/// Everything a run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MegaverseConfig {
    pub goal_url: String,
    /// Action endpoints live under this URL. Stored without a trailing `/`.
    pub base_url: String,
    pub candidate_id: String,
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
}

/// Values given explicitly, e.g. on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub goal_url: Option<String>,
    pub base_url: Option<String>,
    pub candidate_id: Option<String>,
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl MegaverseConfig {
    /// Resolve from the process environment.
    pub fn from_env(overrides: ConfigOverrides) -> MegaverseResult<Self> {
        Self::resolve(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve using `lookup` in place of the environment.
    pub fn resolve<F>(overrides: ConfigOverrides, lookup: F) -> MegaverseResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |explicit: Option<String>, name: &str| {
            explicit
                .or_else(|| read(name))
                .ok_or_else(|| MegaverseError::Config(format!("{name} is not set")))
        };

        let goal_url = required(overrides.goal_url, GOAL_URL_ENV)?;
        let base_url = required(overrides.base_url, BASE_URL_ENV)?;
        let candidate_id = required(overrides.candidate_id, CANDIDATE_ID_ENV)?;

        let max_retries = match overrides.max_retries {
            Some(n) => n,
            None => parse_or(read(MAX_RETRIES_ENV), MAX_RETRIES_ENV, DEFAULT_MAX_RETRIES)?,
        };
        let base_delay = match overrides.base_delay_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_millis(parse_or(
                read(BASE_DELAY_MS_ENV),
                BASE_DELAY_MS_ENV,
                DEFAULT_BASE_DELAY.as_millis() as u64,
            )?),
        };

        Ok(Self {
            goal_url,
            base_url: base_url.trim_end_matches('/').to_string(),
            candidate_id,
            retry: RetryPolicy {
                max_retries,
                base_delay,
            },
            timeout: overrides.timeout_ms.map(Duration::from_millis),
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, name: &str, default: T) -> MegaverseResult<T> {
    match raw {
        Some(v) => v
            .parse::<T>()
            .map_err(|_| MegaverseError::Config(format!("{name} has invalid value {v:?}"))),
        None => Ok(default),
    }
}
