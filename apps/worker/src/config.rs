use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use chrono_tz::Tz;
use tallybook_core::constants::DEFAULT_SWEEP_CONCURRENCY;
use tracing::warn;

const DEFAULT_DB_PATH: &str = "./db/tallybook.db";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
const DEFAULT_TIMEZONE: &str = "UTC";

pub struct Config {
    pub db_path: String,
    pub sweep_interval: Duration,
    pub sweep_concurrency: usize,
    /// Zone whose calendar date is "today" for each sweep.
    pub timezone: Tz,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let db_path = lookup("TALLYBOOK_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.into());

        let interval_secs = positive_or(
            "TALLYBOOK_SWEEP_INTERVAL_SECS",
            lookup("TALLYBOOK_SWEEP_INTERVAL_SECS"),
            DEFAULT_SWEEP_INTERVAL_SECS,
        );
        let sweep_concurrency = positive_or(
            "TALLYBOOK_SWEEP_CONCURRENCY",
            lookup("TALLYBOOK_SWEEP_CONCURRENCY"),
            DEFAULT_SWEEP_CONCURRENCY,
        );

        let timezone_name =
            lookup("TALLYBOOK_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.into());
        let timezone = Tz::from_str(timezone_name.trim())
            .map_err(|e| anyhow!("Invalid TALLYBOOK_TIMEZONE '{}': {}", timezone_name, e))?;

        Ok(Self {
            db_path,
            sweep_interval: Duration::from_secs(interval_secs),
            sweep_concurrency,
            timezone,
        })
    }
}

/// Parses a strictly positive number, falling back to `default` with a
/// warning when the value is missing, malformed or zero.
fn positive_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy + std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => value,
        _ => {
            warn!("Ignoring {}='{}', using {}", key, raw, default);
            default
        }
    }
}
