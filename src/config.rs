//! Runtime settings from `TIMETABLE_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::fetch::cache::DEFAULT_TTL;
use crate::fetch::{DiskCache, RetryPolicy};
use crate::reshape::ServicePeriod;

pub const DEFAULT_CACHE_ROOT: &str = "data/cache";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; timetable_gtfs/0.1; +https://gtfs.org)";

#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_root: PathBuf,
    pub cache_ttl: Duration,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub coord_map: Option<PathBuf>,
    pub stop_fixes: Option<PathBuf>,
    pub period: ServicePeriod,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            cache_ttl: DEFAULT_TTL,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: 2,
            retry_delay: Duration::from_secs(5),
            coord_map: None,
            stop_fixes: None,
            period: ServicePeriod::default(),
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .map(|value| value.trim().parse::<T>().with_context(|| format!("invalid {name}: {value:?}")))
        .transpose()
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any variable source; unset or empty variables
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut settings = Self::default();

        if let Some(root) = lookup("TIMETABLE_CACHE_ROOT") {
            settings.cache_root = PathBuf::from(root);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TIMETABLE_CACHE_TTL_SECS")? {
            settings.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(agent) = lookup("TIMETABLE_USER_AGENT") {
            settings.user_agent = agent;
        }
        if let Some(retries) = parse_var::<u32>(&lookup, "TIMETABLE_MAX_RETRIES")? {
            settings.max_retries = retries;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TIMETABLE_RETRY_DELAY_SECS")? {
            settings.retry_delay = Duration::from_secs(secs);
        }
        settings.coord_map = lookup("TIMETABLE_COORD_MAP").map(PathBuf::from);
        settings.stop_fixes = lookup("TIMETABLE_STOP_FIXES").map(PathBuf::from);

        let start = lookup("TIMETABLE_CALENDAR_START").unwrap_or_else(|| settings.period.start_code());
        let end = lookup("TIMETABLE_CALENDAR_END").unwrap_or_else(|| settings.period.end_code());
        settings.period = ServicePeriod::parse(start.trim(), end.trim())
            .with_context(|| format!("invalid calendar range {start:?}..{end:?}"))?;

        Ok(settings)
    }

    pub fn cache(&self) -> DiskCache {
        DiskCache::new(&self.cache_root).with_ttl(self.cache_ttl)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }
}
