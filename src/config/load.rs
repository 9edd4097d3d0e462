//! Environment loading for [`Config`].
//!
//! Every key is optional except `MODE`; absent keys keep their defaults.
//! Malformed values fail with [`RunError::ConfigInvalid`] naming the key.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{Config, RunMode};
use crate::error::RunError;

impl Config {
    /// Loads and validates configuration from the process environment.
    pub fn from_env() -> Result<Self, RunError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads and validates configuration from any key lookup.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use jobvisor::{Config, RunMode};
    ///
    /// let env = HashMap::from([("MODE", "queue"), ("QUEUE_KEY", "jobs"), ("QUEUE_WAIT", "500ms")]);
    /// let cfg = Config::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
    /// assert_eq!(cfg.mode, RunMode::Queue);
    /// assert_eq!(cfg.queue_wait.as_millis(), 500);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RunError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut cfg = Config::default();

        cfg.mode = match get("MODE") {
            Some(v) => v
                .parse::<RunMode>()
                .map_err(|e| RunError::config("MODE", e))?,
            None => return Err(RunError::config("MODE", "required")),
        };

        set_parsed(&mut cfg.http_port, "HTTP_PORT", get("HTTP_PORT"))?;
        set_parsed(&mut cfg.max_concurrency, "MAX_CONCURRENCY", get("MAX_CONCURRENCY"))?;
        set_parsed(&mut cfg.retry_max, "RETRY_MAX", get("RETRY_MAX"))?;
        set_duration(&mut cfg.retry_backoff, "RETRY_BACKOFF", get("RETRY_BACKOFF"))?;
        set_duration(&mut cfg.retry_backoff_cap, "RETRY_BACKOFF_CAP", get("RETRY_BACKOFF_CAP"))?;
        set_parsed(&mut cfg.retry_jitter, "RETRY_JITTER", get("RETRY_JITTER"))?;
        set_duration(&mut cfg.queue_wait, "QUEUE_WAIT", get("QUEUE_WAIT"))?;
        set_parsed(&mut cfg.total_peers, "TOTAL_PODS", get("TOTAL_PODS"))?;
        set_parsed(&mut cfg.min_peers, "MIN_PEERS", get("MIN_PEERS"))?;
        set_duration(&mut cfg.peer_warmup, "PEER_WARMUP", get("PEER_WARMUP"))?;
        set_duration(&mut cfg.hold_for, "HOLD_FOR", get("HOLD_FOR"))?;
        set_parsed(&mut cfg.bus_capacity, "BUS_CAPACITY", get("BUS_CAPACITY"))?;

        if let Some(v) = get("ITEMS") {
            cfg.items = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        cfg.items_file = get("ITEMS_FILE").map(PathBuf::from);
        if let Some(v) = get("QUEUE_URL") {
            cfg.queue_url = v;
        }
        cfg.queue_key = get("QUEUE_KEY");
        if let Some(v) = get("INPUT_DIR") {
            cfg.input_dir = PathBuf::from(v);
        }
        if let Some(v) = get("OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(v);
        }

        let (index_key, index) = match get("JOB_INDEX") {
            Some(v) => ("JOB_INDEX", Some(v)),
            None => ("JOB_COMPLETION_INDEX", get("JOB_COMPLETION_INDEX")),
        };
        cfg.job_index = index.map(|v| parse_value(index_key, &v)).transpose()?;

        cfg.subdomain = get("SUBDOMAIN");
        cfg.self_address = get("SELF_ADDRESS");
        cfg.hostname = get("HOSTNAME");

        cfg.validate()?;
        Ok(cfg)
    }
}

/// Parses a duration: `250ms`, `3s`, `2m`, `1h`, or bare seconds.
///
/// ```
/// use std::time::Duration;
/// use jobvisor::parse_duration;
///
/// assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
/// assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
/// assert_eq!(parse_duration("7"), Ok(Duration::from_secs(7)));
/// assert!(parse_duration("soon").is_err());
/// ```
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let s = raw.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num, unit) = s.split_at(split);
    let n: u64 = num
        .parse()
        .map_err(|_| format!("invalid duration `{raw}`"))?;

    match unit.trim() {
        "" | "s" => Ok(Duration::from_secs(n)),
        "ms" => Ok(Duration::from_millis(n)),
        "m" => Ok(Duration::from_secs(n.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(n.saturating_mul(3600))),
        other => Err(format!("unknown duration unit `{other}` in `{raw}`")),
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, RunError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| RunError::config(key, format!("`{raw}`: {e}")))
}

fn set_parsed<T>(slot: &mut T, key: &'static str, raw: Option<String>) -> Result<(), RunError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = raw {
        *slot = parse_value(key, &raw)?;
    }
    Ok(())
}

fn set_duration(
    slot: &mut Duration,
    key: &'static str,
    raw: Option<String>,
) -> Result<(), RunError> {
    if let Some(raw) = raw {
        *slot = parse_duration(&raw).map_err(|e| RunError::config(key, e))?;
    }
    Ok(())
}
