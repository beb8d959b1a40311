use log::{info, warn};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::MAX_CACHE_TTL;

const DEFAULT_DATABASE_URL: &str = "sqlite:paredao.db";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_CACHE_TIMEOUT_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub cache_backend: CacheBackend,
    /// How long a computed statistic stays in the cache.
    pub cache_ttl: Duration,
    /// Upper bound for a single cache round-trip.
    pub cache_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_ttl_secs = MAX_CACHE_TTL.as_secs();
        let ttl_secs = match parse_or(&lookup, "STATS_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS) {
            secs if (1..=max_ttl_secs).contains(&secs) => secs,
            secs => {
                warn!(
                    "STATS_CACHE_TTL_SECS must be between 1 and {}, got {}, using default: {}",
                    max_ttl_secs, secs, DEFAULT_CACHE_TTL_SECS
                );
                DEFAULT_CACHE_TTL_SECS
            }
        };

        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            cache_backend: parse_or(&lookup, "CACHE_BACKEND", CacheBackend::Redis),
            cache_ttl: Duration::from_secs(ttl_secs),
            cache_timeout: Duration::from_millis(parse_or(
                &lookup,
                "CACHE_TIMEOUT_MS",
                DEFAULT_CACHE_TIMEOUT_MS,
            )),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {} value '{}': {}, using default: {:?}", key, raw, e, default);
            default
        }),
        None => {
            info!("{} not set, using default: {:?}", key, default);
            default
        }
    }
}
