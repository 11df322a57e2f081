use std::num::NonZeroU32;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::rate_limit::FailurePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}' (expected 'postgres' or 'memory')")),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    /// Insights generations allowed per user per trailing 24 hours.
    pub insights_daily_quota: NonZeroU32,
    pub rate_limit_failure_policy: FailurePolicy,
    pub transaction_max_attempts: u32,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Postgres,
            database_url: None,
            port: 8080,
            rust_log: "info".to_string(),
            insights_daily_quota: NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN),
            rate_limit_failure_policy: FailurePolicy::Closed,
            transaction_max_attempts: 32,
            request_timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let store_backend = match lookup("STORE_BACKEND") {
            Some(v) => v.parse::<StoreBackend>().map_err(|e| anyhow!(e))?,
            None => defaults.store_backend,
        };
        let database_url = lookup("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow!(
                "Required environment variable 'DATABASE_URL' is not set (STORE_BACKEND=postgres)"
            ));
        }

        Ok(Config {
            store_backend,
            database_url,
            port: parse_or(&lookup, "PORT", defaults.port)?,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
            insights_daily_quota: parse_or(&lookup, "INSIGHTS_DAILY_QUOTA", defaults.insights_daily_quota)?,
            rate_limit_failure_policy: match lookup("RATE_LIMIT_STORE_FAILURE") {
                Some(v) => v.parse().map_err(|e: String| anyhow!(e))?,
                None => defaults.rate_limit_failure_policy,
            },
            transaction_max_attempts: parse_or(
                &lookup,
                "TRANSACTION_MAX_ATTEMPTS",
                defaults.transaction_max_attempts,
            )?,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
