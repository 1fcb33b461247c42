//! Server configuration
//!
//! Both binaries are configured entirely through environment variables, which may also be supplied in a `.env` file.
//! Invalid values are logged and replaced with their defaults, so a misconfigured variable never stops the server from
//! starting. Run either binary with any command-line argument to see the current values.
use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use loyalty_engine::reconciler::EngineConfig;

const DEFAULT_LOYALTY_HOST: &str = "127.0.0.1";
const DEFAULT_LOYALTY_PORT: u16 = 8080;
const DEFAULT_LOYALTY_DATABASE_URL: &str = "sqlite://loyalty.db";
const DEFAULT_ACCRUAL_URL: &str = "http://127.0.0.1:8081";
const DEFAULT_ACCRUAL_TIMEOUT: Duration = Duration::from_millis(5000);

const DEFAULT_ACCRUAL_HOST: &str = "127.0.0.1";
const DEFAULT_ACCRUAL_PORT: u16 = 8081;
const DEFAULT_ACCRUAL_DATABASE_URL: &str = "sqlite://accrual.db";

const DEFAULT_WORKER_PERIOD: Duration = Duration::from_millis(3000);
const DEFAULT_WORKER_COOLDOWN: Duration = Duration::from_millis(10_000);
const DEFAULT_WORKER_PACK_LIMIT: i64 = 25;

/// Timing and sizing for one reconciliation engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub period: Duration,
    pub cooldown: Duration,
    pub pack_limit: i64,
    pub pool_size: usize,
}

impl EngineSettings {
    fn defaults(pool_size: usize) -> Self {
        Self {
            period: DEFAULT_WORKER_PERIOD,
            cooldown: DEFAULT_WORKER_COOLDOWN,
            pack_limit: DEFAULT_WORKER_PACK_LIMIT,
            pool_size,
        }
    }

    /// Reads `{prefix}_WORKER_*` variables. The cooldown is only read when `with_cooldown` is set, since only the mart
    /// is ever rate limited.
    fn from_env_or_default(prefix: &str, default_pool_size: usize, with_cooldown: bool) -> Self {
        let defaults = Self::defaults(default_pool_size);
        let period = Duration::from_millis(env_or_default(
            &format!("{prefix}_WORKER_PERIOD_MS"),
            millis(defaults.period),
        ));
        let cooldown = if with_cooldown {
            Duration::from_millis(env_or_default(&format!("{prefix}_WORKER_COOLDOWN_MS"), millis(defaults.cooldown)))
        } else {
            defaults.cooldown
        };
        let pack_limit = env_or_default(&format!("{prefix}_WORKER_PACK_LIMIT"), defaults.pack_limit);
        let pack_limit = if pack_limit < 1 {
            warn!("🪛️ {prefix}_WORKER_PACK_LIMIT must be at least 1. Using {DEFAULT_WORKER_PACK_LIMIT} instead.");
            DEFAULT_WORKER_PACK_LIMIT
        } else {
            pack_limit
        };
        let pool_size = env_or_default(&format!("{prefix}_WORKER_POOL_SIZE"), defaults.pool_size);
        let pool_size = if pool_size == 0 {
            warn!("🪛️ {prefix}_WORKER_POOL_SIZE must be at least 1. Using {default_pool_size} instead.");
            default_pool_size
        } else {
            pool_size
        };
        Self { period, cooldown, pack_limit, pool_size }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            period: self.period,
            cooldown: self.cooldown,
            pack_limit: self.pack_limit,
            pool_size: self.pool_size,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MartConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Base URL of the accrual service, e.g. `http://127.0.0.1:8081`.
    pub accrual_url: String,
    /// Per-request timeout for calls to the accrual service.
    pub accrual_timeout: Duration,
    pub engine: EngineSettings,
}

impl Default for MartConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LOYALTY_HOST.to_string(),
            port: DEFAULT_LOYALTY_PORT,
            database_url: DEFAULT_LOYALTY_DATABASE_URL.to_string(),
            accrual_url: DEFAULT_ACCRUAL_URL.to_string(),
            accrual_timeout: DEFAULT_ACCRUAL_TIMEOUT,
            engine: EngineSettings::defaults(3),
        }
    }
}

impl MartConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LOYALTY_HOST").ok().unwrap_or_else(|| DEFAULT_LOYALTY_HOST.into());
        let port = env_or_default("LOYALTY_PORT", DEFAULT_LOYALTY_PORT);
        let database_url = env::var("LOYALTY_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ LOYALTY_DATABASE_URL is not set. Using {DEFAULT_LOYALTY_DATABASE_URL}.");
            DEFAULT_LOYALTY_DATABASE_URL.into()
        });
        let accrual_url = env::var("LOYALTY_ACCRUAL_URL").ok().unwrap_or_else(|| {
            info!("🪛️ LOYALTY_ACCRUAL_URL is not set. Using {DEFAULT_ACCRUAL_URL}.");
            DEFAULT_ACCRUAL_URL.into()
        });
        let accrual_timeout =
            Duration::from_millis(env_or_default("LOYALTY_ACCRUAL_TIMEOUT_MS", millis(DEFAULT_ACCRUAL_TIMEOUT)));
        let engine = EngineSettings::from_env_or_default("LOYALTY", 3, true);
        Self { host, port, database_url, accrual_url, accrual_timeout, engine }
    }
}

#[derive(Clone, Debug)]
pub struct AccrualServiceConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Maximum number of reward queries accepted per minute. Zero means no limit.
    pub max_requests_per_minute: u32,
    pub engine: EngineSettings,
}

impl Default for AccrualServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_ACCRUAL_HOST.to_string(),
            port: DEFAULT_ACCRUAL_PORT,
            database_url: DEFAULT_ACCRUAL_DATABASE_URL.to_string(),
            max_requests_per_minute: 0,
            engine: EngineSettings::defaults(1),
        }
    }
}

impl AccrualServiceConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("ACCRUAL_HOST").ok().unwrap_or_else(|| DEFAULT_ACCRUAL_HOST.into());
        let port = env_or_default("ACCRUAL_PORT", DEFAULT_ACCRUAL_PORT);
        let database_url = env::var("ACCRUAL_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ ACCRUAL_DATABASE_URL is not set. Using {DEFAULT_ACCRUAL_DATABASE_URL}.");
            DEFAULT_ACCRUAL_DATABASE_URL.into()
        });
        let max_requests_per_minute = env_or_default("ACCRUAL_MAX_REQUESTS_PER_MINUTE", 0);
        let engine = EngineSettings::from_env_or_default("ACCRUAL", 1, false);
        Self { host, port, database_url, max_requests_per_minute, engine }
    }
}

fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    env::var(name)
        .map(|s| {
            s.trim().parse::<T>().unwrap_or_else(|e| {
                error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
                default
            })
        })
        .ok()
        .unwrap_or(default)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
