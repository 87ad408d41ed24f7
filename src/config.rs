//! Service configuration from the environment

use crate::runtime::RuntimeSettings;
use crate::state_machine::state::DEFAULT_ESCALATION_THRESHOLD;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REPLY_DELAY_MS: u64 = 1000;
const DEFAULT_EFFECT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub reply_delay: Duration,
    pub effect_timeout: Duration,
    pub escalation_threshold: u32,
    /// Quiet period after which a session is shut down
    pub idle_timeout: Duration,
    /// JSON tracking dataset; the demo records are used when unset
    pub tracking_db: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            reply_delay: Duration::from_millis(DEFAULT_REPLY_DELAY_MS),
            effect_timeout: Duration::from_millis(DEFAULT_EFFECT_TIMEOUT_MS),
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            tracking_db: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: parse_or(&get, "PARCEL_DESK_PORT", defaults.port),
            reply_delay: Duration::from_millis(parse_or(
                &get,
                "PARCEL_DESK_REPLY_DELAY_MS",
                DEFAULT_REPLY_DELAY_MS,
            )),
            effect_timeout: Duration::from_millis(parse_or(
                &get,
                "PARCEL_DESK_EFFECT_TIMEOUT_MS",
                DEFAULT_EFFECT_TIMEOUT_MS,
            )),
            escalation_threshold: parse_or(
                &get,
                "PARCEL_DESK_ESCALATION_THRESHOLD",
                defaults.escalation_threshold,
            ),
            idle_timeout: Duration::from_secs(parse_or(
                &get,
                "PARCEL_DESK_SESSION_IDLE_SECS",
                DEFAULT_SESSION_IDLE_SECS,
            )),
            tracking_db: get("PARCEL_DESK_TRACKING_DB")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            reply_delay: self.reply_delay,
            effect_timeout: self.effect_timeout,
            escalation_threshold: self.escalation_threshold,
            idle_timeout: self.idle_timeout,
        }
    }
}

fn parse_or<T: FromStr + Copy>(get: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match get(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = key, value = %raw, "Ignoring invalid setting");
            default
        }),
        None => default,
    }
}
