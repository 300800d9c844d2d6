use std::{env, path::PathBuf, time::Duration};

use log::*;

const DEFAULT_API_BASE: &str = "http://localhost:8000";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3_000);
const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 6;

#[derive(Clone, Debug)]
pub struct StorefrontConfig {
    /// Base URL of the merchant Order API, e.g. `https://api.almastore.co`
    pub api_base: String,
    /// Where the client-side key-value store lives. `None` means the default, `~/.storefront`.
    pub state_dir: Option<PathBuf>,
    pub polling: PollSettings,
}

/// How the confirmation page waits for a payment that is still settling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between one status request settling and the next one being sent.
    pub interval: Duration,
    /// Total number of status requests before giving up.
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self { interval: DEFAULT_POLL_INTERVAL, max_attempts: DEFAULT_POLL_MAX_ATTEMPTS }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self { api_base: DEFAULT_API_BASE.to_string(), state_dir: None, polling: PollSettings::default() }
    }
}

impl StorefrontConfig {
    pub fn from_env_or_default() -> Self {
        let api_base = env::var("SF_API_BASE").ok().unwrap_or_else(|| {
            warn!("🪛️ SF_API_BASE not set, using {DEFAULT_API_BASE}");
            DEFAULT_API_BASE.into()
        });
        let state_dir = env::var("SF_STATE_DIR").ok().map(PathBuf::from);
        let interval = env::var("SF_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid value for SF_POLL_INTERVAL_MS. {e} Using the default instead.")
                    })
                    .ok()
            })
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let max_attempts = env::var("SF_POLL_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid value for SF_POLL_MAX_ATTEMPTS. {e} Using the default instead.")
                    })
                    .ok()
            })
            .unwrap_or(DEFAULT_POLL_MAX_ATTEMPTS);
        Self { api_base, state_dir, polling: PollSettings { interval, max_attempts } }
    }
}
