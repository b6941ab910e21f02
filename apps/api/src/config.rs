use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::sync::admission::MAX_PAYLOAD_BYTES;

pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(3000);
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileBackend {
    /// CV kept in the identity provider's per-user private metadata.
    Identity,
    /// Process-local; development only.
    Memory,
}

impl std::str::FromStr for ProfileBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "identity" => Ok(Self::Identity),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown PROFILE_BACKEND '{other}' (expected identity or memory)"),
        }
    }
}

/// Server configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub profile_backend: ProfileBackend,
    pub identity_api_url: String,
    pub identity_secret_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let profile_backend: ProfileBackend = std::env::var("PROFILE_BACKEND")
            .unwrap_or_else(|_| "identity".to_string())
            .parse()?;

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            profile_backend,
            identity_api_url: std::env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| "https://api.clerk.com".to_string()),
            identity_secret_key: require_env("IDENTITY_SECRET_KEY")?,
        })
    }
}

/// Timing and admission limits for the autosave controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub debounce: Duration,
    pub refresh_interval: Duration,
    pub max_payload_bytes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: AUTOSAVE_DELAY,
            refresh_interval: REFRESH_INTERVAL,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
        }
    }
}

impl SyncConfig {
    /// Defaults, overridden by `CV_AUTOSAVE_DELAY_MS`, `CV_REFRESH_INTERVAL_MS`
    /// and `CV_MAX_PAYLOAD_BYTES` when set.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            debounce: env_millis("CV_AUTOSAVE_DELAY_MS")?.unwrap_or(defaults.debounce),
            refresh_interval: env_millis("CV_REFRESH_INTERVAL_MS")?
                .unwrap_or(defaults.refresh_interval),
            max_payload_bytes: match std::env::var("CV_MAX_PAYLOAD_BYTES") {
                Ok(v) => v
                    .parse()
                    .context("CV_MAX_PAYLOAD_BYTES must be a byte count")?,
                Err(_) => defaults.max_payload_bytes,
            },
        })
    }
}

fn env_millis(key: &str) -> Result<Option<Duration>> {
    match std::env::var(key) {
        Ok(v) => {
            let ms: u64 = v
                .parse()
                .with_context(|| format!("{key} must be a number of milliseconds"))?;
            if ms == 0 {
                bail!("{key} must be greater than zero");
            }
            Ok(Some(Duration::from_millis(ms)))
        }
        Err(_) => Ok(None),
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
