//! Environment-driven configuration

use crate::oracle::{DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No API key configured. Set GEMINI_API_KEY (or API_KEY).")]
    MissingApiKey,
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Settings for the honey-pot console
#[derive(Debug, Clone, PartialEq)]
pub struct HoneypotConfig {
    pub api_key: String,
    pub model: String,
    /// Replaces the public Gemini host, e.g. a local proxy
    pub gateway: Option<String>,
    /// Per-call ceiling for oracle requests
    pub request_timeout: Duration,
    /// Sampling temperature for persona replies
    pub temperature: f32,
    pub log_path: PathBuf,
}

impl HoneypotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY")
            .or_else(|| get("API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let request_timeout = match get("HONEYPOT_REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "HONEYPOT_REQUEST_TIMEOUT_SECS",
                        value: raw,
                        reason: "expected a positive number of seconds",
                    })
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        let temperature = match get("HONEYPOT_TEMPERATURE") {
            Some(raw) => match raw.trim().parse::<f32>() {
                Ok(t) if (0.0..=2.0).contains(&t) => t,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "HONEYPOT_TEMPERATURE",
                        value: raw,
                        reason: "expected a number between 0 and 2",
                    })
                }
            },
            None => DEFAULT_TEMPERATURE,
        };

        let log_path = get("HONEYPOT_LOG_PATH").map_or_else(
            || {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.honeypot/honeypot.log"))
            },
            PathBuf::from,
        );

        Ok(Self {
            api_key,
            model: get("HONEYPOT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gateway: get("LLM_GATEWAY"),
            request_timeout,
            temperature,
            log_path,
        })
    }
}
