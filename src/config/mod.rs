//! Client configuration.
//!
//! Everything the client needs is carried in an explicit [`ClientConfig`]:
//! where the service lives, the API token, and how patiently to poll. It is
//! built from defaults, then the environment, then whatever the caller
//! overrides, and handed to the HTTP client and the orchestrator.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::consts::{
    BASE_URL_ENV_VAR, DEFAULT_BASE_URL, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_STDOUT_RETRIES, TOKEN_ENV_VAR,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API token: set {0} or pass --token")]
    MissingToken(&'static str),

    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid poll policy: {0}")]
    InvalidPolicy(&'static str),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// How the delay between two status checks evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every check.
    Fixed,
    /// Delay multiplied by `factor` after each check, never above `max_interval`.
    Exponential { factor: u32, max_interval: Duration },
}

/// Bounds on waiting for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Extra output fetches allowed while a completed task's stdout is empty.
    pub stdout_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            backoff: Backoff::Fixed,
            stdout_retries: DEFAULT_STDOUT_RETRIES,
        }
    }
}

impl PollPolicy {
    /// Delay to wait before the zero-based `attempt`-th check.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential {
                factor,
                max_interval,
            } => {
                let mut delay = self.interval.min(max_interval);
                if factor <= 1 {
                    return delay;
                }
                for _ in 0..attempt {
                    delay = match delay.checked_mul(factor) {
                        Some(next) if next < max_interval => next,
                        _ => return max_interval,
                    };
                }
                delay
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidPolicy("max_attempts must be at least 1"));
        }
        if let Backoff::Exponential { factor, .. } = self.backoff
            && factor < 1
        {
            return Err(ConfigError::InvalidPolicy("backoff factor must be at least 1"));
        }
        Ok(())
    }
}

/// Connection settings for the analysis service.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: String,
    pub request_timeout: Duration,
    pub poll: PollPolicy,
}

impl ClientConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: api_token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll: PollPolicy::default(),
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(TOKEN_ENV_VAR)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken(TOKEN_ENV_VAR))?;
        let mut config = Self::new(token.trim());
        if let Some(url) = lookup(BASE_URL_ENV_VAR).filter(|u| !u.is_empty()) {
            config = config.with_base_url(url);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_token.trim().is_empty() {
            return Err(ConfigError::MissingToken(TOKEN_ENV_VAR));
        }
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }
        self.poll.validate()
    }
}

// The token never reaches logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("poll", &self.poll)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken(TOKEN_ENV_VAR)));
    }

    #[test]
    fn blank_token_is_an_error() {
        let err = ClientConfig::from_lookup(lookup_from(&[(TOKEN_ENV_VAR, "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken(_)));
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = ClientConfig::from_lookup(lookup_from(&[(TOKEN_ENV_VAR, "tok")])).unwrap();
        assert_eq!(config.api_token, "tok");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.poll, PollPolicy::default());
    }

    #[test]
    fn base_url_override_strips_trailing_slash() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (TOKEN_ENV_VAR, "tok"),
            (BASE_URL_ENV_VAR, "http://localhost:8080/"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn bad_base_url_rejected() {
        let err = ClientConfig::new("tok")
            .with_base_url("ftp://example.com")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
        assert!(ClientConfig::new("tok").with_base_url("not a url").validate().is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", ClientConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let policy = PollPolicy {
            interval: Duration::from_millis(250),
            ..PollPolicy::default()
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(50), Duration::from_millis(250));
    }

    #[test]
    fn exponential_backoff_grows_and_caps() {
        let policy = PollPolicy {
            interval: Duration::from_secs(1),
            backoff: Backoff::Exponential {
                factor: 2,
                max_interval: Duration::from_secs(10),
            },
            ..PollPolicy::default()
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn zero_attempts_rejected() {
        let policy = PollPolicy {
            max_attempts: 0,
            ..PollPolicy::default()
        };
        assert!(matches!(policy.validate(), Err(ConfigError::InvalidPolicy(_))));
    }

    #[test]
    fn zero_factor_rejected() {
        let policy = PollPolicy {
            backoff: Backoff::Exponential {
                factor: 0,
                max_interval: Duration::from_secs(1),
            },
            ..PollPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
