use std::env;
use std::time::Duration;

use thiserror::Error;

pub const REQUEST_TOPIC_VARIABLE: &str = "CORRELATE_REQUEST_TOPIC";
pub const RESPONSE_TOPIC_VARIABLE: &str = "CORRELATE_RESPONSE_TOPIC";
pub const REQUEST_TIMEOUT_VARIABLE: &str = "CORRELATE_REQUEST_TIMEOUT_MS";
pub const TIME_TO_LIVE_VARIABLE: &str = "CORRELATE_TIME_TO_LIVE_MS";
pub const SWEEP_INTERVAL_VARIABLE: &str = "CORRELATE_SWEEP_INTERVAL_MS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{variable} must be a whole number of milliseconds, got {value:?}")]
    InvalidMillis { variable: String, value: String },
    #[error("{variable} must not be zero")]
    Zero { variable: String },
    #[error("{variable} must not be empty")]
    Empty { variable: String },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BridgeConfig {
    request_topic: String,
    response_topic: String,
    request_timeout: Duration,
    time_to_live: Duration,
    sweep_interval: Duration,
}

impl BridgeConfig {
    pub fn new(request_topic: impl Into<String>,
               response_topic: impl Into<String>,
               request_timeout: Duration,
               time_to_live: Duration,
               sweep_interval: Duration) -> Self {
        return BridgeConfig {
            request_topic: request_topic.into(),
            response_topic: response_topic.into(),
            request_timeout,
            time_to_live,
            sweep_interval,
        };
    }

    /// Reads the configuration from the environment, falling back to [`BridgeConfig::default`]
    /// for every variable that is not set.
    ///
    /// - `CORRELATE_REQUEST_TOPIC`: topic requests are published to (default: payment-requests)
    /// - `CORRELATE_RESPONSE_TOPIC`: topic responses are consumed from (default: payment-responses)
    /// - `CORRELATE_REQUEST_TIMEOUT_MS`: how long a caller waits (default: 30000)
    /// - `CORRELATE_TIME_TO_LIVE_MS`: how long a registry entry may stay pending (default: 300000)
    /// - `CORRELATE_SWEEP_INTERVAL_MS`: how often the reaper runs (default: 60000)
    pub fn from_env() -> Result<Self, ConfigError> {
        return Self::from_lookup(|variable| env::var(variable).ok());
    }

    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
        where L: Fn(&str) -> Option<String> {
        let defaults = Self::default();
        return Ok(BridgeConfig {
            request_topic: topic(&lookup, REQUEST_TOPIC_VARIABLE, defaults.request_topic)?,
            response_topic: topic(&lookup, RESPONSE_TOPIC_VARIABLE, defaults.response_topic)?,
            request_timeout: millis(&lookup, REQUEST_TIMEOUT_VARIABLE, defaults.request_timeout)?,
            time_to_live: millis(&lookup, TIME_TO_LIVE_VARIABLE, defaults.time_to_live)?,
            sweep_interval: millis(&lookup, SWEEP_INTERVAL_VARIABLE, defaults.sweep_interval)?,
        });
    }

    pub fn get_request_topic(&self) -> &str {
        return &self.request_topic;
    }

    pub fn get_response_topic(&self) -> &str {
        return &self.response_topic;
    }

    pub fn get_request_timeout(&self) -> Duration {
        return self.request_timeout;
    }

    pub fn get_time_to_live(&self) -> Duration {
        return self.time_to_live;
    }

    pub fn get_sweep_interval(&self) -> Duration {
        return self.sweep_interval;
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        return Self::new(
            "payment-requests",
            "payment-responses",
            Duration::from_secs(30),
            Duration::from_secs(5 * 60),
            Duration::from_secs(60),
        );
    }
}

fn topic<L>(lookup: &L, variable: &str, default: String) -> Result<String, ConfigError>
    where L: Fn(&str) -> Option<String> {
    return match lookup(variable) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Err(ConfigError::Empty { variable: variable.to_string() }),
        Some(value) => Ok(value.trim().to_string()),
    };
}

fn millis<L>(lookup: &L, variable: &str, default: Duration) -> Result<Duration, ConfigError>
    where L: Fn(&str) -> Option<String> {
    let value = match lookup(variable) {
        None => return Ok(default),
        Some(value) => value,
    };
    let millis: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidMillis {
        variable: variable.to_string(),
        value: value.clone(),
    })?;
    if millis == 0 {
        return Err(ConfigError::Zero { variable: variable.to_string() });
    }
    return Ok(Duration::from_millis(millis));
}
