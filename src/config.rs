//! Process configuration, read from the environment once at startup.

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmStrategy {
    /// ConfirmSubscription through the SNS API.
    #[default]
    Api,
    /// Plain GET of the SubscribeURL.
    SubscribeUrl,
}

impl FromStr for ConfirmStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "api" => Ok(ConfirmStrategy::Api),
            "subscribe-url" => Ok(ConfirmStrategy::SubscribeUrl),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen_addr: String,
    pub port: u16,
    pub topic_arn: String,
    /// Overrides the host resolved from the SNS regional endpoint.
    pub cert_host: Option<String>,
    pub confirm_strategy: ConfirmStrategy,
    pub fetch_timeout: Duration,
    /// Zero disables the signing key cache.
    pub cert_cache_ttl: Duration,
    pub log_format: LogFormat,
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}
fn default_fetch_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port_raw = get("PORT").ok_or(ConfigError::Missing("PORT"))?;
        let port = parse_var("PORT", &port_raw)?;

        let topic_arn = get("CG_PLATFORM_NOTIFICATION_TOPIC_ARN")
            .ok_or(ConfigError::Missing("CG_PLATFORM_NOTIFICATION_TOPIC_ARN"))?;

        let confirm_strategy = match get("SNS_CONFIRM_STRATEGY") {
            Some(v) => parse_var("SNS_CONFIRM_STRATEGY", &v)?,
            None => ConfirmStrategy::default(),
        };
        let fetch_timeout = match get("SNS_CERT_FETCH_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_var("SNS_CERT_FETCH_TIMEOUT_SECS", &v)?),
            None => default_fetch_timeout(),
        };
        let cert_cache_ttl = match get("SNS_CERT_CACHE_TTL_SECS") {
            Some(v) => Duration::from_secs(parse_var("SNS_CERT_CACHE_TTL_SECS", &v)?),
            None => Duration::ZERO,
        };
        let log_format = match get("LOG_FORMAT") {
            Some(v) => parse_var("LOG_FORMAT", &v)?,
            None => LogFormat::default(),
        };

        Ok(Self {
            listen_addr: get("LISTEN_ADDR").unwrap_or_else(default_listen_addr),
            port,
            topic_arn,
            cert_host: get("SNS_CERT_HOST"),
            confirm_strategy,
            fetch_timeout,
            cert_cache_ttl,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.port)
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
