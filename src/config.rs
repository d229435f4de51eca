use std::{env, time::Duration};

use thiserror::Error;

use crate::enquiry::{DeliveryPolicy, DispatchMode};

/// AppConfig
///
/// Holds the service's entire configuration state. It is immutable once loaded and is pulled
/// into handlers via `FromRef`, the same way the enquiry submitter and the auth extractors see it.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Base URL of the first-party API. `/api/ContactFormSubmissions` is appended by the sink.
    pub api_base_url: String,
    // Fixed endpoint of the third-party form relay.
    pub relay_url: String,
    // Recipients copied on every relayed enquiry (`_cc`).
    pub relay_cc: Vec<String>,
    // Callback the relay notifies once it has forwarded a lead (`_webhook`).
    pub relay_webhook: String,
    // Runtime environment marker. Controls the local header bypass and log format.
    pub env: Env,
    // Secret used to validate bearer tokens issued by the site's auth provider.
    pub jwt_secret: String,
    // Whether the two sinks are awaited one after the other or together.
    pub dispatch_mode: DispatchMode,
    // How the two sink outcomes combine into the user-visible result.
    pub delivery_policy: DeliveryPolicy,
    // Upper bound on a single sink request.
    pub sink_timeout: Duration,
}

/// Env
///
/// Switches between development conveniences (header bypass, pretty logs, local sink URLs)
/// and production behaviour (mandatory secrets, JSON logs).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_SINK_TIMEOUT_SECS: u64 = 15;

impl Default for AppConfig {
    /// Safe values for test state scaffolding. Nothing here reaches a real endpoint.
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            api_base_url: "http://localhost:5000".to_string(),
            relay_url: "http://localhost:4010/relay".to_string(),
            relay_cc: vec!["sales@localhost".to_string()],
            relay_webhook: "http://localhost:5000/api/webhooks/relay".to_string(),
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            dispatch_mode: DispatchMode::Sequential,
            delivery_policy: DeliveryPolicy::RelayRequired,
            sink_timeout: Duration::from_secs(DEFAULT_SINK_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. In `Production` every endpoint and
    /// the JWT secret must be set explicitly; a missing one is reported as `ConfigError::Missing`
    /// so the binary can refuse to start.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };
        let defaults = Self::default();

        let dispatch_mode = match env::var("DISPATCH_MODE") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "DISPATCH_MODE",
                value,
            })?,
            Err(_) => defaults.dispatch_mode,
        };

        let delivery_policy = match env::var("DELIVERY_POLICY") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "DELIVERY_POLICY",
                value,
            })?,
            Err(_) => defaults.delivery_policy,
        };

        let sink_timeout = match env::var("SINK_TIMEOUT_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    key: "SINK_TIMEOUT_SECS",
                    value,
                })?,
            Err(_) => defaults.sink_timeout,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);

        match env {
            Env::Local => Ok(Self {
                env: Env::Local,
                bind_addr,
                api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
                relay_url: env::var("RELAY_URL").unwrap_or(defaults.relay_url),
                relay_cc: env::var("RELAY_CC")
                    .map(|raw| split_recipients(&raw))
                    .unwrap_or(defaults.relay_cc),
                relay_webhook: env::var("RELAY_WEBHOOK").unwrap_or(defaults.relay_webhook),
                jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
                dispatch_mode,
                delivery_policy,
                sink_timeout,
            }),
            Env::Production => Ok(Self {
                env: Env::Production,
                bind_addr,
                api_base_url: required("API_BASE_URL")?,
                relay_url: required("RELAY_URL")?,
                relay_cc: split_recipients(&required("RELAY_CC")?),
                relay_webhook: required("RELAY_WEBHOOK")?,
                jwt_secret: required("JWT_SECRET")?,
                dispatch_mode,
                delivery_policy,
                sink_timeout,
            }),
        }
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn split_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}
