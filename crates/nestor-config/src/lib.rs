// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for the nestor Jenkins client.
//!
//! This crate provides [`ClientConfig`], the explicit settings handed to the
//! client constructor, together with helpers for loading from TOML files,
//! overlaying environment variables on request, merging overlays, and
//! producing advisory [`ConfigWarning`]s. Nothing here is read implicitly:
//! a client only sees the environment if the caller applies
//! [`apply_env_overrides`] itself.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Credentials are embedded in a plain-http URL.
    InsecureCredentials {
        /// Host the credentials would be sent to.
        host: String,
    },
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// The console polling interval is unusually large.
    LargePollInterval {
        /// Interval in milliseconds.
        millis: u64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::InsecureCredentials { host } => {
                write!(f, "credentials for '{host}' are sent over plain http")
            }
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            ConfigWarning::LargePollInterval { millis } => {
                write!(f, "console poll interval is large ({millis}ms)")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Jenkins URL used when none is configured.
pub const DEFAULT_URL: &str = "http://localhost:8080";

/// Token sent with every build trigger.
pub const DEFAULT_BUILD_TOKEN: &str = "nestor";

/// Console polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// UDP port Jenkins listens on for discovery probes.
pub const DEFAULT_DISCOVERY_PORT: u16 = 33_848;

/// How long discovery waits for a reply.
pub const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 5;

/// Monitor schedule: top of every minute (six-field cron, seconds first).
pub const DEFAULT_MONITOR_SCHEDULE: &str = "0 * * * * *";

/// Threshold above which a poll interval generates a warning.
const LARGE_POLL_INTERVAL_MS: u64 = 60_000;

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Settings for a Jenkins client.
///
/// Every field is optional so configs can be layered with
/// [`merge_configs`]; the accessor methods fill in defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ClientConfig {
    /// Jenkins base URL, optionally with `user:password@` credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Upstream HTTP proxy URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Per-request timeout in seconds enforced by the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Token sent as the `token` parameter on build triggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_token: Option<String>,

    /// Console log polling interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    /// Cron expression (with seconds) used by the monitor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_schedule: Option<String>,

    /// UDP discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// UDP discovery settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Port the probe is sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Seconds to wait for a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Config pointing at `url`, everything else defaulted.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Configured URL or [`DEFAULT_URL`].
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_URL)
    }

    /// Configured build token or [`DEFAULT_BUILD_TOKEN`].
    pub fn build_token(&self) -> &str {
        self.build_token.as_deref().unwrap_or(DEFAULT_BUILD_TOKEN)
    }

    /// Console polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    /// Per-request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Monitor cron schedule.
    pub fn monitor_schedule(&self) -> &str {
        self.monitor_schedule
            .as_deref()
            .unwrap_or(DEFAULT_MONITOR_SCHEDULE)
    }

    /// Discovery port.
    pub fn discovery_port(&self) -> u16 {
        self.discovery.port.unwrap_or(DEFAULT_DISCOVERY_PORT)
    }

    /// Discovery reply window.
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(
            self.discovery
                .timeout_secs
                .unwrap_or(DEFAULT_DISCOVERY_TIMEOUT_SECS),
        )
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`ClientConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`ClientConfig::default()`].
///
/// The environment is not consulted; see [`apply_env_overrides`].
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)
        }
        None => Ok(ClientConfig::default()),
    }
}

/// Parse a TOML string into a [`ClientConfig`].
pub fn parse_toml(content: &str) -> Result<ClientConfig, ConfigError> {
    toml::from_str::<ClientConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides from the process environment.
///
/// Recognised variables:
/// - `JENKINS_URL`
/// - `NESTOR_PROXY`, else `https_proxy`/`HTTPS_PROXY` for https URLs and
///   `http_proxy`/`HTTP_PROXY` for http URLs
pub fn apply_env_overrides(config: &mut ClientConfig) {
    apply_env_overrides_from(config, |key| std::env::var(key).ok());
}

/// Same rules as [`apply_env_overrides`], reading variables through `lookup`.
pub fn apply_env_overrides_from<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("JENKINS_URL") {
        config.url = Some(val);
    }
    if let Some(val) = lookup("NESTOR_PROXY") {
        config.proxy = Some(val);
    } else if config.proxy.is_none() {
        let keys: [&str; 2] = if config.url().starts_with("https:") {
            ["https_proxy", "HTTPS_PROXY"]
        } else {
            ["http_proxy", "HTTP_PROXY"]
        };
        config.proxy = keys.iter().find_map(|k| lookup(k));
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a configuration, returning advisory warnings.
///
/// Hard errors (unparseable URLs, zero timeouts, blank tokens) are
/// returned as a [`ConfigError::ValidationError`]; soft issues come back as
/// warnings.
pub fn validate_config(config: &ClientConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    match Url::parse(config.url()) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                errors.push(format!("url '{}' must use http or https", config.url()));
            } else if url.scheme() == "http" && url.password().is_some() {
                warnings.push(ConfigWarning::InsecureCredentials {
                    host: url.host_str().unwrap_or_default().to_string(),
                });
            }
        }
        Err(e) => errors.push(format!("invalid url '{}': {e}", config.url())),
    }

    if let Some(ref proxy) = config.proxy
        && let Err(e) = Url::parse(proxy)
    {
        errors.push(format!("invalid proxy '{proxy}': {e}"));
    }

    if config.timeout_secs == Some(0) {
        errors.push("timeout_secs must be greater than zero".into());
    }

    match config.poll_interval_ms {
        Some(0) => errors.push("poll_interval_ms must be greater than zero".into()),
        Some(ms) if ms > LARGE_POLL_INTERVAL_MS => {
            warnings.push(ConfigWarning::LargePollInterval { millis: ms });
        }
        _ => {}
    }

    if let Some(ref token) = config.build_token
        && token.trim().is_empty()
    {
        errors.push("build_token must not be empty".into());
    }

    if let Some(ref schedule) = config.monitor_schedule
        && schedule.trim().is_empty()
    {
        errors.push("monitor_schedule must not be empty".into());
    }

    if config.discovery.port == Some(0) {
        errors.push("discovery.port must not be zero".into());
    }
    if config.discovery.timeout_secs == Some(0) {
        errors.push("discovery.timeout_secs must be greater than zero".into());
    }

    if config.url.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "url".into(),
            hint: format!("falling back to {DEFAULT_URL}"),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations.  Values in `overlay` take precedence over `base`.
pub fn merge_configs(base: ClientConfig, overlay: ClientConfig) -> ClientConfig {
    ClientConfig {
        url: overlay.url.or(base.url),
        proxy: overlay.proxy.or(base.proxy),
        timeout_secs: overlay.timeout_secs.or(base.timeout_secs),
        build_token: overlay.build_token.or(base.build_token),
        poll_interval_ms: overlay.poll_interval_ms.or(base.poll_interval_ms),
        monitor_schedule: overlay.monitor_schedule.or(base.monitor_schedule),
        discovery: DiscoveryConfig {
            port: overlay.discovery.port.or(base.discovery.port),
            timeout_secs: overlay.discovery.timeout_secs.or(base.discovery.timeout_secs),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
