//! Configuration types for the threat-sync system
//!
//! The configuration file is YAML. `${VAR}` references are replaced with the
//! value of the environment variable before parsing, so secrets can be kept
//! out of the file itself.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Feed request deadline used when `timeout` is absent, unparseable or zero
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(30);

/// Sync interval used when `sync.interval` is absent
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Lower bound for `sync.interval`
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Main threat-sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatSyncConfig {
    /// Network controller settings
    #[serde(alias = "unifi")]
    pub controller: ControllerConfig,

    /// Scheduling settings
    #[serde(default)]
    pub sync: ScheduleConfig,

    /// Threat feeds, in the order they are fetched
    #[serde(default)]
    pub feeds: FeedsList,

    /// Health endpoint settings
    #[serde(default)]
    pub health: HealthConfig,
}

impl ThreatSyncConfig {
    /// Load and parse a configuration file
    ///
    /// The result is not validated; call [`ThreatSyncConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse a configuration document, expanding `${VAR}` references first
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        serde_yaml::from_str(&expanded)
            .map_err(|e| Error::config(format!("failed to parse config: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.controller.validate()?;
        self.sync.validate()?;

        if self.feeds.is_empty() {
            return Err(Error::config("at least one feed must be configured"));
        }

        for (index, feed) in self.feeds.iter().enumerate() {
            if feed.enabled {
                feed.validate()
                    .map_err(|e| Error::config(format!("feed[{}]: {}", index, e)))?;
            }
        }

        if self.feeds.enabled_count() == 0 {
            return Err(Error::config("at least one feed must be enabled"));
        }

        Ok(())
    }
}

/// Network controller configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller base URL (e.g., "https://192.168.1.1")
    pub url: String,

    /// Controller site
    #[serde(default = "default_site")]
    pub site: String,

    /// Login user
    #[serde(default)]
    pub username: String,

    /// Login password
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub password: String,

    /// Name of the address-group holding the block-list
    #[serde(default = "default_group_name", alias = "groupName")]
    pub group_name: String,

    /// Firewall ruleset the group is meant to be referenced from
    #[serde(default = "default_ruleset")]
    pub ruleset: String,

    /// Firewall rule index for the blocking rule
    #[serde(default = "default_rule_index", alias = "ruleIndex")]
    pub rule_index: u32,

    /// Verify the controller's TLS certificate (controllers usually self-sign)
    #[serde(default, alias = "verifyTls")]
    pub verify_tls: bool,

    /// Read from the controller but never write to it
    #[serde(default, alias = "dryRun")]
    pub dry_run: bool,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("url", &self.url)
            .field("site", &self.site)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("group_name", &self.group_name)
            .field("ruleset", &self.ruleset)
            .field("rule_index", &self.rule_index)
            .field("verify_tls", &self.verify_tls)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ControllerConfig {
    /// Create a controller configuration with defaults for optional fields
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            site: default_site(),
            username: username.into(),
            password: password.into(),
            group_name: default_group_name(),
            ruleset: default_ruleset(),
            rule_index: default_rule_index(),
            verify_tls: false,
            dry_run: false,
        }
    }

    /// Validate the controller configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::config("controller.url is required"));
        }
        if !is_http_url(&self.url) {
            return Err(Error::config(
                "controller.url must start with http:// or https://",
            ));
        }
        if self.username.is_empty() {
            return Err(Error::config("controller.username is required"));
        }
        if self.password.is_empty() {
            return Err(Error::config("controller.password is required"));
        }
        if self.group_name.is_empty() {
            return Err(Error::config("controller.group_name cannot be empty"));
        }
        Ok(())
    }
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Interval between sync cycles (e.g., "60m", "1h30m")
    #[serde(default = "default_interval")]
    pub interval: String,
}

impl ScheduleConfig {
    /// Parsed interval, falling back to the default when unparseable
    pub fn interval(&self) -> Duration {
        parse_duration(&self.interval).unwrap_or(DEFAULT_SYNC_INTERVAL)
    }

    /// Validate the schedule
    pub fn validate(&self) -> Result<()> {
        let interval = parse_duration(&self.interval).ok_or_else(|| {
            Error::config(format!("sync.interval is not a valid duration: {}", self.interval))
        })?;
        if interval < MIN_SYNC_INTERVAL {
            return Err(Error::config("sync.interval must be at least 1 minute"));
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

/// Health endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Whether to serve health endpoints
    #[serde(default)]
    pub enabled: bool,

    /// Listen port
    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_health_port(),
        }
    }
}

/// A single threat feed
///
/// The sync engine only reads `enabled`, `parser`, `url` and `timeout`;
/// `auth` and `params` are passed through to parsers untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed name (for logging)
    pub name: String,

    /// Source URL
    #[serde(default)]
    pub url: String,

    /// Parser identifier (e.g., "plain", "netset")
    pub parser: String,

    /// Whether this feed is fetched
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Request deadline (e.g., "30s")
    #[serde(default)]
    pub timeout: Option<String>,

    /// Opaque authentication settings
    #[serde(default)]
    pub auth: HashMap<String, serde_json::Value>,

    /// Opaque parser parameters
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

impl FeedConfig {
    /// Create a new enabled feed configuration
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        parser: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            parser: parser.into(),
            enabled: true,
            timeout: None,
            auth: HashMap::new(),
            params: HashMap::new(),
        }
    }

    /// Set the request timeout string
    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Enable or disable the feed
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Request deadline; 30s when absent, unparseable or zero
    pub fn timeout(&self) -> Duration {
        self.timeout
            .as_deref()
            .and_then(parse_duration)
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(DEFAULT_FEED_TIMEOUT)
    }

    /// Validate the fields every enabled feed needs
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config("name is required"));
        }
        if self.url.is_empty() {
            return Err(Error::config("url is required"));
        }
        if self.parser.is_empty() {
            return Err(Error::config("parser is required"));
        }
        if !is_http_url(&self.url) {
            return Err(Error::config("url must start with http:// or https://"));
        }
        Ok(())
    }
}

/// Ordered list of feed configurations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedsList(Vec<FeedConfig>);

impl FeedsList {
    /// Create a feed list
    pub fn new(feeds: Vec<FeedConfig>) -> Self {
        Self(feeds)
    }

    /// Enabled feeds, in configuration order
    pub fn enabled(&self) -> impl Iterator<Item = &FeedConfig> {
        self.0.iter().filter(|feed| feed.enabled)
    }

    /// Number of enabled feeds
    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }

    /// All feeds
    pub fn iter(&self) -> std::slice::Iter<'_, FeedConfig> {
        self.0.iter()
    }

    /// Total number of feeds
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no feeds are configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<FeedConfig>> for FeedsList {
    fn from(feeds: Vec<FeedConfig>) -> Self {
        Self(feeds)
    }
}

/// Parse a Go-style duration string such as `30s`, `1m30s`, `500ms` or `1.5h`
///
/// Returns `None` for empty or malformed input.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input == "0" {
        return Some(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = input;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let value: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return None,
        };
        rest = &rest[unit_len..];

        total += value * seconds_per_unit;
    }

    Duration::try_from_secs_f64(total).ok()
}

fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| Error::config(format!("invalid expansion pattern: {}", e)))?;

    Ok(re
        .replace_all(content, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn default_site() -> String {
    "default".to_string()
}

fn default_group_name() -> String {
    "uts-block-list".to_string()
}

fn default_ruleset() -> String {
    "WAN_OUT".to_string()
}

fn default_rule_index() -> u32 {
    2000
}

fn default_interval() -> String {
    "60m".to_string()
}

fn default_health_port() -> u16 {
    8080
}

fn default_enabled() -> bool {
    true
}
