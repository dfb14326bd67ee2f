// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Configuration Module
//!
//! Configuration for a wizard session: which backend to talk to, where to
//! keep local snapshots, the auto-save and publish timings, and the content
//! schema that decides which fields are required at the content step.
//!
//! Values come from a TOML file, environment variables and programmatic
//! overrides, applied in that order.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sitewizard::core::config::{ConfigBuilder, Profile};
//!
//! let config = ConfigBuilder::new()
//!     .with_file("sitewizard.toml")
//!     .with_env_prefix("SITEWIZARD_")
//!     .with_profile(Profile::Production)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.profile, Profile::Production);
//! ```

use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toml::Value as TomlValue;

use crate::core::error::{Result, WizardError};
use crate::draft::{ContentSchema, FieldSpec};

/// Prefix used by the binary for environment overrides.
pub const ENV_PREFIX: &str = "SITEWIZARD_";

/// Specifies operational profiles for configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Development profile with verbose logging.
    #[default]
    Development,
    /// Staging profile for intermediate testing.
    Staging,
    /// Production profile.
    Production,
    /// Custom profile enabling specific user configurations.
    Custom,
}

impl Profile {
    /// Default log filter for this profile.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Profile::Development => "debug",
            Profile::Staging | Profile::Custom => "info",
            Profile::Production => "warn",
        }
    }
}

/// Represents the main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    /// Base URL of the backend serving the builder API.
    pub base_url: String,

    #[serde(default = "default_storage_dir")]
    /// Directory holding persisted wizard snapshots.
    pub storage_dir: PathBuf,

    #[serde(default)]
    /// Indicates the current operational profile.
    pub profile: Profile,

    #[serde(default)]
    /// Auto-save timer settings.
    pub autosave: AutoSaveConfig,

    #[serde(default)]
    /// Publish redirect settings.
    pub publish: PublishConfig,

    #[serde(default)]
    /// HTTP settings for the request client.
    pub request: RequestConfig,

    #[serde(default)]
    /// Notification display settings.
    pub notifications: NotificationConfig,

    #[serde(default)]
    /// Content fields shown at the content step.
    pub fields: Vec<FieldSpec>,
}

/// Auto-save timer settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AutoSaveConfig {
    #[serde(default = "default_true")]
    /// Whether the periodic save runs at all.
    pub enabled: bool,

    #[serde(default = "default_autosave_interval_ms")]
    /// Period between two auto-save ticks, in milliseconds.
    pub interval_ms: u64,
}

/// Settings applied after a successful publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_redirect_delay_ms")]
    /// Delay before leaving the wizard, in milliseconds.
    pub redirect_delay_ms: u64,

    #[serde(default = "default_redirect_to")]
    /// Route the user lands on once the site is published.
    pub redirect_to: String,
}

/// HTTP settings for the request client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_timeout_ms")]
    /// Per-request timeout, in milliseconds.
    pub timeout_ms: u64,
}

/// Notification display settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_dismiss_after_ms")]
    /// Time a toast stays visible, in milliseconds.
    pub dismiss_after_ms: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_autosave_interval_ms(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            redirect_delay_ms: default_redirect_delay_ms(),
            redirect_to: default_redirect_to(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dismiss_after_ms: default_dismiss_after_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            storage_dir: default_storage_dir(),
            profile: Profile::default(),
            autosave: AutoSaveConfig::default(),
            publish: PublishConfig::default(),
            request: RequestConfig::default(),
            notifications: NotificationConfig::default(),
            fields: Vec::new(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }

    /// Content schema built from the configured fields.
    pub fn schema(&self) -> ContentSchema {
        ContentSchema::new(self.fields.clone())
    }

    /// Auto-save period.
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave.interval_ms)
    }

    /// Delay between a successful publish and the redirect.
    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.publish.redirect_delay_ms)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request.timeout_ms)
    }

    /// Lifetime of a notification toast.
    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notifications.dismiss_after_ms)
    }
}

/// Builds a [`Config`] from a file, the environment and overrides.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_file: Option<PathBuf>,
    env_prefix: Option<String>,
    profile: Option<Profile>,
    overrides: Vec<(String, TomlValue)>,
}

impl ConfigBuilder {
    /// Initialises a new `ConfigBuilder` instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a TOML configuration file to the builder.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds a prefix for environment variables to override configuration values.
    ///
    /// `SITEWIZARD_BASE_URL` sets `base_url`; a dotted remainder such as
    /// `SITEWIZARD_AUTOSAVE.INTERVAL_MS` reaches into a section.
    pub fn with_env_prefix<S: Into<String>>(
        mut self,
        prefix: S,
    ) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Sets the profile for the configuration.
    pub fn with_profile<P: Into<Profile>>(
        mut self,
        profile: P,
    ) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Adds a key-value pair to override configuration values.
    ///
    /// Overrides are applied in insertion order, after the file and the
    /// environment.
    pub fn with_override<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<TomlValue>,
    {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Builds the final configuration by applying all specified settings and overrides.
    pub fn build(self) -> Result<Config> {
        let mut config = if let Some(path) = self.config_file {
            load_from_file(&path)?
        } else {
            Config::default()
        };

        if let Some(profile) = self.profile {
            config.profile = profile;
        }

        if let Some(prefix) = self.env_prefix {
            apply_env_overrides(&mut config, &prefix)?;
        }

        apply_overrides(&mut config, &self.overrides)?;
        validate_config(&config)?;

        Ok(config)
    }
}

// Internal helper functions

fn load_from_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        WizardError::config_error(
            format!("Failed to read config file: {}", e),
            Some(path.to_path_buf()),
        )
    })?;

    toml::from_str(&content).map_err(|e| {
        WizardError::config_error(
            format!("Failed to parse config file: {}", e),
            Some(path.to_path_buf()),
        )
    })
}

fn apply_env_overrides(
    config: &mut Config,
    prefix: &str,
) -> Result<()> {
    let mut vars: Vec<(String, String)> = env::vars()
        .filter_map(|(key, value)| {
            key.strip_prefix(prefix).map(|stripped| {
                (stripped.trim_start_matches('_').to_lowercase(), value)
            })
        })
        .collect();
    vars.sort();

    for (key, value) in vars {
        apply_config_value(config, &key, &value)?;
    }
    Ok(())
}

fn apply_overrides(
    config: &mut Config,
    overrides: &[(String, TomlValue)],
) -> Result<()> {
    for (key, value) in overrides {
        let value = match value {
            TomlValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        apply_config_value(config, key, &value)?;
    }
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    if !(config.base_url.starts_with("http://")
        || config.base_url.starts_with("https://"))
    {
        return Err(WizardError::config_error(
            format!("base_url must be an http(s) URL: {}", config.base_url),
            None,
        ));
    }

    for (name, value) in [
        ("autosave.interval_ms", config.autosave.interval_ms),
        ("request.timeout_ms", config.request.timeout_ms),
        (
            "notifications.dismiss_after_ms",
            config.notifications.dismiss_after_ms,
        ),
    ] {
        if value == 0 {
            return Err(WizardError::config_error(
                format!("{} must be greater than zero", name),
                None,
            ));
        }
    }

    if !config.publish.redirect_to.starts_with('/') {
        return Err(WizardError::config_error(
            format!(
                "publish.redirect_to must be an absolute route: {}",
                config.publish.redirect_to
            ),
            None,
        ));
    }

    let mut seen = HashSet::new();
    for field in &config.fields {
        if field.key.trim().is_empty() {
            return Err(WizardError::config_error(
                "Content field keys cannot be blank",
                None,
            ));
        }
        if !seen.insert(field.key.as_str()) {
            return Err(WizardError::config_error(
                format!("Duplicate content field: {}", field.key),
                None,
            ));
        }
    }

    Ok(())
}

fn apply_config_value(
    config: &mut Config,
    key: &str,
    value: &str,
) -> Result<()> {
    let value = value.trim_matches('"');
    match key {
        "base_url" => {
            config.base_url = value.trim_end_matches('/').to_string()
        }
        "storage_dir" => config.storage_dir = PathBuf::from(value),
        "profile" => {
            config.profile = match value.to_lowercase().as_str() {
                "development" => Profile::Development,
                "staging" => Profile::Staging,
                "production" => Profile::Production,
                _ => Profile::Custom,
            };
        }
        "autosave.enabled" => {
            config.autosave.enabled = parse_value(key, value)?
        }
        "autosave.interval_ms" => {
            config.autosave.interval_ms = parse_value(key, value)?
        }
        "publish.redirect_delay_ms" => {
            config.publish.redirect_delay_ms = parse_value(key, value)?
        }
        "publish.redirect_to" => {
            config.publish.redirect_to = value.to_string()
        }
        "request.timeout_ms" => {
            config.request.timeout_ms = parse_value(key, value)?
        }
        "notifications.dismiss_after_ms" => {
            config.notifications.dismiss_after_ms =
                parse_value(key, value)?
        }
        _ => {
            return Err(WizardError::config_error(
                format!("Unknown configuration key: {}", key),
                None,
            ));
        }
    }
    Ok(())
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| {
        WizardError::config_error(
            format!("Invalid {} value '{}': {}", key, value, e),
            None,
        )
    })
}

/// Collects `KEY=VALUE` pairs into overrides, rejecting malformed entries.
pub fn parse_overrides<I, S>(pairs: I) -> Result<HashMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = HashMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            WizardError::config_error(
                format!("Expected KEY=VALUE, got '{}'", pair),
                None,
            )
        })?;
        _ = out.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(out)
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".sitewizard")
}

fn default_autosave_interval_ms() -> u64 {
    30_000
}

fn default_redirect_delay_ms() -> u64 {
    2_000
}

fn default_redirect_to() -> String {
    "/dashboard".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_dismiss_after_ms() -> u64 {
    5_000
}
