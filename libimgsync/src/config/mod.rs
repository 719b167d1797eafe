//! Application configuration.
//!
//! Configuration is layered: compiled defaults, then an optional YAML file,
//! then environment variables, then whatever the caller overrides in code
//! (command-line flags). The result is validated once and passed into
//! construction explicitly; nothing reads the environment later.

use crate::catalog::Cloud;
use crate::client::ClientConfig;
use crate::error::{Result, SyncError};
use crate::pipeline::DEFAULT_TAG_CONCURRENCY;
use crate::policy::{DEFAULT_EOL_MINIMUM, TagPolicyEngine};
use config::{Config as ConfigRs, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;


/// Environment variable selecting the cloud region.
pub const ENV_CLOUD: &str = "FALCON_CLOUD";
/// Environment variable holding the API client id.
pub const ENV_CLIENT_ID: &str = "FALCON_CLIENT_ID";
/// Environment variable holding the API client secret.
pub const ENV_CLIENT_SECRET: &str = "FALCON_CLIENT_SECRET";
/// Environment variable toggling verbose diagnostics.
pub const ENV_DEBUG: &str = "DEBUG";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub falcon: Falcon,
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub server: Server,
}

impl Config {
    /// Parses a `Config` from a YAML string layered over the defaults.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = Self::defaults_builder()?.add_source(File::from_str(s, FileFormat::Yaml));
        Self::from_builder(builder, None)
    }

    /// Loads defaults, overlaid with the YAML file at `path` when given.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file is missing or malformed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::defaults_builder()?;

        if let Some(p) = path {
            builder = builder.add_source(File::from(p).format(FileFormat::Yaml).required(true));
        }

        Self::from_builder(builder, path)
    }

    /// Loads the file layer, applies the process environment, and validates.
    pub fn from_env(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn defaults_builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = ConfigRs::try_from(&Config::default()).map_err(|e| {
            SyncError::config_with_source("Failed to build default configuration", None, e)
        })?;
        Ok(ConfigRs::builder().add_source(defaults))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        path: Option<&Path>,
    ) -> Result<Self> {
        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                SyncError::config_with_source(
                    "Failed to deserialize configuration".to_string(),
                    path.map(|p| p.display().to_string()),
                    e,
                )
            })
    }

    /// Overlays environment variables read through `lookup`.
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `FALCON_CLOUD` names an unknown
    /// region or `DEBUG` is not a boolean.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(cloud) = read(ENV_CLOUD) {
            self.falcon.cloud = Cloud::from_str(&cloud)?;
        }
        if let Some(client_id) = read(ENV_CLIENT_ID) {
            self.falcon.client_id = Some(client_id);
        }
        if let Some(client_secret) = read(ENV_CLIENT_SECRET) {
            self.falcon.client_secret = Some(client_secret);
        }
        if let Some(debug) = read(ENV_DEBUG) {
            self.logging.debug = parse_bool(&debug).ok_or_else(|| {
                SyncError::config(
                    format!("{} must be a boolean, got '{}'", ENV_DEBUG, debug),
                    None,
                )
            })?;
        }
        Ok(())
    }

    /// Checks the values no type can express.
    pub fn validate(&self) -> Result<()> {
        if self.sync.tag_concurrency == 0 {
            return Err(SyncError::config("sync.tag_concurrency must be at least 1", None));
        }
        if self.registry.timeout == 0 {
            return Err(SyncError::config("registry.timeout must be at least 1", None));
        }
        self.policy_engine()?;
        Ok(())
    }

    /// Returns the vendor API base URL: the override if set, else the region's.
    pub fn api_base_url(&self) -> String {
        match &self.falcon.api_url {
            Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => self.falcon.cloud.api_base_url().to_string(),
        }
    }

    /// Builds the tag policy engine for the configured cutoff.
    pub fn policy_engine(&self) -> Result<TagPolicyEngine> {
        TagPolicyEngine::new(&self.sync.eol_minimum)
    }

    /// Returns the registry HTTP client configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new().with_timeout(self.registry.timeout)
    }
}

/// Parses the boolean spellings accepted for toggles.
///
/// # Examples
///
/// ```
/// use libimgsync::config::parse_bool;
///
/// assert_eq!(parse_bool("On"), Some(true));
/// assert_eq!(parse_bool("0"), Some(false));
/// assert_eq!(parse_bool("maybe"), None);
/// ```
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Vendor API settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Falcon {
    #[serde(default)]
    pub cloud: Cloud,

    /// Overrides the region's API base URL.
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,
}

impl fmt::Debug for Falcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Falcon")
            .field("cloud", &self.cloud)
            .field("api_url", &self.api_url)
            .field("has_client_id", &self.client_id.is_some())
            .field("has_client_secret", &self.client_secret.is_some())
            .finish()
    }
}

/// Registry access settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    /// Sends registry requests to this base URL instead of the region's host.
    #[serde(default)]
    pub url: Option<String>,

    /// Per-request deadline in seconds.
    #[serde(default = "default_registry_timeout")]
    pub timeout: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            url: None,
            timeout: default_registry_timeout(),
        }
    }
}

fn default_registry_timeout() -> u64 {
    30
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncOptions {
    #[serde(default = "default_tag_concurrency")]
    pub tag_concurrency: usize,

    #[serde(default = "default_eol_minimum")]
    pub eol_minimum: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            tag_concurrency: default_tag_concurrency(),
            eol_minimum: default_eol_minimum(),
        }
    }
}

fn default_tag_concurrency() -> usize {
    DEFAULT_TAG_CONCURRENCY
}

fn default_eol_minimum() -> String {
    DEFAULT_EOL_MINIMUM.to_string()
}

/// Report persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Storage {
    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_object_key")]
    pub object_key: String,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            object_key: default_object_key(),
        }
    }
}

fn default_collection() -> String {
    "images".to_string()
}

fn default_object_key() -> String {
    "all".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Logging {
    #[serde(default)]
    pub debug: bool,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}
