//! Configuration management
//!
//! Options come from three places: the process environment (read once at
//! startup), an optional TOML file, and caller code. They are merged field
//! by field and then resolved into a validated `AdapterConfig`.
//!
//! The configuration file lives at ~/.config/cos-storage/config.toml unless
//! a path is given.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::normalize_base_path;
use crate::record::SchemaFields;

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "ap-guangzhou";

pub const ENV_SECRET_ID: &str = "COS_SECRET_ID";
pub const ENV_SECRET_KEY: &str = "COS_SECRET_KEY";
pub const ENV_BUCKET: &str = "COS_BUCKET";
pub const ENV_REGION: &str = "COS_REGION";
pub const ENV_PATH: &str = "COS_PATH";

/// Partial COS options; unset fields fall through to lower layers
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Bucket name, formatted `name-appid`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Absolute base path prefixed to every key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CosOptions {
    /// Read options from the COS_* environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read options through an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.is_empty());
        Self {
            secret_id: read(ENV_SECRET_ID),
            secret_key: read(ENV_SECRET_KEY),
            bucket: read(ENV_BUCKET),
            region: read(ENV_REGION),
            path: read(ENV_PATH),
        }
    }

    /// Lay `overrides` over `self`; every field set in `overrides` wins
    pub fn merge(self, overrides: CosOptions) -> Self {
        Self {
            secret_id: overrides.secret_id.or(self.secret_id),
            secret_key: overrides.secret_key.or(self.secret_key),
            bucket: overrides.bucket.or(self.bucket),
            region: overrides.region.or(self.region),
            path: overrides.path.or(self.path),
        }
    }

    /// Validate and fill defaults
    ///
    /// Fails when a base path is given that is not absolute.
    pub fn resolve(self, schema: SchemaFields) -> Result<AdapterConfig> {
        if let Some(path) = &self.path {
            validate_base_path(path)?;
        }

        Ok(AdapterConfig {
            secret_id: self.secret_id.unwrap_or_default(),
            secret_key: self.secret_key.unwrap_or_default(),
            bucket: self.bucket.unwrap_or_default(),
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            path: self.path,
            schema,
        })
    }
}

impl fmt::Debug for CosOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosOptions")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("path", &self.path)
            .finish()
    }
}

/// Check that a base path is absolute
pub fn validate_base_path(path: &str) -> Result<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "COS path must be absolute, got '{path}'"
        )))
    }
}

/// Resolved adapter configuration
///
/// Only obtainable through `CosOptions::resolve`, so the base path is
/// always valid.
#[derive(Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    secret_id: String,
    secret_key: String,
    bucket: String,
    region: String,
    path: Option<String>,
    schema: SchemaFields,
}

impl AdapterConfig {
    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Configured base path, as given
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Base path with its leading slash removed, as used in keys
    pub fn storage_path(&self) -> &str {
        normalize_base_path(self.path.as_deref())
    }

    pub fn schema(&self) -> &SchemaFields {
        &self.schema
    }
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("path", &self.path)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    #[serde(default)]
    pub cos: CosOptions,

    /// Extra record fields the host persists
    #[serde(default)]
    pub schema: SchemaFields,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            cos: CosOptions::default(),
            schema: SchemaFields::default(),
        }
    }
}

impl Config {
    /// Merge the file's options over `defaults` and resolve them
    pub fn resolve(self, defaults: CosOptions) -> Result<AdapterConfig> {
        defaults.merge(self.cos).resolve(self.schema)
    }
}

/// Loads and saves the configuration file
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        let config_path = config_dir.join("cos-storage").join("config.toml");
        Ok(Self { config_path })
    }

    /// Create a ConfigManager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// A missing file yields the default configuration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}",
                config.schema_version, SCHEMA_VERSION
            )));
        }
        config.schema_version = SCHEMA_VERSION;

        tracing::debug!(path = %self.config_path.display(), "Loaded COS configuration");
        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// The file holds credentials, so it is written with mode 600 on Unix.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }
}
