//! Configuration management for cfdrive
//!
//! Values are resolved in layers, later layers winning:
//! `~/.config/cfdrive/config.toml`, then a `.env` file, then the process
//! environment.

use crate::error::{Error, Result};
use crate::url::PUBLIC_URL_VAR;
use dirs::home_dir;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration directory name
const CONFIG_DIR: &str = "cfdrive";

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Environment variable pointing at an explicit `.env` file
pub const ENV_FILE_VAR: &str = "CFDRIVE_ENV_FILE";

pub const ACCOUNT_ID_VAR: &str = "ACCOUNT_ID";
pub const ACCESS_KEY_ID_VAR: &str = "ACCESS_KEY_ID";
pub const ACCESS_KEY_SECRET_VAR: &str = "ACCESS_KEY_SECRET";
pub const BUCKET_NAME_VAR: &str = "BUCKET_NAME";

/// Smallest part size R2 accepts for multipart uploads (except the last part)
pub const MIN_PART_SIZE_MB: usize = 5;

/// On-disk configuration file; every field is optional so the environment
/// can fill the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
    #[serde(default)]
    pub r2: R2Config,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Cloudflare account and credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudflareConfig {
    pub account_id: Option<String>,
    /// Overrides the endpoint derived from the account id
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// R2 bucket settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct R2Config {
    pub bucket: Option<String>,
    pub public_url: Option<String>,
}

/// Advanced configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdvancedConfig {
    /// Multipart upload part size in MB (default: 100)
    #[serde(default = "default_multipart_chunk_size")]
    pub multipart_chunk_size_mb: usize,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            multipart_chunk_size_mb: default_multipart_chunk_size(),
        }
    }
}

fn default_multipart_chunk_size() -> usize {
    100 // 100MB
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub account_id: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub public_url: Option<String>,
    pub multipart_chunk_size_mb: usize,
}

impl Config {
    /// Load and validate configuration from all sources
    pub fn load() -> Result<Self> {
        load_env_file()?;
        let file = load_config_file(&get_config_path()?)?;
        let config = Self::from_sources(file, |name| std::env::var(name).ok())?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Merge an optional config file with a variable lookup; the lookup wins.
    pub fn from_sources<F>(file: Option<ConfigFile>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |value: Option<String>, name: &str| {
            value.ok_or_else(|| Error::MissingConfiguration(name.to_string()))
        };

        let account_id = required(
            var(ACCOUNT_ID_VAR).or(file.cloudflare.account_id),
            ACCOUNT_ID_VAR,
        )?;
        let access_key_id = required(
            var(ACCESS_KEY_ID_VAR).or(file.cloudflare.access_key_id),
            ACCESS_KEY_ID_VAR,
        )?;
        let secret_access_key = required(
            var(ACCESS_KEY_SECRET_VAR).or(file.cloudflare.secret_access_key),
            ACCESS_KEY_SECRET_VAR,
        )?;
        let bucket = required(var(BUCKET_NAME_VAR).or(file.r2.bucket), BUCKET_NAME_VAR)?;

        let endpoint = file
            .cloudflare
            .endpoint
            .unwrap_or_else(|| r2_endpoint(&account_id));

        Ok(Self {
            account_id,
            endpoint,
            access_key_id,
            secret_access_key,
            bucket,
            public_url: var(PUBLIC_URL_VAR).or(file.r2.public_url),
            multipart_chunk_size_mb: file.advanced.multipart_chunk_size_mb,
        })
    }

    /// Public base URL, required to hand out download links
    pub fn require_public_url(&self) -> Result<&str> {
        self.public_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::MissingConfiguration(PUBLIC_URL_VAR.to_string()))
    }

    /// Multipart part size in bytes
    pub fn part_size_bytes(&self) -> usize {
        self.multipart_chunk_size_mb * 1024 * 1024
    }
}

/// S3 endpoint of an R2 account
pub fn r2_endpoint(account_id: &str) -> String {
    format!("https://{}.r2.cloudflarestorage.com", account_id)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let home = home_dir()
        .ok_or_else(|| Error::InvalidConfig("Cannot determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR))
}

/// Get the configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Read the TOML config file, `None` if it doesn't exist
pub fn load_config_file(path: &Path) -> Result<Option<ConfigFile>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file");
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| {
        Error::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let config: ConfigFile = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(Some(config))
}

/// Load a `.env` file into the process environment without overriding
/// variables that are already set.
///
/// An explicit `CFDRIVE_ENV_FILE` must exist; the implicit `.env` lookup in
/// the working directory is optional.
pub fn load_env_file() -> Result<()> {
    match std::env::var_os(ENV_FILE_VAR) {
        Some(path) => {
            dotenvy::from_path(&path).map_err(|e| {
                Error::InvalidConfig(format!(
                    "Failed to load {} ({}): {}",
                    ENV_FILE_VAR,
                    Path::new(&path).display(),
                    e
                ))
            })?;
        }
        None => {
            if let Ok(path) = dotenvy::dotenv() {
                tracing::debug!(path = %path.display(), "loaded .env");
            }
        }
    }
    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if !config
        .account_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric())
    {
        return Err(Error::InvalidConfig(format!(
            "{} must be alphanumeric",
            ACCOUNT_ID_VAR
        )));
    }

    if config.multipart_chunk_size_mb < MIN_PART_SIZE_MB {
        return Err(Error::InvalidConfig(format!(
            "multipart_chunk_size_mb must be at least {} (got {})",
            MIN_PART_SIZE_MB, config.multipart_chunk_size_mb
        )));
    }

    Ok(())
}
