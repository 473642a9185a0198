//! Configuration file management for stratplan.
//!
//! Provides a TOML-based config file at `~/.config/stratplan/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.
//!
//! The password is never stored; it is read from `STRATPLAN_PASSWORD` when a
//! remote command needs to log in.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use stratplan_api::ApiConfig;

pub const URL_ENV: &str = "STRATPLAN_API_URL";
pub const USERNAME_ENV: &str = "STRATPLAN_USERNAME";
pub const PASSWORD_ENV: &str = "STRATPLAN_PASSWORD";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api: ApiSection,
    #[serde(default)]
    pub auth: AuthSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuthSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the stratplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/stratplan` or
/// `~/.config/stratplan`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("stratplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("stratplan")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load the config file, or `None` when there is none.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    read_config(&path).map(Some)
}

pub fn read_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Write the config file to its standard location.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    write_config(&path, config)?;
    Ok(path)
}

/// Serialize and write `config` to `path`, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn write_config(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct StratplanConfig {
    pub api_config: ApiConfig,
    pub username: Option<String>,
}

impl StratplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - API URL: `cli_api_url` > `STRATPLAN_API_URL` > `api.url` > `ApiConfig::DEFAULT_URL`
    /// - Username: `STRATPLAN_USERNAME` > `auth.username` > none
    pub fn resolve(cli_api_url: Option<&str>) -> Result<Self> {
        let file_config = load_config()?;

        let url = if let Some(url) = cli_api_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(URL_ENV) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.api.url.clone()
        } else {
            ApiConfig::DEFAULT_URL.to_string()
        };
        let api_config = ApiConfig {
            timeout_secs: ApiConfig::from_env().timeout_secs,
            ..ApiConfig::new(url)
        };

        let username = std::env::var(USERNAME_ENV)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| file_config.and_then(|cfg| cfg.auth.username));

        Ok(Self {
            api_config,
            username,
        })
    }

    /// Login credentials, when both parts are available.
    pub fn credentials(&self) -> Option<(String, String)> {
        let password = std::env::var(PASSWORD_ENV).ok()?;
        self.username.clone().map(|username| (username, password))
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
