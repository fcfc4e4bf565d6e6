//! Configuration file management for kondate.
//!
//! Provides a TOML-based config file at `~/.config/kondate/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use kondate_core::calendar::Credential;
use kondate_core::model::{DEFAULT_GEMINI_MODEL, ModelConfig, ModelProvider};

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelSection {
    /// "gemini" or "fake".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuthSection {
    /// Identity key used for the settings store (usually an email).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// OAuth bearer token for the calendar API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_dir: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the kondate config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/kondate` or `~/.config/kondate`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("kondate");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("kondate")
}

/// Return the path to the kondate config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default settings directory: `$XDG_DATA_HOME/kondate/settings` or
/// `~/.local/share/kondate/settings`.
pub fn default_settings_dir() -> PathBuf {
    let base = match std::env::var("XDG_DATA_HOME") {
        Ok(xdg) => PathBuf::from(xdg),
        Err(_) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".local")
            .join("share"),
    };
    base.join("kondate").join("settings")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The file may hold API keys and tokens.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub user: Option<String>,
    pub access_token: Option<String>,
    /// Force the offline fake model.
    pub offline: bool,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct KondateConfig {
    pub model: ModelConfig,
    pub user: Option<String>,
    pub access_token: Option<String>,
    pub settings_dir: PathBuf,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl KondateConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Provider: `--offline` > `KONDATE_MODEL_PROVIDER` > `model.provider` > `gemini`
    /// - Model: `KONDATE_MODEL` > `model.name` > [`DEFAULT_GEMINI_MODEL`]
    /// - API key: `GEMINI_API_KEY` > `model.api_key` (checked when the model is built)
    /// - User: `--user` > `KONDATE_USER` > `auth.user`
    /// - Access token: `--access-token` > `KONDATE_ACCESS_TOKEN` > `auth.access_token`
    /// - Settings dir: `KONDATE_SETTINGS_DIR` > `storage.settings_dir` > [`default_settings_dir`]
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = load_config().unwrap_or_default();

        let provider = if cli.offline {
            ModelProvider::Fake
        } else {
            match env_var("KONDATE_MODEL_PROVIDER").or(file.model.provider) {
                Some(p) => p.parse::<ModelProvider>()?,
                None => ModelProvider::Gemini,
            }
        };

        let model = env_var("KONDATE_MODEL")
            .or(file.model.name)
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let api_key = env_var("GEMINI_API_KEY").or(file.model.api_key);

        let user = cli
            .user
            .clone()
            .or_else(|| env_var("KONDATE_USER"))
            .or(file.auth.user);

        let access_token = cli
            .access_token
            .clone()
            .or_else(|| env_var("KONDATE_ACCESS_TOKEN"))
            .or(file.auth.access_token);

        let settings_dir = env_var("KONDATE_SETTINGS_DIR")
            .or(file.storage.settings_dir)
            .map(PathBuf::from)
            .unwrap_or_else(default_settings_dir);

        Ok(Self {
            model: ModelConfig {
                provider,
                model,
                api_key,
            },
            user,
            access_token,
            settings_dir,
        })
    }

    /// Calendar credential, if a token was configured.
    pub fn credential(&self) -> Option<Credential> {
        Credential::from_parts(self.user.clone(), self.access_token.clone())
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
