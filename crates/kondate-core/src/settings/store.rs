//! Per-user persistence of the settings mapping.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use super::{SettingsError, SettingsRecord};

/// Key-value store for settings blobs, keyed by user identity.
///
/// The store persists whatever mapping it is given; validation happens in
/// [`SettingsRecord::from_value`] on the way in and out.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the stored mapping, or `None` if the user has none yet.
    async fn load(&self, user: &str) -> Result<Option<Value>, SettingsError>;

    /// Replace the stored mapping.
    async fn save(&self, user: &str, value: &Value) -> Result<(), SettingsError>;
}

/// Load and validate a user's settings, falling back to defaults.
pub async fn load_settings(
    store: &dyn SettingsStore,
    user: &str,
) -> Result<SettingsRecord, SettingsError> {
    match store.load(user).await? {
        Some(value) => SettingsRecord::from_value(value),
        None => Ok(SettingsRecord::default()),
    }
}

/// Validate a mapping and store its normalized form.
///
/// Invalid mappings are rejected and nothing is written.
pub async fn save_settings(
    store: &dyn SettingsStore,
    user: &str,
    value: Value,
) -> Result<SettingsRecord, SettingsError> {
    let record = SettingsRecord::from_value(value)?;
    store.save(user, &record.to_value()?).await?;
    Ok(record)
}

/// One JSON file per user under a directory.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    dir: PathBuf,
}

impl FileSettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding `user`'s settings.
    pub fn path_for(&self, user: &str) -> Result<PathBuf, SettingsError> {
        let key = file_key(user)?;
        Ok(self.dir.join(format!("user_settings_{key}.json")))
    }
}

/// Percent-encode an identity (usually an email) into a filename-safe key.
///
/// The encoding is reversible, so distinct identities never share a file.
fn file_key(user: &str) -> Result<String, SettingsError> {
    let trimmed = user.trim();
    if trimmed.is_empty() {
        return Err(SettingsError::InvalidIdentity(user.to_string()));
    }
    Ok(urlencoding::encode(trimmed).into_owned())
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self, user: &str) -> Result<Option<Value>, SettingsError> {
        let path = self.path_for(user)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SettingsError::Io {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        let value = serde_json::from_str(&contents)?;
        Ok(Some(value))
    }

    async fn save(&self, user: &str, value: &Value) -> Result<(), SettingsError> {
        let path = self.path_for(user)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SettingsError::Io {
                path: self.dir.display().to_string(),
                source: e,
            })?;
        let contents = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| SettingsError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }
}
