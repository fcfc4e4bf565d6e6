//! `kondate settings show` and `kondate settings import`.

use std::path::Path;

use anyhow::{Context, Result};

use kondate_core::settings::{FileSettingsStore, save_settings};

use crate::SettingsCommands;
use crate::config::KondateConfig;
use crate::plan_cmds::household_settings;

pub async fn run_settings_command(command: SettingsCommands, cfg: &KondateConfig) -> Result<()> {
    match command {
        SettingsCommands::Show => {
            let settings = household_settings(cfg).await?;
            let json = serde_json::to_string_pretty(&settings.to_value()?)?;
            println!("{json}");
        }
        SettingsCommands::Import { file } => {
            let user = require_user(cfg)?;
            import_settings(&cfg.settings_dir, user, Path::new(&file)).await?;
            println!("Settings for {user} saved.");
        }
    }
    Ok(())
}

fn require_user(cfg: &KondateConfig) -> Result<&str> {
    cfg.user
        .as_deref()
        .context("no user configured; pass --user or set KONDATE_USER")
}

/// Validate a settings JSON file and store it for `user`.
pub async fn import_settings(settings_dir: &Path, user: &str, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read settings file at {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("settings file at {} is not JSON", file.display()))?;

    let store = FileSettingsStore::new(settings_dir);
    let record = save_settings(&store, user, value)
        .await
        .with_context(|| format!("settings file at {} was rejected", file.display()))?;
    tracing::info!(
        user,
        children = record.children.len(),
        calendar_id = %record.calendar_id,
        "settings imported"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kondate_core::settings::{ChildStage, load_settings};
    use tempfile::TempDir;

    #[tokio::test]
    async fn import_then_load() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("settings.json");
        std::fs::write(
            &file,
            r#"{"adults": 1, "children": [{"id": 7, "name": "Mei", "birthday": "", "stage": "toddler"}], "calendarId": ""}"#,
        )
        .unwrap();

        let store_dir = dir.path().join("store");
        import_settings(&store_dir, "papa@example.com", &file)
            .await
            .unwrap();

        let store = FileSettingsStore::new(&store_dir);
        let loaded = load_settings(&store, "papa@example.com").await.unwrap();
        assert_eq!(loaded.adults, 1);
        assert_eq!(loaded.children[0].stage, ChildStage::Toddler);
        assert_eq!(loaded.calendar_id, "primary");
    }

    #[tokio::test]
    async fn import_rejects_invalid_settings() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("settings.json");
        std::fs::write(&file, r#"{"adults": "two"}"#).unwrap();

        let store_dir = dir.path().join("store");
        let err = import_settings(&store_dir, "papa@example.com", &file)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("rejected"));

        let store = FileSettingsStore::new(&store_dir);
        assert!(!store.path_for("papa@example.com").unwrap().exists());
    }

    #[tokio::test]
    async fn import_rejects_non_json() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("settings.json");
        std::fs::write(&file, "adults = 2").unwrap();
        let err = import_settings(dir.path(), "u", &file).await.unwrap_err();
        assert!(err.to_string().contains("is not JSON"));
    }
}
