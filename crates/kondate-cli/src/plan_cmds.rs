//! `kondate prompt`, `kondate generate`, and `kondate register`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};

use kondate_core::PlanError;
use kondate_core::calendar::GoogleCalendar;
use kondate_core::model::create_model;
use kondate_core::plan::{
    GenerationRequest, NormalizedPlan, build_prompt, generate_plan, register_plan,
};
use kondate_core::settings::{FileSettingsStore, SettingsRecord, load_settings};

use crate::config::KondateConfig;

/// Options for `kondate generate`.
#[derive(Debug)]
pub struct GenerateOptions {
    pub days: u8,
    pub start: NaiveDate,
    pub request: String,
    pub output: Option<PathBuf>,
    pub register: bool,
}

/// Settings for the configured user, or defaults when no user is set.
pub async fn household_settings(cfg: &KondateConfig) -> Result<SettingsRecord> {
    match cfg.user.as_deref() {
        Some(user) => {
            let store = FileSettingsStore::new(&cfg.settings_dir);
            load_settings(&store, user)
                .await
                .with_context(|| format!("failed to load settings for {user}"))
        }
        None => {
            tracing::warn!("no user configured; using default household settings");
            Ok(SettingsRecord::default())
        }
    }
}

/// Render a plan for the terminal: each day under its `M/D` date label,
/// then the shopping list.
pub fn render_plan(plan: &NormalizedPlan, start: NaiveDate, requested: u8) -> String {
    let mut out = String::new();
    for (i, day) in plan.days.iter().enumerate() {
        let label = start
            .checked_add_days(Days::new(i as u64))
            .map(|d| d.format("%-m/%-d").to_string())
            .unwrap_or_else(|| format!("day {}", i + 1));
        out.push_str(&format!("=== {label} ===\n{}\n\n", day.trim_end()));
    }
    let shortfall = plan.shortfall(requested);
    if shortfall > 0 {
        out.push_str(&format!(
            "(only {} of {requested} days were generated)\n\n",
            plan.days.len()
        ));
    }
    if !plan.shopping_list.is_empty() {
        out.push_str("=== shopping list ===\n");
        out.push_str(plan.shopping_list.trim_end());
        out.push('\n');
    }
    out
}

/// Execute `kondate prompt`: print the prompt that would be sent.
pub async fn run_prompt(cfg: &KondateConfig, days: u8, request: &str) -> Result<()> {
    let settings = household_settings(cfg).await?;
    let req = GenerationRequest::new(days, settings, request)?;
    println!("{}", build_prompt(&req));
    Ok(())
}

/// Execute `kondate generate`.
pub async fn run_generate(cfg: &KondateConfig, opts: &GenerateOptions) -> Result<()> {
    let settings = household_settings(cfg).await?;
    let calendar_id = settings.calendar_id.clone();
    let req = GenerationRequest::new(opts.days, settings, opts.request.clone())?;
    let model = create_model(&cfg.model)?;

    let plan = match generate_plan(model.as_ref(), &req).await {
        Ok(plan) => plan,
        Err(err) => {
            if let Some(raw) = err.raw_output() {
                println!("--- raw model output ---\n{raw}\n------------------------");
            }
            return Err(err.into());
        }
    };

    print!("{}", render_plan(&plan, opts.start, opts.days));

    if let Some(path) = &opts.output {
        write_plan(path, &plan)?;
        println!("Plan written to {}", path.display());
    }

    if opts.register {
        let credential = cfg.credential();
        let sink = GoogleCalendar::new();
        let report = register_plan(
            &sink,
            credential.as_ref(),
            &plan.days,
            opts.start,
            &calendar_id,
        )
        .await?;
        println!("Registered {} event(s) on calendar {calendar_id}.", report.inserted_count);
    }

    Ok(())
}

/// Execute `kondate register`: submit a saved plan.
pub async fn run_register(cfg: &KondateConfig, file: &Path, start: NaiveDate) -> Result<()> {
    let plan = read_plan(file)?;
    let settings = household_settings(cfg).await?;
    let credential = cfg.credential();
    let sink = GoogleCalendar::new();

    match register_plan(
        &sink,
        credential.as_ref(),
        &plan.days,
        start,
        &settings.calendar_id,
    )
    .await
    {
        Ok(report) => {
            println!(
                "Registered {} event(s) on calendar {}.",
                report.inserted_count, settings.calendar_id
            );
            Ok(())
        }
        Err(PlanError::MissingCredential) => anyhow::bail!(
            "no calendar access token; pass --access-token or set KONDATE_ACCESS_TOKEN"
        ),
        Err(e) => Err(e.into()),
    }
}

/// Save a plan as `{"days": [...], "shoppingList": "..."}`.
pub fn write_plan(path: &Path, plan: &NormalizedPlan) -> Result<()> {
    let contents = serde_json::to_string_pretty(plan).context("failed to serialize plan")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write plan file at {}", path.display()))
}

/// Load a plan saved by [`write_plan`]. Blank days are rejected.
pub fn read_plan(path: &Path) -> Result<NormalizedPlan> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan file at {}", path.display()))?;
    let plan: NormalizedPlan = serde_json::from_str(&contents)
        .with_context(|| format!("invalid plan file at {}", path.display()))?;
    if plan.days.iter().any(|d| d.trim().is_empty()) {
        anyhow::bail!("plan file at {} contains a blank day", path.display());
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_plan() -> NormalizedPlan {
        NormalizedPlan {
            days: vec!["[menu]\nCurry".to_string(), "[menu]\nFish\n".to_string()],
            shopping_list: "- rice\n- salmon".to_string(),
        }
    }

    #[test]
    fn render_labels_days_with_dates() {
        let out = render_plan(&sample_plan(), ymd(2024, 1, 31), 2);
        assert!(out.contains("=== 1/31 ===\n[menu]\nCurry\n"));
        assert!(out.contains("=== 2/1 ===\n[menu]\nFish\n"));
        assert!(out.contains("=== shopping list ===\n- rice\n- salmon\n"));
        assert!(!out.contains("only"));
    }

    #[test]
    fn render_reports_shortfall() {
        let out = render_plan(&sample_plan(), ymd(2024, 1, 1), 4);
        assert!(out.contains("only 2 of 4 days were generated"));
    }

    #[test]
    fn render_omits_empty_shopping_list() {
        let plan = NormalizedPlan {
            days: vec!["x".to_string()],
            shopping_list: String::new(),
        };
        assert!(!render_plan(&plan, ymd(2024, 1, 1), 1).contains("shopping list"));
    }

    #[test]
    fn plan_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.json");
        write_plan(&path, &sample_plan()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("shoppingList").is_some());

        assert_eq!(read_plan(&path).unwrap(), sample_plan());
    }

    #[test]
    fn read_plan_rejects_blank_days() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, r#"{"days": ["ok", "  "], "shoppingList": ""}"#).unwrap();
        let msg = read_plan(&path).unwrap_err().to_string();
        assert!(msg.contains("blank day"), "unexpected error: {msg}");
    }

    #[test]
    fn read_plan_tolerates_missing_shopping_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, r#"{"days": ["ok"]}"#).unwrap();
        assert_eq!(read_plan(&path).unwrap().shopping_list, "");
    }
}
