mod config;
mod plan_cmds;
mod serve_cmd;
mod settings_cmds;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use config::{CliOverrides, KondateConfig};
use plan_cmds::GenerateOptions;

#[derive(Parser)]
#[command(name = "kondate", about = "Household meal-plan generator with calendar sync")]
struct Cli {
    /// Identity key for stored settings (overrides KONDATE_USER env var)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Calendar API bearer token (overrides KONDATE_ACCESS_TOKEN env var)
    #[arg(long, global = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a kondate config file
    Init {
        /// Gemini API key to store in the config file
        #[arg(long)]
        api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Household settings management
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Print the prompt that would be sent to the model
    Prompt {
        /// Number of days to plan (1-7)
        #[arg(long, default_value_t = 3)]
        days: u8,
        /// Free-text request, e.g. "more fish"
        #[arg(long, default_value = "")]
        request: String,
    },
    /// Generate a meal plan
    Generate {
        /// Number of days to plan (1-7)
        #[arg(long, default_value_t = 3)]
        days: u8,
        /// Date of day 1 (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Free-text request, e.g. "more fish"
        #[arg(long, default_value = "")]
        request: String,
        /// Save the plan as JSON
        #[arg(long)]
        output: Option<PathBuf>,
        /// Register the plan on the calendar after generating it
        #[arg(long)]
        register: bool,
        /// Use the built-in sample plan instead of calling the model
        #[arg(long)]
        offline: bool,
    },
    /// Register a saved plan on the calendar
    Register {
        /// Plan JSON written by `kondate generate --output`
        file: PathBuf,
        /// Date of day 1 (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// Start the HTTP API server
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
        /// Use the built-in sample plan instead of calling the model
        #[arg(long)]
        offline: bool,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the effective settings as JSON
    Show,
    /// Validate and store a settings JSON file
    Import {
        /// Path to the settings JSON file
        file: String,
    },
}

/// Execute the `kondate init` command: write config file.
fn cmd_init(api_key: Option<String>, user: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let has_key = api_key.is_some();
    let cfg = config::ConfigFile {
        model: config::ModelSection {
            provider: Some("gemini".to_string()),
            name: Some(kondate_core::model::DEFAULT_GEMINI_MODEL.to_string()),
            api_key,
        },
        auth: config::AuthSection {
            user: user.clone(),
            access_token: None,
        },
        storage: config::StorageSection {
            settings_dir: Some(config::default_settings_dir().display().to_string()),
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  model.name = {}", kondate_core::model::DEFAULT_GEMINI_MODEL);
    println!("  model.api_key = {}", if has_key { "(set)" } else { "(not set)" });
    if let Some(user) = &user {
        println!("  auth.user = {user}");
    }
    if !has_key {
        println!();
        println!("Set GEMINI_API_KEY or rerun with --api-key before `kondate generate`.");
    }

    Ok(())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let overrides = |offline: bool| CliOverrides {
        user: cli.user.clone(),
        access_token: cli.access_token.clone(),
        offline,
    };

    match cli.command {
        Commands::Init { api_key, force } => {
            cmd_init(api_key, cli.user.clone(), force)?;
        }
        Commands::Settings { command } => {
            let resolved = KondateConfig::resolve(&overrides(false))?;
            settings_cmds::run_settings_command(command, &resolved).await?;
        }
        Commands::Prompt { days, ref request } => {
            let resolved = KondateConfig::resolve(&overrides(false))?;
            plan_cmds::run_prompt(&resolved, days, request).await?;
        }
        Commands::Generate {
            days,
            start,
            ref request,
            ref output,
            register,
            offline,
        } => {
            let resolved = KondateConfig::resolve(&overrides(offline))?;
            let options = GenerateOptions {
                days,
                start: start.unwrap_or_else(today),
                request: request.clone(),
                output: output.clone(),
                register,
            };
            plan_cmds::run_generate(&resolved, &options).await?;
        }
        Commands::Register { ref file, start } => {
            let resolved = KondateConfig::resolve(&overrides(false))?;
            plan_cmds::run_register(&resolved, file, start.unwrap_or_else(today)).await?;
        }
        Commands::Serve {
            ref bind,
            port,
            offline,
        } => {
            let resolved = KondateConfig::resolve(&overrides(offline))?;
            serve_cmd::run_serve(&resolved, bind, port).await?;
        }
    }

    Ok(())
}
