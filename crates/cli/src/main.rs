//! Change logger CLI - clog command

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clog_lib::config;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cmd;

const LOG_ENV: &str = "CLOG_LOG";

/// Change logger - capture cell references and log them to a shared change log
#[derive(Parser)]
#[command(name = "clog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workbook snapshot to work on (default: <data_dir>/change-logger/workbook.json)
    #[arg(long, global = true)]
    workbook: Option<PathBuf>,

    /// Config file (default: <config_dir>/change-logger/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a workbook snapshot to log changes against
    Init {
        /// Name of the data sheet
        #[arg(long, default_value = "Sheet1")]
        sheet: String,

        /// Don't add an empty "Change log" sheet
        #[arg(long)]
        no_change_log: bool,

        /// Overwrite an existing snapshot
        #[arg(short, long)]
        force: bool,
    },
    /// Run the interactive change-logger panel
    Session {
        /// Keep auto-save off at start even if the config enables it
        #[arg(long)]
        no_autosave: bool,
    },
    /// Print the change log sheet
    Show {
        /// Print every column, including QC columns and raw formulas
        #[arg(long)]
        all: bool,
    },
    /// View and edit configuration
    Config {
        /// List all configuration values
        #[arg(long)]
        list: bool,

        /// Get a single configuration value
        #[arg(long, value_name = "KEY")]
        get: Option<String>,

        /// Set a configuration value
        #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
        set: Option<Vec<String>>,

        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Create the config file with defaults if it doesn't exist (with --path)
        #[arg(long, requires = "path")]
        create: bool,

        /// Show an example configuration
        #[arg(long)]
        example: bool,
    },
}

/// Stderr logging for one-shot commands
fn init_stderr_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// File logging for the interactive session, which owns the terminal
fn init_file_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let appender = tracing_appender::rolling::daily(log_dir, "session.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = config::data_dir();
    let workbook_path = cli
        .workbook
        .unwrap_or_else(|| data_dir.join("workbook.json"));
    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_file_path().context("Could not determine config file path")?,
    };

    let _guard = match &cli.command {
        Commands::Session { .. } => Some(init_file_tracing(&data_dir.join("logs"))?),
        _ => {
            init_stderr_tracing();
            None
        }
    };

    match cli.command {
        Commands::Init { sheet, no_change_log, force } => {
            cmd::init::run(&workbook_path, &sheet, !no_change_log, force).await
        }
        Commands::Session { no_autosave } => {
            let settings_path = data_dir.join("settings.json");
            cmd::session::run(&workbook_path, &config_path, &settings_path, no_autosave).await
        }
        Commands::Show { all } => cmd::show::run(&workbook_path, all).await,
        Commands::Config { list, get, set, path, create, example } => {
            if list {
                cmd::config::run_list(&config_path).await
            } else if let Some(key) = get {
                cmd::config::run_get(&config_path, &key).await
            } else if let Some(pair) = set {
                cmd::config::run_set(&config_path, &pair[0], &pair[1]).await
            } else if path {
                cmd::config::run_path(&config_path, create).await
            } else if example {
                cmd::config::run_example().await
            } else {
                cmd::config::run_list(&config_path).await
            }
        }
    }
}
