//! Configuration management command
//!
//! Provides CLI interface to view and edit the panel configuration.

use anyhow::{Context, Result};
use clog_lib::config::{self, PanelConfig};
use owo_colors::OwoColorize;
use std::path::Path;

/// List all configuration values
pub async fn run_list(config_path: &Path) -> Result<()> {
    let config = config::load_from(config_path)?;

    println!("{}", "Change Logger Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[autosave]".yellow());
    println!(
        "  {} = {} {}",
        "debounce_ms".cyan(),
        config.autosave.debounce_ms,
        format!("({}ms quiet period)", config.autosave.debounce_ms).dimmed()
    );
    println!("  {} = {}", "capture_limit".cyan(), config.autosave.capture_limit);
    println!("  {} = {}", "enabled_on_start".cyan(), config.autosave.enabled_on_start);

    println!("\n{}", "[manual]".yellow());
    println!("  {} = {}", "capture_limit".cyan(), config.manual.capture_limit);

    println!("\n{}", "[changelog]".yellow());
    println!("  {} = {:?}", "template_title".cyan(), config.changelog.template_title);

    println!("\n{}", "[telemetry]".yellow());
    println!("  {} = {}", "enabled".cyan(), config.telemetry.enabled);
    println!(
        "  {} = {}",
        "endpoint".cyan(),
        config.telemetry.endpoint.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  {} = {}",
        "api_key".cyan(),
        if config.telemetry.api_key.is_some() { "(set)" } else { "(not set)" }
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  debounce_ms: 1-10,000");
    println!("  capture_limit: 1-1,000");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(config_path: &Path, key: &str) -> Result<()> {
    let config = config::load_from(config_path)?;

    let value = config.get(key).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown config key: {}. Use 'clog config --list' to see available keys.",
            key
        )
    })?;

    println!("{}", value);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(config_path: &Path, key: &str, value: &str) -> Result<()> {
    let mut config = config::load_from(config_path)?;
    apply(&mut config, key, value)?;

    // Validate before saving
    config.validate().context("Invalid configuration value")?;

    config::save_to(config_path, &config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    println!("{}", "Note: Restart the session for changes to take effect".yellow());

    Ok(())
}

fn apply(config: &mut PanelConfig, key: &str, value: &str) -> Result<()> {
    let optional = |v: &str| if v.is_empty() { None } else { Some(v.to_string()) };

    match key {
        "autosave.debounce_ms" => {
            config.autosave.debounce_ms = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "autosave.capture_limit" => {
            config.autosave.capture_limit = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "autosave.enabled_on_start" => {
            config.autosave.enabled_on_start = value
                .parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        "manual.capture_limit" => {
            config.manual.capture_limit = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "changelog.template_title" => config.changelog.template_title = value.to_string(),
        "telemetry.enabled" => {
            config.telemetry.enabled = value
                .parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        "telemetry.endpoint" => config.telemetry.endpoint = optional(value),
        "telemetry.api_key" => config.telemetry.api_key = optional(value),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'clog config --list' to see available keys.",
            key
        ),
    }
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(config_path: &Path, create: bool) -> Result<()> {
    if create && config::init_if_missing(config_path)? {
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", config::example_config());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_keys() {
        let mut config = PanelConfig::default();
        apply(&mut config, "autosave.debounce_ms", "120").unwrap();
        apply(&mut config, "telemetry.endpoint", "https://telemetry.invalid").unwrap();
        apply(&mut config, "telemetry.api_key", "").unwrap();
        assert_eq!(config.autosave.debounce_ms, 120);
        assert_eq!(config.telemetry.endpoint.as_deref(), Some("https://telemetry.invalid"));
        assert_eq!(config.telemetry.api_key, None);

        assert!(apply(&mut config, "manual.capture_limit", "many").is_err());
        assert!(apply(&mut config, "gc.retain_count", "1").is_err());
    }
}
