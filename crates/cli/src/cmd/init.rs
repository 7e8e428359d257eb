//! Create a workbook snapshot

use anyhow::{Context, Result};
use changelog::is_change_log;
use clog_core::MemoryWorkbook;
use owo_colors::OwoColorize;
use std::path::Path;

const CHANGE_LOG_SHEET: &str = "Change log";

pub async fn run(workbook_path: &Path, data_sheet: &str, with_change_log: bool, force: bool) -> Result<()> {
    if workbook_path.exists() && !force {
        anyhow::bail!(
            "Workbook already exists at {} (use --force to overwrite)",
            workbook_path.display()
        );
    }
    if is_change_log(data_sheet) {
        anyhow::bail!("The data sheet cannot be named like the change log: '{}'", data_sheet);
    }

    let mut sheets = vec![data_sheet];
    if with_change_log {
        sheets.push(CHANGE_LOG_SHEET);
    }
    let workbook = MemoryWorkbook::new(&sheets);

    if let Some(parent) = workbook_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    workbook
        .save(workbook_path)
        .context("Failed to write workbook snapshot")?;

    println!("{} Created workbook at {}", "✓".green(), workbook_path.display());
    println!();
    println!("Sheets:");
    for sheet in &sheets {
        println!("  - {}", sheet.cyan());
    }
    println!();
    println!("Next steps:");
    println!("  - Run 'clog session' to capture addresses");
    if !with_change_log {
        println!("  - Add a 'Change log' sheet before enabling auto-save");
    }
    Ok(())
}
