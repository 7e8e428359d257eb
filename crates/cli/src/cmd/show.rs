//! Print the change log sheet

use anyhow::{Context, Result};
use changelog::{find_change_log, CELLS_COL, INITIALS_COL};
use clog_core::{CellValue, MemoryWorkbook, Workbook};
use owo_colors::OwoColorize;
use std::path::Path;

/// Columns shown without `--all`: ID, Sheet, Cells, Description, Initials
const SUMMARY_COLS: usize = INITIALS_COL as usize + 1;

pub async fn run(workbook_path: &Path, all: bool) -> Result<()> {
    let workbook = MemoryWorkbook::load(workbook_path)
        .with_context(|| format!("Failed to open workbook {}", workbook_path.display()))?;
    print_change_log(&workbook, all).await
}

/// Print the non-blank rows of the change log
pub async fn print_change_log(workbook: &dyn Workbook, all: bool) -> Result<()> {
    let Some(sheet) = find_change_log(workbook).await? else {
        println!("{}", "No change log sheet in this workbook".yellow());
        return Ok(());
    };

    let Some(used) = workbook.used_range(&sheet).await? else {
        println!("{} {}", sheet.bold(), "(empty)".dimmed());
        return Ok(());
    };

    let rows = workbook.read(&sheet, used).await?;
    println!("{} {}", sheet.bold(), used.to_a1().dimmed());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for (i, row) in rows.iter().enumerate() {
        if row.iter().all(CellValue::is_blank) {
            continue;
        }
        let width = if all { row.len() } else { row.len().min(SUMMARY_COLS) };
        let cells: Vec<String> = row[..width]
            .iter()
            .enumerate()
            .map(|(col, value)| render_cell(col, value, all))
            .collect();
        println!("{:>4}  {}", (used.start.row as usize + i + 1).dimmed(), cells.join(" | "));
    }

    Ok(())
}

fn render_cell(col: usize, value: &CellValue, all: bool) -> String {
    let text = value.display();
    if !all && col == CELLS_COL as usize && text.starts_with('=') {
        return "[link]".cyan().to_string();
    }
    text
}
