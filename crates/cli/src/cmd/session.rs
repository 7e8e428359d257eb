//! Interactive change-logger panel
//!
//! Reads one command per line from stdin. The workbook snapshot is written
//! back after every command so `clog show` sees the latest change log.

use super::show::print_change_log;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clog_core::address::parse_qualified;
use clog_core::{CellFormat, CellRef, FileSettings, GridRange, LogError, MemoryWorkbook, Workbook};
use clog_lib::config;
use clog_lib::telemetry::{self, FROM_SHORTCUT};
use clog_lib::{InsertOutcome, Panel, PanelParts, TerminalPresenter};
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Debounce periods to wait for pending saves before exiting
const FLUSH_ATTEMPTS: u32 = 20;

#[derive(Parser)]
#[command(no_binary_name = true, name = "clog>", disable_version_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Select a range, e.g. `B2:C4` or `'My Sheet'!A1`
    Select {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        address: Vec<String>,
    },
    /// Activate a worksheet
    Activate {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        sheet: Vec<String>,
    },
    /// Move the active cell on the active sheet
    Cursor { cell: String },
    /// Add a worksheet to the workbook
    AddSheet {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Fill the selected range with a colour
    Fill { colour: String },
    /// Capture the selected range as a new entry
    Capture {
        /// Tag the capture as triggered by the keyboard shortcut
        #[arg(long)]
        shortcut: bool,
    },
    /// Change an entry's description
    Describe {
        /// Entry number as shown by `list`
        entry: usize,
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Remove an entry from the panel
    Delete { entry: usize },
    /// Remove every entry from the panel
    Clear,
    /// Insert an entry at the active cell (or reset an inserted one)
    Insert { entry: usize },
    /// Insert every entry, moving down from the active cell
    InsertAll,
    /// Turn auto-save on or off
    Autosave { state: Toggle },
    /// Show or set your initials
    Initials { value: Option<String> },
    /// Show or set the fill colour for new change-log rows
    Colour { value: Option<String> },
    /// Use the active cell's fill as the row colour
    SampleColour,
    /// Jump to an entry's range
    Goto {
        entry: usize,
        /// Only activate the entry's sheet
        #[arg(long)]
        sheet_only: bool,
    },
    /// Show captured entries
    List,
    /// Print the change log sheet
    Log,
    /// Close the current notice
    Dismiss,
    /// Leave the session
    Quit,
}

impl SessionCommand {
    /// Replace word-split free text with the line's own spacing
    fn with_raw_text(self, line: &str) -> Self {
        let rest = |words| vec![rest_of_line(line, words).to_string()];
        match self {
            SessionCommand::Select { .. } => SessionCommand::Select { address: rest(1) },
            SessionCommand::Activate { .. } => SessionCommand::Activate { sheet: rest(1) },
            SessionCommand::AddSheet { .. } => SessionCommand::AddSheet { name: rest(1) },
            SessionCommand::Describe { entry, .. } => SessionCommand::Describe { entry, text: rest(2) },
            other => other,
        }
    }
}

/// What follows the first `words` whitespace-separated words of `line`
fn rest_of_line(line: &str, words: usize) -> &str {
    let mut rest = line.trim();
    for _ in 0..words {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = &rest[end..];
    }
    rest.trim_start()
}

pub async fn run(workbook_path: &Path, config_path: &Path, settings_path: &Path, no_autosave: bool) -> Result<()> {
    let mut config = config::load_from(config_path)?;
    if no_autosave {
        config.autosave.enabled_on_start = false;
    }

    let workbook = Arc::new(MemoryWorkbook::load(workbook_path).with_context(|| {
        format!(
            "Failed to open workbook {} (run 'clog init' first)",
            workbook_path.display()
        )
    })?);
    let settings = FileSettings::open(settings_path, None).context("Failed to open settings")?;

    let parts = PanelParts {
        workbook: workbook.clone(),
        settings: Arc::new(settings),
        presenter: Arc::new(TerminalPresenter::new(true)),
        telemetry: telemetry::from_config(&config.telemetry),
    };
    let panel = Panel::new(parts, config);
    info!(workbook = %workbook_path.display(), "Session started");

    panel.act("start", panel.start()).await;
    println!("{}", "Type 'help' for commands, 'quit' to leave.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "clog>".bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let command = match SessionLine::try_parse_from(&words) {
            Ok(parsed) => parsed.command.with_raw_text(&line),
            Err(e) => {
                e.print()?;
                continue;
            }
        };
        if matches!(command, SessionCommand::Quit) {
            break;
        }

        execute(&panel, &workbook, command).await;
        persist(&workbook, workbook_path);
    }

    flush_pending(&panel).await;
    persist(&workbook, workbook_path);
    info!("Session ended");
    Ok(())
}

async fn execute(panel: &Panel, workbook: &MemoryWorkbook, command: SessionCommand) {
    match command {
        SessionCommand::Select { address } => {
            let address = address.join(" ");
            panel
                .act("select", async {
                    let (sheet, range) = parse_qualified(&address)
                        .ok_or_else(|| clog_core::WorkbookError::InvalidRange(address.clone()))?;
                    let sheet = match sheet {
                        Some(sheet) => sheet,
                        None => workbook.active_worksheet().await?,
                    };
                    workbook.select(&sheet, range).await?;
                    Ok::<_, LogError>(())
                })
                .await;
        }
        SessionCommand::Activate { sheet } => {
            let sheet = sheet.join(" ");
            panel
                .act("activate", async { Ok::<_, LogError>(workbook.activate(&sheet).await?) })
                .await;
        }
        SessionCommand::Cursor { cell } => {
            panel
                .act("cursor", async {
                    let at = CellRef::parse(&cell)
                        .ok_or_else(|| clog_core::WorkbookError::InvalidRange(cell.clone()))?;
                    let sheet = workbook.active_worksheet().await?;
                    workbook.select(&sheet, GridRange::cell(at)).await?;
                    Ok::<_, LogError>(())
                })
                .await;
        }
        SessionCommand::AddSheet { name } => {
            let name = name.join(" ");
            workbook.add_sheet(&name);
            println!("{} Added sheet {}", "✓".green(), name.cyan());
        }
        SessionCommand::Fill { colour } => {
            if !is_hex_colour(&colour) {
                eprintln!("{} colour must look like #rrggbb", "Error:".red().bold());
                return;
            }
            panel
                .act("fill", async {
                    let selection = workbook.selected_range().await?;
                    workbook
                        .format(&selection.sheet, selection.range, &CellFormat::with_fill(colour.clone()))
                        .await?;
                    Ok::<_, LogError>(())
                })
                .await;
        }
        SessionCommand::Capture { shortcut } => {
            let context = if shortcut { FROM_SHORTCUT } else { "" };
            panel.act("capture", panel.capture(context)).await;
        }
        SessionCommand::Describe { entry, text } => {
            let text = text.join(" ");
            panel
                .act("describe", async {
                    let id = entry_id(panel, entry)?;
                    panel.edit_description(&id, &text)
                })
                .await;
        }
        SessionCommand::Delete { entry } => {
            panel
                .act("delete", async {
                    let id = entry_id(panel, entry)?;
                    panel.delete_entry(&id)
                })
                .await;
        }
        SessionCommand::Clear => {
            let removed = panel.delete_all();
            println!("Removed {} entries", removed);
        }
        SessionCommand::Insert { entry } => {
            let outcome = panel
                .act("insert", async {
                    let id = entry_id(panel, entry)?;
                    panel.insert_entry(&id).await
                })
                .await;
            if let Some(InsertOutcome::Inserted { next }) = outcome {
                println!("{} Inserted; cursor now at {}", "✓".green(), next.to_string().cyan());
            }
        }
        SessionCommand::InsertAll => {
            if let Some(count) = panel.act("insert-all", panel.insert_all()).await {
                println!("{} Inserted {} entries", "✓".green(), count);
            }
        }
        SessionCommand::Autosave { state } => {
            let enabled = matches!(state, Toggle::On);
            panel.act("autosave", panel.set_autosave(enabled)).await;
            panel.render();
        }
        SessionCommand::Initials { value: None } => {
            if let Some(initials) = panel.act("initials", async { panel.stored_initials() }).await {
                println!("{}", if initials.is_empty() { "(not set)".to_string() } else { initials });
            }
        }
        SessionCommand::Initials { value: Some(value) } => {
            panel.act("initials", async { panel.set_initials(&value) }).await;
        }
        SessionCommand::Colour { value: None } => {
            if let Some(colour) = panel.act("colour", async { panel.fill_colour() }).await {
                println!("{}", colour);
            }
        }
        SessionCommand::Colour { value: Some(value) } => {
            if !is_hex_colour(&value) {
                eprintln!("{} colour must look like #rrggbb", "Error:".red().bold());
                return;
            }
            panel.act("colour", async { panel.set_fill_colour(&value) }).await;
        }
        SessionCommand::SampleColour => {
            if let Some(colour) = panel.act("sample-colour", panel.sample_fill_colour()).await {
                println!("Fill colour is now {}", colour);
            }
        }
        SessionCommand::Goto { entry, sheet_only } => {
            panel
                .act("goto", async {
                    let id = entry_id(panel, entry)?;
                    if sheet_only {
                        panel.go_to_sheet(&id).await
                    } else {
                        panel.go_to_address(&id).await
                    }
                })
                .await;
        }
        SessionCommand::List => panel.render(),
        SessionCommand::Dismiss => panel.dismiss_notice(),
        SessionCommand::Log => {
            if let Err(e) = print_change_log(workbook, false).await {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            }
        }
        SessionCommand::Quit => {}
    }
}

fn entry_id(panel: &Panel, number: usize) -> Result<String, LogError> {
    panel
        .entry_id_at(number)
        .ok_or_else(|| LogError::MissingEntry(format!("#{}", number)))
}

fn is_hex_colour(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn persist(workbook: &MemoryWorkbook, path: &Path) {
    if let Err(e) = workbook.save(path) {
        warn!("Failed to save workbook: {}", e);
        eprintln!("{} {}", "Failed to save workbook:".red(), e);
    }
}

/// Give queued auto-saves a chance to land before the snapshot is written
async fn flush_pending(panel: &Panel) {
    let step = panel.config().debounce();
    for _ in 0..FLUSH_ATTEMPTS {
        if panel.pending_saves() == 0 {
            break;
        }
        tokio::time::sleep(step).await;
    }
    // A save that already left the queue may still be writing.
    tokio::time::sleep(step).await;
}
