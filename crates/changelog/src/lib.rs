//! Change-log worksheet protocol
//!
//! This crate provides:
//! - Change-log sheet resolution (name-normalized lookup)
//! - The header template written into an empty log
//! - Upsert by entry id (sparse overwrite or grouped insert)
//! - Direct insert at the active cell

pub mod manual;
pub mod sheet;
pub mod template;
pub mod upsert;
mod write;

// Re-exports
pub use manual::insert_at_active_cell;
pub use sheet::{change_log_exists, find_change_log, is_change_log, resolve_change_log};
pub use template::{write_template, DEFAULT_TITLE};
pub use upsert::{insertion_index, upsert, LogStyle, UpsertOutcome};

use clog_core::CellValue;

/// Column offsets within a change-log row
pub const ID_COL: u32 = 0;
pub const SHEET_COL: u32 = 1;
pub const CELLS_COL: u32 = 2;
pub const DESCRIPTION_COL: u32 = 3;
pub const INITIALS_COL: u32 = 4;

/// Row data for one entry
///
/// In a partial patch `None` means "leave this cell alone"; in a full patch
/// it means "clear this cell".
#[derive(Debug, Clone, PartialEq)]
pub struct RowPatch {
    pub cells: Vec<Option<CellValue>>,
    pub partial: bool,
}

impl RowPatch {
    pub fn new(cells: Vec<Option<CellValue>>, partial: bool) -> Self {
        Self { cells, partial }
    }

    /// Every column written
    pub fn full(cells: Vec<CellValue>) -> Self {
        Self {
            cells: cells.into_iter().map(Some).collect(),
            partial: false,
        }
    }

    /// Only the description column
    pub fn description(text: &str) -> Self {
        let mut cells = vec![None; DESCRIPTION_COL as usize + 1];
        cells[DESCRIPTION_COL as usize] = Some(CellValue::from(text));
        Self { cells, partial: true }
    }
}
