//! Block placement shared by the template, upsert and manual insert paths

use clog_core::{CellRef, CellValue, GridRange, LogError, Workbook};
use clog_core::workbook::is_blank_block;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Fail with `DestinationNotEmpty` (and select the target) unless blank
    RequireEmpty,
    /// Overwrite; `None` cells are skipped when `skip_none`, cleared otherwise
    Overwrite { skip_none: bool },
}

/// Write `rows` at `origin`, padding ragged rows to the widest one
///
/// Returns the range the block covers.
pub(crate) async fn place_block(
    workbook: &dyn Workbook,
    sheet: &str,
    origin: CellRef,
    rows: Vec<Vec<Option<CellValue>>>,
    mode: WriteMode,
) -> Result<GridRange, LogError> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
    let target = GridRange::sized(origin, rows.len() as u32, width);

    if mode == WriteMode::RequireEmpty {
        let existing = workbook.read(sheet, target).await?;
        if !is_blank_block(&existing) {
            debug!(sheet, range = %target, "Destination not empty");
            workbook.select(sheet, target).await?;
            return Err(LogError::DestinationNotEmpty);
        }
    }

    let clear_missing = matches!(mode, WriteMode::Overwrite { skip_none: false });
    let block: Vec<Vec<Option<CellValue>>> = rows
        .into_iter()
        .map(|mut row| {
            row.resize(width as usize, None);
            if clear_missing {
                row.into_iter()
                    .map(|cell| Some(cell.unwrap_or_default()))
                    .collect()
            } else {
                row
            }
        })
        .collect();

    workbook.write(sheet, origin, &block).await?;
    Ok(target)
}
