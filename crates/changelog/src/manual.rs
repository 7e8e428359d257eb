//! Direct insert at the active cell
//!
//! Unlike [`crate::upsert`], this writes exactly where the user's cursor is,
//! on the change-log sheet only, and never over existing content.

use crate::sheet::is_change_log;
use crate::write::{place_block, WriteMode};
use clog_core::{CellRef, CellValue, GridRange, LogError, Workbook};
use tracing::debug;

/// Write `cells` at the active cell and move the cursor one row down
///
/// Returns the new active cell.
pub async fn insert_at_active_cell(
    workbook: &dyn Workbook,
    cells: Vec<CellValue>,
) -> Result<CellRef, LogError> {
    let sheet = workbook.active_worksheet().await?;
    let at = workbook.active_cell().await?;

    if !is_change_log(&sheet) {
        return Err(LogError::WrongSheet);
    }

    let row = cells.into_iter().map(Some).collect();
    place_block(workbook, &sheet, at, vec![row], WriteMode::RequireEmpty).await?;

    let next = at.down(1);
    workbook.select(&sheet, GridRange::cell(next)).await?;
    debug!(sheet = %sheet, at = %at, "Inserted entry at cursor");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clog_core::MemoryWorkbook;

    fn cells() -> Vec<CellValue> {
        ["id1", "Inputs", "=HYPERLINK(\"#Inputs!B2\",\"B2\")", "Desc", "JS"]
            .into_iter()
            .map(CellValue::from)
            .collect()
    }

    #[tokio::test]
    async fn test_wrong_sheet() {
        let wb = MemoryWorkbook::new(&["Inputs", "Change log"]);
        wb.activate("Inputs").await.unwrap();
        let result = insert_at_active_cell(&wb, cells()).await;
        assert!(matches!(result, Err(LogError::WrongSheet)));
        assert!(wb.used_range("Inputs").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_advances_cursor() {
        let wb = MemoryWorkbook::new(&["change LOG"]);
        let at = CellRef::new(4, 0);
        wb.select("change LOG", GridRange::cell(at)).await.unwrap();

        let next = insert_at_active_cell(&wb, cells()).await.unwrap();
        assert_eq!(next, CellRef::new(5, 0));
        assert_eq!(wb.active_cell().await.unwrap(), next);

        let row = wb.read("change LOG", GridRange::sized(at, 1, 5)).await.unwrap();
        assert_eq!(row[0], cells());
    }

    #[tokio::test]
    async fn test_occupied_destination() {
        let wb = MemoryWorkbook::new(&["Change log"]);
        let at = CellRef::new(2, 0);
        wb.write("Change log", CellRef::new(2, 3), &[vec![Some(CellValue::from("taken"))]])
            .await
            .unwrap();
        wb.select("Change log", GridRange::cell(at)).await.unwrap();

        let result = insert_at_active_cell(&wb, cells()).await;
        assert!(matches!(result, Err(LogError::DestinationNotEmpty)));

        let selection = wb.selected_range().await.unwrap();
        assert_eq!(selection.range, GridRange::sized(at, 1, 5));
        assert!(wb.cell("Change log", at).is_none());
    }
}
