//! Upsert one entry row into the change log
//!
//! An entry's row is found by scanning the ID column. Found rows are
//! overwritten in place (sparsely for partial patches). Missing rows are
//! inserted below the last row carrying the same initials, so each author's
//! entries stay grouped; with no such row the new row goes after the last
//! non-blank row.
//!
//! The log is re-read after every host round trip that could have moved it.

use crate::sheet::resolve_change_log;
use crate::template::{write_template, DEFAULT_TITLE};
use crate::write::{place_block, WriteMode};
use crate::{RowPatch, ID_COL, INITIALS_COL};
use clog_core::{CellFormat, CellValue, GridRange, LogError, Workbook};
use tracing::{debug, info};

/// Row index of the header within a fresh template
const HEADER_ROW: u32 = 1;

const ID_FONT_SIZE: f64 = 8.0;
const ID_FONT_COLOUR: &str = "#c2c2c2";

/// Presentation settings for inserted rows
#[derive(Debug, Clone)]
pub struct LogStyle {
    /// Title written when the log has to be initialized
    pub template_title: String,
    /// Fill applied to every data column but the ID of an inserted row
    pub fill_colour: Option<String>,
}

impl Default for LogStyle {
    fn default() -> Self {
        Self {
            template_title: DEFAULT_TITLE.to_string(),
            fill_colour: None,
        }
    }
}

/// What `upsert` did, with the absolute row it touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Updated { row: u32 },
    Inserted { row: u32 },
}

impl UpsertOutcome {
    pub fn row(&self) -> u32 {
        match self {
            UpsertOutcome::Updated { row } | UpsertOutcome::Inserted { row } => *row,
        }
    }
}

/// Write `patch` as the row for `entry_id`
///
/// `full_row` is only consulted when a partial patch has no row to land on;
/// it must produce the complete row (or `None` when the entry is gone).
pub async fn upsert<F>(
    workbook: &dyn Workbook,
    entry_id: &str,
    initials: &str,
    patch: RowPatch,
    full_row: F,
    style: &LogStyle,
) -> Result<UpsertOutcome, LogError>
where
    F: FnOnce() -> Option<Vec<CellValue>> + Send,
{
    let sheet = resolve_change_log(workbook).await?;

    let used = match workbook.used_range(&sheet).await? {
        Some(used) => Some(used),
        None => {
            info!(sheet = %sheet, "Change log is empty, initializing");
            write_template(workbook, &sheet, &style.template_title).await?;
            None
        }
    };

    if let Some(used) = used {
        let ids = workbook.read(&sheet, used.column(ID_COL)).await?;
        let found = ids
            .iter()
            .rposition(|row| row.first().and_then(CellValue::as_text) == Some(entry_id));

        if let Some(index) = found {
            let origin = used.row(index as u32).start;
            let mode = WriteMode::Overwrite {
                skip_none: patch.partial,
            };
            place_block(workbook, &sheet, origin, vec![patch.cells], mode).await?;
            debug!(entry_id, row = origin.row, partial = patch.partial, "Updated change log row");
            return Ok(UpsertOutcome::Updated { row: origin.row });
        }
    }

    let cells: Vec<CellValue> = if patch.partial {
        full_row().ok_or_else(|| LogError::MissingEntry(entry_id.to_string()))?
    } else {
        patch.cells.into_iter().map(Option::unwrap_or_default).collect()
    };

    // Anything may have moved since the scan.
    let (used, anchor) = match workbook.used_range(&sheet).await? {
        Some(current) if used.is_some() => {
            let values = workbook.read(&sheet, current).await?;
            (current, insertion_index(&values, initials) as u32)
        }
        Some(current) => (current, HEADER_ROW),
        None => {
            let current = write_template(workbook, &sheet, &style.template_title).await?;
            (current, HEADER_ROW)
        }
    };

    let row = insert_row(workbook, &sheet, used.row(anchor), cells, style).await?;
    info!(entry_id, row, "Inserted change log row");
    Ok(UpsertOutcome::Inserted { row })
}

/// Row index (relative to the used range) the new row goes below
///
/// Walks upward from the bottom. Trailing blank rows pull the anchor up;
/// the first row whose initials match wins outright.
pub fn insertion_index(values: &[Vec<CellValue>], initials: &str) -> usize {
    let mut index = values.len().saturating_sub(1);
    let mut seen_content = false;

    for i in (1..values.len()).rev() {
        let row = &values[i];
        if !seen_content {
            if row.iter().all(CellValue::is_blank) {
                index = i - 1;
            } else {
                seen_content = true;
            }
        }
        if row.get(INITIALS_COL as usize).and_then(CellValue::as_text) == Some(initials) {
            index = i;
            break;
        }
    }

    index
}

async fn insert_row(
    workbook: &dyn Workbook,
    sheet: &str,
    anchor: GridRange,
    cells: Vec<CellValue>,
    style: &LogStyle,
) -> Result<u32, LogError> {
    let new_row = anchor.shifted_down(1);
    workbook.insert_shift_down(sheet, new_row).await?;
    workbook.copy_formats(sheet, new_row.shifted_down(1), new_row).await?;

    let cells = cells.into_iter().map(Some).collect();
    let inserted = place_block(workbook, sheet, new_row.start, vec![cells], WriteMode::RequireEmpty).await?;

    if let (Some(colour), Some(data)) = (&style.fill_colour, inserted.skip_cols(1)) {
        workbook.format(sheet, data, &CellFormat::with_fill(colour.clone())).await?;
    }

    let id_format = CellFormat {
        italic: Some(true),
        font_size: Some(ID_FONT_SIZE),
        font_colour: Some(ID_FONT_COLOUR.to_string()),
        ..Default::default()
    };
    workbook
        .format(sheet, GridRange::cell(inserted.start), &id_format)
        .await?;

    Ok(inserted.start.row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DESCRIPTION_COL, SHEET_COL};
    use async_trait::async_trait;
    use clog_core::workbook::WorkbookResult;
    use clog_core::{CellRef, MemoryWorkbook, Selection};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LOG: &str = "Change log";

    fn row(id: &str, initials: &str) -> Vec<CellValue> {
        vec![
            CellValue::from(id),
            CellValue::from("Inputs"),
            CellValue::from("=HYPERLINK(\"#Inputs!A1\",\"A1\")"),
            CellValue::from("Description of change..."),
            CellValue::from(initials),
        ]
    }

    async fn row_values(wb: &MemoryWorkbook, r: u32) -> Vec<CellValue> {
        let range = GridRange::sized(CellRef::new(r, 0), 1, 5);
        wb.read(LOG, range).await.unwrap().remove(0)
    }

    fn find_row(wb: &MemoryWorkbook, id: &str) -> Option<u32> {
        let (range, values) = wb.used_values(LOG).unwrap()?;
        values
            .iter()
            .position(|r| r[0].as_text() == Some(id))
            .map(|i| range.start.row + i as u32)
    }

    /// Template plus one data row per initials; the scaffold leaves blank rows below
    async fn seeded_log(initials: &[&str]) -> MemoryWorkbook {
        let wb = MemoryWorkbook::new(&["Inputs", LOG]);
        write_template(&wb, LOG, DEFAULT_TITLE).await.unwrap();
        let rows: Vec<Vec<Option<CellValue>>> = initials
            .iter()
            .enumerate()
            .map(|(i, who)| row(&format!("id{}", i + 2), who).into_iter().map(Some).collect())
            .collect();
        wb.write(LOG, CellRef::new(2, 0), &rows).await.unwrap();
        wb
    }

    /// Host where another user appends a row once the ID column has been scanned
    struct SharedWorkbook {
        inner: MemoryWorkbook,
        used_calls: AtomicUsize,
        intrusion: (u32, Vec<CellValue>),
    }

    #[async_trait]
    impl Workbook for SharedWorkbook {
        async fn worksheet_names(&self) -> WorkbookResult<Vec<String>> {
            self.inner.worksheet_names().await
        }

        async fn active_worksheet(&self) -> WorkbookResult<String> {
            self.inner.active_worksheet().await
        }

        async fn activate(&self, sheet: &str) -> WorkbookResult<()> {
            self.inner.activate(sheet).await
        }

        async fn active_cell(&self) -> WorkbookResult<CellRef> {
            self.inner.active_cell().await
        }

        async fn selected_range(&self) -> WorkbookResult<Selection> {
            self.inner.selected_range().await
        }

        async fn select(&self, sheet: &str, range: GridRange) -> WorkbookResult<()> {
            self.inner.select(sheet, range).await
        }

        async fn used_range(&self, sheet: &str) -> WorkbookResult<Option<GridRange>> {
            if self.used_calls.fetch_add(1, Ordering::SeqCst) == 1 {
                let (at, cells) = &self.intrusion;
                let cells: Vec<Option<CellValue>> = cells.iter().cloned().map(Some).collect();
                self.inner.write(sheet, CellRef::new(*at, 0), &[cells]).await?;
            }
            self.inner.used_range(sheet).await
        }

        async fn read(&self, sheet: &str, range: GridRange) -> WorkbookResult<Vec<Vec<CellValue>>> {
            self.inner.read(sheet, range).await
        }

        async fn write(
            &self,
            sheet: &str,
            origin: CellRef,
            rows: &[Vec<Option<CellValue>>],
        ) -> WorkbookResult<()> {
            self.inner.write(sheet, origin, rows).await
        }

        async fn insert_shift_down(&self, sheet: &str, range: GridRange) -> WorkbookResult<()> {
            self.inner.insert_shift_down(sheet, range).await
        }

        async fn copy_formats(&self, sheet: &str, from: GridRange, to: GridRange) -> WorkbookResult<()> {
            self.inner.copy_formats(sheet, from, to).await
        }

        async fn format(&self, sheet: &str, range: GridRange, patch: &CellFormat) -> WorkbookResult<()> {
            self.inner.format(sheet, range, patch).await
        }

        async fn set_column_width(&self, sheet: &str, col: u32, width: f64) -> WorkbookResult<()> {
            self.inner.set_column_width(sheet, col, width).await
        }

        async fn fill_colour(&self, sheet: &str, cell: CellRef) -> WorkbookResult<Option<String>> {
            self.inner.fill_colour(sheet, cell).await
        }
    }

    #[tokio::test]
    async fn test_insert_anchors_on_rows_written_after_scan() {
        // AB at 2, JS at 3, AB at 4, KL at 5; another JS row appears at 6 mid-upsert.
        let wb = SharedWorkbook {
            inner: seeded_log(&["AB", "JS", "AB", "KL"]).await,
            used_calls: AtomicUsize::new(0),
            intrusion: (6, row("other", "JS")),
        };

        let outcome = upsert(&wb, "new", "JS", RowPatch::full(row("new", "JS")), || None, &LogStyle::default())
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted { row: 7 });
        assert_eq!(wb.used_calls.load(Ordering::SeqCst), 2);

        assert_eq!(row_values(&wb.inner, 3).await[0], CellValue::from("id3"));
        assert_eq!(row_values(&wb.inner, 4).await[4], CellValue::from("AB"));
        assert_eq!(row_values(&wb.inner, 5).await[4], CellValue::from("KL"));
        assert_eq!(row_values(&wb.inner, 6).await, row("other", "JS"));
        assert_eq!(row_values(&wb.inner, 7).await, row("new", "JS"));
    }

    #[tokio::test]
    async fn test_missing_log_is_store_not_found() {
        let wb = MemoryWorkbook::new(&["Inputs"]);
        let result = upsert(&wb, "id", "JS", RowPatch::full(row("id", "JS")), || None, &LogStyle::default()).await;
        assert!(matches!(result, Err(LogError::StoreNotFound)));
    }

    #[tokio::test]
    async fn test_fresh_log_gets_template_and_one_row() {
        let wb = MemoryWorkbook::new(&["Inputs", LOG]);
        let style = LogStyle {
            fill_colour: Some("#aabbcc".to_string()),
            ..Default::default()
        };

        let outcome = upsert(&wb, "abc12", "JS", RowPatch::full(row("abc12", "JS")), || None, &style)
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted { row: 2 });

        assert_eq!(row_values(&wb, 1).await[0], CellValue::from("ID"));
        assert_eq!(row_values(&wb, 2).await, row("abc12", "JS"));

        let (_, values) = wb.used_values(LOG).unwrap().unwrap();
        let data_rows = values[2..].iter().filter(|r| !r[0].is_blank()).count();
        assert_eq!(data_rows, 1);

        let id_cell = wb.cell(LOG, CellRef::new(2, 0)).unwrap().format;
        assert_eq!(id_cell.italic, Some(true));
        assert_eq!(id_cell.font_size, Some(8.0));
        assert_eq!(id_cell.font_colour.as_deref(), Some(ID_FONT_COLOUR));
        assert_eq!(id_cell.fill, None);
        for col in 1..5 {
            assert_eq!(
                wb.fill_colour(LOG, CellRef::new(2, col)).await.unwrap().as_deref(),
                Some("#aabbcc")
            );
        }
        // Scaffold formatting carried onto the inserted row.
        assert!(wb.cell(LOG, CellRef::new(2, 10)).unwrap().format.border.is_some());
    }

    #[tokio::test]
    async fn test_insert_groups_by_initials() {
        // JS at index 5, KL at index 8, blank scaffold rows below.
        let wb = seeded_log(&["AB", "AB", "AB", "JS", "AB", "AB", "KL"]).await;
        assert_eq!(row_values(&wb, 5).await[4], CellValue::from("JS"));
        assert_eq!(row_values(&wb, 8).await[4], CellValue::from("KL"));

        let outcome = upsert(&wb, "new", "JS", RowPatch::full(row("new", "JS")), || None, &LogStyle::default())
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted { row: 6 });
        assert_eq!(row_values(&wb, 6).await[0], CellValue::from("new"));
        assert_eq!(row_values(&wb, 7).await[0], CellValue::from("id6"));
        assert_eq!(row_values(&wb, 9).await[4], CellValue::from("KL"));
    }

    #[tokio::test]
    async fn test_insert_without_match_follows_last_content() {
        let wb = seeded_log(&["AB", "AB", "AB", "JS", "AB", "AB", "KL"]).await;

        let outcome = upsert(&wb, "new", "ZZ", RowPatch::full(row("new", "ZZ")), || None, &LogStyle::default())
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted { row: 9 });
        assert_eq!(row_values(&wb, 8).await[4], CellValue::from("KL"));
        assert_eq!(row_values(&wb, 9).await[0], CellValue::from("new"));
    }

    #[tokio::test]
    async fn test_partial_patch_touches_only_description() {
        let wb = MemoryWorkbook::new(&["Inputs", LOG]);
        let style = LogStyle::default();
        upsert(&wb, "e1", "JS", RowPatch::full(row("e1", "JS")), || None, &style)
            .await
            .unwrap();
        let before = row_values(&wb, 2).await;

        for _ in 0..2 {
            let outcome = upsert(&wb, "e1", "JS", RowPatch::description("Changed WACC"), || None, &style)
                .await
                .unwrap();
            assert_eq!(outcome, UpsertOutcome::Updated { row: 2 });
        }

        let after = row_values(&wb, 2).await;
        assert_eq!(after[DESCRIPTION_COL as usize], CellValue::from("Changed WACC"));
        for col in [ID_COL, SHEET_COL, 2, INITIALS_COL] {
            assert_eq!(after[col as usize], before[col as usize]);
        }
        assert_eq!(find_row(&wb, "e1"), Some(2));
    }

    #[tokio::test]
    async fn test_partial_patch_without_row_reconstitutes() {
        let wb = MemoryWorkbook::new(&["Inputs", LOG]);
        let style = LogStyle::default();

        let missing = upsert(&wb, "e1", "JS", RowPatch::description("x"), || None, &style).await;
        assert!(matches!(missing, Err(LogError::MissingEntry(id)) if id == "e1"));

        let outcome = upsert(&wb, "e1", "JS", RowPatch::description("x"), || Some(row("e1", "JS")), &style)
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted { row: 2 });
        assert_eq!(row_values(&wb, 2).await, row("e1", "JS"));
    }

    #[tokio::test]
    async fn test_full_patch_clears_missing_cells() {
        let wb = MemoryWorkbook::new(&["Inputs", LOG]);
        let style = LogStyle::default();
        upsert(&wb, "e1", "JS", RowPatch::full(row("e1", "JS")), || None, &style)
            .await
            .unwrap();

        let patch = RowPatch::new(vec![Some(CellValue::from("e1")), None, None, None, None], false);
        upsert(&wb, "e1", "JS", patch, || None, &style).await.unwrap();

        let values = row_values(&wb, 2).await;
        assert_eq!(values[0], CellValue::from("e1"));
        assert!(values[1..].iter().all(CellValue::is_blank));
    }

    #[tokio::test]
    async fn test_duplicate_ids_update_last_match() {
        let wb = seeded_log(&["AB", "AB"]).await;
        wb.write(LOG, CellRef::new(2, 0), &[vec![Some(CellValue::from("dup"))]])
            .await
            .unwrap();
        wb.write(LOG, CellRef::new(3, 0), &[vec![Some(CellValue::from("dup"))]])
            .await
            .unwrap();

        let outcome = upsert(&wb, "dup", "AB", RowPatch::description("last"), || None, &LogStyle::default())
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated { row: 3 });
        assert_ne!(row_values(&wb, 2).await[3], CellValue::from("last"));
    }

    #[test]
    fn test_insertion_index() {
        let blank = || vec![CellValue::Empty; 5];
        let with = |who: &str| {
            let mut r = blank();
            r[0] = CellValue::from("id");
            r[4] = CellValue::from(who);
            r
        };

        let values = vec![blank(), with(""), with("AB"), with("JS"), with("AB"), blank(), blank()];
        assert_eq!(insertion_index(&values, "JS"), 3);
        assert_eq!(insertion_index(&values, "ZZ"), 4);
        // A header-only log anchors on the header.
        assert_eq!(insertion_index(&values[..2], "ZZ"), 1);
        assert_eq!(insertion_index(&[], "ZZ"), 0);
    }
}
