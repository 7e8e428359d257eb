//! Header template written into an empty change log

use crate::write::{place_block, WriteMode};
use clog_core::workbook::{Border, BorderStyle};
use clog_core::{CellFormat, CellRef, CellValue, GridRange, LogError, Workbook};
use tracing::info;

pub const DEFAULT_TITLE: &str = "Change Log - Generated by FIECON Change Logger Powerup";

/// Column headers, starting at column A
pub const HEADERS: [&str; 11] = [
    "ID",
    "Sheet",
    "Cells",
    "Description",
    "Initials",
    "QC initials",
    "QC comment",
    "QC initials",
    "QC comment",
    "QC initials",
    "QC comment",
];

/// Relative column widths, scaled by [`WIDTH_SCALE`]
pub const COLUMN_WIDTHS: [f64; 11] = [9.0, 18.0, 18.0, 45.0, 12.0, 12.0, 32.0, 12.0, 32.0, 12.0, 32.0];
pub const WIDTH_SCALE: f64 = 5.725;

/// Bordered rows prepared below the header
pub const SCAFFOLD_ROWS: u32 = 20;

const HEADER_FILL: &str = "#c4e6ff";
const QC_FILL: &str = "#FBE2D5";
const FONT: &str = "Verdana";
const QC_FIRST_COL: u32 = 5;

/// Lay out title, header and scaffold rows at A1 of `sheet`
///
/// Returns the block the template occupies (title row through the last
/// scaffold row), which stands in for the used range of a fresh log.
pub async fn write_template(
    workbook: &dyn Workbook,
    sheet: &str,
    title: &str,
) -> Result<GridRange, LogError> {
    let width = HEADERS.len();
    let mut title_row = vec![None; width];
    title_row[0] = Some(CellValue::from(""));
    title_row[1] = Some(CellValue::from(title));
    let header_row = HEADERS.iter().map(|h| Some(CellValue::from(*h))).collect();

    let block = place_block(
        workbook,
        sheet,
        CellRef::new(0, 0),
        vec![title_row, header_row],
        WriteMode::RequireEmpty,
    )
    .await?;

    let title_range = block.row(0);
    let header_range = block.row(1);

    workbook
        .format(
            sheet,
            title_range,
            &CellFormat {
                italic: Some(true),
                font_name: Some(FONT.to_string()),
                ..Default::default()
            },
        )
        .await?;

    workbook
        .format(
            sheet,
            header_range,
            &CellFormat {
                bold: Some(true),
                ..Default::default()
            },
        )
        .await?;
    if let Some(range) = header_range.skip_cols(1) {
        workbook.format(sheet, range, &CellFormat::with_fill(HEADER_FILL)).await?;
    }
    if let Some(range) = header_range.skip_cols(QC_FIRST_COL) {
        workbook.format(sheet, range, &CellFormat::with_fill(QC_FILL)).await?;
    }

    let scaffold = header_range.resized(SCAFFOLD_ROWS + 1, header_range.col_count());
    if let Some(range) = scaffold.skip_cols(1) {
        let border = CellFormat {
            border: Some(Border {
                colour: "black".to_string(),
                style: BorderStyle::Continuous,
            }),
            ..Default::default()
        };
        workbook.format(sheet, range, &border).await?;
    }
    workbook
        .format(
            sheet,
            scaffold,
            &CellFormat {
                font_name: Some(FONT.to_string()),
                ..Default::default()
            },
        )
        .await?;

    for (i, width) in COLUMN_WIDTHS.iter().enumerate() {
        workbook
            .set_column_width(sheet, block.start.col + i as u32, width * WIDTH_SCALE)
            .await?;
    }

    info!(sheet, "Wrote change log template");
    Ok(title_range.resized(SCAFFOLD_ROWS + 2, title_range.col_count()))
}
