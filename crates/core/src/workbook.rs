//! Host spreadsheet interface
//!
//! The change logger never owns cell data: it reads and writes through a
//! `Workbook`. Every method is one round trip to the host, so anything read
//! earlier may be stale by the time the next call returns. Callers re-read
//! whatever they are about to rely on.

use crate::address::{CellRef, GridRange};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a workbook host
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("Worksheet not found: {0}")]
    SheetNotFound(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Workbook I/O failed: {0}")]
    Io(String),
}

pub type WorkbookResult<T> = std::result::Result<T, WorkbookError>;

/// A single cell value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Blank means no value or an empty string
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable rendering used by listings
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// True when every cell in the block is blank
pub fn is_blank_block(rows: &[Vec<CellValue>]) -> bool {
    rows.iter().all(|row| row.iter().all(CellValue::is_blank))
}

/// Line style for cell borders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorderStyle {
    Continuous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Border {
    pub colour: String,
    pub style: BorderStyle,
}

/// Cell formatting
///
/// Used both as the stored format of a cell and as a patch, where `None`
/// leaves the existing attribute alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_colour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,
}

impl CellFormat {
    pub fn is_default(&self) -> bool {
        *self == CellFormat::default()
    }

    /// Overlay every attribute set in `patch`
    pub fn apply(&mut self, patch: &CellFormat) {
        if patch.fill.is_some() {
            self.fill = patch.fill.clone();
        }
        if patch.bold.is_some() {
            self.bold = patch.bold;
        }
        if patch.italic.is_some() {
            self.italic = patch.italic;
        }
        if patch.font_size.is_some() {
            self.font_size = patch.font_size;
        }
        if patch.font_colour.is_some() {
            self.font_colour = patch.font_colour.clone();
        }
        if patch.font_name.is_some() {
            self.font_name = patch.font_name.clone();
        }
        if patch.border.is_some() {
            self.border = patch.border.clone();
        }
    }

    pub fn with_fill(colour: impl Into<String>) -> Self {
        Self {
            fill: Some(colour.into()),
            ..Default::default()
        }
    }
}

/// The host's current selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub sheet: String,
    pub range: GridRange,
}

/// Spreadsheet host operations consumed by the change logger
#[async_trait]
pub trait Workbook: Send + Sync {
    /// Names of all worksheets, in tab order
    async fn worksheet_names(&self) -> WorkbookResult<Vec<String>>;

    /// Name of the active worksheet
    async fn active_worksheet(&self) -> WorkbookResult<String>;

    /// Make `sheet` the active worksheet
    async fn activate(&self, sheet: &str) -> WorkbookResult<()>;

    /// Active cell on the active worksheet
    async fn active_cell(&self) -> WorkbookResult<CellRef>;

    /// Current selection on the active worksheet
    async fn selected_range(&self) -> WorkbookResult<Selection>;

    /// Activate `sheet` and select `range`; the active cell becomes its top-left
    async fn select(&self, sheet: &str, range: GridRange) -> WorkbookResult<()>;

    /// Bounding box of every cell holding a value or formatting, `None` when empty
    async fn used_range(&self, sheet: &str) -> WorkbookResult<Option<GridRange>>;

    /// Values of `range`, row-major
    async fn read(&self, sheet: &str, range: GridRange) -> WorkbookResult<Vec<Vec<CellValue>>>;

    /// Write a block anchored at `origin`; `None` cells are left untouched
    async fn write(
        &self,
        sheet: &str,
        origin: CellRef,
        rows: &[Vec<Option<CellValue>>],
    ) -> WorkbookResult<()>;

    /// Insert blank cells at `range`, shifting the cells below it down
    async fn insert_shift_down(&self, sheet: &str, range: GridRange) -> WorkbookResult<()>;

    /// Copy formatting (not values) from `from` onto the same-shaped `to`
    async fn copy_formats(&self, sheet: &str, from: GridRange, to: GridRange) -> WorkbookResult<()>;

    /// Apply a format patch to every cell of `range`
    async fn format(&self, sheet: &str, range: GridRange, patch: &CellFormat) -> WorkbookResult<()>;

    async fn set_column_width(&self, sheet: &str, col: u32, width: f64) -> WorkbookResult<()>;

    /// Fill colour of a cell, `None` when unfilled
    async fn fill_colour(&self, sheet: &str, cell: CellRef) -> WorkbookResult<Option<String>>;
}
