//! In-process workbook host
//!
//! A thread-safe grid implementing [`Workbook`]. Used by the CLI session
//! (persisted as a JSON snapshot between runs) and by tests that need a
//! change log to write into.

use crate::address::{CellRef, GridRange};
use crate::workbook::{CellFormat, CellValue, Selection, Workbook, WorkbookError, WorkbookResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Stored content of one cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "CellFormat::is_default")]
    pub format: CellFormat,
}

impl Cell {
    fn is_unused(&self) -> bool {
        self.value.is_blank() && self.format.is_default()
    }
}

#[derive(Debug, Clone)]
struct Sheet {
    name: String,
    cells: BTreeMap<(u32, u32), Cell>,
    column_widths: BTreeMap<u32, f64>,
    selection: GridRange,
}

impl Sheet {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: BTreeMap::new(),
            column_widths: BTreeMap::new(),
            selection: GridRange::cell(CellRef::new(0, 0)),
        }
    }

    fn cell_mut(&mut self, at: CellRef) -> &mut Cell {
        self.cells.entry((at.row, at.col)).or_default()
    }

    /// Drop cells that carry neither value nor format
    fn prune(&mut self, range: GridRange) {
        for at in range.cells() {
            if self.cells.get(&(at.row, at.col)).is_some_and(Cell::is_unused) {
                self.cells.remove(&(at.row, at.col));
            }
        }
    }

    fn used_range(&self) -> Option<GridRange> {
        self.cells
            .iter()
            .filter(|(_, cell)| !cell.is_unused())
            .map(|(&(row, col), _)| GridRange::cell(CellRef::new(row, col)))
            .reduce(|acc, r| acc.union(&r))
    }
}

#[derive(Debug, Clone)]
struct State {
    sheets: Vec<Sheet>,
    active: usize,
}

impl State {
    fn sheet(&self, name: &str) -> WorkbookResult<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| WorkbookError::SheetNotFound(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> WorkbookResult<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| WorkbookError::SheetNotFound(name.to_string()))
    }

    fn active_sheet(&self) -> WorkbookResult<&Sheet> {
        self.sheets
            .get(self.active)
            .ok_or_else(|| WorkbookError::Io("workbook has no worksheets".to_string()))
    }
}

/// Serialized form of a workbook
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkbookSnapshot {
    pub active: String,
    pub sheets: Vec<SheetSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetSnapshot {
    pub name: String,
    #[serde(default)]
    pub selection: Option<String>,
    #[serde(default)]
    pub column_widths: BTreeMap<u32, f64>,
    #[serde(default)]
    pub cells: BTreeMap<String, Cell>,
}

/// Thread-safe in-memory workbook
pub struct MemoryWorkbook {
    state: RwLock<State>,
}

impl MemoryWorkbook {
    /// Workbook with the given worksheets; the first is active
    pub fn new<S: AsRef<str>>(sheet_names: &[S]) -> Self {
        let sheets = sheet_names.iter().map(|n| Sheet::new(n.as_ref())).collect();
        Self {
            state: RwLock::new(State { sheets, active: 0 }),
        }
    }

    pub fn add_sheet(&self, name: &str) {
        let mut state = self.state.write();
        if state.sheets.iter().all(|s| s.name != name) {
            state.sheets.push(Sheet::new(name));
        }
    }

    /// Delete a worksheet, as another user of a shared workbook might
    pub fn remove_sheet(&self, name: &str) -> bool {
        let mut state = self.state.write();
        let Some(index) = state.sheets.iter().position(|s| s.name == name) else {
            return false;
        };
        state.sheets.remove(index);
        if state.active >= state.sheets.len() {
            state.active = state.sheets.len().saturating_sub(1);
        } else if state.active > index {
            state.active -= 1;
        }
        true
    }

    /// Stored cell, if any
    pub fn cell(&self, sheet: &str, at: CellRef) -> Option<Cell> {
        let state = self.state.read();
        state.sheet(sheet).ok()?.cells.get(&(at.row, at.col)).cloned()
    }

    pub fn column_width(&self, sheet: &str, col: u32) -> Option<f64> {
        let state = self.state.read();
        state.sheet(sheet).ok()?.column_widths.get(&col).copied()
    }

    /// Values of a sheet's used range, row-major
    pub fn used_values(&self, sheet: &str) -> WorkbookResult<Option<(GridRange, Vec<Vec<CellValue>>)>> {
        let state = self.state.read();
        let sheet = state.sheet(sheet)?;
        Ok(sheet.used_range().map(|range| (range, read_block(sheet, range))))
    }

    pub fn snapshot(&self) -> WorkbookSnapshot {
        let state = self.state.read();
        WorkbookSnapshot {
            active: state
                .sheets
                .get(state.active)
                .map(|s| s.name.clone())
                .unwrap_or_default(),
            sheets: state
                .sheets
                .iter()
                .map(|sheet| SheetSnapshot {
                    name: sheet.name.clone(),
                    selection: Some(sheet.selection.to_a1()),
                    column_widths: sheet.column_widths.clone(),
                    cells: sheet
                        .cells
                        .iter()
                        .filter(|(_, cell)| !cell.is_unused())
                        .map(|(&(row, col), cell)| (CellRef::new(row, col).to_a1(), cell.clone()))
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: WorkbookSnapshot) -> WorkbookResult<Self> {
        let mut sheets = Vec::with_capacity(snapshot.sheets.len());
        for sheet_snapshot in snapshot.sheets {
            let mut sheet = Sheet::new(&sheet_snapshot.name);
            sheet.column_widths = sheet_snapshot.column_widths;
            if let Some(selection) = sheet_snapshot.selection.as_deref() {
                sheet.selection = GridRange::parse(selection)
                    .ok_or_else(|| WorkbookError::InvalidRange(selection.to_string()))?;
            }
            for (address, cell) in sheet_snapshot.cells {
                let at = CellRef::parse(&address).ok_or(WorkbookError::InvalidRange(address))?;
                sheet.cells.insert((at.row, at.col), cell);
            }
            sheets.push(sheet);
        }

        let active = sheets.iter().position(|s| s.name == snapshot.active).unwrap_or(0);
        Ok(Self {
            state: RwLock::new(State { sheets, active }),
        })
    }

    pub fn load(path: &Path) -> WorkbookResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WorkbookError::Io(format!("{}: {}", path.display(), e)))?;
        let snapshot: WorkbookSnapshot = serde_json::from_str(&text)
            .map_err(|e| WorkbookError::Io(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), sheets = snapshot.sheets.len(), "Loaded workbook snapshot");
        Self::from_snapshot(snapshot)
    }

    pub fn save(&self, path: &Path) -> WorkbookResult<()> {
        let text = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| WorkbookError::Io(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, text)
            .and_then(|_| std::fs::rename(&tmp, path))
            .map_err(|e| WorkbookError::Io(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Saved workbook snapshot");
        Ok(())
    }
}

fn read_block(sheet: &Sheet, range: GridRange) -> Vec<Vec<CellValue>> {
    (range.start.row..=range.end.row)
        .map(|row| {
            (range.start.col..=range.end.col)
                .map(|col| {
                    sheet
                        .cells
                        .get(&(row, col))
                        .map(|c| c.value.clone())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

#[async_trait]
impl Workbook for MemoryWorkbook {
    async fn worksheet_names(&self) -> WorkbookResult<Vec<String>> {
        Ok(self.state.read().sheets.iter().map(|s| s.name.clone()).collect())
    }

    async fn active_worksheet(&self) -> WorkbookResult<String> {
        Ok(self.state.read().active_sheet()?.name.clone())
    }

    async fn activate(&self, sheet: &str) -> WorkbookResult<()> {
        let mut state = self.state.write();
        let index = state
            .sheets
            .iter()
            .position(|s| s.name == sheet)
            .ok_or_else(|| WorkbookError::SheetNotFound(sheet.to_string()))?;
        state.active = index;
        Ok(())
    }

    async fn active_cell(&self) -> WorkbookResult<CellRef> {
        Ok(self.state.read().active_sheet()?.selection.start)
    }

    async fn selected_range(&self) -> WorkbookResult<Selection> {
        let state = self.state.read();
        let sheet = state.active_sheet()?;
        Ok(Selection {
            sheet: sheet.name.clone(),
            range: sheet.selection,
        })
    }

    async fn select(&self, sheet: &str, range: GridRange) -> WorkbookResult<()> {
        let mut state = self.state.write();
        let index = state
            .sheets
            .iter()
            .position(|s| s.name == sheet)
            .ok_or_else(|| WorkbookError::SheetNotFound(sheet.to_string()))?;
        state.sheets[index].selection = range;
        state.active = index;
        Ok(())
    }

    async fn used_range(&self, sheet: &str) -> WorkbookResult<Option<GridRange>> {
        Ok(self.state.read().sheet(sheet)?.used_range())
    }

    async fn read(&self, sheet: &str, range: GridRange) -> WorkbookResult<Vec<Vec<CellValue>>> {
        let state = self.state.read();
        Ok(read_block(state.sheet(sheet)?, range))
    }

    async fn write(
        &self,
        sheet: &str,
        origin: CellRef,
        rows: &[Vec<Option<CellValue>>],
    ) -> WorkbookResult<()> {
        let mut state = self.state.write();
        let sheet = state.sheet_mut(sheet)?;
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                if let Some(value) = value {
                    let at = CellRef::new(origin.row + i as u32, origin.col + j as u32);
                    sheet.cell_mut(at).value = value.clone();
                    sheet.prune(GridRange::cell(at));
                }
            }
        }
        Ok(())
    }

    async fn insert_shift_down(&self, sheet: &str, range: GridRange) -> WorkbookResult<()> {
        let mut state = self.state.write();
        let sheet = state.sheet_mut(sheet)?;
        let height = range.row_count();

        let moved: Vec<_> = sheet
            .cells
            .keys()
            .copied()
            .filter(|&(row, col)| row >= range.start.row && (range.start.col..=range.end.col).contains(&col))
            .collect();

        let mut shifted = Vec::with_capacity(moved.len());
        for key in moved {
            if let Some(cell) = sheet.cells.remove(&key) {
                shifted.push(((key.0 + height, key.1), cell));
            }
        }
        sheet.cells.extend(shifted);
        Ok(())
    }

    async fn copy_formats(&self, sheet: &str, from: GridRange, to: GridRange) -> WorkbookResult<()> {
        if from.row_count() != to.row_count() || from.col_count() != to.col_count() {
            return Err(WorkbookError::InvalidRange(format!(
                "cannot copy formats from {} to {}",
                from, to
            )));
        }

        let mut state = self.state.write();
        let sheet = state.sheet_mut(sheet)?;
        let formats: Vec<_> = from
            .cells()
            .map(|at| {
                sheet
                    .cells
                    .get(&(at.row, at.col))
                    .map(|c| c.format.clone())
                    .unwrap_or_default()
            })
            .collect();

        for (at, format) in to.cells().zip(formats) {
            sheet.cell_mut(at).format = format;
        }
        sheet.prune(to);
        Ok(())
    }

    async fn format(&self, sheet: &str, range: GridRange, patch: &CellFormat) -> WorkbookResult<()> {
        let mut state = self.state.write();
        let sheet = state.sheet_mut(sheet)?;
        for at in range.cells() {
            sheet.cell_mut(at).format.apply(patch);
        }
        sheet.prune(range);
        Ok(())
    }

    async fn set_column_width(&self, sheet: &str, col: u32, width: f64) -> WorkbookResult<()> {
        let mut state = self.state.write();
        state.sheet_mut(sheet)?.column_widths.insert(col, width);
        Ok(())
    }

    async fn fill_colour(&self, sheet: &str, cell: CellRef) -> WorkbookResult<Option<String>> {
        let state = self.state.read();
        Ok(state
            .sheet(sheet)?
            .cells
            .get(&(cell.row, cell.col))
            .and_then(|c| c.format.fill.clone()))
    }
}
