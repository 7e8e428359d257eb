//! A1-style addressing for cells and rectangular ranges
//!
//! All coordinates are 0-based internally; the textual A1 form is 1-based
//! for rows and letter-based for columns (`A`, `B`, ..., `Z`, `AA`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell position (0-based row and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse `A1`, `$A$1` or `a1`
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim().replace('$', "");
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let col = letters_to_col(letters)?;
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }

        Some(Self { row: row - 1, col })
    }

    /// The cell `rows` rows below this one
    pub fn down(self, rows: u32) -> Self {
        Self { row: self.row + rows, col: self.col }
    }

    pub fn to_a1(self) -> String {
        format!("{}{}", col_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// An inclusive rectangular block of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl GridRange {
    /// Build a range from two corners in any order
    pub fn new(a: CellRef, b: CellRef) -> Self {
        Self {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn cell(cell: CellRef) -> Self {
        Self { start: cell, end: cell }
    }

    /// Range of `rows` x `cols` anchored at `origin`; both sizes must be non-zero
    pub fn sized(origin: CellRef, rows: u32, cols: u32) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            start: origin,
            end: CellRef::new(origin.row + rows - 1, origin.col + cols - 1),
        }
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    /// The `index`-th row of this range (relative to its top)
    pub fn row(&self, index: u32) -> Self {
        let row = self.start.row + index;
        Self {
            start: CellRef::new(row, self.start.col),
            end: CellRef::new(row, self.end.col),
        }
    }

    /// The `index`-th column of this range (relative to its left edge)
    pub fn column(&self, index: u32) -> Self {
        let col = self.start.col + index;
        Self {
            start: CellRef::new(self.start.row, col),
            end: CellRef::new(self.end.row, col),
        }
    }

    /// Same shape moved down by `rows`
    pub fn shifted_down(&self, rows: u32) -> Self {
        Self {
            start: self.start.down(rows),
            end: self.end.down(rows),
        }
    }

    /// Keep the top-left corner, change the size
    pub fn resized(&self, rows: u32, cols: u32) -> Self {
        Self::sized(self.start, rows, cols)
    }

    /// Drop the first `n` columns
    pub fn skip_cols(&self, n: u32) -> Option<Self> {
        if n >= self.col_count() {
            return None;
        }
        Some(Self {
            start: CellRef::new(self.start.row, self.start.col + n),
            end: self.end,
        })
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    /// Smallest range covering both
    pub fn union(&self, other: &GridRange) -> Self {
        Self {
            start: CellRef::new(self.start.row.min(other.start.row), self.start.col.min(other.start.col)),
            end: CellRef::new(self.end.row.max(other.end.row), self.end.col.max(other.end.col)),
        }
    }

    /// Row-major iteration over every cell
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.start.row..=self.end.row)
            .flat_map(move |row| (self.start.col..=self.end.col).map(move |col| CellRef::new(row, col)))
    }

    /// Parse `A1`, `A1:B2` (with or without `$` anchors)
    pub fn parse(input: &str) -> Option<Self> {
        match input.split_once(':') {
            Some((a, b)) => Some(Self::new(CellRef::parse(a)?, CellRef::parse(b)?)),
            None => CellRef::parse(input).map(Self::cell),
        }
    }

    /// `A1` for a single cell, `A1:B2` otherwise
    pub fn to_a1(&self) -> String {
        if self.start == self.end {
            self.start.to_a1()
        } else {
            format!("{}:{}", self.start.to_a1(), self.end.to_a1())
        }
    }
}

impl fmt::Display for GridRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Split `Sheet1!A1:B2` or `'My Sheet'!A1` into sheet name and range
///
/// Returns `None` for the sheet when the address is unqualified.
pub fn parse_qualified(input: &str) -> Option<(Option<String>, GridRange)> {
    match input.rsplit_once('!') {
        Some((sheet, local)) => {
            let range = GridRange::parse(local)?;
            Some((Some(unquote_sheet(sheet)), range))
        }
        None => GridRange::parse(input).map(|range| (None, range)),
    }
}

/// Format a sheet-qualified address the way the host reports it
pub fn qualify(sheet: &str, range: &GridRange) -> String {
    format!("{}!{}", quote_sheet(sheet), range.to_a1())
}

fn quote_sheet(sheet: &str) -> String {
    let plain = sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !sheet.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

fn unquote_sheet(sheet: &str) -> String {
    let trimmed = sheet.trim();
    match trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => trimmed.to_string(),
    }
}

/// Convert column index to letters (0 -> A, 25 -> Z, 26 -> AA)
pub fn col_to_letters(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Convert column letters to a 0-based index
pub fn letters_to_col(letters: &str) -> Option<u32> {
    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }
    col.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_letters() {
        assert_eq!(col_to_letters(0), "A");
        assert_eq!(col_to_letters(25), "Z");
        assert_eq!(col_to_letters(26), "AA");
        assert_eq!(col_to_letters(27), "AB");
        assert_eq!(letters_to_col("A"), Some(0));
        assert_eq!(letters_to_col("aa"), Some(26));
        assert_eq!(letters_to_col(""), None);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(CellRef::parse("B3"), Some(CellRef::new(2, 1)));
        assert_eq!(CellRef::parse("$C$10"), Some(CellRef::new(9, 2)));
        assert_eq!(CellRef::parse("A0"), None);
        assert_eq!(CellRef::parse("3B"), None);
        assert_eq!(CellRef::parse("B"), None);
    }

    #[test]
    fn test_parse_range_normalizes_corners() {
        let range = GridRange::parse("C4:A1").unwrap();
        assert_eq!(range.to_a1(), "A1:C4");
        assert_eq!(range.row_count(), 4);
        assert_eq!(range.col_count(), 3);
    }

    #[test]
    fn test_qualified_round_trip() {
        let (sheet, range) = parse_qualified("'Q1 Inputs'!B2:D5").unwrap();
        assert_eq!(sheet.as_deref(), Some("Q1 Inputs"));
        assert_eq!(qualify("Q1 Inputs", &range), "'Q1 Inputs'!B2:D5");

        let (sheet, range) = parse_qualified("Sheet1!A1").unwrap();
        assert_eq!(sheet.as_deref(), Some("Sheet1"));
        assert_eq!(qualify("Sheet1", &range), "Sheet1!A1");

        let (sheet, _) = parse_qualified("E7").unwrap();
        assert!(sheet.is_none());
    }

    #[test]
    fn test_row_and_column_views() {
        let range = GridRange::parse("B2:D6").unwrap();
        assert_eq!(range.row(1).to_a1(), "B3:D3");
        assert_eq!(range.column(0).to_a1(), "B2:B6");
        assert_eq!(range.skip_cols(1).unwrap().to_a1(), "C2:D6");
        assert!(range.skip_cols(3).is_none());
        assert_eq!(range.cells().count(), 15);
    }
}
