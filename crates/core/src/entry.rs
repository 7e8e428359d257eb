//! Captured ranges and the in-memory entry store

use crate::error::LogError;
use crate::formula::hyperlink_formula;
use crate::workbook::CellValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Description given to the first capture of a session
pub const DEFAULT_DESCRIPTION: &str = "Description of change...";

/// Lifecycle of an entry relative to the change log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Auto-save on, nothing written yet
    None,
    /// Auto-save off, ready for a manual insert
    Arrow,
    /// Save scheduled or in flight
    Pending,
    /// Row written to the change log
    Saved,
    /// Last save failed
    Error,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::None => "none",
            EntryState::Arrow => "arrow",
            EntryState::Pending => "pending",
            EntryState::Saved => "saved",
            EntryState::Error => "error",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub sheet_name: String,
    pub local_address: String,
    pub full_address: String,
    pub description: String,
    pub state: EntryState,
}

impl Entry {
    /// Change-log row: ID, Sheet, Cells link, Description, Initials
    pub fn row_cells(&self, initials: &str) -> Vec<CellValue> {
        vec![
            CellValue::from(self.id.as_str()),
            CellValue::from(self.sheet_name.as_str()),
            CellValue::from(hyperlink_formula(&self.sheet_name, &self.local_address, &self.full_address)),
            CellValue::from(self.description.as_str()),
            CellValue::from(initials),
        ]
    }
}

/// Ordered collection of captured entries, oldest first
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: Vec<Entry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Append an entry unless the store already holds `limit` of them
    pub fn push(&mut self, entry: Entry, limit: usize) -> Result<(), LogError> {
        if self.entries.len() >= limit {
            return Err(LogError::CaptureLimitExceeded { limit });
        }
        debug_assert!(self.get(&entry.id).is_none(), "duplicate entry id {}", entry.id);
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn get_at(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn remove(&mut self, id: &str) -> Option<Entry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) -> Vec<Entry> {
        std::mem::take(&mut self.entries)
    }

    /// Set an entry's state; returns `None` if the entry is gone, else whether it changed
    pub fn set_state(&mut self, id: &str, state: EntryState) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        let changed = entry.state != state;
        entry.state = state;
        Some(changed)
    }

    pub fn set_description(&mut self, id: &str, description: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.description = description.to_string();
                true
            }
            None => false,
        }
    }

    /// Reset every entry to `state`
    pub fn reset_states(&mut self, state: EntryState) {
        for entry in &mut self.entries {
            entry.state = state;
        }
    }

    /// Description of the most recent capture, or the placeholder
    pub fn next_description(&self) -> String {
        self.entries
            .last()
            .map(|e| e.description.clone())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
    }

    /// Full change-log row for `id`, used when a partial update turns into an insert
    pub fn full_row(&self, id: &str, initials: &str) -> Option<Vec<CellValue>> {
        self.get(id).map(|e| e.row_cells(initials))
    }

    /// Mean description length over all but the newest entry
    ///
    /// The newest entry usually still holds the inherited default text, so
    /// it is left out. `None` with fewer than two entries.
    pub fn average_description_len(&self) -> Option<f64> {
        let settled = self.entries.len().checked_sub(1).filter(|&n| n > 0)?;
        let total: usize = self.entries[..settled]
            .iter()
            .map(|e| e.description.chars().count())
            .sum();
        Some(total as f64 / settled as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, description: &str) -> Entry {
        Entry {
            id: id.to_string(),
            sheet_name: "Inputs".to_string(),
            local_address: "B2".to_string(),
            full_address: "Inputs!B2".to_string(),
            description: description.to_string(),
            state: EntryState::Arrow,
        }
    }

    #[test]
    fn test_push_respects_limit() {
        let mut store = EntryStore::new();
        for i in 0..5 {
            store.push(entry(&format!("id{}", i), "x"), 5).unwrap();
        }

        let err = store.push(entry("id5", "x"), 5).unwrap_err();
        assert!(matches!(err, LogError::CaptureLimitExceeded { limit: 5 }));
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_state_and_description_updates() {
        let mut store = EntryStore::new();
        store.push(entry("a", "first"), 20).unwrap();

        assert_eq!(store.set_state("a", EntryState::Pending), Some(true));
        assert_eq!(store.set_state("a", EntryState::Pending), Some(false));
        assert_eq!(store.set_state("missing", EntryState::Saved), None);

        assert!(store.set_description("a", "edited"));
        assert_eq!(store.get("a").unwrap().description, "edited");
        assert!(!store.set_description("missing", "x"));
    }

    #[test]
    fn test_next_description_inherits_latest() {
        let mut store = EntryStore::new();
        assert_eq!(store.next_description(), DEFAULT_DESCRIPTION);

        store.push(entry("a", "Updated WACC"), 20).unwrap();
        assert_eq!(store.next_description(), "Updated WACC");
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = EntryStore::new();
        store.push(entry("a", "1"), 20).unwrap();
        store.push(entry("b", "2"), 20).unwrap();
        store.push(entry("c", "3"), 20).unwrap();

        assert_eq!(store.remove("b").unwrap().id, "b");
        assert!(store.remove("b").is_none());
        assert_eq!(store.get_at(1).unwrap().id, "c");
        assert_eq!(store.clear().len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_full_row_layout() {
        let mut store = EntryStore::new();
        store.push(entry("JSabc12", "Changed growth rate"), 20).unwrap();

        let row = store.full_row("JSabc12", "JS").unwrap();
        assert_eq!(row.len(), 5);
        assert_eq!(row[0], CellValue::from("JSabc12"));
        assert_eq!(row[1], CellValue::from("Inputs"));
        assert!(row[2].as_text().unwrap().starts_with("= LET(rng, Inputs!B2"));
        assert_eq!(row[3], CellValue::from("Changed growth rate"));
        assert_eq!(row[4], CellValue::from("JS"));
        assert!(store.full_row("nope", "JS").is_none());
    }

    #[test]
    fn test_average_description_len_skips_newest() {
        let mut store = EntryStore::new();
        assert_eq!(store.average_description_len(), None);

        store.push(entry("a", "abcd"), 20).unwrap();
        assert_eq!(store.average_description_len(), None);

        store.push(entry("b", "ab"), 20).unwrap();
        store.push(entry("c", "ignored entirely"), 20).unwrap();
        assert_eq!(store.average_description_len(), Some(3.0));
    }
}
