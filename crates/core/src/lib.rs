//! Core types for the change logger
//!
//! This crate provides:
//! - Entry identity (time-ordered base-62 ids)
//! - The in-memory entry store
//! - A1 addressing
//! - The `Workbook` host interface and an in-memory workbook
//! - Key-value settings storage
//! - The change-log hyperlink formula

pub mod address;
pub mod entry;
pub mod error;
pub mod formula;
pub mod id;
pub mod memory;
pub mod settings;
pub mod workbook;

// Re-exports
pub use address::{CellRef, GridRange};
pub use entry::{Entry, EntryState, EntryStore, DEFAULT_DESCRIPTION};
pub use error::LogError;
pub use id::generate_id;
pub use memory::MemoryWorkbook;
pub use settings::{FileSettings, MemorySettings, SettingsError, SettingsStore};
pub use workbook::{CellFormat, CellValue, Selection, Workbook, WorkbookError};

/// Result type for change-log operations
pub type Result<T> = std::result::Result<T, LogError>;
