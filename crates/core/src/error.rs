//! Error taxonomy for change-log operations

use crate::settings::SettingsError;
use crate::workbook::WorkbookError;
use thiserror::Error;

/// Every failure a panel action can surface
#[derive(Debug, Error)]
pub enum LogError {
    /// No worksheet matches the change-log name
    #[error("Change log sheet not found.")]
    StoreNotFound,

    /// Manual insert attempted outside the change log
    #[error("Unable to insert address. Destination sheet must be 'Change log'.")]
    WrongSheet,

    /// Manual insert target already holds data
    #[error("Unable to insert address. Destination must be empty.")]
    DestinationNotEmpty,

    #[error(
        "Unable to save more than {limit} addresses at once. \
         Unload the current addresses to the change log before continuing."
    )]
    CaptureLimitExceeded { limit: usize },

    /// Entry vanished from the panel before its row could be built
    #[error("No captured address with id {0}")]
    MissingEntry(String),

    #[error("Auto-save not enabled. {0}")]
    AutosaveUnavailable(&'static str),

    /// Manual inserts would race the auto-save writes
    #[error("Turn auto-save off to insert addresses manually.")]
    ManualInsertWhileAutosave,

    #[error(transparent)]
    Host(#[from] WorkbookError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl LogError {
    /// The change log is missing, which auto-save treats as "turn off" rather than a failure
    pub fn is_store_not_found(&self) -> bool {
        matches!(self, LogError::StoreNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = LogError::CaptureLimitExceeded { limit: 5 };
        assert!(err.to_string().starts_with("Unable to save more than 5 addresses"));
        assert!(LogError::StoreNotFound.is_store_not_found());
        assert!(!LogError::WrongSheet.is_store_not_found());

        let err: LogError = WorkbookError::Io("connection reset".into()).into();
        assert_eq!(err.to_string(), "Workbook I/O failed: connection reset");
    }
}
