//! Auto-save pipeline for captured entries
//!
//! This crate provides:
//! - Per-entry debouncing (300ms by default)
//! - Last-write-wins coalescing of rapid edits
//! - Cancellation of one or all pending saves
//! - Status reporting (`pending`, `saved`, `error`) back to the presenter

pub mod debounce;

pub use debounce::{SaveQueue, DEFAULT_DEBOUNCE};

use async_trait::async_trait;
use clog_core::{EntryState, LogError};

/// Persists the latest value of one entry
///
/// Returning [`LogError::StoreNotFound`] tells the queue the change log is
/// gone; the queue then stays quiet and leaves recovery to the handler.
#[async_trait]
pub trait SaveHandler: Send + Sync + 'static {
    async fn save(&self, entry_id: &str, value: &str) -> Result<(), LogError>;
}

/// Receives per-entry status changes
pub trait StatusSink: Send + Sync {
    fn on_status(&self, entry_id: &str, state: EntryState);
}

impl<F> StatusSink for F
where
    F: Fn(&str, EntryState) + Send + Sync,
{
    fn on_status(&self, entry_id: &str, state: EntryState) {
        self(entry_id, state)
    }
}
