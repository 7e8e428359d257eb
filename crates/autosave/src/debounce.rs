//! Per-entry debouncing logic
//!
//! Each entry id owns at most one pending timer. A new edit aborts the
//! previous timer and restarts the quiet period, so only the last value of a
//! burst is ever saved. Timers carry a generation number; a timer that wakes
//! after being superseded or cancelled finds a different generation (or no
//! item) in the queue and does nothing.

use crate::{SaveHandler, StatusSink};
use clog_core::EntryState;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Quiet period before a save fires
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// One pending save
struct QueueItem {
    /// Latest value for the entry
    value: String,
    generation: u64,
    timer: JoinHandle<()>,
}

struct Inner {
    enabled: AtomicBool,
    debounce: Duration,
    handler: Arc<dyn SaveHandler>,
    items: DashMap<String, QueueItem>,
    generation: AtomicU64,
}

/// Debounced save queue
///
/// Must be driven from inside a Tokio runtime: timers are spawned tasks.
pub struct SaveQueue {
    inner: Arc<Inner>,
}

impl SaveQueue {
    /// Create a disabled queue
    pub fn new(handler: Arc<dyn SaveHandler>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                enabled: AtomicBool::new(false),
                debounce,
                handler,
                items: DashMap::new(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Flip the global toggle; returns the previous value
    ///
    /// Disabling does not cancel pending timers, callers decide that.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let previous = self.inner.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!("Auto-save {}", if enabled { "enabled" } else { "disabled" });
        }
        previous
    }

    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    /// Record an edit and (re)start the entry's quiet period
    pub fn handle_edit(&self, entry_id: &str, value: &str, on_status: Arc<dyn StatusSink>) {
        if !self.is_enabled() {
            return;
        }

        on_status.on_status(entry_id, EntryState::Pending);

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let item = |timer: JoinHandle<()>| QueueItem {
            value: value.to_string(),
            generation,
            timer,
        };

        // Holding the map entry while spawning keeps the new timer from
        // observing the queue before its own item is in place.
        match self.inner.items.entry(entry_id.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                occupied.get().timer.abort();
                let timer = self.spawn_timer(entry_id, generation, on_status);
                occupied.insert(item(timer));
                debug!("Debounce restarted for {}", entry_id);
            }
            MapEntry::Vacant(vacant) => {
                let timer = self.spawn_timer(entry_id, generation, on_status);
                vacant.insert(item(timer));
            }
        }
    }

    fn spawn_timer(&self, entry_id: &str, generation: u64, on_status: Arc<dyn StatusSink>) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let entry_id = entry_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            inner.fire(entry_id, generation, on_status).await;
        })
    }

    /// Drop the pending save for one entry (entry deleted)
    pub fn cancel(&self, entry_id: &str) -> bool {
        match self.inner.items.remove(entry_id) {
            Some((_, item)) => {
                item.timer.abort();
                debug!("Cancelled pending save for {}", entry_id);
                true
            }
            None => false,
        }
    }

    /// Drop every pending save (auto-save disabled or entries cleared)
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        self.inner.items.retain(|_, item| {
            item.timer.abort();
            cancelled += 1;
            false
        });
        if cancelled > 0 {
            debug!("Cancelled {} pending saves", cancelled);
        }
        cancelled
    }

    pub fn is_pending(&self, entry_id: &str) -> bool {
        self.inner.items.contains_key(entry_id)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.items.len()
    }

    /// Value that will be saved when the entry's timer fires
    pub fn pending_value(&self, entry_id: &str) -> Option<String> {
        self.inner.items.get(entry_id).map(|item| item.value.clone())
    }
}

impl Drop for SaveQueue {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl Inner {
    async fn fire(&self, entry_id: String, generation: u64, on_status: Arc<dyn StatusSink>) {
        let Some((_, item)) = self
            .items
            .remove_if(&entry_id, |_, item| item.generation == generation)
        else {
            debug!("Timer for {} superseded or cancelled", entry_id);
            return;
        };

        on_status.on_status(&entry_id, EntryState::Pending);

        match self.handler.save(&entry_id, &item.value).await {
            Ok(()) => {
                debug!("Saved {}", entry_id);
                on_status.on_status(&entry_id, EntryState::Saved);
            }
            Err(e) if e.is_store_not_found() => {
                debug!("Change log missing while saving {}", entry_id);
            }
            Err(e) => {
                error!("Error saving {}: {}", entry_id, e);
                on_status.on_status(&entry_id, EntryState::Error);
            }
        }
    }
}
