//! Panel application state
//!
//! One `Panel` per session owns the captured entries and the save queue and
//! drives every user action against the workbook. Actions return `Result`;
//! [`Panel::act`] is the wrapper front-ends use to turn failures into
//! notices without disturbing other entries.

use crate::config::PanelConfig;
use crate::telemetry::{TelemetryEvent, TelemetrySink, FROM_SHORTCUT};
use crate::view::{Notice, Presenter};
use async_trait::async_trait;
use autosave::{SaveHandler, SaveQueue, StatusSink};
use changelog::{change_log_exists, insert_at_active_cell, upsert, LogStyle, RowPatch};
use clog_core::address::qualify;
use clog_core::settings::{random_vibrant_colour, FILL_COLOUR_KEY, INITIALS_KEY};
use clog_core::{
    generate_id, CellRef, Entry, EntryState, EntryStore, GridRange, LogError, SettingsStore, Workbook,
    WorkbookError,
};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// Initials used when none are stored
pub const DEFAULT_INITIALS: &str = "NU";

/// Fill reported when the sampled cell has none
pub const DEFAULT_FILL: &str = "#FFFFFF";

const AUTOSAVE_ENABLED_NOTICE: &str = "Auto-save enabled, syncing to Change Log. \
     Deleting cards from this pane will not delete change log entries.";
const STORE_MISSING_NOTICE: &str = "Change log sheet not found. Disabling auto-save.";

type Result<T> = std::result::Result<T, LogError>;

/// What clicking an entry's insert button did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row written; the cursor moved to `next`
    Inserted { next: CellRef },
    /// Entry was not in the `arrow` state, so it was reset instead
    Reset,
}

/// External collaborators of a panel
pub struct PanelParts {
    pub workbook: Arc<dyn Workbook>,
    pub settings: Arc<dyn SettingsStore>,
    pub presenter: Arc<dyn Presenter>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

pub struct Panel {
    workbook: Arc<dyn Workbook>,
    settings: Arc<dyn SettingsStore>,
    presenter: Arc<dyn Presenter>,
    telemetry: Arc<dyn TelemetrySink>,
    config: PanelConfig,
    entries: Mutex<EntryStore>,
    queue: SaveQueue,
    status_sink: Arc<dyn StatusSink>,
}

/// Save handler writing description edits through to the change log
struct DescriptionWriter {
    panel: Weak<Panel>,
}

#[async_trait]
impl SaveHandler for DescriptionWriter {
    async fn save(&self, entry_id: &str, value: &str) -> Result<()> {
        let Some(panel) = self.panel.upgrade() else {
            return Ok(());
        };
        let result = panel.write_description(entry_id, value).await;
        if let Err(e) = &result {
            if e.is_store_not_found() {
                panel.on_store_missing();
            }
        }
        result
    }
}

impl Panel {
    pub fn new(parts: PanelParts, config: PanelConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Panel>| {
            let handler = Arc::new(DescriptionWriter { panel: weak.clone() });
            let status_panel = weak.clone();
            let status_sink: Arc<dyn StatusSink> = Arc::new(move |entry_id: &str, state: EntryState| {
                if let Some(panel) = status_panel.upgrade() {
                    panel.apply_status(entry_id, state);
                }
            });

            Panel {
                workbook: parts.workbook,
                settings: parts.settings,
                presenter: parts.presenter,
                telemetry: parts.telemetry,
                queue: SaveQueue::new(handler, config.debounce()),
                config,
                entries: Mutex::new(EntryStore::new()),
                status_sink,
            }
        })
    }

    /// Load preferences and try to switch auto-save on
    pub async fn start(&self) -> Result<()> {
        let colour = self.fill_colour()?;
        debug!(fill = %colour, "Loaded fill colour");
        if self.config.autosave.enabled_on_start {
            self.try_enable_autosave().await;
        }
        self.render();
        Ok(())
    }

    /// Run an action; failures are logged and shown as an error notice
    pub async fn act<T, F>(&self, action: &str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        match fut.await {
            Ok(value) => Some(value),
            Err(e) => {
                error!(action, "{}", e);
                self.presenter.notify(Notice::error(e.to_string()));
                None
            }
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().entries().to_vec()
    }

    pub fn entry(&self, entry_id: &str) -> Option<Entry> {
        self.entries.lock().get(entry_id).cloned()
    }

    /// Id of the entry at 1-based position `number`, oldest first
    pub fn entry_id_at(&self, number: usize) -> Option<String> {
        let index = number.checked_sub(1)?;
        self.entries.lock().get_at(index).map(|e| e.id.clone())
    }

    pub fn autosave_enabled(&self) -> bool {
        self.queue.is_enabled()
    }

    pub fn pending_saves(&self) -> usize {
        self.queue.pending_count()
    }

    pub fn render(&self) {
        let entries = self.entries();
        self.presenter.render(&entries, self.autosave_enabled());
    }

    pub fn dismiss_notice(&self) {
        self.presenter.dismiss();
    }

    // Preferences

    /// Stored initials, possibly blank
    pub fn stored_initials(&self) -> Result<String> {
        Ok(self.settings.get(INITIALS_KEY)?.unwrap_or_default())
    }

    /// Initials stamped on ids and rows
    pub fn initials(&self) -> Result<String> {
        let stored = self.stored_initials()?;
        let trimmed = stored.trim();
        Ok(if trimmed.is_empty() {
            DEFAULT_INITIALS.to_string()
        } else {
            trimmed.to_string()
        })
    }

    pub fn set_initials(&self, initials: &str) -> Result<()> {
        self.settings.set(INITIALS_KEY, initials.trim())?;
        Ok(())
    }

    /// Stored fill colour, generating and storing a random one on first use
    pub fn fill_colour(&self) -> Result<String> {
        if let Some(colour) = self.settings.get(FILL_COLOUR_KEY)?.filter(|c| !c.is_empty()) {
            return Ok(colour);
        }
        let colour = random_vibrant_colour();
        self.settings.set(FILL_COLOUR_KEY, &colour)?;
        info!(fill = %colour, "Generated fill colour");
        Ok(colour)
    }

    pub fn set_fill_colour(&self, colour: &str) -> Result<()> {
        self.settings.set(FILL_COLOUR_KEY, colour)?;
        Ok(())
    }

    /// Adopt the active cell's fill as the row colour
    pub async fn sample_fill_colour(&self) -> Result<String> {
        self.presenter
            .notify(Notice::info("Sampling fill colour from the active cell."));
        let sheet = self.workbook.active_worksheet().await?;
        let cell = self.workbook.active_cell().await?;
        let colour = self
            .workbook
            .fill_colour(&sheet, cell)
            .await?
            .unwrap_or_else(|| DEFAULT_FILL.to_string());
        self.set_fill_colour(&colour)?;
        Ok(colour)
    }

    // Entries

    /// Capture the current selection as a new entry
    ///
    /// `context` tags the telemetry event; only [`FROM_SHORTCUT`] is kept.
    pub async fn capture(&self, context: &str) -> Result<Entry> {
        let autosave = self.autosave_enabled();
        let limit = self.config.capture_limit(autosave);
        if self.entries.lock().len() >= limit {
            return Err(LogError::CaptureLimitExceeded { limit });
        }

        let selection = self.workbook.selected_range().await?;
        let initials = self.initials()?;

        let entry = {
            let mut entries = self.entries.lock();
            let entry = Entry {
                id: generate_id(&initials),
                sheet_name: selection.sheet.clone(),
                local_address: selection.range.to_a1(),
                full_address: qualify(&selection.sheet, &selection.range),
                description: entries.next_description(),
                state: if autosave { EntryState::None } else { EntryState::Arrow },
            };
            entries.push(entry.clone(), limit)?;
            entry
        };
        info!(id = %entry.id, address = %entry.full_address, "Captured address");

        self.render();
        if autosave {
            self.queue
                .handle_edit(&entry.id, &entry.description, Arc::clone(&self.status_sink));
        }
        self.record_capture(context, &initials);
        Ok(entry)
    }

    fn record_capture(&self, context: &str, initials: &str) {
        let (no_entries, avg_desc_len) = {
            let entries = self.entries.lock();
            (entries.len(), entries.average_description_len())
        };
        let context = if context == FROM_SHORTCUT { context } else { "" };
        self.telemetry.record(TelemetryEvent {
            context: context.to_string(),
            user_identifier: initials.to_string(),
            autosave_enabled: self.autosave_enabled(),
            no_entries,
            avg_desc_len,
        });
    }

    /// Change an entry's description; queued for saving when auto-save is on
    pub fn edit_description(&self, entry_id: &str, description: &str) -> Result<()> {
        if !self.entries.lock().set_description(entry_id, description) {
            return Err(LogError::MissingEntry(entry_id.to_string()));
        }
        self.queue
            .handle_edit(entry_id, description, Arc::clone(&self.status_sink));
        Ok(())
    }

    /// Remove one entry from the panel (its change-log row stays)
    pub fn delete_entry(&self, entry_id: &str) -> Result<Entry> {
        let removed = self
            .entries
            .lock()
            .remove(entry_id)
            .ok_or_else(|| LogError::MissingEntry(entry_id.to_string()))?;
        self.queue.cancel(entry_id);
        self.render();
        Ok(removed)
    }

    pub fn delete_all(&self) -> usize {
        let removed = self.entries.lock().clear().len();
        self.queue.cancel_all();
        self.render();
        removed
    }

    /// Insert button: write at the cursor, or reset a non-arrow entry
    pub async fn insert_entry(&self, entry_id: &str) -> Result<InsertOutcome> {
        if self.autosave_enabled() {
            return Err(LogError::ManualInsertWhileAutosave);
        }

        let state = self
            .entry(entry_id)
            .map(|e| e.state)
            .ok_or_else(|| LogError::MissingEntry(entry_id.to_string()))?;

        if state != EntryState::Arrow {
            self.entries.lock().set_state(entry_id, EntryState::Arrow);
            self.render();
            return Ok(InsertOutcome::Reset);
        }

        let next = self.insert_address(entry_id).await?;
        self.render();
        Ok(InsertOutcome::Inserted { next })
    }

    /// Insert every entry in order, stopping at the first failure
    pub async fn insert_all(&self) -> Result<usize> {
        if self.autosave_enabled() {
            return Err(LogError::ManualInsertWhileAutosave);
        }

        let ids: Vec<String> = self.entries.lock().iter().map(|e| e.id.clone()).collect();
        let mut inserted = 0;
        let mut result = Ok(());
        for id in &ids {
            match self.insert_address(id).await {
                Ok(_) => inserted += 1,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        self.render();
        result.map(|()| inserted)
    }

    async fn insert_address(&self, entry_id: &str) -> Result<CellRef> {
        let initials = self.initials()?;
        let cells = self
            .entries
            .lock()
            .full_row(entry_id, &initials)
            .ok_or_else(|| LogError::MissingEntry(entry_id.to_string()))?;

        let next = insert_at_active_cell(self.workbook.as_ref(), cells).await?;
        self.entries.lock().set_state(entry_id, EntryState::Saved);
        info!(id = entry_id, "Inserted address manually");
        Ok(next)
    }

    pub async fn go_to_sheet(&self, entry_id: &str) -> Result<()> {
        let entry = self
            .entry(entry_id)
            .ok_or_else(|| LogError::MissingEntry(entry_id.to_string()))?;
        self.workbook.activate(&entry.sheet_name).await?;
        Ok(())
    }

    pub async fn go_to_address(&self, entry_id: &str) -> Result<()> {
        let entry = self
            .entry(entry_id)
            .ok_or_else(|| LogError::MissingEntry(entry_id.to_string()))?;
        let range = GridRange::parse(&entry.local_address)
            .ok_or_else(|| WorkbookError::InvalidRange(entry.local_address.clone()))?;
        self.workbook.select(&entry.sheet_name, range).await?;
        Ok(())
    }

    // Auto-save

    /// Toggle auto-save; enabling requires a change log and stored initials
    pub async fn set_autosave(&self, enabled: bool) -> Result<()> {
        if !enabled {
            self.disable_autosave();
            return Ok(());
        }

        if !change_log_exists(self.workbook.as_ref()).await? {
            return Err(LogError::AutosaveUnavailable("No 'Change log' sheet exists."));
        }
        if self.stored_initials()?.trim().is_empty() {
            return Err(LogError::AutosaveUnavailable("Initials cannot be blank."));
        }

        self.enable_autosave();
        Ok(())
    }

    /// Enable auto-save if the workbook allows it, without surfacing why not
    pub async fn try_enable_autosave(&self) -> bool {
        match self.set_autosave(true).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Auto-save left off at start: {}", e);
                false
            }
        }
    }

    fn enable_autosave(&self) {
        if self.queue.set_enabled(true) {
            return;
        }
        self.presenter.notify(Notice::info(AUTOSAVE_ENABLED_NOTICE));

        let pending: Vec<(String, String)> = self
            .entries
            .lock()
            .iter()
            .map(|e| (e.id.clone(), e.description.clone()))
            .collect();
        for (id, description) in pending {
            self.queue
                .handle_edit(&id, &description, Arc::clone(&self.status_sink));
        }
    }

    /// Returns whether auto-save was on
    fn disable_autosave(&self) -> bool {
        if !self.queue.set_enabled(false) {
            return false;
        }
        self.queue.cancel_all();
        self.entries.lock().reset_states(EntryState::Arrow);
        self.render();
        true
    }

    fn on_store_missing(&self) {
        if self.disable_autosave() {
            self.presenter.notify(Notice::error(STORE_MISSING_NOTICE));
        }
    }

    fn apply_status(&self, entry_id: &str, state: EntryState) {
        let changed = self.entries.lock().set_state(entry_id, state);
        if changed == Some(true) {
            self.presenter.status(entry_id, state);
        }
    }

    async fn write_description(&self, entry_id: &str, description: &str) -> Result<()> {
        let initials = self.initials()?;
        let style = LogStyle {
            template_title: self.config.changelog.template_title.clone(),
            fill_colour: Some(self.fill_colour()?),
        };

        let outcome = upsert(
            self.workbook.as_ref(),
            entry_id,
            &initials,
            RowPatch::description(description),
            || self.entries.lock().full_row(entry_id, &initials),
            &style,
        )
        .await?;
        debug!(id = entry_id, row = outcome.row(), "Description written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::NoopTelemetry;
    use clog_core::{MemorySettings, MemoryWorkbook};

    struct Silent;

    impl Presenter for Silent {
        fn render(&self, _: &[Entry], _: bool) {}
        fn status(&self, _: &str, _: EntryState) {}
        fn notify(&self, _: Notice) {}
    }

    fn panel(settings: MemorySettings) -> Arc<Panel> {
        let parts = PanelParts {
            workbook: Arc::new(MemoryWorkbook::new(&["Inputs"])),
            settings: Arc::new(settings),
            presenter: Arc::new(Silent),
            telemetry: Arc::new(NoopTelemetry),
        };
        Panel::new(parts, PanelConfig::default())
    }

    #[test]
    fn test_initials_default() {
        let settings = MemorySettings::new();
        let p = panel(settings);
        assert_eq!(p.initials().unwrap(), DEFAULT_INITIALS);
        p.set_initials("  js ").unwrap();
        assert_eq!(p.initials().unwrap(), "js");
        assert_eq!(p.entry_id_at(1), None);
    }

    #[test]
    fn test_fill_colour_generated_once() {
        let p = panel(MemorySettings::new());
        let first = p.fill_colour().unwrap();
        assert!(first.starts_with('#') && first.len() == 7);
        assert_eq!(p.fill_colour().unwrap(), first);
    }
}
