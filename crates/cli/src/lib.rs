//! Change logger application layer
//!
//! Shared by the `clog` binary and the integration tests.

pub mod config;
pub mod panel;
pub mod telemetry;
pub mod view;

pub use config::{ConfigError, PanelConfig};
pub use panel::{InsertOutcome, Panel, PanelParts};
pub use telemetry::{TelemetryEvent, TelemetrySink};
pub use view::{Notice, NoticeKind, Presenter, TerminalPresenter};
