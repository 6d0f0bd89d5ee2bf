//! LSP Service Module
//!
//! The protocol-facing core: one `Session` event loop plus the registries
//! and interpreters it drives.

mod diagnostics;
mod edits;
mod interpreters;
mod logs;
mod session;
mod views;

pub use diagnostics::DiagnosticsStore;
pub use edits::{EditOutcome, apply_text_edits};
pub use logs::ServerLog;
pub use session::{Action, BufferSnapshot, Event, Host, RequestKind, Session, StartTarget};
pub use views::{ViewBindings, ViewId};
