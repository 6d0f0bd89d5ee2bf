//! Data models for lspc
//!
//! Contains core type definitions used throughout the application.

pub mod config;
pub mod diagnostic;
pub mod lsp;
pub mod symbol;

// Re-export commonly used types
pub use config::{LspSettings, LspcConfig, ServerConfig};
pub use diagnostic::{Diagnostic, DiagnosticSeverity, RenderedDiagnostic};
pub use lsp::{Location, LocationEntry, Position, Range, TextEdit};
pub use symbol::SymbolKind;
