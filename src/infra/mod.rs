//! Infrastructure layer for lspc
//!
//! Contains low-level implementations and external integrations.

pub mod lsp;
