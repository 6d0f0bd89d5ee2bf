//! Command implementations for lspc
//!
//! Each command is implemented in its own module.

pub mod complete;
pub mod config;
pub mod diagnostics;
pub mod doctor;
pub mod find;
pub mod format;
pub mod hover;
