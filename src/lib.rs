//! lspc - a Language Server Protocol client
//!
//! Spawns language servers over stdio, keeps documents in sync with them
//! and turns their answers into host actions: hover text, completions,
//! formatting edits, navigation targets and diagnostics.

pub mod app;
pub mod cli;
pub mod error;
pub mod infra;
pub mod models;
pub mod services;

pub use error::{LspcError, LspcResult};
