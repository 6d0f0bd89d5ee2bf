//! Service layer for lspc

pub mod config;
pub mod lsp;

pub use config::{ConfigService, DefaultConfigService};
pub use lsp::{Host, Session};
