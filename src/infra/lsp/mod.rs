//! LSP Infrastructure for lspc
//!
//! Everything below the session: the wire, one connection per server,
//! and the tables that track them.
//! - Content-Length framing and JSON-RPC 2.0 message types
//! - Request correlation and per-connection document sync
//! - Subprocess launching behind the `Launcher` seam
//! - Negotiated capabilities and the identity-keyed connection registry

pub mod capabilities;
pub mod client;
pub mod correlator;
pub mod documents;
pub mod framer;
pub mod manager;
pub mod process;
pub mod protocol;
pub mod servers;

pub use capabilities::{Capability, CapabilityRegistry, ServerCapabilities, TextDocumentSyncKind};
pub use client::{Connection, ConnectionState, Inbound};
pub use documents::ContentChange;
pub use manager::ConnectionRegistry;
pub use process::{ConnectionId, Launcher, ProcessLauncher, ServerEvent};
pub use servers::ServerCatalog;
