//! Connection Registry
//!
//! Identity-keyed table of live connections. At most one pending or
//! active connection may exist per identity.

use std::collections::HashMap;

use super::client::{Connection, ConnectionState};
use super::process::ConnectionId;
use crate::error::LspError;

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if the identity is taken by a connection that has not stopped
    pub fn ensure_available(&self, identity: &str) -> Result<(), LspError> {
        match self.connections.get(identity) {
            Some(conn) if conn.state() != ConnectionState::Stopped => {
                Err(LspError::DuplicateStart {
                    identity: identity.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Register a new connection; a stopped one under the same identity is replaced
    pub fn insert(&mut self, connection: Connection) -> Result<&mut Connection, LspError> {
        let identity = connection.identity().to_string();
        self.ensure_available(&identity)?;
        self.connections.insert(identity.clone(), connection);
        self.connections
            .get_mut(&identity)
            .ok_or(LspError::UnknownServer(identity))
    }

    pub fn get(&self, identity: &str) -> Option<&Connection> {
        self.connections.get(identity)
    }

    pub fn get_mut(&mut self, identity: &str) -> Option<&mut Connection> {
        self.connections.get_mut(identity)
    }

    /// Resolve an event's connection; stale ids from a previous spawn find nothing
    pub fn find_by_id(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.values_mut().find(|conn| conn.id() == id)
    }

    pub fn remove(&mut self, identity: &str) -> Option<Connection> {
        self.connections.remove(identity)
    }

    pub fn active(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(|conn| conn.is_active())
    }

    /// Identities in sorted order, for stable output
    pub fn identities(&self) -> Vec<String> {
        let mut identities: Vec<String> = self.connections.keys().cloned().collect();
        identities.sort();
        identities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::lsp::process::ServerLink;
    use crate::models::config::ServerConfig;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn connection(id: u64, command: &str) -> Connection {
        let (outbound, rx) = mpsc::unbounded_channel();
        // Keep the wire open for the whole test
        std::mem::forget(rx);
        Connection::new(
            ConnectionId(id),
            ServerConfig::new(command, vec![]),
            ServerLink {
                outbound,
                process: None,
            },
        )
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let mut registry = ConnectionRegistry::new();
        registry.insert(connection(1, "clangd")).unwrap();

        let err = registry.insert(connection(2, "clangd")).unwrap_err();
        assert!(matches!(err, LspError::DuplicateStart { ref identity } if identity == "clangd"));
        assert_eq!(registry.get("clangd").unwrap().id(), ConnectionId(1));
        assert_eq!(registry.identities(), vec!["clangd"]);
    }

    #[test]
    fn test_stopped_identity_can_restart() {
        let mut registry = ConnectionRegistry::new();
        registry.insert(connection(1, "gopls")).unwrap();
        registry
            .get_mut("gopls")
            .unwrap()
            .terminate(Duration::ZERO);

        registry.insert(connection(2, "gopls")).unwrap();
        assert!(registry.find_by_id(ConnectionId(1)).is_none());
        assert!(registry.find_by_id(ConnectionId(2)).is_some());
    }

    #[test]
    fn test_active_filter_and_identities() {
        let mut registry = ConnectionRegistry::new();
        registry.insert(connection(1, "zls")).unwrap();
        registry.insert(connection(2, "clangd")).unwrap();
        registry.get_mut("zls").unwrap().activate().unwrap();

        let active: Vec<&str> = registry.active().map(|c| c.identity()).collect();
        assert_eq!(active, vec!["zls"]);
        assert_eq!(registry.identities(), vec!["clangd", "zls"]);

        assert!(registry.remove("zls").is_some());
        assert!(registry.get("zls").is_none());
    }
}
