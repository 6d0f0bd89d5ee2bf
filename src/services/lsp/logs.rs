//! Captured server stderr
//!
//! Bounded per identity; the oldest output is dropped first. A log
//! outlives its connection until the identity is started again.

use crate::infra::lsp::process::ConnectionId;

#[derive(Debug, Clone)]
pub struct ServerLog {
    connection: ConnectionId,
    limit: usize,
    text: String,
}

impl ServerLog {
    pub fn new(connection: ConnectionId, limit: usize) -> Self {
        Self {
            connection,
            limit,
            text: String::new(),
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.text.push_str(&String::from_utf8_lossy(bytes));
        if self.text.len() > self.limit {
            let mut cut = self.text.len() - self.limit;
            while !self.text.is_char_boundary(cut) {
                cut += 1;
            }
            self.text.drain(..cut);
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
