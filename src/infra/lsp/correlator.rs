//! Request correlation
//!
//! Hands out request ids and remembers which method each outstanding id
//! was sent for. Error responses carry no method name, so that record is
//! the only way to know what failed.

use std::collections::HashMap;
use std::path::PathBuf;

use super::protocol::{Method, RequestId};

/// What an outstanding request was for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub method: Method,
    /// Document the request was issued against, if any
    pub document: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Correlator {
    next_id: u64,
    pending: HashMap<u64, PendingRequest>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    /// Allocate the next id and record it as pending
    pub fn register(&mut self, method: Method, document: Option<PathBuf>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id, PendingRequest { method, document });
        id
    }

    /// Consume the pending entry for a response id
    pub fn resolve(&mut self, id: &RequestId) -> Option<PendingRequest> {
        let number = id.as_number()?;
        self.pending.remove(&number)
    }

    /// Forget a request that could not be written
    pub fn discard(&mut self, id: u64) {
        self.pending.remove(&id);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop every outstanding entry, returning how many there were
    pub fn clear(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let mut correlator = Correlator::new();
        let ids: Vec<u64> = (0..5)
            .map(|_| correlator.register(Method::Hover, None))
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        // Resolving does not make an id available again
        correlator.resolve(&RequestId::Number(3));
        assert_eq!(correlator.register(Method::Hover, None), 6);
    }

    #[test]
    fn test_resolve_consumes_once() {
        let mut correlator = Correlator::new();
        let id = correlator.register(Method::Completion, Some(PathBuf::from("/a.rs")));

        let pending = correlator.resolve(&RequestId::Number(id)).unwrap();
        assert_eq!(pending.method, Method::Completion);
        assert_eq!(pending.document, Some(PathBuf::from("/a.rs")));

        assert!(correlator.resolve(&RequestId::Number(id)).is_none());
        assert_eq!(correlator.pending_count(), 0);
    }

    #[test]
    fn test_string_ids_resolve() {
        let mut correlator = Correlator::new();
        let id = correlator.register(Method::References, None);
        let pending = correlator.resolve(&RequestId::String(id.to_string()));
        assert_eq!(pending.map(|p| p.method), Some(Method::References));
    }

    #[test]
    fn test_unknown_id() {
        let mut correlator = Correlator::new();
        correlator.register(Method::Hover, None);
        assert!(correlator.resolve(&RequestId::Number(42)).is_none());
        assert!(
            correlator
                .resolve(&RequestId::String("x".into()))
                .is_none()
        );
        assert_eq!(correlator.pending_count(), 1);
    }

    #[test]
    fn test_clear_and_discard() {
        let mut correlator = Correlator::new();
        let first = correlator.register(Method::Hover, None);
        correlator.register(Method::Definition, None);
        correlator.discard(first);
        assert!(correlator.resolve(&RequestId::Number(first)).is_none());
        assert_eq!(correlator.clear(), 1);
        assert_eq!(correlator.pending_count(), 0);
    }
}
