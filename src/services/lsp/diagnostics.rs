//! Diagnostics store
//!
//! Latest published diagnostics per (connection identity, document).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::models::diagnostic::Diagnostic;

#[derive(Debug, Default)]
pub struct DiagnosticsStore {
    entries: HashMap<(String, PathBuf), Vec<Diagnostic>>,
}

impl DiagnosticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list a connection published for a document
    pub fn replace(&mut self, identity: &str, path: &Path, diagnostics: Vec<Diagnostic>) {
        let key = (identity.to_string(), path.to_path_buf());
        if diagnostics.is_empty() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, diagnostics);
        }
    }

    pub fn get(&self, identity: &str, path: &Path) -> &[Diagnostic] {
        self.entries
            .get(&(identity.to_string(), path.to_path_buf()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every connection's list for a document, by identity
    pub fn for_path(&self, path: &Path) -> Vec<(&str, &[Diagnostic])> {
        let mut lists: Vec<(&str, &[Diagnostic])> = self
            .entries
            .iter()
            .filter(|((_, p), _)| p == path)
            .map(|((identity, _), list)| (identity.as_str(), list.as_slice()))
            .collect();
        lists.sort_by_key(|(identity, _)| *identity);
        lists
    }

    /// Diagnostics of any connection whose range covers the line
    pub fn covering_line(&self, path: &Path, line: u32) -> Vec<(&str, &Diagnostic)> {
        self.for_path(path)
            .into_iter()
            .flat_map(|(identity, list)| {
                list.iter()
                    .filter(move |d| d.range.contains_line(line))
                    .map(move |d| (identity, d))
            })
            .collect()
    }

    /// Forget a connection; returns the documents it had diagnostics for
    pub fn remove_connection(&mut self, identity: &str) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        self.entries.retain(|(id, path), _| {
            if id == identity {
                paths.push(path.clone());
                false
            } else {
                true
            }
        });
        paths.sort();
        paths
    }

    pub fn remove_path(&mut self, path: &Path) {
        self.entries.retain(|(_, p), _| p != path);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
