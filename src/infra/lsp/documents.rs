//! Document synchronization
//!
//! Per-connection open-document table. Every operation either yields the
//! notification to send or `None` when its precondition does not hold.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::protocol::{Notification, methods};
use crate::models::lsp::{Range, path_to_uri};

/// One entry of a didChange `contentChanges` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContentChange {
    Range { range: Range, text: String },
    Full { text: String },
}

impl ContentChange {
    pub fn full(text: impl Into<String>) -> Self {
        Self::Full { text: text.into() }
    }

    pub fn range(range: Range, text: impl Into<String>) -> Self {
        Self::Range {
            range,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenDocument {
    pub version: i32,
}

#[derive(Debug, Default)]
pub struct DocumentSync {
    documents: HashMap<PathBuf, OpenDocument>,
}

impl DocumentSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, path: &Path, text: &str, language_id: &str) -> Option<Notification> {
        if self.documents.contains_key(path) {
            return None;
        }
        let document = OpenDocument { version: 1 };
        self.documents.insert(path.to_path_buf(), document);

        Some(Notification::new(
            methods::DID_OPEN,
            Some(serde_json::json!({
                "textDocument": {
                    "uri": path_to_uri(path),
                    "languageId": language_id,
                    "version": document.version,
                    "text": text
                }
            })),
        ))
    }

    pub fn close(&mut self, path: &Path) -> Option<Notification> {
        self.documents.remove(path)?;
        Some(Notification::new(
            methods::DID_CLOSE,
            Some(serde_json::json!({ "textDocument": { "uri": path_to_uri(path) } })),
        ))
    }

    /// Bump the version and forward the changes in the order given
    pub fn change(&mut self, path: &Path, changes: &[ContentChange]) -> Option<Notification> {
        let document = self.documents.get_mut(path)?;
        document.version += 1;

        Some(Notification::new(
            methods::DID_CHANGE,
            Some(serde_json::json!({
                "textDocument": { "uri": path_to_uri(path), "version": document.version },
                "contentChanges": changes
            })),
        ))
    }

    /// didSave is sent whether or not the document is tracked
    pub fn save(&self, path: &Path, text: Option<&str>) -> Notification {
        let mut params = serde_json::json!({ "textDocument": { "uri": path_to_uri(path) } });
        if let Some(text) = text {
            params["text"] = serde_json::Value::String(text.to_string());
        }
        Notification::new(methods::DID_SAVE, Some(params))
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.documents.contains_key(path)
    }

    pub fn version(&self, path: &Path) -> Option<i32> {
        self.documents.get(path).map(|doc| doc.version)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Forget every document without producing notifications
    pub fn clear(&mut self) -> Vec<PathBuf> {
        self.documents.drain().map(|(path, _)| path).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lsp::Position;

    fn path() -> PathBuf {
        PathBuf::from("/src/main.rs")
    }

    #[test]
    fn test_open_once() {
        let mut sync = DocumentSync::new();
        let open = sync.open(&path(), "fn main() {}", "rust").unwrap();
        assert_eq!(open.method, "textDocument/didOpen");
        assert_eq!(open.params["textDocument"]["version"], 1);
        assert_eq!(open.params["textDocument"]["languageId"], "rust");
        assert_eq!(open.params["textDocument"]["uri"], "file:///src/main.rs");

        assert!(sync.open(&path(), "fn main() {}", "rust").is_none());
        assert_eq!(sync.version(&path()), Some(1));
    }

    #[test]
    fn test_change_bumps_version_and_keeps_order() {
        let mut sync = DocumentSync::new();
        sync.open(&path(), "abc", "rust");

        let changes = vec![
            ContentChange::range(
                Range::new(Position::new(0, 2), Position::new(0, 3)),
                "Z",
            ),
            ContentChange::range(Range::new(Position::new(0, 0), Position::new(0, 1)), ""),
        ];
        let change = sync.change(&path(), &changes).unwrap();
        assert_eq!(change.params["textDocument"]["version"], 2);
        assert_eq!(change.params["contentChanges"][0]["text"], "Z");
        assert_eq!(
            change.params["contentChanges"][0]["range"]["start"]["character"],
            2
        );
        assert_eq!(change.params["contentChanges"][1]["text"], "");

        let change = sync
            .change(&path(), &[ContentChange::full("whole")])
            .unwrap();
        assert_eq!(change.params["textDocument"]["version"], 3);
        assert_eq!(
            change.params["contentChanges"],
            serde_json::json!([{"text": "whole"}])
        );
    }

    #[test]
    fn test_change_and_close_require_open() {
        let mut sync = DocumentSync::new();
        assert!(sync.change(&path(), &[ContentChange::full("x")]).is_none());
        assert!(sync.close(&path()).is_none());

        sync.open(&path(), "x", "rust");
        assert!(sync.close(&path()).is_some());
        assert!(sync.close(&path()).is_none());
        assert!(!sync.is_open(&path()));
    }

    #[test]
    fn test_save_is_unconditional_and_keeps_version() {
        let mut sync = DocumentSync::new();
        let save = sync.save(&path(), None);
        assert_eq!(save.method, "textDocument/didSave");
        assert!(save.params.get("text").is_none());

        sync.open(&path(), "x", "rust");
        let save = sync.save(&path(), Some("x"));
        assert_eq!(save.params["text"], "x");
        assert_eq!(sync.version(&path()), Some(1));
    }

    #[test]
    fn test_clear_is_silent() {
        let mut sync = DocumentSync::new();
        sync.open(&path(), "x", "rust");
        sync.open(Path::new("/src/lib.rs"), "y", "rust");
        let mut cleared = sync.clear();
        cleared.sort();
        assert_eq!(
            cleared,
            vec![PathBuf::from("/src/lib.rs"), PathBuf::from("/src/main.rs")]
        );
        assert!(sync.is_empty());
    }
}
