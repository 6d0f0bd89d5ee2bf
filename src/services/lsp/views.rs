//! View bindings
//!
//! Which host views show which document. A document is visible while at
//! least one view is bound to it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Host-assigned view handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

#[derive(Debug, Default)]
pub struct ViewBindings {
    views: HashMap<ViewId, PathBuf>,
    documents: HashMap<PathBuf, Vec<ViewId>>,
}

impl ViewBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a view; true when the document just became visible
    pub fn bind(&mut self, view: ViewId, path: &Path) -> bool {
        self.views.insert(view, path.to_path_buf());
        let bound = self.documents.entry(path.to_path_buf()).or_default();
        if !bound.contains(&view) {
            bound.push(view);
        }
        bound.len() == 1
    }

    /// Unbind a view; returns its document and whether it was the last view on it
    pub fn unbind(&mut self, view: ViewId) -> Option<(PathBuf, bool)> {
        let path = self.views.remove(&view)?;
        let last = match self.documents.get_mut(&path) {
            Some(bound) => {
                bound.retain(|v| *v != view);
                bound.is_empty()
            }
            None => true,
        };
        if last {
            self.documents.remove(&path);
        }
        Some((path, last))
    }

    pub fn path_of(&self, view: ViewId) -> Option<&Path> {
        self.views.get(&view).map(PathBuf::as_path)
    }

    pub fn views_of(&self, path: &Path) -> &[ViewId] {
        self.documents
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_and_last_view() {
        let mut views = ViewBindings::new();
        let path = Path::new("/src/a.rs");

        assert!(views.bind(ViewId(1), path));
        assert!(!views.bind(ViewId(2), path));
        assert!(!views.bind(ViewId(2), path));
        assert_eq!(views.views_of(path), &[ViewId(1), ViewId(2)]);

        assert_eq!(views.unbind(ViewId(1)), Some((path.to_path_buf(), false)));
        assert_eq!(views.views_of(path), &[ViewId(2)]);
        assert_eq!(views.unbind(ViewId(2)), Some((path.to_path_buf(), true)));
        assert!(views.views_of(path).is_empty());
        assert_eq!(views.unbind(ViewId(2)), None);
    }

    #[test]
    fn test_path_of() {
        let mut views = ViewBindings::new();
        views.bind(ViewId(7), Path::new("/x.go"));
        assert_eq!(views.path_of(ViewId(7)), Some(Path::new("/x.go")));
        assert_eq!(views.path_of(ViewId(8)), None);
        assert_eq!(views.views_of(Path::new("/x.go")), &[ViewId(7)]);
    }
}
