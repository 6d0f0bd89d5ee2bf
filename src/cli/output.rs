//! Output formatting for CLI commands

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::models::lsp::Location;

/// Output context for consistent formatting across commands
///
/// Every command prints exactly one JSON document through this.
#[derive(Debug, Clone)]
pub struct OutputContext {
    /// Project root for relative path calculation
    root: PathBuf,
}

/// A location as printed: project-relative path, 1-indexed position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationOutput {
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl OutputContext {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert an absolute path to relative (if within project root)
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string())
    }

    pub fn location(&self, location: &Location, label: Option<String>) -> LocationOutput {
        let (line, column) = location.range.start.to_display();
        LocationOutput {
            file: self.relative_path(&location.path),
            line,
            column,
            label,
        }
    }

    /// Print a successful response with flat structure (data fields at top level)
    pub fn print_success_flat<T: Serialize>(&self, data: T) {
        let mut response = serde_json::to_value(data).unwrap_or(serde_json::json!({}));
        if let Some(obj) = response.as_object_mut() {
            obj.insert("success".to_string(), serde_json::json!(true));
        }
        print_json(&response);
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}
