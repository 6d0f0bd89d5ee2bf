//! LSP Common Types
//!
//! Positions, ranges, edits and locations shared by the protocol layer
//! and the response interpreters, plus `file://` URI conversion.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ============================================================================
// Core LSP Types
// ============================================================================

/// Position within a document (0-indexed, LSP standard)
///
/// `character` counts UTF-16 code units, which is the protocol default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// Convert 1-indexed CLI input to 0-indexed LSP position
    pub fn from_cli(line: u32, column: u32) -> Self {
        Self {
            line: line.saturating_sub(1),
            character: column.saturating_sub(1),
        }
    }

    /// Convert 0-indexed LSP position to 1-indexed display position
    pub fn to_display(&self) -> (u32, u32) {
        (self.line + 1, self.character + 1)
    }

    /// Byte offset of this position in `text`, clipped to the end of the
    /// line (or of the document when the line does not exist)
    pub fn to_offset(&self, text: &str) -> usize {
        let Some(line_start) = line_start(text, self.line) else {
            return text.len();
        };
        let line = line_content(&text[line_start..]);

        let mut units = 0u32;
        for (idx, ch) in line.char_indices() {
            if units >= self.character {
                return line_start + idx;
            }
            units += ch.len_utf16() as u32;
        }
        line_start + line.len()
    }

    /// Position of a byte offset in `text`
    pub fn from_offset(text: &str, offset: usize) -> Self {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }

        let before = &text[..offset];
        let line = before.matches('\n').count() as u32;
        let line_begin = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let character = before[line_begin..]
            .chars()
            .map(|c| c.len_utf16() as u32)
            .sum();

        Self { line, character }
    }
}

/// Range within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Convert a single position to a range
    pub fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn contains_line(&self, line: u32) -> bool {
        self.start.line <= line && line <= self.end.line
    }
}

fn line_start(text: &str, line: u32) -> Option<usize> {
    if line == 0 {
        return Some(0);
    }
    text.match_indices('\n')
        .nth(line as usize - 1)
        .map(|(idx, _)| idx + 1)
}

fn line_content(rest: &str) -> &str {
    let line = rest.split('\n').next().unwrap_or("");
    line.strip_suffix('\r').unwrap_or(line)
}

/// Length of a line in UTF-16 units, `None` when the line does not exist
pub fn line_length(text: &str, line: u32) -> Option<u32> {
    let start = line_start(text, line)?;
    Some(
        line_content(&text[start..])
            .chars()
            .map(|c| c.len_utf16() as u32)
            .sum(),
    )
}

// ============================================================================
// Text Edit Types
// ============================================================================

/// Text edit unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }
}

// ============================================================================
// Locations
// ============================================================================

/// A navigation target resolved to a local path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: PathBuf,
    pub range: Range,
}

impl Location {
    pub fn new(path: impl Into<PathBuf>, range: Range) -> Self {
        Self {
            path: path.into(),
            range,
        }
    }
}

/// A location with a display label (reference lists, symbol lists)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationEntry {
    pub location: Location,
    pub label: String,
}

// ============================================================================
// URI Conversion
// ============================================================================

/// Convert a path to a percent-encoded file:// URI
pub fn path_to_uri(path: &Path) -> String {
    let abs_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };

    let path_str = abs_path.to_string_lossy();
    let encoded: String = path_str
        .chars()
        .map(|c| match c {
            '/' | '.' | '-' | '_' | '~' => c.to_string(),
            c if c.is_ascii_alphanumeric() => c.to_string(),
            c => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{:02X}", b))
                    .collect()
            }
        })
        .collect();

    format!("file://{encoded}")
}

/// Convert file:// URI to PathBuf with full percent-decoding
pub fn uri_to_path(uri: &str) -> PathBuf {
    let path = match uri.strip_prefix("file://") {
        Some(p) => p,
        None => {
            tracing::warn!("Invalid file URI (missing file:// prefix): {}", uri);
            return PathBuf::from(uri);
        }
    };

    #[cfg(windows)]
    let path = path.strip_prefix('/').unwrap_or(path);

    PathBuf::from(percent_decode(path))
}

fn percent_decode(input: &str) -> String {
    let mut result = Vec::with_capacity(input.len());
    let mut bytes = input.bytes();

    while let Some(byte) = bytes.next() {
        if byte == b'%' {
            let mut lookahead = bytes.clone();
            let high = lookahead.next().and_then(hex_value);
            let low = lookahead.next().and_then(hex_value);
            if let (Some(h), Some(l)) = (high, low) {
                result.push((h << 4) | l);
                bytes = lookahead;
                continue;
            }
        }
        result.push(byte);
    }

    String::from_utf8_lossy(&result).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_cli() {
        let pos = Position::from_cli(10, 5);
        assert_eq!(pos.line, 9);
        assert_eq!(pos.character, 4);
    }

    #[test]
    fn test_position_to_display() {
        let pos = Position::new(9, 4);
        assert_eq!(pos.to_display(), (10, 5));
    }

    #[test]
    fn test_offset_conversion() {
        let text = "fn main() {\n    let x = 1;\n}\n";
        assert_eq!(Position::new(0, 0).to_offset(text), 0);
        assert_eq!(Position::new(1, 4).to_offset(text), 16);
        assert_eq!(Position::from_offset(text, 16), Position::new(1, 4));
        // Past the end of a line clips to the newline
        assert_eq!(Position::new(0, 99).to_offset(text), 11);
        // Past the last line clips to the document end
        assert_eq!(Position::new(40, 0).to_offset(text), text.len());
    }

    #[test]
    fn test_offset_counts_utf16_units() {
        let text = "a😀b";
        // The emoji is two UTF-16 units and four bytes
        assert_eq!(Position::new(0, 3).to_offset(text), 5);
        assert_eq!(Position::from_offset(text, 5), Position::new(0, 3));
    }

    #[test]
    fn test_line_length() {
        let text = "abc\r\nde\n";
        assert_eq!(line_length(text, 0), Some(3));
        assert_eq!(line_length(text, 1), Some(2));
        assert_eq!(line_length(text, 2), Some(0));
        assert_eq!(line_length(text, 3), None);
    }

    #[test]
    fn test_uri_roundtrip_simple() {
        let path = PathBuf::from("/test/file.rs");
        let uri = path_to_uri(&path);
        assert_eq!(uri, "file:///test/file.rs");
        assert_eq!(uri_to_path(&uri), path);
    }

    #[test]
    fn test_uri_with_spaces() {
        let path = PathBuf::from("/path with spaces/file.rs");
        let uri = path_to_uri(&path);
        assert!(uri.contains("%20"));
        assert_eq!(uri_to_path(&uri), path);
    }

    #[test]
    fn test_uri_with_unicode() {
        let path = PathBuf::from("/tmp/한글_테스트.rs");
        let uri = path_to_uri(&path);
        assert_eq!(uri_to_path(&uri), path);
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("hello%20world"), "hello world");
        assert_eq!(percent_decode("test%2Fpath"), "test/path");
        assert_eq!(percent_decode("normal"), "normal");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz1"), "%zz1");
    }
}
