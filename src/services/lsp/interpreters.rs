//! Response interpreters
//!
//! One function per method, from a raw `result` value to what the editor
//! needs. Unexpected shapes come back as `InterpretError`.

use std::path::Path;

use serde_json::Value;

use crate::error::InterpretError;
use crate::infra::lsp::capabilities::ServerCapabilities;
use crate::infra::lsp::protocol::{DocumentSymbol, LspLocation, ServerInfo, SymbolInformation};
use crate::models::lsp::{Location, LocationEntry, TextEdit, uri_to_path};
use crate::models::symbol::symbol_label;

type Interpreted<T> = Result<T, InterpretError>;

fn shape_error(expected: &str, got: &Value) -> InterpretError {
    let kind = match got {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    InterpretError::InvalidShape(format!("expected {expected}, got {kind}"))
}

// ============================================================================
// initialize
// ============================================================================

pub fn interpret_initialize(result: &Value) -> Interpreted<(ServerCapabilities, Option<ServerInfo>)> {
    if !result.is_object() {
        return Err(shape_error("initialize result object", result));
    }
    let capabilities = result
        .get("capabilities")
        .filter(|caps| caps.is_object())
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    let server_info = result
        .get("serverInfo")
        .and_then(|info| serde_json::from_value(info.clone()).ok());

    Ok((ServerCapabilities::from_raw(capabilities), server_info))
}

// ============================================================================
// hover
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverOutcome {
    Empty,
    Text(String),
    /// A shape this client does not render; not an error
    Unrecognized,
}

pub fn interpret_hover(result: &Value) -> HoverOutcome {
    let contents = match result {
        Value::Object(map) => map.get("contents").unwrap_or(result),
        _ => result,
    };

    let text = match contents {
        Value::Null => return HoverOutcome::Empty,
        Value::Object(map) if map.is_empty() => return HoverOutcome::Empty,
        Value::Array(items) if items.is_empty() => return HoverOutcome::Empty,
        Value::String(text) => text.as_str(),
        Value::Object(map) => match map.get("value") {
            Some(Value::String(text)) => text.as_str(),
            _ => return HoverOutcome::Unrecognized,
        },
        _ => return HoverOutcome::Unrecognized,
    };

    if text.trim().is_empty() {
        HoverOutcome::Empty
    } else {
        HoverOutcome::Text(text.to_string())
    }
}

// ============================================================================
// formatting / rangeFormatting
// ============================================================================

/// Absent or empty means the document is already formatted
pub fn interpret_edits(result: &Value) -> Interpreted<Vec<TextEdit>> {
    match result {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => Ok(serde_json::from_value(result.clone())?),
        other => Err(shape_error("array of text edits", other)),
    }
}

// ============================================================================
// completion
// ============================================================================

/// Completion candidates in server order: `insertText`, else `label`
pub fn interpret_completion(result: &Value) -> Interpreted<Vec<String>> {
    let items = match result {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        Value::Object(map) => match map.get("items") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(other) => return Err(shape_error("completion items array", other)),
        },
        other => return Err(shape_error("completion list", other)),
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            item.get("insertText")
                .and_then(Value::as_str)
                .or_else(|| item.get("label").and_then(Value::as_str))
                .map(str::to_string)
        })
        .collect())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The identifier fragment immediately left of a byte offset
pub fn word_prefix(text: &str, cursor: usize) -> &str {
    let mut cursor = cursor.min(text.len());
    while !text.is_char_boundary(cursor) {
        cursor -= 1;
    }
    let before = &text[..cursor];
    let start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(cursor);
    &before[start..]
}

/// For servers that return every symbol in scope: keep plain identifiers
/// that extend the prefix, first occurrence only
pub fn filter_quirky(items: Vec<String>, prefix: &str) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for item in items {
        let plain = !item.is_empty()
            && item
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain && item.starts_with(prefix) && !kept.contains(&item) {
            kept.push(item);
        }
    }
    kept
}

// ============================================================================
// definition / declaration / typeDefinition / implementation / references
// ============================================================================

fn parse_location(value: &Value) -> Interpreted<Location> {
    if value.get("targetUri").is_some() {
        return Err(InterpretError::UnsupportedLink);
    }
    let location: LspLocation = serde_json::from_value(value.clone())?;
    Ok(Location::new(uri_to_path(&location.uri), location.range))
}

/// Only the first location of a list is honored
pub fn interpret_location(result: &Value) -> Interpreted<Option<Location>> {
    match result {
        Value::Null => Ok(None),
        Value::Array(items) => items.first().map(parse_location).transpose(),
        Value::Object(_) => parse_location(result).map(Some),
        other => Err(shape_error("location", other)),
    }
}

pub fn interpret_references(result: &Value) -> Interpreted<Vec<Location>> {
    match result {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(parse_location).collect(),
        other => Err(shape_error("array of locations", other)),
    }
}

// ============================================================================
// documentSymbol
// ============================================================================

/// Flat and nested symbols as (location, label) pairs, nested ones in
/// pre-order and placed in `document`
pub fn interpret_document_symbols(result: &Value, document: &Path) -> Interpreted<Vec<LocationEntry>> {
    let items = match result {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => return Err(shape_error("array of symbols", other)),
    };

    let mut entries = Vec::new();
    for item in items {
        if item.get("location").is_some() {
            let symbol: SymbolInformation = serde_json::from_value(item.clone())?;
            entries.push(LocationEntry {
                location: Location::new(uri_to_path(&symbol.location.uri), symbol.location.range),
                label: symbol_label(symbol.kind, &symbol.name),
            });
        } else {
            let symbol: DocumentSymbol = serde_json::from_value(item.clone())?;
            flatten_symbol(&symbol, document, &mut entries);
        }
    }
    Ok(entries)
}

fn flatten_symbol(symbol: &DocumentSymbol, document: &Path, entries: &mut Vec<LocationEntry>) {
    let range = symbol.selection_range.unwrap_or(symbol.range);
    entries.push(LocationEntry {
        location: Location::new(document, range),
        label: symbol_label(symbol.kind, &symbol.name),
    });
    for child in &symbol.children {
        flatten_symbol(child, document, entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::lsp::capabilities::Capability;
    use crate::models::lsp::{Position, Range};
    use serde_json::json;
    use std::path::PathBuf;

    fn range_json(line: u32, start: u32, end: u32) -> Value {
        json!({"start": {"line": line, "character": start}, "end": {"line": line, "character": end}})
    }

    #[test]
    fn test_initialize_result() {
        let (caps, info) = interpret_initialize(&json!({
            "capabilities": {"hoverProvider": true},
            "serverInfo": {"name": "clangd", "version": "18.1"}
        }))
        .unwrap();
        assert!(caps.supports(Capability::Hover));
        assert_eq!(info.unwrap().to_string(), "clangd 18.1");

        let (caps, info) = interpret_initialize(&json!({})).unwrap();
        assert!(!caps.supports(Capability::Hover));
        assert!(info.is_none());

        assert!(interpret_initialize(&Value::Null).is_err());
    }

    #[test]
    fn test_hover_shapes() {
        assert_eq!(interpret_hover(&Value::Null), HoverOutcome::Empty);
        assert_eq!(interpret_hover(&json!("")), HoverOutcome::Empty);
        assert_eq!(interpret_hover(&json!({"contents": ""})), HoverOutcome::Empty);
        assert_eq!(interpret_hover(&json!({"contents": null})), HoverOutcome::Empty);
        assert_eq!(interpret_hover(&json!({})), HoverOutcome::Empty);
        assert_eq!(interpret_hover(&json!([])), HoverOutcome::Empty);
        assert_eq!(interpret_hover(&json!({"contents": {}})), HoverOutcome::Empty);
        assert_eq!(interpret_hover(&json!({"contents": []})), HoverOutcome::Empty);
        assert_eq!(
            interpret_hover(&json!("fn main()")),
            HoverOutcome::Text("fn main()".into())
        );
        assert_eq!(
            interpret_hover(&json!({"contents": {"kind": "markdown", "value": "**x**"}})),
            HoverOutcome::Text("**x**".into())
        );
        assert_eq!(
            interpret_hover(&json!({"value": "int x"})),
            HoverOutcome::Text("int x".into())
        );
        assert_eq!(
            interpret_hover(&json!({"contents": ["a", "b"]})),
            HoverOutcome::Unrecognized
        );
        assert_eq!(interpret_hover(&json!(42)), HoverOutcome::Unrecognized);
    }

    #[test]
    fn test_edits() {
        assert!(interpret_edits(&Value::Null).unwrap().is_empty());
        assert!(interpret_edits(&json!([])).unwrap().is_empty());

        let edits = interpret_edits(&json!([{"range": range_json(0, 0, 2), "newText": "ab"}])).unwrap();
        assert_eq!(
            edits,
            vec![TextEdit::new(
                Range::new(Position::new(0, 0), Position::new(0, 2)),
                "ab"
            )]
        );

        assert!(interpret_edits(&json!({"edits": []})).is_err());
        assert!(matches!(
            interpret_edits(&json!([{"newText": "x"}])),
            Err(InterpretError::Decode(_))
        ));
    }

    #[test]
    fn test_completion_shapes() {
        let items = json!([
            {"label": "push", "insertText": "push()"},
            {"label": "pop"},
            {"kind": 3}
        ]);
        assert_eq!(interpret_completion(&items).unwrap(), vec!["push()", "pop"]);
        assert_eq!(
            interpret_completion(&json!({"isIncomplete": false, "items": [{"label": "len"}]})).unwrap(),
            vec!["len"]
        );
        assert!(interpret_completion(&Value::Null).unwrap().is_empty());
        assert!(interpret_completion(&json!("nope")).is_err());
    }

    #[test]
    fn test_word_prefix() {
        assert_eq!(word_prefix("let x = foo_b", 13), "foo_b");
        assert_eq!(word_prefix("self.", 5), "");
        assert_eq!(word_prefix("abc", 2), "ab");
        assert_eq!(word_prefix("é1x", 4), "é1x");
        assert_eq!(word_prefix("", 0), "");
    }

    #[test]
    fn test_quirk_filter() {
        let items = vec![
            "self::Foo".to_string(),
            "foobar".to_string(),
            "foo_bar".to_string(),
            "foo_bar".to_string(),
        ];
        assert_eq!(filter_quirky(items, "foo"), vec!["foobar", "foo_bar"]);
        assert_eq!(
            filter_quirky(vec!["".into(), "x y".into(), "a1".into()], ""),
            vec!["a1"]
        );
    }

    #[test]
    fn test_location_shapes() {
        let loc = json!({"uri": "file:///src/lib.rs", "range": range_json(4, 2, 6)});
        let expected = Location::new(
            "/src/lib.rs",
            Range::new(Position::new(4, 2), Position::new(4, 6)),
        );

        assert_eq!(interpret_location(&loc).unwrap(), Some(expected.clone()));
        let other = json!({"uri": "file:///other.rs", "range": range_json(0, 0, 0)});
        assert_eq!(
            interpret_location(&json!([loc, other])).unwrap(),
            Some(expected)
        );
        assert_eq!(interpret_location(&json!([])).unwrap(), None);
        assert_eq!(interpret_location(&Value::Null).unwrap(), None);

        let link = json!([{"targetUri": "file:///a.rs", "targetRange": range_json(0, 0, 1),
                           "targetSelectionRange": range_json(0, 0, 1)}]);
        assert!(matches!(
            interpret_location(&link),
            Err(InterpretError::UnsupportedLink)
        ));
    }

    #[test]
    fn test_references() {
        let refs = json!([
            {"uri": "file:///a%20b/x.go", "range": range_json(1, 0, 3)},
            {"uri": "file:///y.go", "range": range_json(2, 4, 5)}
        ]);
        let locations = interpret_references(&refs).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].path, PathBuf::from("/a b/x.go"));
        assert!(interpret_references(&Value::Null).unwrap().is_empty());
        assert!(interpret_references(&json!({})).is_err());
    }

    #[test]
    fn test_nested_symbols_in_preorder() {
        let result = json!([
            {
                "name": "Parser", "kind": 23, "range": range_json(0, 0, 9),
                "selectionRange": range_json(0, 7, 13),
                "children": [
                    {"name": "new", "kind": 6, "range": range_json(1, 4, 8)},
                    {"name": "buf", "kind": 8, "range": range_json(2, 4, 8)}
                ]
            },
            {"name": "main", "kind": 12, "range": range_json(5, 0, 4)}
        ]);
        let entries = interpret_document_symbols(&result, Path::new("/src/parse.rs")).unwrap();
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["[Struct]\tParser", "[Method]\tnew", "[Field]\tbuf", "[Function]\tmain"]
        );
        assert_eq!(entries[0].location.range.start, Position::new(0, 7));
        assert_eq!(entries[1].location.path, PathBuf::from("/src/parse.rs"));
    }

    #[test]
    fn test_flat_symbols() {
        let result = json!([
            {"name": "x", "kind": 99, "location": {"uri": "file:///b.py", "range": range_json(3, 0, 1)}}
        ]);
        let entries = interpret_document_symbols(&result, Path::new("/a.py")).unwrap();
        assert_eq!(entries[0].label, "[Unknown]\tx");
        assert_eq!(entries[0].location.path, PathBuf::from("/b.py"));
        assert!(interpret_document_symbols(&Value::Null, Path::new("/a.py")).unwrap().is_empty());
    }
}
