//! Text edit application
//!
//! Applies server edits (formatting results) to the host buffer text and
//! keeps the cursor on the same piece of code.

use crate::models::lsp::TextEdit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub text: String,
    /// Byte offset into `text`
    pub cursor: usize,
}

/// Apply edits that all refer to the original `text`
///
/// Edits are ordered by start position with ties kept in server order.
/// Positions past the end of a line or of the document are clipped, and an
/// edit overlapping its predecessor is clipped to start where that one ended.
pub fn apply_text_edits(text: &str, edits: &[TextEdit], cursor: usize) -> EditOutcome {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|edit| edit.range.start);

    let mut output = String::with_capacity(text.len());
    let mut copied = 0usize;
    let mut shift = 0i64;

    for edit in ordered {
        let start = edit.range.start.to_offset(text).max(copied);
        let end = edit.range.end.to_offset(text).max(start);

        output.push_str(&text[copied..start]);
        output.push_str(&edit.new_text);
        copied = end;

        if start < cursor {
            shift += edit.new_text.len() as i64 - (end - start) as i64;
        }
    }
    output.push_str(&text[copied..]);

    let mut cursor = (cursor as i64 + shift).clamp(0, output.len() as i64) as usize;
    while !output.is_char_boundary(cursor) {
        cursor -= 1;
    }

    EditOutcome {
        text: output,
        cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lsp::{Position, Range};

    fn edit(sl: u32, sc: u32, el: u32, ec: u32, text: &str) -> TextEdit {
        TextEdit::new(
            Range::new(Position::new(sl, sc), Position::new(el, ec)),
            text,
        )
    }

    #[test]
    fn test_out_of_order_edits() {
        let edits = vec![edit(0, 5, 0, 10, "X"), edit(0, 0, 0, 3, "Y")];
        let outcome = apply_text_edits("0123456789", &edits, 0);
        assert_eq!(outcome.text, "Y34X");
    }

    #[test]
    fn test_same_start_keeps_server_order() {
        let edits = vec![edit(0, 0, 0, 0, "a"), edit(0, 0, 0, 0, "b")];
        let outcome = apply_text_edits("x", &edits, 0);
        assert_eq!(outcome.text, "abx");
    }

    #[test]
    fn test_multiline_and_clipping() {
        let text = "fn main(){\n  let x=1;\n}\n";
        let edits = vec![
            edit(0, 9, 0, 10, " {"),
            edit(1, 0, 1, 2, "    "),
            // Past the end of the line
            edit(1, 9, 1, 99, ";"),
            // Past the end of the document
            edit(9, 0, 12, 0, "// end\n"),
        ];
        let outcome = apply_text_edits(text, &edits, 0);
        assert_eq!(outcome.text, "fn main() {\n    let x=1;\n}\n// end\n");
    }

    #[test]
    fn test_overlap_clipped_to_previous_end() {
        let edits = vec![edit(0, 0, 0, 4, "AB"), edit(0, 2, 0, 6, "CD")];
        let outcome = apply_text_edits("0123456789", &edits, 0);
        assert_eq!(outcome.text, "ABCD6789");
    }

    #[test]
    fn test_cursor_follows_code() {
        // Cursor on the 'x' of "let x"
        let text = "  let x = 1;";
        let cursor = text.find('x').unwrap();
        let edits = vec![edit(0, 0, 0, 2, "    "), edit(0, 10, 0, 11, "42")];
        let outcome = apply_text_edits(text, &edits, cursor);
        assert_eq!(outcome.text, "    let x = 42;");
        assert_eq!(&outcome.text[outcome.cursor..outcome.cursor + 1], "x");
    }

    #[test]
    fn test_cursor_clamped_to_char_boundary() {
        let text = "abcdef";
        let edits = vec![edit(0, 0, 0, 6, "é")];
        let outcome = apply_text_edits(text, &edits, 6);
        assert_eq!(outcome.text, "é");
        // 6 - 6 + 2 = 2, the end of the text
        assert_eq!(outcome.cursor, 2);

        let outcome = apply_text_edits("ab", &[edit(0, 0, 0, 1, "é")], 1);
        assert_eq!(outcome.text, "éb");
        assert_eq!(outcome.cursor, 2);
    }

    #[test]
    fn test_no_edits() {
        let outcome = apply_text_edits("same", &[], 3);
        assert_eq!(outcome, EditOutcome { text: "same".into(), cursor: 3 });
    }
}
