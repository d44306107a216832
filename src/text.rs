//! Line-level text utilities
//!
//! Tab-aware column counting, line splitting and word character
//! classification shared by the stream, the grammars and the caller.

use unicode_width::UnicodeWidthStr;

/// Code point ranges of scripts without case that still count as word characters
const SINGLE_CASE_WORD_RANGES: &[(char, char)] = &[
    ('\u{00df}', '\u{00df}'),
    ('\u{0587}', '\u{0587}'),
    ('\u{0590}', '\u{05f4}'),
    ('\u{0600}', '\u{06ff}'),
    ('\u{3040}', '\u{309f}'),
    ('\u{30a0}', '\u{30ff}'),
    ('\u{3400}', '\u{4db5}'),
    ('\u{4e00}', '\u{9fcc}'),
    ('\u{ac00}', '\u{d7af}'),
];

/// Whitespace as seen by the stream
///
/// ASCII whitespace, the no-break and BOM characters, and the Unicode space
/// separators. U+0085 (next line) is not included.
pub fn is_space(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n' | '\u{0b}' | '\u{0c}' | '\r' | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
            | '\u{feff}'
    )
}

/// Byte offset of the first non-whitespace character, or the text length
pub fn first_non_space(text: &str) -> usize {
    text.find(|c: char| !is_space(c)).unwrap_or(text.len())
}

/// Count the tab-expanded column at byte offset `end`
///
/// With `end == None` the column of the first non-whitespace character is
/// returned (the indentation of the line).
pub fn count_column(text: &str, end: Option<usize>, tab_size: usize) -> usize {
    count_column_from(text, end, tab_size, 0, 0)
}

/// Count the tab-expanded column at `end`, resuming from a known checkpoint
///
/// `start_value` is the column at byte offset `start_index`. Every tab moves
/// the column to the next multiple of `tab_size`, every other character
/// advances it by one.
pub fn count_column_from(
    text: &str,
    end: Option<usize>,
    tab_size: usize,
    start_index: usize,
    start_value: usize,
) -> usize {
    let end = end.unwrap_or_else(|| first_non_space(text)).min(text.len());
    let tab_size = tab_size.max(1);
    let mut column = start_value;

    if start_index >= end {
        return column;
    }

    let Some(range) = text.get(start_index..end) else {
        return column;
    };
    for ch in range.chars() {
        if ch == '\t' {
            column += tab_size - column % tab_size;
        } else {
            column += 1;
        }
    }
    column
}

/// Split text into lines on `\n`, `\r\n` or a bare `\r`
///
/// Separators are dropped. Text ending on a separator produces a final
/// empty line, and empty text produces a single empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\n' => {
                lines.push(&text[start..pos]);
                pos += 1;
                start = pos;
            }
            b'\r' => {
                lines.push(&text[start..pos]);
                pos += if bytes.get(pos + 1) == Some(&b'\n') { 2 } else { 1 };
                start = pos;
            }
            _ => pos += 1,
        }
    }
    lines.push(&text[start..]);
    lines
}

/// Check whether a character belongs to a word for selection and navigation
pub fn is_word_char(ch: char) -> bool {
    if ch.is_ascii_alphanumeric() || ch == '_' {
        return true;
    }
    if ch <= '\u{80}' {
        return false;
    }
    let has_case = !ch.to_uppercase().eq(ch.to_lowercase());
    has_case
        || SINGLE_CASE_WORD_RANGES
            .iter()
            .any(|&(lo, hi)| ch >= lo && ch <= hi)
}

/// Terminal display width of a string (wide characters count as two)
pub fn display_width(text: &str) -> usize {
    text.width()
}
