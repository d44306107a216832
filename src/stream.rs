//! String stream fed to mode tokenizers
//!
//! A `StringStream` is a cursor over a single line. Token operations
//! consume characters from it; the caller marks the start of every token
//! with [`StringStream::begin_token`] and reads the consumed text back with
//! [`StringStream::current`].
//!
//! All positions are byte offsets that sit on character boundaries.

use std::ops::{Deref, DerefMut};

use regex::{Captures, Regex};

use crate::text::{count_column, count_column_from, is_space};

/// Default tab width when none is given
pub const DEFAULT_TAB_SIZE: usize = 8;

/// Something that can accept or reject a single character
pub trait CharMatcher {
    /// Check whether `ch` is accepted
    fn matches(&self, ch: char) -> bool;
}

impl CharMatcher for char {
    fn matches(&self, ch: char) -> bool {
        *self == ch
    }
}

impl CharMatcher for Regex {
    fn matches(&self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.is_match(ch.encode_utf8(&mut buf))
    }
}

impl CharMatcher for &Regex {
    fn matches(&self, ch: char) -> bool {
        (**self).matches(ch)
    }
}

impl<F: Fn(char) -> bool> CharMatcher for F {
    fn matches(&self, ch: char) -> bool {
        self(ch)
    }
}

/// Scan cursor over one line of text
#[derive(Debug, Clone)]
pub struct StringStream<'a> {
    string: &'a str,
    /// Cursor position
    pub pos: usize,
    /// Start of the current token
    pub start: usize,
    tab_size: usize,
    /// Hidden prefix boundary; `sol()` and columns are relative to it
    line_start: usize,
    last_column_pos: usize,
    last_column_value: usize,
}

impl<'a> StringStream<'a> {
    /// Create a stream over `string` with the default tab size
    pub fn new(string: &'a str) -> Self {
        Self::with_tab_size(string, DEFAULT_TAB_SIZE)
    }

    /// Create a stream with an explicit tab size (0 falls back to the default)
    pub fn with_tab_size(string: &'a str, tab_size: usize) -> Self {
        Self {
            string,
            pos: 0,
            start: 0,
            tab_size: if tab_size == 0 { DEFAULT_TAB_SIZE } else { tab_size },
            line_start: 0,
            last_column_pos: 0,
            last_column_value: 0,
        }
    }

    /// The whole line
    pub fn string(&self) -> &'a str {
        self.string
    }

    /// Tab width used for column computations
    pub fn tab_size(&self) -> usize {
        self.tab_size
    }

    /// Current hidden prefix boundary
    pub fn line_start(&self) -> usize {
        self.line_start
    }

    /// Text from the cursor to the end of the line
    pub fn rest(&self) -> &'a str {
        &self.string[self.pos..]
    }

    /// Mark the cursor as the start of the next token
    pub fn begin_token(&mut self) {
        self.start = self.pos;
    }

    /// At end of line
    pub fn eol(&self) -> bool {
        self.pos >= self.string.len()
    }

    /// At start of line (the hidden prefix boundary, not necessarily 0)
    pub fn sol(&self) -> bool {
        self.pos == self.line_start
    }

    /// Character under the cursor
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consume and return the character under the cursor
    pub fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Consume the character under the cursor if `matcher` accepts it
    pub fn eat<M: CharMatcher>(&mut self, matcher: M) -> Option<char> {
        let ch = self.peek()?;
        if matcher.matches(ch) {
            self.pos += ch.len_utf8();
            Some(ch)
        } else {
            None
        }
    }

    /// Consume characters while `matcher` accepts them
    ///
    /// Returns true if at least one character was consumed.
    pub fn eat_while<M: CharMatcher>(&mut self, matcher: M) -> bool {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !matcher.matches(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        self.pos > start
    }

    /// Consume a run of whitespace
    pub fn eat_space(&mut self) -> bool {
        self.eat_while(is_space)
    }

    /// Move the cursor to the end of the line
    pub fn skip_to_end(&mut self) {
        self.pos = self.string.len();
    }

    /// Move the cursor to the next occurrence of `ch` without consuming it
    ///
    /// The cursor is left untouched when `ch` does not occur.
    pub fn skip_to(&mut self, ch: char) -> bool {
        match self.rest().find(ch) {
            Some(offset) => {
                self.pos += offset;
                true
            }
            None => false,
        }
    }

    /// Move the cursor back by `n` characters
    ///
    /// Stops at the hidden prefix boundary. A cursor still inside the
    /// hidden prefix may back up to the start of the line.
    pub fn back_up(&mut self, n: usize) {
        let floor = if self.pos < self.line_start { 0 } else { self.line_start };
        let offset = self.string[floor..self.pos]
            .char_indices()
            .rev()
            .nth(n.saturating_sub(1))
            .map(|(i, _)| i);
        self.pos = match (n, offset) {
            (0, _) => self.pos,
            (_, Some(i)) => floor + i,
            (_, None) => floor,
        };
    }

    /// Tab-aware column of the token start, relative to the hidden prefix
    pub fn column(&mut self) -> usize {
        if self.last_column_pos < self.start {
            self.last_column_value = count_column_from(
                self.string,
                Some(self.start),
                self.tab_size,
                self.last_column_pos,
                self.last_column_value,
            );
            self.last_column_pos = self.start;
        } else if self.last_column_pos > self.start {
            // Token start moved backwards past the memo
            self.last_column_value = count_column(self.string, Some(self.start), self.tab_size);
            self.last_column_pos = self.start;
        }
        self.last_column_value.saturating_sub(self.prefix_column())
    }

    /// Tab-aware indentation of the line, relative to the hidden prefix
    pub fn indentation(&self) -> usize {
        count_column(self.string, None, self.tab_size).saturating_sub(self.prefix_column())
    }

    fn prefix_column(&self) -> usize {
        if self.line_start == 0 {
            0
        } else {
            count_column(self.string, Some(self.line_start), self.tab_size)
        }
    }

    /// Match literal text at the cursor
    ///
    /// Consumes the text on success unless `consume` is false.
    pub fn match_str(&mut self, pattern: &str, consume: bool, case_insensitive: bool) -> bool {
        let rest = self.rest();
        let len = if case_insensitive {
            let wanted = pattern.chars().count();
            let end = rest
                .char_indices()
                .nth(wanted)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            let candidate = &rest[..end];
            if candidate.to_lowercase() != pattern.to_lowercase() {
                return false;
            }
            end
        } else {
            if !rest.starts_with(pattern) {
                return false;
            }
            pattern.len()
        };

        if consume {
            self.pos += len;
        }
        true
    }

    /// Match a regex that must start exactly at the cursor
    ///
    /// Consumes the matched span unless `consume` is false and returns the
    /// captures.
    pub fn match_regex(&mut self, pattern: &Regex, consume: bool) -> Option<Captures<'a>> {
        let rest: &'a str = &self.string[self.pos..];
        let caps = pattern.captures(rest)?;
        let whole = caps.get(0)?;
        if whole.start() > 0 {
            return None;
        }
        if consume {
            self.pos += whole.end();
        }
        Some(caps)
    }

    /// Text of the current token
    pub fn current(&self) -> &'a str {
        &self.string[self.start..self.pos]
    }

    /// Run `inner` with the first `n` characters hidden
    ///
    /// Inside `inner`, `sol()`, `column()` and `indentation()` treat the
    /// hidden prefix as absent. The previous boundary is restored on every
    /// exit path, including a panic unwinding through `inner`.
    pub fn hide_first_chars<R>(&mut self, n: usize, inner: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.line_start;
        let shifted = self.string[saved..]
            .char_indices()
            .nth(n)
            .map(|(i, _)| saved + i)
            .unwrap_or(self.string.len());
        self.line_start = shifted;

        let mut guard = HiddenPrefix {
            stream: self,
            saved,
        };
        inner(&mut *guard)
    }
}

/// Restores the hidden prefix boundary when dropped
struct HiddenPrefix<'s, 'a> {
    stream: &'s mut StringStream<'a>,
    saved: usize,
}

impl<'a> Deref for HiddenPrefix<'_, 'a> {
    type Target = StringStream<'a>;

    fn deref(&self) -> &Self::Target {
        self.stream
    }
}

impl DerefMut for HiddenPrefix<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.stream
    }
}

impl Drop for HiddenPrefix<'_, '_> {
    fn drop(&mut self) {
        self.stream.line_start = self.saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_peek_and_next() {
        let mut stream = StringStream::new("ab");
        assert!(stream.sol());
        assert_eq!(stream.peek(), Some('a'));
        assert_eq!(stream.next(), Some('a'));
        assert_eq!(stream.next(), Some('b'));
        assert!(stream.eol());
        assert_eq!(stream.next(), None);
        assert_eq!(stream.peek(), None);
        assert_eq!(stream.pos, 2);
    }

    #[test]
    fn test_next_multibyte() {
        let mut stream = StringStream::new("é!");
        assert_eq!(stream.next(), Some('é'));
        assert_eq!(stream.pos, 2);
        stream.back_up(1);
        assert_eq!(stream.pos, 0);
    }

    #[test]
    fn test_eat_matchers() {
        let digits = Regex::new(r"\d").unwrap();
        let mut stream = StringStream::new("x1y");
        assert_eq!(stream.eat('y'), None);
        assert_eq!(stream.pos, 0);
        assert_eq!(stream.eat('x'), Some('x'));
        assert_eq!(stream.eat(&digits), Some('1'));
        assert_eq!(stream.eat(|c: char| c.is_alphabetic()), Some('y'));
        assert_eq!(stream.eat('y'), None);
    }

    #[test]
    fn test_eat_while() {
        let mut stream = StringStream::new("aaab");
        assert!(stream.eat_while('a'));
        assert_eq!(stream.pos, 3);
        assert!(!stream.eat_while('a'));
        assert_eq!(stream.current(), "aaa");
    }

    #[test]
    fn test_eat_space() {
        let mut stream = StringStream::new("  x");
        assert!(stream.eat_space());
        assert_eq!(stream.pos, 2);
        assert!(!stream.eat_space());

        let mut nbsp = StringStream::new("\u{a0}\tz");
        assert!(nbsp.eat_space());
        assert_eq!(nbsp.peek(), Some('z'));
    }

    #[test]
    fn test_skip_to() {
        let mut stream = StringStream::new("abc;def");
        assert!(stream.skip_to(';'));
        assert_eq!(stream.pos, 3);
        assert!(stream.skip_to(';'));
        assert_eq!(stream.pos, 3);
        assert!(!stream.skip_to('#'));
        assert_eq!(stream.pos, 3);
        stream.skip_to_end();
        assert!(stream.eol());
    }

    #[test]
    fn test_match_str() {
        let mut stream = StringStream::new("abc");
        assert!(stream.match_str("ab", true, false));
        assert_eq!(stream.pos, 2);
        assert!(stream.match_str("c", true, false));
        assert!(stream.eol());
    }

    #[test]
    fn test_match_str_options() {
        let mut stream = StringStream::new("SELECT x");
        assert!(!stream.match_str("select", true, false));
        assert!(stream.match_str("select", false, true));
        assert_eq!(stream.pos, 0);
        assert!(stream.match_str("select", true, true));
        assert_eq!(stream.pos, 6);
        assert!(!stream.match_str(" xyz", true, false));
        assert_eq!(stream.pos, 6);
    }

    #[test]
    fn test_match_regex_anchored_at_cursor() {
        let number = Regex::new(r"(\d+)\.(\d+)").unwrap();
        let mut stream = StringStream::new("x 12.5");
        assert!(stream.match_regex(&number, true).is_none());
        assert_eq!(stream.pos, 0);

        stream.pos = 2;
        let caps = stream.match_regex(&number, false).unwrap();
        assert_eq!(&caps[1], "12");
        assert_eq!(&caps[2], "5");
        assert_eq!(stream.pos, 2);

        assert!(stream.match_regex(&number, true).is_some());
        assert!(stream.eol());
    }

    #[test]
    fn test_current_token() {
        let mut stream = StringStream::new("foo bar");
        stream.eat_while(|c: char| c.is_alphabetic());
        assert_eq!(stream.current(), "foo");
        stream.eat_space();
        stream.begin_token();
        stream.eat_while(|c: char| c.is_alphabetic());
        assert_eq!(stream.current(), "bar");
    }

    #[test]
    fn test_column_and_indentation() {
        let mut stream = StringStream::with_tab_size("\tfoo\tbar", 4);
        assert_eq!(stream.indentation(), 4);
        stream.pos = 1;
        stream.begin_token();
        assert_eq!(stream.column(), 4);
        stream.pos = 5;
        stream.begin_token();
        assert_eq!(stream.column(), 8);
        // Polling again without movement uses the memo
        assert_eq!(stream.column(), 8);
        stream.start = 1;
        assert_eq!(stream.column(), 4);
    }

    #[test]
    fn test_back_up() {
        let mut stream = StringStream::new("hello");
        stream.skip_to_end();
        stream.back_up(2);
        assert_eq!(stream.pos, 3);
        stream.back_up(0);
        assert_eq!(stream.pos, 3);
    }

    #[test]
    fn test_eat_space_byte_order_mark() {
        let mut stream = StringStream::new("\u{feff}x");
        assert!(stream.eat_space());
        assert_eq!(stream.peek(), Some('x'));
        let mut stream = StringStream::new("\u{85}x");
        assert!(!stream.eat_space());
    }

    #[test]
    fn test_back_up_stops_at_hidden_prefix() {
        let mut stream = StringStream::new("abcdef");
        stream.pos = 2;
        stream.hide_first_chars(2, |inner| {
            inner.next();
            inner.next();
            inner.back_up(5);
            assert_eq!(inner.pos, 2);
            assert!(inner.sol());
        });
        stream.pos = 4;
        stream.back_up(5);
        assert_eq!(stream.pos, 0);
    }

    #[test]
    fn test_back_up_inside_hidden_prefix() {
        let mut stream = StringStream::new("  foo");
        let pos = stream.hide_first_chars(2, |inner| {
            inner.back_up(0);
            inner.next();
            inner.back_up(1);
            inner.pos
        });
        assert_eq!(pos, 0);
    }

    #[test]
    fn test_hide_first_chars() {
        let mut stream = StringStream::new("  foo");
        stream.eat_space();
        let (sol, indentation) = stream.hide_first_chars(2, |inner| {
            inner.begin_token();
            (inner.sol(), inner.indentation())
        });
        assert!(sol);
        assert_eq!(indentation, 0);
        assert_eq!(stream.line_start(), 0);
        assert!(!stream.sol());
    }

    #[test]
    fn test_sol_false_before_hidden_prefix_is_consumed() {
        let mut stream = StringStream::new("  foo");
        let sol = stream.hide_first_chars(2, |inner| inner.sol());
        assert!(!sol);
        assert!(stream.sol());
    }

    #[test]
    fn test_hide_first_chars_column() {
        let mut stream = StringStream::with_tab_size("<% x", 4);
        stream.pos = 3;
        stream.begin_token();
        let column = stream.hide_first_chars(2, |inner| inner.column());
        assert_eq!(column, 1);
        assert_eq!(stream.column(), 3);
    }

    #[test]
    fn test_hide_first_chars_restores_after_error() {
        let mut stream = StringStream::new("  foo");
        let result: Result<(), &str> = stream.hide_first_chars(2, |_| Err("boom"));
        assert!(result.is_err());
        assert_eq!(stream.line_start(), 0);
    }

    #[test]
    fn test_hide_first_chars_restores_after_panic() {
        let mut stream = StringStream::new("  foo");
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            stream.hide_first_chars(2, |_| -> () { panic!("tokenizer failed") })
        }));
        assert!(outcome.is_err());
        assert_eq!(stream.line_start(), 0);
        assert!(stream.sol());
    }

    #[test]
    fn test_nested_hide_first_chars() {
        let mut stream = StringStream::new("abcdef");
        stream.hide_first_chars(1, |outer| {
            assert_eq!(outer.line_start(), 1);
            outer.hide_first_chars(2, |inner| assert_eq!(inner.line_start(), 3));
            assert_eq!(outer.line_start(), 1);
        });
        assert_eq!(stream.line_start(), 0);
    }
}
