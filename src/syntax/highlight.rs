//! Line highlighting driven by a mode
//!
//! [`tokenize_line`] runs a mode's token operation over one line and
//! [`highlight_line`] turns the result into styled spans. [`HighlightCache`]
//! keeps the end-of-line state of every line so that an edit only
//! re-tokenizes from the first changed line onwards.

use std::sync::Arc;

use tracing::{debug, warn};

use super::style::Span;
use super::tokens::TokenType;
use crate::mode::{copy_state, start_state, Handling, Mode, State};
use crate::stream::StringStream;

/// Consecutive token calls that may leave the cursor in place before the
/// rest of the line is given up on
pub const MAX_STALLED_CALLS: usize = 10;

/// One token as produced by a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset past the last character
    pub end: usize,
    /// Class reported by the mode
    pub kind: Option<TokenType>,
}

impl Token {
    /// Text of the token within its line
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }
}

/// Split a line into tokens, advancing `state` to the end of the line
///
/// Empty lines go to the mode's blank line operation instead. A mode that
/// fails to advance the stream for [`MAX_STALLED_CALLS`] calls in a row has
/// the remainder of the line reported as a single unclassified token.
pub fn tokenize_line(mode: &Mode, line: &str, state: &mut State, tab_size: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    if line.is_empty() {
        mode.blank_line(state);
        return tokens;
    }

    let mut stream = StringStream::with_tab_size(line, tab_size);
    let mut stalled = 0;
    while !stream.eol() {
        stream.begin_token();
        let kind = mode.token(&mut stream, state);

        if stream.pos <= stream.start {
            stream.pos = stream.start;
            stalled += 1;
            if stalled >= MAX_STALLED_CALLS {
                warn!(mode = mode.name(), column = stream.start, "mode failed to advance stream");
                tokens.push(Token {
                    start: stream.start,
                    end: line.len(),
                    kind: None,
                });
                break;
            }
            continue;
        }

        stalled = 0;
        tokens.push(Token {
            start: stream.start,
            end: stream.pos,
            kind,
        });
    }
    tokens
}

/// Highlight a line, advancing `state` to the end of the line
///
/// Unclassified text gets no span; adjacent tokens of the same class are
/// merged into one span.
pub fn highlight_line(mode: &Mode, line: &str, state: &mut State, tab_size: usize) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    for token in tokenize_line(mode, line, state, tab_size) {
        let Some(kind) = token.kind else {
            continue;
        };
        match spans.last_mut() {
            Some(last) if last.end == token.start && last.token == Some(kind) => {
                last.end = token.end;
            }
            _ => spans.push(Span::new(token.start, token.end, Some(kind))),
        }
    }
    spans
}

/// Per-document highlighting cache
pub struct HighlightCache {
    mode: Arc<Mode>,
    tab_size: usize,
    /// State at the end of each line
    line_states: Vec<State>,
    /// Spans for each line
    line_spans: Vec<Vec<Span>>,
    /// Number of leading lines whose state and spans are current
    valid_lines: usize,
}

impl HighlightCache {
    pub fn new(mode: Arc<Mode>, tab_size: usize) -> Self {
        Self {
            mode,
            tab_size,
            line_states: Vec::new(),
            line_spans: Vec::new(),
            valid_lines: 0,
        }
    }

    pub fn mode(&self) -> &Arc<Mode> {
        &self.mode
    }

    /// Switch modes; everything is re-tokenized
    pub fn set_mode(&mut self, mode: Arc<Mode>) {
        self.mode = mode;
        self.invalidate_all();
    }

    /// Mark `line` and every following line as stale
    pub fn invalidate_from(&mut self, line: usize) {
        self.valid_lines = self.valid_lines.min(line);
    }

    pub fn invalidate_all(&mut self) {
        self.valid_lines = 0;
        self.line_states.clear();
        self.line_spans.clear();
    }

    /// Number of lines whose cached result is current
    pub fn valid_lines(&self) -> usize {
        self.valid_lines
    }

    /// State at the end of `line`, if it has been computed
    pub fn state_after(&self, line: usize) -> Option<&State> {
        if line < self.valid_lines {
            self.line_states.get(line)
        } else {
            None
        }
    }

    /// Highlight a whole document, re-tokenizing only stale lines
    pub fn highlight_document(&mut self, lines: &[&str]) -> &[Vec<Span>] {
        self.ensure_lines(lines, lines.len());
        &self.line_spans[..lines.len()]
    }

    /// Indentation the mode suggests for `line`
    ///
    /// Uses the state at the end of the previous line, and the text of
    /// `line` after its leading whitespace.
    pub fn indent_line(&mut self, lines: &[&str], line: usize) -> Handling<usize> {
        let Some(text) = lines.get(line) else {
            return Handling::Declined;
        };
        self.ensure_lines(lines, line);
        let text_after = text.trim_start();
        match line.checked_sub(1).and_then(|prev| self.state_after(prev)) {
            Some(state) => self.mode.indent(state, text_after),
            None => self.mode.indent(&start_state(&self.mode, 0), text_after),
        }
    }

    /// Bring the first `count` lines up to date
    fn ensure_lines(&mut self, lines: &[&str], count: usize) {
        let count = count.min(lines.len());
        self.line_states.truncate(lines.len());
        self.line_spans.truncate(lines.len());
        self.valid_lines = self.valid_lines.min(lines.len());
        if self.valid_lines >= count {
            return;
        }

        debug!(
            mode = self.mode.name(),
            from = self.valid_lines,
            to = count,
            "re-tokenizing lines"
        );
        self.line_states.truncate(self.valid_lines);
        self.line_spans.truncate(self.valid_lines);
        for (idx, text) in lines.iter().enumerate().take(count).skip(self.valid_lines) {
            let mut state = match idx.checked_sub(1) {
                Some(prev) => copy_state(&self.mode, &self.line_states[prev]),
                None => start_state(&self.mode, 0),
            };
            let spans = highlight_line(&self.mode, text, &mut state, self.tab_size);
            self.line_states.push(state);
            self.line_spans.push(spans);
        }
        self.valid_lines = count;
    }
}

impl std::fmt::Debug for HighlightCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightCache")
            .field("mode", &self.mode.name())
            .field("tab_size", &self.tab_size)
            .field("valid_lines", &self.valid_lines)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::StateRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Words, numbers and `/* */` comments spanning lines
    fn test_mode() -> Mode {
        Mode::new(|_, stream, state| {
            let record = state.as_record_mut()?;
            if record.bool("comment") {
                let rest = stream.rest();
                match rest.find("*/") {
                    Some(end) => {
                        stream.pos += end + 2;
                        record.set("comment", false);
                    }
                    None => stream.skip_to_end(),
                }
                return Some(TokenType::Comment);
            }
            if stream.eat_space() {
                return None;
            }
            if stream.match_str("/*", true, false) {
                record.set("comment", true);
                return Some(TokenType::Comment);
            }
            if stream.eat_while(|c: char| c.is_ascii_digit()) {
                return Some(TokenType::Number);
            }
            if stream.eat_while(|c: char| c.is_alphanumeric()) {
                return Some(TokenType::Variable);
            }
            stream.next();
            Some(TokenType::Punctuation)
        })
        .with_start_state(|_, _| State::Record(StateRecord::new()))
        .with_indent(|_, state, _| {
            let in_comment = state.as_record().map(|r| r.bool("comment")).unwrap_or(false);
            Handling::Handled(if in_comment { 3 } else { 0 })
        })
    }

    #[test]
    fn test_tokenize_line() {
        let mode = test_mode();
        let mut state = start_state(&mode, 0);
        let tokens = tokenize_line(&mode, "ab 12", &mut state, 4);
        assert_eq!(
            tokens,
            vec![
                Token { start: 0, end: 2, kind: Some(TokenType::Variable) },
                Token { start: 2, end: 3, kind: None },
                Token { start: 3, end: 5, kind: Some(TokenType::Number) },
            ]
        );
        assert_eq!(tokens[2].text("ab 12"), "12");
    }

    #[test]
    fn test_highlight_merges_and_skips_unstyled() {
        let mode = test_mode();
        let mut state = start_state(&mode, 0);
        let spans = highlight_line(&mode, "x ;; 1", &mut state, 4);
        let ranges: Vec<_> = spans.iter().map(|s| (s.start, s.end, s.token)).collect();
        assert_eq!(
            ranges,
            vec![
                (0, 1, Some(TokenType::Variable)),
                (2, 4, Some(TokenType::Punctuation)),
                (5, 6, Some(TokenType::Number)),
            ]
        );
    }

    #[test]
    fn test_state_carries_across_lines() {
        let mode = test_mode();
        let mut state = start_state(&mode, 0);
        highlight_line(&mode, "a /* open", &mut state, 4);
        assert!(state.as_record().unwrap().bool("comment"));

        let spans = highlight_line(&mode, "still */ b", &mut state, 4);
        assert_eq!(spans[0].token, Some(TokenType::Comment));
        assert_eq!((spans[0].start, spans[0].end), (0, 8));
        assert!(!state.as_record().unwrap().bool("comment"));
    }

    #[test]
    fn test_blank_line_called_for_empty_lines() {
        let blanks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&blanks);
        let mode = test_mode().with_blank_line(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut state = start_state(&mode, 0);
        assert!(tokenize_line(&mode, "", &mut state, 4).is_empty());
        assert_eq!(blanks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stalled_mode_gives_up_on_line() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mode = Mode::new(move |_, stream, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            if stream.sol() {
                stream.next();
                return Some(TokenType::Keyword);
            }
            None
        });
        let mut state = State::Stateless;
        let tokens = tokenize_line(&mode, "abc", &mut state, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 1 + MAX_STALLED_CALLS);
        assert_eq!(tokens.last(), Some(&Token { start: 1, end: 3, kind: None }));
    }

    #[test]
    fn test_cache_retokenizes_from_invalid_line() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mode = Mode::new(move |_, stream, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            stream.skip_to_end();
            Some(TokenType::Variable)
        });
        let mut cache = HighlightCache::new(Arc::new(mode), 4);
        let lines = ["one", "two", "three"];

        assert_eq!(cache.highlight_document(&lines).len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        cache.highlight_document(&lines);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        cache.invalidate_from(1);
        cache.highlight_document(&lines);
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        cache.invalidate_all();
        assert_eq!(cache.valid_lines(), 0);
    }

    #[test]
    fn test_cache_states_are_independent_copies() {
        let mut cache = HighlightCache::new(Arc::new(test_mode()), 4);
        cache.highlight_document(&["/* open", "x */", "y"]);
        assert!(cache.state_after(0).unwrap().as_record().unwrap().bool("comment"));
        assert!(!cache.state_after(1).unwrap().as_record().unwrap().bool("comment"));
        assert!(cache.state_after(3).is_none());
    }

    #[test]
    fn test_cache_handles_shorter_document() {
        let mut cache = HighlightCache::new(Arc::new(test_mode()), 4);
        cache.highlight_document(&["a", "b", "c"]);
        assert_eq!(cache.highlight_document(&["a"]).len(), 1);
        assert_eq!(cache.valid_lines(), 1);
    }

    #[test]
    fn test_indent_line_uses_previous_state() {
        let mut cache = HighlightCache::new(Arc::new(test_mode()), 4);
        let lines = ["/* open", "   inside", "*/"];
        assert_eq!(cache.indent_line(&lines, 0), Handling::Handled(0));
        assert_eq!(cache.indent_line(&lines, 1), Handling::Handled(3));
        assert_eq!(cache.indent_line(&lines, 9), Handling::Declined);
    }
}
