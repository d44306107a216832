//! Style types for highlighted output
//!
//! Styles are terminal-oriented (ANSI 16-color palette) and are attached to
//! byte ranges of a line as [`Span`]s.

use super::tokens::TokenType;

/// Terminal colors (ANSI 16-color palette for compatibility)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

/// Text style attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Style {
    /// Create a style with just foreground color
    pub fn fg(color: Color) -> Self {
        Self {
            fg: color,
            ..Default::default()
        }
    }

    /// Builder: set background color
    pub fn with_bg(mut self, color: Color) -> Self {
        self.bg = color;
        self
    }

    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn with_underline(mut self) -> Self {
        self.underline = true;
        self
    }

    /// Check if this is the default (no styling)
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// A classified range of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Byte offset where this span starts (inclusive)
    pub start: usize,
    /// Byte offset where this span ends (exclusive)
    pub end: usize,
    /// Token class, `None` for unclassified text
    pub token: Option<TokenType>,
    /// Style to apply to this span
    pub style: Style,
}

impl Span {
    /// Create a span styled by its token class
    pub fn new(start: usize, end: usize, token: Option<TokenType>) -> Self {
        let style = token.map(|t| t.default_style()).unwrap_or_default();
        Self {
            start,
            end,
            token,
            style,
        }
    }

    /// Check if this span contains a byte position
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos < self.end
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_style_is_dim_italic() {
        let style = TokenType::Comment.default_style();
        assert_eq!(style.fg, Color::BrightBlack);
        assert!(style.italic && !style.bold);
        assert_eq!(style.with_bg(Color::Blue).bg, Color::Blue);
    }

    #[test]
    fn test_span_style_follows_token() {
        let span = Span::new(0, 3, Some(TokenType::Keyword));
        assert_eq!(span.style, TokenType::Keyword.default_style());
        assert!(Span::new(0, 3, None).style.is_default());
    }

    #[test]
    fn test_span_contains() {
        let span = Span::new(5, 10, None);
        assert!(!span.contains(4));
        assert!(span.contains(5));
        assert!(span.contains(9));
        assert!(!span.contains(10));
        assert_eq!(span.len(), 5);
    }
}
