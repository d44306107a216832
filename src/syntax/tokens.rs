//! Token classes for syntax highlighting
//!
//! Token operations classify what they consumed with a [`TokenType`];
//! returning `None` leaves the text unstyled.

use super::style::{Color, Style};

/// Semantic token classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Comments
    Comment,
    /// String literals
    String,
    /// Character literals
    Char,
    /// Numeric literals
    Number,
    /// Language keywords
    Keyword,
    /// Type names
    Type,
    /// Function names at call or definition sites
    Function,
    /// Plain identifiers
    Variable,
    /// Operators (+, -, *, /, etc.)
    Operator,
    /// Punctuation (, ; : etc.)
    Punctuation,
    /// Brackets and braces
    Bracket,
    /// Preprocessor directives (#include, #define)
    Preprocessor,
    /// Macros (println!, vec!)
    Macro,
    /// Constants, booleans and entities
    Atom,
    /// Markup tag names
    Tag,
    /// Markup attribute names and TOML keys
    Attribute,
    /// Section headers (TOML tables)
    Header,
    /// Lifetime annotations ('a)
    Lifetime,
    /// Out-of-band text such as diff markers
    Meta,
    /// Added lines in a patch
    Inserted,
    /// Removed lines in a patch
    Deleted,
    /// Malformed input
    Error,
}

impl TokenType {
    /// Get the default style for this token type
    pub fn default_style(&self) -> Style {
        match self {
            TokenType::Comment => Style::fg(Color::BrightBlack).with_italic(),
            TokenType::String | TokenType::Char => Style::fg(Color::Green),
            TokenType::Number => Style::fg(Color::Cyan),
            TokenType::Keyword => Style::fg(Color::Magenta).with_bold(),
            TokenType::Type => Style::fg(Color::Yellow),
            TokenType::Function => Style::fg(Color::Blue),
            TokenType::Variable => Style::default(),
            TokenType::Operator => Style::fg(Color::BrightWhite),
            TokenType::Punctuation | TokenType::Bracket => Style::default(),
            TokenType::Preprocessor => Style::fg(Color::BrightMagenta),
            TokenType::Macro => Style::fg(Color::BrightCyan),
            TokenType::Atom => Style::fg(Color::BrightRed),
            TokenType::Tag => Style::fg(Color::Blue).with_bold(),
            TokenType::Attribute => Style::fg(Color::BrightBlue),
            TokenType::Header => Style::fg(Color::Yellow).with_bold(),
            TokenType::Lifetime => Style::fg(Color::BrightMagenta),
            TokenType::Meta => Style::fg(Color::BrightBlack),
            TokenType::Inserted => Style::fg(Color::BrightGreen),
            TokenType::Deleted => Style::fg(Color::BrightRed),
            TokenType::Error => Style::fg(Color::Red).with_underline(),
        }
    }

    /// Get a human-readable name for this token type
    pub fn name(&self) -> &'static str {
        match self {
            TokenType::Comment => "comment",
            TokenType::String => "string",
            TokenType::Char => "char",
            TokenType::Number => "number",
            TokenType::Keyword => "keyword",
            TokenType::Type => "type",
            TokenType::Function => "function",
            TokenType::Variable => "variable",
            TokenType::Operator => "operator",
            TokenType::Punctuation => "punctuation",
            TokenType::Bracket => "bracket",
            TokenType::Preprocessor => "preprocessor",
            TokenType::Macro => "macro",
            TokenType::Atom => "atom",
            TokenType::Tag => "tag",
            TokenType::Attribute => "attribute",
            TokenType::Header => "header",
            TokenType::Lifetime => "lifetime",
            TokenType::Meta => "meta",
            TokenType::Inserted => "inserted",
            TokenType::Deleted => "deleted",
            TokenType::Error => "error",
        }
    }

    /// Token type for a class name, the inverse of [`TokenType::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "comment" => Some(TokenType::Comment),
            "string" => Some(TokenType::String),
            "char" => Some(TokenType::Char),
            "number" => Some(TokenType::Number),
            "keyword" => Some(TokenType::Keyword),
            "type" => Some(TokenType::Type),
            "function" => Some(TokenType::Function),
            "variable" => Some(TokenType::Variable),
            "operator" => Some(TokenType::Operator),
            "punctuation" => Some(TokenType::Punctuation),
            "bracket" => Some(TokenType::Bracket),
            "preprocessor" => Some(TokenType::Preprocessor),
            "macro" => Some(TokenType::Macro),
            "atom" => Some(TokenType::Atom),
            "tag" => Some(TokenType::Tag),
            "attribute" => Some(TokenType::Attribute),
            "header" => Some(TokenType::Header),
            "lifetime" => Some(TokenType::Lifetime),
            "meta" => Some(TokenType::Meta),
            "inserted" => Some(TokenType::Inserted),
            "deleted" => Some(TokenType::Deleted),
            "error" => Some(TokenType::Error),
            _ => None,
        }
    }
}
