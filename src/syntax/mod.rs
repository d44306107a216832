//! Token classes, styles and highlighting
//!
//! This module provides:
//! - The token classes returned by mode token operations
//! - Terminal styles for each class
//! - The per-line highlighting loop and its document cache
//! - The bundled grammars

mod highlight;
mod style;
mod tokens;
pub mod builtin;

pub use builtin::{mime_for_extension, CommentSyntax, COMMENT_HELPER};
pub use highlight::{highlight_line, tokenize_line, HighlightCache, Token, MAX_STALLED_CALLS};
pub use style::{Color, Span, Style};
pub use tokens::TokenType;
