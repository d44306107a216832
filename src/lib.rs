//! lexmode - a pluggable line tokenizer framework
//!
//! Grammars ("modes") are registered on a [`ModeRegistry`] by name and by
//! MIME type. A caller resolves a mode, creates its start state, and then
//! feeds it one line at a time through a [`StringStream`]. Modes may keep
//! state across lines and may delegate to nested modes.
//!
//! ```
//! use lexmode::{start_state, ModeOptions, ModeRegistry, StringStream};
//!
//! let registry = ModeRegistry::with_builtins();
//! let mode = registry.get_mode(&ModeOptions::default(), "text/x-rustsrc");
//! let mut state = start_state(&mode, 0);
//! let mut stream = StringStream::new("fn main() {}");
//! let kind = mode.token(&mut stream, &mut state);
//! assert_eq!(stream.current(), "fn");
//! assert_eq!(kind.map(|k| k.name()), Some("keyword"));
//! ```

pub mod config;
pub mod error;
pub mod mode;
pub mod render;
pub mod stream;
pub mod syntax;
pub mod text;

pub use error::{ModeError, Result};
pub use mode::{
    copy_state, inner_mode, start_state, Handling, InnerMode, Mode, ModeConfig, ModeExtension,
    ModeOptions, ModeRegistry, ModeSpec, ModeState, Pass, PropValue, State, StateRecord,
    StateValue, PASS,
};
pub use stream::{CharMatcher, StringStream, DEFAULT_TAB_SIZE};
pub use syntax::{highlight_line, tokenize_line, HighlightCache, TokenType};
pub use text::{count_column, is_word_char, split_lines};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
