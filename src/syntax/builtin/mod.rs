//! Built-in grammars
//!
//! Each grammar registers its mode factory, its MIME aliases and a
//! `comment` helper describing its comment syntax.

mod clike;
mod htmlmixed;
mod patch;
mod toml_lang;
mod xml;

use crate::mode::{ModeConfig, ModeRegistry, PropValue};

/// Helper category for comment syntax
pub const COMMENT_HELPER: &str = "comment";

/// Comment delimiters of a grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommentSyntax {
    /// Line comment prefix
    pub line: Option<&'static str>,
    /// Block comment delimiters
    pub block: Option<(&'static str, &'static str)>,
}

/// File extensions and the MIME type they select
const EXTENSIONS: &[(&str, &str)] = &[
    ("c", "text/x-csrc"),
    ("h", "text/x-csrc"),
    ("cc", "text/x-c++src"),
    ("cpp", "text/x-c++src"),
    ("cxx", "text/x-c++src"),
    ("hpp", "text/x-c++src"),
    ("rs", "text/x-rustsrc"),
    ("js", "text/javascript"),
    ("mjs", "text/javascript"),
    ("toml", "text/x-toml"),
    ("xml", "application/xml"),
    ("svg", "image/svg+xml"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("diff", "text/x-diff"),
    ("patch", "text/x-diff"),
];

/// Register every bundled grammar
///
/// `clike` goes first so that it becomes the registry's default mode.
pub fn register_all(registry: &mut ModeRegistry) {
    clike::register(registry);
    toml_lang::register(registry);
    xml::register(registry);
    htmlmixed::register(registry);
    patch::register(registry);
}

/// MIME type for a file extension (case-insensitive)
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// String option from a mode config
fn str_option<'a>(config: &'a ModeConfig, key: &str) -> Option<&'a str> {
    config.option(key).and_then(PropValue::as_str)
}

/// List-of-strings option from a mode config
fn list_option<'a>(config: &'a ModeConfig, key: &str) -> Vec<&'a str> {
    config
        .option(key)
        .and_then(PropValue::as_list)
        .map(|items| items.iter().filter_map(PropValue::as_str).collect())
        .unwrap_or_default()
}
