//! C-family grammar
//!
//! One mode covers C, C++, Rust and JavaScript; the `dialect` option picks
//! keyword sets and lexical details. Extra words can be added with the
//! `keywords`, `types` and `atoms` list options.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;

use super::{list_option, str_option, CommentSyntax, COMMENT_HELPER};
use crate::mode::{Handling, Mode, ModeConfig, ModeOptions, ModeRegistry, State};
use crate::stream::StringStream;
use crate::syntax::TokenType;

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "const", "continue", "default", "do", "else", "enum", "extern",
    "for", "goto", "if", "inline", "register", "restrict", "return", "sizeof", "static",
    "struct", "switch", "typedef", "union", "volatile", "while",
];

const C_TYPES: &[&str] = &[
    "bool", "char", "double", "float", "int", "long", "short", "signed", "unsigned", "void",
    "size_t", "ptrdiff_t", "int8_t", "int16_t", "int32_t", "int64_t", "uint8_t", "uint16_t",
    "uint32_t", "uint64_t", "FILE",
];

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "catch", "class", "constexpr", "const_cast", "decltype", "delete",
    "dynamic_cast", "explicit", "export", "friend", "mutable", "namespace", "new", "noexcept",
    "operator", "private", "protected", "public", "reinterpret_cast", "static_assert",
    "static_cast", "template", "this", "throw", "try", "typeid", "typename", "using",
    "virtual",
];

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "type",
    "unsafe", "use", "where", "while",
];

const RUST_TYPES: &[&str] = &[
    "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32",
    "i64", "i128", "isize", "f32", "f64", "String", "Vec", "Option", "Result", "Box",
];

const JS_KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "export", "extends", "finally", "for", "function", "if",
    "import", "in", "instanceof", "let", "new", "return", "static", "super", "switch", "this",
    "throw", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Lexical flavor of a C-family language
#[derive(Debug)]
struct Dialect {
    keywords: HashSet<String>,
    types: HashSet<String>,
    atoms: HashSet<String>,
    /// `#` at line start begins a directive
    preprocessor: bool,
    /// `'x'` is a character literal (otherwise a string)
    char_literals: bool,
    /// Rust lifetimes, attributes and `name!` macros
    rust_syntax: bool,
    /// Backtick template strings
    template_strings: bool,
    /// Double-quoted strings continue across lines
    multiline_strings: bool,
    number: Option<Regex>,
}

impl Dialect {
    fn from_config(config: &ModeConfig) -> Self {
        let name = str_option(config, "dialect").unwrap_or("c");
        let (keywords, types, atoms): (Vec<&str>, Vec<&str>, Vec<&str>) = match name {
            "c++" | "cpp" => (
                [C_KEYWORDS, CPP_KEYWORDS].concat(),
                C_TYPES.to_vec(),
                vec!["true", "false", "nullptr", "NULL"],
            ),
            "rust" => (
                RUST_KEYWORDS.to_vec(),
                RUST_TYPES.to_vec(),
                vec!["true", "false", "None", "Some", "Ok", "Err"],
            ),
            "javascript" | "js" => (
                JS_KEYWORDS.to_vec(),
                Vec::new(),
                vec!["true", "false", "null", "undefined", "NaN", "Infinity"],
            ),
            _ => (C_KEYWORDS.to_vec(), C_TYPES.to_vec(), vec!["NULL"]),
        };
        let is_rust = name == "rust";
        let is_js = matches!(name, "javascript" | "js");

        let collect = |base: Vec<&str>, key: &str| -> HashSet<String> {
            let mut words: HashSet<String> = base.into_iter().map(str::to_string).collect();
            words.extend(list_option(config, key).into_iter().map(str::to_string));
            words
        };

        Self {
            keywords: collect(keywords, "keywords"),
            types: collect(types, "types"),
            atoms: collect(atoms, "atoms"),
            preprocessor: !is_rust && !is_js,
            char_literals: !is_js,
            rust_syntax: is_rust,
            template_strings: is_js,
            multiline_strings: is_rust,
            number: Regex::new(
                r"^(?:0[xX][0-9a-fA-F_]+|0[bB][01_]+|0[oO][0-7_]+|\d[\d_]*(?:\.\d[\d_]*)?(?:[eE][+-]?\d+)?)[A-Za-z0-9_]*",
            )
            .ok(),
        }
    }
}

/// What the next token call continues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tokenize {
    Base,
    BlockComment,
    String(char),
}

#[derive(Debug, Clone, PartialEq)]
struct ClikeState {
    tokenize: Tokenize,
    /// Closing brackets of the open bracket contexts
    contexts: Vec<char>,
    base_indent: usize,
}

pub(super) fn register(registry: &mut ModeRegistry) {
    registry.define_mode("clike", clike_mode, &[]);
    registry.define_mime("text/x-csrc", ModeConfig::new("clike").with_option("dialect", "c"));
    registry.define_mime("text/x-c++src", ModeConfig::new("clike").with_option("dialect", "c++"));
    registry.define_mime("text/x-rustsrc", ModeConfig::new("clike").with_option("dialect", "rust"));
    registry.define_mime(
        "text/javascript",
        ModeConfig::new("clike").with_option("dialect", "javascript"),
    );
    registry.define_mime("application/javascript", "text/javascript");
    registry.register_helper(
        COMMENT_HELPER,
        "clike",
        CommentSyntax {
            line: Some("//"),
            block: Some(("/*", "*/")),
        },
    );
}

fn clike_mode(options: &ModeOptions, config: &ModeConfig, _: &ModeRegistry) -> Mode {
    let dialect = Arc::new(Dialect::from_config(config));
    let indent_unit = options.indent_unit;

    Mode::new(move |_, stream, state| {
        let Some(st) = state.downcast_mut::<ClikeState>() else {
            stream.skip_to_end();
            return None;
        };
        token(&dialect, stream, st)
    })
    .with_start_state(|_, base_indent| {
        State::custom(ClikeState {
            tokenize: Tokenize::Base,
            contexts: Vec::new(),
            base_indent,
        })
    })
    .with_indent(move |_, state, text_after| {
        let Some(st) = state.downcast_ref::<ClikeState>() else {
            return Handling::Declined;
        };
        if st.tokenize != Tokenize::Base {
            return Handling::Declined;
        }
        let mut depth = st.contexts.len();
        if let (Some(first), Some(closing)) = (text_after.chars().next(), st.contexts.last()) {
            if first == *closing {
                depth -= 1;
            }
        }
        Handling::Handled(st.base_indent + depth * indent_unit)
    })
    .with_prop("lineComment", "//")
    .with_prop("blockCommentStart", "/*")
    .with_prop("blockCommentEnd", "*/")
    .with_prop("electricChars", "{}")
    .with_prop("fold", "brace")
}

fn token(dialect: &Dialect, stream: &mut StringStream<'_>, st: &mut ClikeState) -> Option<TokenType> {
    match st.tokenize {
        Tokenize::BlockComment => return block_comment(stream, st),
        Tokenize::String(quote) => return string(dialect, stream, st, quote),
        Tokenize::Base => {}
    }

    if stream.eat_space() {
        return None;
    }
    let from = stream.line_start().min(stream.pos);
    let at_line_start = stream.string()[from..stream.pos].trim().is_empty();
    let ch = stream.next()?;

    match ch {
        '"' => {
            st.tokenize = Tokenize::String('"');
            string(dialect, stream, st, '"')
        }
        '`' if dialect.template_strings => {
            st.tokenize = Tokenize::String('`');
            string(dialect, stream, st, '`')
        }
        '\'' if !dialect.char_literals => {
            st.tokenize = Tokenize::String('\'');
            string(dialect, stream, st, '\'')
        }
        '\'' => char_or_lifetime(dialect, stream),
        '/' if stream.eat('*').is_some() => {
            st.tokenize = Tokenize::BlockComment;
            block_comment(stream, st)
        }
        '/' if stream.eat('/').is_some() => {
            stream.skip_to_end();
            Some(TokenType::Comment)
        }
        '#' if dialect.preprocessor && at_line_start => {
            stream.skip_to_end();
            Some(TokenType::Preprocessor)
        }
        '#' if dialect.rust_syntax && matches!(stream.peek(), Some('[') | Some('!')) => {
            if stream.skip_to(']') {
                stream.next();
            } else {
                stream.skip_to_end();
            }
            Some(TokenType::Attribute)
        }
        '0'..='9' => {
            stream.back_up(1);
            match &dialect.number {
                Some(number) if stream.match_regex(number, true).is_some() => {}
                _ => {
                    stream.eat_while(|c: char| c.is_ascii_digit());
                }
            }
            Some(TokenType::Number)
        }
        '(' => open_context(st, ')'),
        '[' => open_context(st, ']'),
        '{' => open_context(st, '}'),
        ')' | ']' | '}' => {
            if st.contexts.last() == Some(&ch) {
                st.contexts.pop();
            }
            Some(TokenType::Bracket)
        }
        ';' | ',' | '.' | ':' => Some(TokenType::Punctuation),
        c if c.is_alphabetic() || c == '_' || c == '$' => Some(word(dialect, stream)),
        c if is_operator_char(c) => {
            stream.eat_while(is_operator_char);
            Some(TokenType::Operator)
        }
        _ => None,
    }
}

fn open_context(st: &mut ClikeState, closing: char) -> Option<TokenType> {
    st.contexts.push(closing);
    Some(TokenType::Bracket)
}

fn is_operator_char(c: char) -> bool {
    "+-*/%&|^!<>=~?".contains(c)
}

fn word(dialect: &Dialect, stream: &mut StringStream<'_>) -> TokenType {
    stream.eat_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$');
    let word = stream.current();
    if dialect.keywords.contains(word) {
        TokenType::Keyword
    } else if dialect.atoms.contains(word) {
        TokenType::Atom
    } else if dialect.types.contains(word) {
        TokenType::Type
    } else if dialect.rust_syntax && stream.eat('!').is_some() {
        TokenType::Macro
    } else if stream.peek() == Some('(') {
        TokenType::Function
    } else {
        TokenType::Variable
    }
}

fn string(
    dialect: &Dialect,
    stream: &mut StringStream<'_>,
    st: &mut ClikeState,
    quote: char,
) -> Option<TokenType> {
    let mut escaped = false;
    while let Some(ch) = stream.next() {
        if ch == quote && !escaped {
            st.tokenize = Tokenize::Base;
            return Some(TokenType::String);
        }
        escaped = !escaped && ch == '\\';
    }
    let continues = escaped || quote == '`' || dialect.multiline_strings;
    if !continues {
        st.tokenize = Tokenize::Base;
    }
    Some(TokenType::String)
}

fn block_comment(stream: &mut StringStream<'_>, st: &mut ClikeState) -> Option<TokenType> {
    match stream.rest().find("*/") {
        Some(end) => {
            stream.pos += end + 2;
            st.tokenize = Tokenize::Base;
        }
        None => stream.skip_to_end(),
    }
    Some(TokenType::Comment)
}

fn char_or_lifetime(dialect: &Dialect, stream: &mut StringStream<'_>) -> Option<TokenType> {
    if stream.eat('\\').is_some() {
        stream.next();
        stream.eat_while(|c: char| c != '\'');
        stream.eat('\'');
        return Some(TokenType::Char);
    }
    if stream.next().is_some() && stream.eat('\'').is_some() {
        return Some(TokenType::Char);
    }
    if dialect.rust_syntax {
        stream.eat_while(|c: char| c.is_alphanumeric() || c == '_');
        return Some(TokenType::Lifetime);
    }
    Some(TokenType::Error)
}
