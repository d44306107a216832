//! TOML grammar

use std::sync::Arc;

use regex::Regex;

use super::{CommentSyntax, COMMENT_HELPER};
use crate::mode::{Mode, ModeConfig, ModeOptions, ModeRegistry, State, StateRecord, StateValue};
use crate::stream::StringStream;
use crate::syntax::TokenType;

/// Patterns that need more than single-character lookahead
struct TomlRules {
    header: Option<Regex>,
    key: Option<Regex>,
    datetime: Option<Regex>,
    time: Option<Regex>,
    number: Option<Regex>,
    boolean: Option<Regex>,
}

impl TomlRules {
    fn new() -> Self {
        Self {
            header: Regex::new(r"^\[\[?[^\[\]]+\]\]?").ok(),
            key: Regex::new(r"^[A-Za-z0-9_\-]+").ok(),
            datetime: Regex::new(
                r"^\d{4}-\d{2}-\d{2}(?:[Tt ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:[Zz]|[+-]\d{2}:\d{2})?)?",
            )
            .ok(),
            time: Regex::new(r"^\d{2}:\d{2}:\d{2}(?:\.\d+)?").ok(),
            number: Regex::new(
                r"^[+-]?(?:0x[0-9a-fA-F_]+|0o[0-7_]+|0b[01_]+|inf|nan|\d[\d_]*(?:\.\d[\d_]*)?(?:[eE][+-]?\d[\d_]*)?)",
            )
            .ok(),
            boolean: Regex::new(r"^(?:true|false)\b").ok(),
        }
    }
}

/// Try an optional rule at the cursor
fn eat_rule(stream: &mut StringStream<'_>, rule: &Option<Regex>) -> bool {
    match rule {
        Some(rule) => stream.match_regex(rule, true).is_some(),
        None => false,
    }
}

pub(super) fn register(registry: &mut ModeRegistry) {
    registry.define_mode("toml", toml_mode, &[]);
    registry.define_mime("text/x-toml", "toml");
    registry.register_helper(
        COMMENT_HELPER,
        "toml",
        CommentSyntax {
            line: Some("#"),
            block: None,
        },
    );
}

fn toml_mode(_: &ModeOptions, _: &ModeConfig, _: &ModeRegistry) -> Mode {
    let rules = Arc::new(TomlRules::new());
    Mode::new(move |_, stream, state| {
        let Some(rec) = state.as_record_mut() else {
            stream.skip_to_end();
            return None;
        };
        token(&rules, stream, rec)
    })
    .with_start_state(|_, _| {
        let mut rec = StateRecord::new();
        rec.set("lhs", true);
        State::Record(rec)
    })
    .with_prop("lineComment", "#")
}

fn token(rules: &TomlRules, stream: &mut StringStream<'_>, rec: &mut StateRecord) -> Option<TokenType> {
    if let Some(delim) = rec.str("string").map(str::to_string) {
        return Some(multiline_string(stream, rec, &delim));
    }
    if stream.sol() && rec.list("nesting").is_empty() {
        rec.set("lhs", true);
    }
    if stream.eat_space() {
        return None;
    }
    if stream.eat('#').is_some() {
        stream.skip_to_end();
        return Some(TokenType::Comment);
    }

    let lhs = rec.bool("lhs");
    if lhs && rec.list("nesting").is_empty() && stream.peek() == Some('[') {
        if eat_rule(stream, &rules.header) {
            return Some(TokenType::Header);
        }
        stream.skip_to_end();
        return Some(TokenType::Error);
    }

    for delim in ["\"\"\"", "'''"] {
        if stream.match_str(delim, true, false) {
            rec.set("string", delim);
            return Some(multiline_string(stream, rec, delim));
        }
    }
    if let Some(quote) = stream.eat(|c: char| c == '"' || c == '\'') {
        quoted(stream, quote);
        return Some(if lhs { TokenType::Attribute } else { TokenType::String });
    }

    if lhs {
        return Some(key_part(rules, stream, rec));
    }
    value(rules, stream, rec)
}

fn key_part(rules: &TomlRules, stream: &mut StringStream<'_>, rec: &mut StateRecord) -> TokenType {
    if stream.eat('=').is_some() {
        rec.set("lhs", false);
        return TokenType::Operator;
    }
    if stream.eat('.').is_some() {
        return TokenType::Punctuation;
    }
    if stream.eat('}').is_some() {
        close_nesting(rec);
        return TokenType::Bracket;
    }
    if eat_rule(stream, &rules.key) {
        return TokenType::Attribute;
    }
    stream.next();
    TokenType::Error
}

fn value(rules: &TomlRules, stream: &mut StringStream<'_>, rec: &mut StateRecord) -> Option<TokenType> {
    match stream.peek()? {
        '[' | '{' => {
            let open = stream.next()?;
            rec.list_mut("nesting").push(StateValue::from(open.to_string()));
            if open == '{' {
                rec.set("lhs", true);
            }
            return Some(TokenType::Bracket);
        }
        ']' | '}' => {
            stream.next();
            close_nesting(rec);
            return Some(TokenType::Bracket);
        }
        ',' => {
            stream.next();
            if innermost(rec) == Some("{") {
                rec.set("lhs", true);
            }
            return Some(TokenType::Punctuation);
        }
        _ => {}
    }

    if eat_rule(stream, &rules.datetime) || eat_rule(stream, &rules.time) {
        return Some(TokenType::Atom);
    }
    if eat_rule(stream, &rules.boolean) {
        return Some(TokenType::Atom);
    }
    if eat_rule(stream, &rules.number) {
        return Some(TokenType::Number);
    }
    if !stream.eat_while(|c: char| !c.is_whitespace() && !",]}#".contains(c)) {
        stream.next();
    }
    Some(TokenType::Error)
}

fn innermost(rec: &StateRecord) -> Option<&str> {
    rec.list("nesting").last().and_then(StateValue::as_str)
}

fn close_nesting(rec: &mut StateRecord) {
    rec.list_mut("nesting").pop();
    rec.set("lhs", innermost(rec) == Some("{"));
}

/// Single-line string body after its opening quote
fn quoted(stream: &mut StringStream<'_>, quote: char) {
    let mut escaped = false;
    while let Some(ch) = stream.next() {
        if ch == quote && !escaped {
            return;
        }
        escaped = quote == '"' && !escaped && ch == '\\';
    }
}

fn multiline_string(stream: &mut StringStream<'_>, rec: &mut StateRecord, delim: &str) -> TokenType {
    match stream.rest().find(delim) {
        Some(end) => {
            stream.pos += end + delim.len();
            rec.remove("string");
        }
        None => stream.skip_to_end(),
    }
    TokenType::String
}
