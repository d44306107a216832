//! XML grammar
//!
//! State is a plain record: the construct being continued (`tokenize`),
//! the stack of open element names (`tagStack`), the tag being read
//! (`tagName`, `closing`) and an unterminated attribute quote (`quote`).

use super::{CommentSyntax, COMMENT_HELPER};
use crate::mode::{Handling, Mode, ModeConfig, ModeOptions, ModeRegistry, State, StateRecord, StateValue};
use crate::stream::StringStream;
use crate::syntax::TokenType;

const TOKENIZE: &str = "tokenize";
const TAG_STACK: &str = "tagStack";
const TAG_NAME: &str = "tagName";
const CLOSING: &str = "closing";
const QUOTE: &str = "quote";
const BASE_INDENT: &str = "baseIndent";

/// Construct a token call continues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tokenize {
    Text,
    Tag,
    Attr,
    Comment,
    Cdata,
    Pi,
}

impl Tokenize {
    fn of(rec: &StateRecord) -> Self {
        match rec.str(TOKENIZE) {
            Some("tag") => Tokenize::Tag,
            Some("attr") => Tokenize::Attr,
            Some("comment") => Tokenize::Comment,
            Some("cdata") => Tokenize::Cdata,
            Some("pi") => Tokenize::Pi,
            _ => Tokenize::Text,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Tokenize::Text => "text",
            Tokenize::Tag => "tag",
            Tokenize::Attr => "attr",
            Tokenize::Comment => "comment",
            Tokenize::Cdata => "cdata",
            Tokenize::Pi => "pi",
        }
    }
}

fn set_tokenize(rec: &mut StateRecord, tokenize: Tokenize) {
    rec.set(TOKENIZE, tokenize.name());
}

pub(super) fn register(registry: &mut ModeRegistry) {
    registry.define_mode("xml", xml_mode, &[]);
    registry.define_mime("application/xml", "xml");
    registry.define_mime("text/xml", "xml");
    registry.register_helper(
        COMMENT_HELPER,
        "xml",
        CommentSyntax {
            line: None,
            block: Some(("<!--", "-->")),
        },
    );
}

pub(super) fn xml_mode(options: &ModeOptions, _: &ModeConfig, _: &ModeRegistry) -> Mode {
    let indent_unit = options.indent_unit;
    Mode::new(|_, stream, state| {
        let Some(rec) = state.as_record_mut() else {
            stream.skip_to_end();
            return None;
        };
        token(stream, rec)
    })
    .with_start_state(|_, base_indent| {
        let mut rec = StateRecord::new();
        set_tokenize(&mut rec, Tokenize::Text);
        rec.set(BASE_INDENT, base_indent as i64);
        State::Record(rec)
    })
    .with_indent(move |_, state, text_after| {
        let Some(rec) = state.as_record() else {
            return Handling::Declined;
        };
        let base = usize::try_from(rec.int(BASE_INDENT)).unwrap_or(0);
        let depth = rec.list(TAG_STACK).len();
        match Tokenize::of(rec) {
            Tokenize::Text if text_after.starts_with("</") => {
                Handling::Handled(base + depth.saturating_sub(1) * indent_unit)
            }
            Tokenize::Text => Handling::Handled(base + depth * indent_unit),
            Tokenize::Tag => Handling::Handled(base + (depth + 1) * indent_unit),
            _ => Handling::Declined,
        }
    })
    .with_prop("blockCommentStart", "<!--")
    .with_prop("blockCommentEnd", "-->")
    .with_prop("fold", "xml")
}

/// Innermost open element while the tokenizer is in text content
pub(super) fn open_element(state: &State) -> Option<&str> {
    let rec = state.as_record()?;
    if Tokenize::of(rec) != Tokenize::Text {
        return None;
    }
    rec.list(TAG_STACK).last()?.as_str()
}

fn token(stream: &mut StringStream<'_>, rec: &mut StateRecord) -> Option<TokenType> {
    match Tokenize::of(rec) {
        Tokenize::Comment => Some(until(stream, rec, "-->", TokenType::Comment)),
        Tokenize::Cdata => Some(until(stream, rec, "]]>", TokenType::Atom)),
        Tokenize::Pi => Some(until(stream, rec, "?>", TokenType::Meta)),
        Tokenize::Attr => Some(attribute_value(stream, rec)),
        Tokenize::Tag => in_tag(stream, rec),
        Tokenize::Text => in_text(stream, rec),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')
}

/// Consume up to and including `end`, returning to text content when found
fn until(stream: &mut StringStream<'_>, rec: &mut StateRecord, end: &str, kind: TokenType) -> TokenType {
    match stream.rest().find(end) {
        Some(offset) => {
            stream.pos += offset + end.len();
            set_tokenize(rec, Tokenize::Text);
        }
        None => stream.skip_to_end(),
    }
    kind
}

fn in_text(stream: &mut StringStream<'_>, rec: &mut StateRecord) -> Option<TokenType> {
    if stream.eat('<').is_some() {
        if stream.match_str("!--", true, false) {
            set_tokenize(rec, Tokenize::Comment);
            return Some(until(stream, rec, "-->", TokenType::Comment));
        }
        if stream.match_str("![CDATA[", true, false) {
            set_tokenize(rec, Tokenize::Cdata);
            return Some(until(stream, rec, "]]>", TokenType::Atom));
        }
        if stream.eat('?').is_some() {
            set_tokenize(rec, Tokenize::Pi);
            return Some(until(stream, rec, "?>", TokenType::Meta));
        }
        if stream.eat('!').is_some() {
            if stream.skip_to('>') {
                stream.next();
            } else {
                stream.skip_to_end();
            }
            return Some(TokenType::Meta);
        }

        let closing = stream.eat('/').is_some();
        let name_start = stream.pos;
        if !stream.eat_while(is_name_char) {
            return Some(TokenType::Error);
        }
        let name = &stream.string()[name_start..stream.pos];
        rec.set(TAG_NAME, name);
        rec.set(CLOSING, closing);
        set_tokenize(rec, Tokenize::Tag);
        return Some(TokenType::Tag);
    }

    if stream.eat('&').is_some() {
        stream.eat_while(|c: char| c.is_alphanumeric() || c == '#');
        return Some(if stream.eat(';').is_some() {
            TokenType::Atom
        } else {
            TokenType::Error
        });
    }

    stream.eat_while(|c: char| c != '<' && c != '&');
    None
}

fn in_tag(stream: &mut StringStream<'_>, rec: &mut StateRecord) -> Option<TokenType> {
    if stream.eat_space() {
        return None;
    }
    if stream.match_str("/>", true, false) {
        finish_tag(rec);
        return Some(TokenType::Tag);
    }
    if stream.eat('>').is_some() {
        let closing = rec.bool(CLOSING);
        if let Some(name) = rec.str(TAG_NAME).map(str::to_string) {
            let stack = rec.list_mut(TAG_STACK);
            if closing {
                if let Some(idx) = stack.iter().rposition(|v| v.as_str() == Some(name.as_str())) {
                    stack.truncate(idx);
                }
            } else {
                stack.push(StateValue::from(name));
            }
        }
        finish_tag(rec);
        return Some(TokenType::Tag);
    }
    if stream.eat('=').is_some() {
        return Some(TokenType::Operator);
    }
    if let Some(quote) = stream.eat(|c: char| c == '"' || c == '\'') {
        if stream.skip_to(quote) {
            stream.next();
        } else {
            stream.skip_to_end();
            rec.set(QUOTE, quote.to_string());
            set_tokenize(rec, Tokenize::Attr);
        }
        return Some(TokenType::String);
    }
    if stream.eat_while(is_name_char) {
        return Some(TokenType::Attribute);
    }
    stream.next();
    Some(TokenType::Error)
}

fn finish_tag(rec: &mut StateRecord) {
    rec.remove(TAG_NAME);
    rec.remove(CLOSING);
    set_tokenize(rec, Tokenize::Text);
}

/// Continue an attribute value left open at the end of a line
fn attribute_value(stream: &mut StringStream<'_>, rec: &mut StateRecord) -> TokenType {
    let quote = rec.str(QUOTE).and_then(|q| q.chars().next()).unwrap_or('"');
    if stream.skip_to(quote) {
        stream.next();
        rec.remove(QUOTE);
        set_tokenize(rec, Tokenize::Tag);
    } else {
        stream.skip_to_end();
    }
    TokenType::String
}
