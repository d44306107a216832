//! HTML with embedded scripts
//!
//! The outer document is tokenized by the `xml` mode. Once a `<script>`
//! start tag is complete, tokens come from the JavaScript flavor of `clike`
//! until `</script` appears.

use std::sync::Arc;

use super::xml::open_element;
use super::{CommentSyntax, COMMENT_HELPER};
use crate::mode::{
    copy_state, start_state, Handling, InnerMode, Mode, ModeConfig, ModeOptions, ModeRegistry, State,
    StateRecord, StateValue,
};
use crate::stream::StringStream;
use crate::syntax::TokenType;

const HTML: &str = "html";
const LOCAL: &str = "local";
const SCRIPT_END: &str = "</script";

pub(super) fn register(registry: &mut ModeRegistry) {
    registry.define_mode("htmlmixed", htmlmixed_mode, &["xml", "clike"]);
    registry.define_mime("text/html", "htmlmixed");
    registry.register_helper(
        COMMENT_HELPER,
        "htmlmixed",
        CommentSyntax {
            line: None,
            block: Some(("<!--", "-->")),
        },
    );
}

fn htmlmixed_mode(options: &ModeOptions, _: &ModeConfig, registry: &ModeRegistry) -> Mode {
    let html = registry.get_mode(options, "xml");
    let script = registry.get_mode(options, "text/javascript");

    let (token_html, token_script) = (Arc::clone(&html), Arc::clone(&script));
    let start_html = Arc::clone(&html);
    let (copy_html, copy_script) = (Arc::clone(&html), Arc::clone(&script));
    let (inner_html, inner_script) = (Arc::clone(&html), Arc::clone(&script));

    Mode::new(move |_, stream, state| {
        let Some(rec) = state.as_record_mut() else {
            stream.skip_to_end();
            return None;
        };
        token(&token_html, &token_script, stream, rec)
    })
    .with_start_state(move |_, base_indent| {
        let mut rec = StateRecord::new();
        rec.set(HTML, start_state(&start_html, base_indent));
        State::Record(rec)
    })
    .with_copy_state(move |_, state| {
        let Some(rec) = state.as_record() else {
            return state.clone();
        };
        let mut copy = StateRecord::new();
        if let Some(html) = rec.state(HTML) {
            copy.set(HTML, copy_state(&copy_html, html));
        }
        if let Some(local) = rec.state(LOCAL) {
            copy.set(LOCAL, copy_state(&copy_script, local));
        }
        State::Record(copy)
    })
    .with_inner_mode(move |_, state| {
        let rec = state.as_record()?;
        match rec.state(LOCAL) {
            Some(local) => Some(InnerMode {
                mode: Arc::clone(&inner_script),
                state: local,
            }),
            None => Some(InnerMode {
                mode: Arc::clone(&inner_html),
                state: rec.state(HTML)?,
            }),
        }
    })
    .with_indent(move |_, state, text_after| {
        let Some(rec) = state.as_record() else {
            return Handling::Declined;
        };
        match (rec.state(LOCAL), rec.state(HTML)) {
            (Some(local), _) if !starts_with_ignore_case(text_after, SCRIPT_END) => {
                script.indent(local, text_after)
            }
            (_, Some(outer)) => html.indent(outer, text_after),
            _ => Handling::Declined,
        }
    })
    .with_prop("blockCommentStart", "<!--")
    .with_prop("blockCommentEnd", "-->")
}

fn token(
    html: &Mode,
    script: &Mode,
    stream: &mut StringStream<'_>,
    rec: &mut StateRecord,
) -> Option<TokenType> {
    if rec.contains(LOCAL) {
        if starts_with_ignore_case(stream.rest(), SCRIPT_END) {
            rec.remove(LOCAL);
        } else {
            let local = rec.state_mut(LOCAL)?;
            let kind = script.token(stream, local);
            back_up_before_script_end(stream);
            return kind;
        }
    }

    let outer = rec.state_mut(HTML)?;
    let kind = html.token(stream, outer);
    let script_opened = kind == Some(TokenType::Tag)
        && stream.current().ends_with('>')
        && !stream.current().ends_with("/>")
        && open_element(outer).is_some_and(|name| name.eq_ignore_ascii_case("script"));
    if script_opened {
        let base = html.indent(outer, "").handled().unwrap_or(0);
        rec.set(LOCAL, StateValue::from(start_state(script, base)));
    }
    kind
}

/// Give back the part of a script token that runs into `</script`
fn back_up_before_script_end(stream: &mut StringStream<'_>) {
    let line = stream.string();
    let from_start = line[stream.start..].to_ascii_lowercase();
    let Some(idx) = from_start.find(SCRIPT_END) else {
        return;
    };
    let end_tag = stream.start + idx;
    if idx > 0 && end_tag < stream.pos {
        stream.back_up(line[end_tag..stream.pos].chars().count());
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
