//! Unified diff grammar
//!
//! Hunk headers and file headers are classified whole. On content lines
//! the one-character marker is classified and the rest of the line goes to
//! an inner mode (the `inner` option, `clike` by default) with the marker
//! hidden, so the inner mode sees an ordinary line start.

use std::sync::Arc;

use super::str_option;
use crate::mode::{
    start_state, InnerMode, Mode, ModeConfig, ModeOptions, ModeRegistry, State, StateRecord,
};
use crate::syntax::TokenType;

const INNER: &str = "inner";

/// Line prefixes classified as headers
const HEADER_PREFIXES: &[&str] = &["@@", "+++", "---", "diff ", "index "];

pub(super) fn register(registry: &mut ModeRegistry) {
    registry.define_mode("patch", patch_mode, &["clike"]);
    registry.define_mime("text/x-diff", "patch");
    registry.define_mime("text/x-patch", "text/x-diff");
}

fn patch_mode(options: &ModeOptions, config: &ModeConfig, registry: &ModeRegistry) -> Mode {
    let inner = registry.get_mode(options, str_option(config, INNER).unwrap_or("clike"));
    let (start_inner, report_inner, blank_inner) =
        (Arc::clone(&inner), Arc::clone(&inner), Arc::clone(&inner));

    Mode::new(move |_, stream, state| {
        let Some(rec) = state.as_record_mut() else {
            stream.skip_to_end();
            return None;
        };
        if stream.sol() {
            let rest = stream.rest();
            if HEADER_PREFIXES.iter().any(|prefix| rest.starts_with(prefix)) {
                stream.skip_to_end();
                return Some(TokenType::Header);
            }
            return match stream.next() {
                Some('+') => Some(TokenType::Inserted),
                Some('-') => Some(TokenType::Deleted),
                Some(' ') => Some(TokenType::Meta),
                _ => {
                    stream.skip_to_end();
                    Some(TokenType::Meta)
                }
            };
        }
        let Some(inner_state) = rec.state_mut(INNER) else {
            stream.skip_to_end();
            return None;
        };
        stream.hide_first_chars(1, |stream| inner.token(stream, inner_state))
    })
    .with_start_state(move |_, base_indent| {
        let mut rec = StateRecord::new();
        rec.set(INNER, start_state(&start_inner, base_indent));
        State::Record(rec)
    })
    .with_inner_mode(move |_, state| {
        Some(InnerMode {
            mode: Arc::clone(&report_inner),
            state: state.as_record()?.state(INNER)?,
        })
    })
    .with_blank_line(move |_, state| {
        if let Some(inner_state) = state.as_record_mut().and_then(|rec| rec.state_mut(INNER)) {
            blank_inner.blank_line(inner_state);
        }
    })
}
