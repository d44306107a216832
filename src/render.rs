//! Terminal rendering of highlighted lines using crossterm

use std::io::Write;

use crossterm::{
    queue,
    style::{self, Attribute, Print, SetAttribute, SetBackgroundColor, SetForegroundColor},
};

use crate::error::Result;
use crate::syntax::{Color, Span, Style, Token};
use crate::text::display_width;

/// Map a palette color to crossterm
fn to_crossterm(color: Color) -> style::Color {
    match color {
        Color::Default => style::Color::Reset,
        Color::Black => style::Color::Black,
        Color::Red => style::Color::DarkRed,
        Color::Green => style::Color::DarkGreen,
        Color::Yellow => style::Color::DarkYellow,
        Color::Blue => style::Color::DarkBlue,
        Color::Magenta => style::Color::DarkMagenta,
        Color::Cyan => style::Color::DarkCyan,
        Color::White => style::Color::Grey,
        Color::BrightBlack => style::Color::DarkGrey,
        Color::BrightRed => style::Color::Red,
        Color::BrightGreen => style::Color::Green,
        Color::BrightYellow => style::Color::Yellow,
        Color::BrightBlue => style::Color::Blue,
        Color::BrightMagenta => style::Color::Magenta,
        Color::BrightCyan => style::Color::Cyan,
        Color::BrightWhite => style::Color::White,
    }
}

/// Queue the escape sequences for a style
fn apply_style<W: Write>(out: &mut W, style: &Style) -> Result<()> {
    if style.fg != Color::Default {
        queue!(out, SetForegroundColor(to_crossterm(style.fg)))?;
    }
    if style.bg != Color::Default {
        queue!(out, SetBackgroundColor(to_crossterm(style.bg)))?;
    }
    if style.bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if style.italic {
        queue!(out, SetAttribute(Attribute::Italic))?;
    }
    if style.underline {
        queue!(out, SetAttribute(Attribute::Underlined))?;
    }
    Ok(())
}

/// Write one line with its spans styled, followed by a newline
///
/// Spans must be sorted and non-overlapping, as produced by
/// [`crate::syntax::highlight_line`].
pub fn write_highlighted<W: Write>(out: &mut W, line: &str, spans: &[Span]) -> Result<()> {
    let mut pos = 0;
    for span in spans {
        if span.start > pos {
            queue!(out, Print(&line[pos..span.start]))?;
        }
        if span.style.is_default() {
            queue!(out, Print(&line[span.start..span.end]))?;
        } else {
            apply_style(out, &span.style)?;
            queue!(out, Print(&line[span.start..span.end]), SetAttribute(Attribute::Reset))?;
        }
        pos = span.end;
    }
    if pos < line.len() {
        queue!(out, Print(&line[pos..]))?;
    }
    queue!(out, Print("\n"))?;
    Ok(())
}

/// Write one row per token: position, text and class
///
/// The text column is padded by display width so that wide characters
/// keep the class column aligned.
pub fn write_token_table<W: Write>(out: &mut W, line_no: usize, line: &str, tokens: &[Token]) -> Result<()> {
    const TEXT_WIDTH: usize = 24;
    for token in tokens {
        let text = token.text(line);
        let pad = TEXT_WIDTH.saturating_sub(display_width(text));
        let class = token.kind.map(|kind| kind.name()).unwrap_or("-");
        writeln!(
            out,
            "{}:{}-{}\t{:?}{}\t{}",
            line_no + 1,
            token.start,
            token.end,
            text,
            " ".repeat(pad),
            class
        )?;
    }
    Ok(())
}
