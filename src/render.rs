//! Terminal rendering of styled documents with 24-bit ANSI escapes

use std::fmt::Write;

use crate::projector::StyledDocument;
use crate::style::{Color, ThemeStyle};

const RESET: &str = "\x1b[0m";

/// SGR parameters for `style`; empty when nothing applies.
///
/// Colors that fail to parse are treated as unresolved.
fn sgr_params(style: &ThemeStyle) -> Vec<String> {
    let mut params = Vec::new();
    if style.bold {
        params.push("1".to_string());
    }
    if style.italic {
        params.push("3".to_string());
    }
    if style.underline {
        params.push("4".to_string());
    }
    if let Some(c) = parse(style.color.as_deref()) {
        params.push(format!("38;2;{};{};{}", c.r, c.g, c.b));
    }
    if let Some(c) = parse(style.background_color.as_deref()) {
        params.push(format!("48;2;{};{};{}", c.r, c.g, c.b));
    }
    params
}

fn parse(hex: Option<&str>) -> Option<Color> {
    let hex = hex?;
    match Color::from_hex(hex) {
        Ok(color) => Some(color),
        Err(e) => {
            tracing::debug!("Ignoring unparseable color {:?}: {}", hex, e);
            None
        }
    }
}

/// Render `doc` for a truecolor terminal.
///
/// Text not covered by any run is written as-is in the terminal's default
/// style.
pub fn to_ansi(doc: &StyledDocument) -> String {
    let units: Vec<u16> = doc.text.encode_utf16().collect();
    let segment = |start: usize, end: usize| {
        String::from_utf16_lossy(&units[start.min(units.len())..end.min(units.len())])
    };

    let mut out = String::with_capacity(doc.text.len() * 2);
    let mut cursor = 0;
    for run in &doc.runs {
        if run.start > cursor {
            out.push_str(&segment(cursor, run.start));
        }
        let params = sgr_params(&run.style);
        if params.is_empty() {
            out.push_str(&segment(run.start, run.end()));
        } else {
            let _ = write!(
                out,
                "\x1b[{}m{}{}",
                params.join(";"),
                segment(run.start, run.end()),
                RESET
            );
        }
        cursor = cursor.max(run.end());
    }
    if cursor < units.len() {
        out.push_str(&segment(cursor, units.len()));
    }
    out
}
