//! Projection of tokens onto a styled document
//!
//! Offsets everywhere in this module are UTF-16 code units, matching the
//! engine's token offsets.
//!
//! Without line numbers the runs cover the source text exactly, gaps
//! between tokens filled with [`RunKind::Default`] runs. With line numbers
//! every line gets a right-aligned number prefix as a [`RunKind::Gutter`]
//! run, the original runs are clipped per line and shifted past the
//! prefix, and the `\n` separators sit between runs.

use serde::Serialize;

use crate::style::ThemeStyle;
use crate::syntax::{utf16_len, Token};

/// What produced a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    /// Text no valid token covered
    Default,
    Token,
    /// Synthesized line-number prefix
    Gutter,
}

/// A contiguous range sharing one style
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleRun {
    pub start: usize,
    pub length: usize,
    pub style: ThemeStyle,
    pub kind: RunKind,
}

impl StyleRun {
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Options for [`project`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOptions {
    pub show_line_numbers: bool,
    /// Appended after each line number
    pub gutter_separator: String,
    pub gutter_style: ThemeStyle,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            show_line_numbers: false,
            gutter_separator: " | ".to_string(),
            gutter_style: ThemeStyle::with_color("#6272A4"),
        }
    }
}

impl ProjectOptions {
    pub fn with_line_numbers(mut self, show: bool) -> Self {
        self.show_line_numbers = show;
        self
    }
}

/// Rendered text plus its style runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyledDocument {
    pub text: String,
    pub runs: Vec<StyleRun>,
    /// Tokens discarded as out of range, empty or overlapping
    pub dropped_tokens: usize,
}

impl StyledDocument {
    /// Text of `[start, start + length)` in UTF-16 units
    pub fn slice(&self, start: usize, length: usize) -> String {
        let units: Vec<u16> = self
            .text
            .encode_utf16()
            .skip(start)
            .take(length)
            .collect();
        String::from_utf16_lossy(&units)
    }

    pub fn run_text(&self, run: &StyleRun) -> String {
        self.slice(run.start, run.length)
    }

    /// The document text with every gutter run removed
    pub fn visible_text(&self) -> String {
        let mut units: Vec<Option<u16>> = self.text.encode_utf16().map(Some).collect();
        for run in self.runs.iter().filter(|r| r.kind == RunKind::Gutter) {
            for unit in units.iter_mut().skip(run.start).take(run.length) {
                *unit = None;
            }
        }
        let kept: Vec<u16> = units.into_iter().flatten().collect();
        String::from_utf16_lossy(&kept)
    }

    /// Runs produced from tokens or gaps, i.e. everything but the gutter
    pub fn content_runs(&self) -> impl Iterator<Item = &StyleRun> {
        self.runs.iter().filter(|r| r.kind != RunKind::Gutter)
    }
}

/// Build a styled document from `text` and engine `tokens`.
///
/// Invalid tokens are dropped and counted, never fatal.
pub fn project(text: &str, tokens: &[Token], options: &ProjectOptions) -> StyledDocument {
    let text_len = utf16_len(text);
    let (runs, dropped_tokens) = build_runs(text_len, tokens);

    if dropped_tokens > 0 {
        tracing::warn!(
            "Dropped {} invalid tokens out of {} (text length {})",
            dropped_tokens,
            tokens.len(),
            text_len
        );
    }

    if !options.show_line_numbers {
        return StyledDocument {
            text: text.to_string(),
            runs,
            dropped_tokens,
        };
    }

    let (text, runs) = synthesize_lines(text, &runs, options);
    StyledDocument {
        text,
        runs,
        dropped_tokens,
    }
}

/// Contiguous runs over `[0, text_len)`, plus the number of dropped tokens
fn build_runs(text_len: usize, tokens: &[Token]) -> (Vec<StyleRun>, usize) {
    let mut runs = Vec::with_capacity(tokens.len() * 2 + 1);
    let mut dropped = 0;
    let mut cursor = 0usize;

    for token in tokens {
        if !token.is_valid_for(text_len) {
            tracing::debug!(
                "Skipping invalid token: start={}, length={}, textLength={}",
                token.start,
                token.length,
                text_len
            );
            dropped += 1;
            continue;
        }

        // is_valid_for guarantees both fit in usize
        let start = token.start as usize;
        let length = token.length as usize;
        if start < cursor {
            tracing::debug!("Skipping overlapping token at {} (cursor {})", start, cursor);
            dropped += 1;
            continue;
        }

        if start > cursor {
            runs.push(default_run(cursor, start - cursor));
        }
        runs.push(StyleRun {
            start,
            length,
            style: token.style.clone(),
            kind: RunKind::Token,
        });
        cursor = start + length;
    }

    if cursor < text_len {
        runs.push(default_run(cursor, text_len - cursor));
    }

    (runs, dropped)
}

fn default_run(start: usize, length: usize) -> StyleRun {
    StyleRun {
        start,
        length,
        style: ThemeStyle::default(),
        kind: RunKind::Default,
    }
}

fn digit_count(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Prefix every line with its number and remap `runs` accordingly
fn synthesize_lines(
    text: &str,
    runs: &[StyleRun],
    options: &ProjectOptions,
) -> (String, Vec<StyleRun>) {
    let lines: Vec<&str> = text.split('\n').collect();
    let width = digit_count(lines.len());
    let separator_len = utf16_len(&options.gutter_separator);

    let mut out = String::with_capacity(text.len() + lines.len() * (width + separator_len + 1));
    let mut out_runs = Vec::with_capacity(runs.len() + lines.len());
    let mut out_len = 0usize;
    let mut line_start = 0usize;
    // Runs are sorted and disjoint; everything before this index ended
    // before the current line.
    let mut first_run = 0usize;

    for (index, line) in lines.iter().enumerate() {
        let line_len = utf16_len(line);
        let line_end = line_start + line_len;

        let prefix = format!(
            "{:>width$}{}",
            index + 1,
            options.gutter_separator,
            width = width
        );
        let prefix_len = utf16_len(&prefix);
        out_runs.push(StyleRun {
            start: out_len,
            length: prefix_len,
            style: options.gutter_style.clone(),
            kind: RunKind::Gutter,
        });
        out.push_str(&prefix);
        out_len += prefix_len;

        while first_run < runs.len() && runs[first_run].end() <= line_start {
            first_run += 1;
        }
        for run in runs[first_run..].iter().take_while(|r| r.start < line_end) {
            let clipped_start = run.start.max(line_start);
            let clipped_end = run.end().min(line_end);
            if clipped_end <= clipped_start {
                continue;
            }
            out_runs.push(StyleRun {
                start: out_len + (clipped_start - line_start),
                length: clipped_end - clipped_start,
                style: run.style.clone(),
                kind: run.kind,
            });
        }

        out.push_str(line);
        out_len += line_len;

        if index + 1 < lines.len() {
            out.push('\n');
            out_len += 1;
        }
        line_start = line_end + 1;
    }

    (out, out_runs)
}
