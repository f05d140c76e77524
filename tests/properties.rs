//! Property-based tests for defaults, serialization and projection.

mod common;

use std::sync::Arc;
use std::thread;

use common::{recording_session, unstyled, INVALID_SOURCE};
use hilite::{project, HighlightError, ProjectOptions, RunKind, Token};
use proptest::prelude::*;

const NAMES: [&str; 4] = ["rust", "go", "toml", "c"];

#[derive(Debug, Clone)]
enum Op {
    Load { name: usize, valid: bool },
    SetDefault { name: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..NAMES.len(), prop::bool::weighted(0.8))
            .prop_map(|(name, valid)| Op::Load { name, valid }),
        1 => (0..NAMES.len()).prop_map(|name| Op::SetDefault { name }),
    ]
}

fn token_strategy(max: i64) -> impl Strategy<Value = Token> {
    (-2..max + 2, -1..max / 2 + 2).prop_map(|(start, length)| unstyled(start, length, &["s"]))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// The default grammar is the first successful load unless overridden
    #[test]
    fn default_grammar_follows_first_load(ops in prop::collection::vec(op_strategy(), 1..12)) {
        let (session, _probe) = recording_session();
        session.load_theme("dark", "t").wait().unwrap();

        let mut loaded: Vec<&str> = Vec::new();
        let mut expected: Option<&str> = None;
        for op in &ops {
            match *op {
                Op::Load { name, valid } => {
                    let source = if valid { "g" } else { INVALID_SOURCE };
                    let result = session.load_grammar(NAMES[name], source).wait();
                    prop_assert_eq!(result.is_ok(), valid);
                    if valid {
                        if !loaded.contains(&NAMES[name]) {
                            loaded.push(NAMES[name]);
                        }
                        expected.get_or_insert(NAMES[name]);
                    }
                }
                Op::SetDefault { name } => {
                    let result = session.set_default_grammar(NAMES[name]).wait();
                    prop_assert_eq!(result.is_ok(), loaded.contains(&NAMES[name]));
                    if result.is_ok() {
                        expected = Some(NAMES[name]);
                    }
                }
            }
        }

        match expected {
            Some(name) => {
                session.tokenize("x", None, None).wait().unwrap();
                let active = session.active_grammar().wait().unwrap();
                prop_assert_eq!(active.as_deref(), Some(name));
            }
            None => {
                prop_assert_eq!(
                    session.tokenize("x", None, None).wait(),
                    Err(HighlightError::NoGrammarSpecified)
                );
            }
        }
    }

    /// Engine calls form one total order consistent with each caller's order
    #[test]
    fn engine_calls_are_serialized(callers in 2usize..5, per_caller in 1usize..8) {
        let (session, probe) = recording_session();
        common::load_basics(&session, "rust", "dark");
        let session = Arc::new(session);

        let workers: Vec<_> = (0..callers)
            .map(|caller| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    let pending: Vec<_> = (0..per_caller)
                        .map(|seq| session.tokenize(format!("{}:{}", caller, seq), None, None))
                        .collect();
                    for p in pending {
                        p.wait().unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        prop_assert_eq!(probe.max_in_flight(), 1);
        for caller in 0..callers {
            let prefix = format!("tokenize:{}:", caller);
            let seen: Vec<usize> = probe
                .calls()
                .iter()
                .filter_map(|c| c.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            prop_assert_eq!(seen, (0..per_caller).collect::<Vec<_>>());
        }
    }

    /// Runs tile the text exactly and every token is either used or counted
    #[test]
    fn projection_covers_text(
        text in "[a-z é🦀\n]{0,40}",
        tokens in prop::collection::vec(token_strategy(40), 0..12),
    ) {
        let doc = project(&text, &tokens, &ProjectOptions::default());
        let len = text.encode_utf16().count();

        let mut cursor = 0;
        for run in &doc.runs {
            prop_assert_eq!(run.start, cursor);
            prop_assert!(run.length > 0);
            cursor = run.end();
        }
        prop_assert_eq!(cursor, len);

        let token_runs = doc.runs.iter().filter(|r| r.kind == RunKind::Token).count();
        prop_assert_eq!(token_runs + doc.dropped_tokens, tokens.len());
    }

    /// Line synthesis only adds gutters, it never loses or restyles content
    #[test]
    fn line_synthesis_preserves_content(
        text in "[a-z é🦀\n]{0,40}",
        tokens in prop::collection::vec(token_strategy(40), 0..12),
    ) {
        let plain = project(&text, &tokens, &ProjectOptions::default());
        let numbered = project(&text, &tokens, &ProjectOptions::default().with_line_numbers(true));

        prop_assert_eq!(numbered.visible_text(), text.clone());
        prop_assert_eq!(numbered.dropped_tokens, plain.dropped_tokens);
        prop_assert_eq!(
            numbered.runs.iter().filter(|r| r.kind == RunKind::Gutter).count(),
            text.split('\n').count()
        );

        // Content runs concatenate to the text without newlines, style by style
        let plain_chars: Vec<_> = plain
            .runs
            .iter()
            .flat_map(|r| {
                let style = r.style.clone();
                plain.run_text(r).chars().filter(|c| *c != '\n').map(move |c| (c, style.clone())).collect::<Vec<_>>()
            })
            .collect();
        let numbered_chars: Vec<_> = numbered
            .content_runs()
            .flat_map(|r| {
                let style = r.style.clone();
                numbered.run_text(r).chars().map(move |c| (c, style.clone())).collect::<Vec<_>>()
            })
            .collect();
        prop_assert_eq!(numbered_chars, plain_chars);
    }
}
