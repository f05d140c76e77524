//! Regex-backed reference engine
//!
//! Grammars are flat lists of `{ "match": <regex>, "name": <scope> }`
//! patterns; the leftmost non-empty match wins and ties go to the earlier
//! pattern.
//! Themes use the TextMate `tokenColors` layout. There are no begin/end
//! rules and no capture scopes: this is enough to drive the session from
//! the command line, not a TextMate implementation.

use std::collections::HashMap;

use regex::{Match, Regex};
use serde::Deserialize;

use super::{GrammarHandle, ThemeHandle, TokenizerEngine};
use crate::error::EngineError;
use crate::style::ThemeStyle;
use crate::syntax::Token;

/// Result cache entries kept before the cache is flushed
const RESULT_CACHE_ENTRIES: usize = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrammarData {
    #[serde(default)]
    scope_name: Option<String>,
    patterns: Vec<PatternData>,
}

#[derive(Debug, Deserialize)]
struct PatternData {
    #[serde(rename = "match")]
    regex: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeData {
    #[serde(default)]
    token_colors: Vec<TokenColorData>,
}

#[derive(Debug, Deserialize)]
struct TokenColorData {
    #[serde(default)]
    scope: Option<ScopeSelector>,
    #[serde(default)]
    settings: SettingsData,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScopeSelector {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsData {
    #[serde(default)]
    foreground: Option<String>,
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    font_style: Option<String>,
}

struct CompiledGrammar {
    scope_name: String,
    patterns: Vec<(Regex, String)>,
}

struct CompiledTheme {
    /// (selector, style) in declaration order
    rules: Vec<(String, ThemeStyle)>,
}

impl CompiledTheme {
    /// Most specific rule whose selector is `scope` or a dotted prefix of it
    fn lookup(&self, scope: &str) -> Option<&ThemeStyle> {
        let mut best: Option<(usize, &ThemeStyle)> = None;
        for (selector, style) in &self.rules {
            let matches = scope == selector
                || scope
                    .strip_prefix(selector.as_str())
                    .is_some_and(|rest| rest.starts_with('.'));
            // Later rules win ties, as in TextMate themes
            if matches && best.is_none_or(|(len, _)| selector.len() >= len) {
                best = Some((selector.len(), style));
            }
        }
        best.map(|(_, style)| style)
    }

    fn exact(&self, scope: &str) -> Option<&ThemeStyle> {
        self.rules
            .iter()
            .rev()
            .find(|(selector, _)| selector == scope)
            .map(|(_, style)| style)
    }
}

/// Reference [`TokenizerEngine`] built on the `regex` crate
#[derive(Default)]
pub struct PatternEngine {
    next_id: u64,
    grammars: HashMap<u64, CompiledGrammar>,
    themes: HashMap<u64, CompiledTheme>,
    active_grammar: Option<u64>,
    active_theme: Option<u64>,
    cache_enabled: bool,
    result_cache: HashMap<(u64, u64, String), Vec<Token>>,
}

impl PatternEngine {
    pub fn new() -> Self {
        Self {
            cache_enabled: true,
            ..Self::default()
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Number of grammars currently compiled
    pub fn grammar_count(&self) -> usize {
        self.grammars.len()
    }

    /// Number of themes currently compiled
    pub fn theme_count(&self) -> usize {
        self.themes.len()
    }

    fn active_theme(&self) -> Result<&CompiledTheme, EngineError> {
        self.active_theme
            .and_then(|id| self.themes.get(&id))
            .ok_or_else(|| EngineError::failure("no active theme"))
    }

    fn scan(grammar: &CompiledGrammar, theme: &CompiledTheme, text: &str) -> Vec<Token> {
        Scan::new(grammar, text).run(theme)
    }
}

/// One pass over `text`, holding the next non-empty match of every pattern.
///
/// A pattern is searched again only once the cursor has moved past the start
/// of its cached match.
struct Scan<'g, 't> {
    grammar: &'g CompiledGrammar,
    text: &'t str,
    next: Vec<Option<Match<'t>>>,
    searches: usize,
}

impl<'g, 't> Scan<'g, 't> {
    fn new(grammar: &'g CompiledGrammar, text: &'t str) -> Self {
        let mut scan = Self {
            grammar,
            text,
            next: Vec::with_capacity(grammar.patterns.len()),
            searches: 0,
        };
        for index in 0..grammar.patterns.len() {
            let m = scan.search(index, 0);
            scan.next.push(m);
        }
        scan
    }

    /// Leftmost non-empty match of pattern `index` starting at or after `from`
    fn search(&mut self, index: usize, mut from: usize) -> Option<Match<'t>> {
        let grammar = self.grammar;
        let regex = &grammar.patterns[index].0;
        while from <= self.text.len() {
            self.searches += 1;
            let m = regex.find_at(self.text, from)?;
            if !m.is_empty() {
                return Some(m);
            }
            from = m.end()
                + self.text[m.end()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
        }
        None
    }

    fn run(&mut self, theme: &CompiledTheme) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut pos = 0;
        // Incremental byte -> UTF-16 conversion; matches only move forward
        let mut byte_cursor = 0;
        let mut utf16_cursor = 0i64;

        loop {
            for index in 0..self.next.len() {
                if self.next[index].is_some_and(|m| m.start() < pos) {
                    let m = self.search(index, pos);
                    self.next[index] = m;
                }
            }

            // Leftmost wins, ties go to the earlier pattern
            let Some((index, m)) = self
                .next
                .iter()
                .enumerate()
                .filter_map(|(index, m)| m.map(|m| (index, m)))
                .min_by_key(|(index, m)| (m.start(), *index))
            else {
                break;
            };

            utf16_cursor += utf16_units(&self.text[byte_cursor..m.start()]);
            let start = utf16_cursor;
            utf16_cursor += utf16_units(m.as_str());
            byte_cursor = m.end();

            let name = &self.grammar.patterns[index].1;
            tokens.push(Token::new(
                start,
                utf16_cursor - start,
                vec![name.clone(), self.grammar.scope_name.clone()],
                theme.exact(name).cloned().unwrap_or_default(),
            ));
            pos = m.end();
        }

        tokens
    }
}

fn utf16_units(text: &str) -> i64 {
    text.chars().map(|c| c.len_utf16() as i64).sum()
}

impl TokenizerEngine for PatternEngine {
    fn compile_grammar(
        &mut self,
        name: &str,
        scope_name: &str,
        source: &str,
    ) -> Result<GrammarHandle, EngineError> {
        let data: GrammarData = serde_json::from_str(source)
            .map_err(|e| EngineError::invalid_grammar(format!("{name}: {e}")))?;

        let mut patterns = Vec::with_capacity(data.patterns.len());
        for pattern in data.patterns {
            let regex = Regex::new(&pattern.regex).map_err(|e| {
                EngineError::invalid_grammar(format!("{name}: pattern '{}': {e}", pattern.name))
            })?;
            patterns.push((regex, pattern.name));
        }

        let id = self.allocate_id();
        self.grammars.insert(
            id,
            CompiledGrammar {
                scope_name: data.scope_name.unwrap_or_else(|| scope_name.to_string()),
                patterns,
            },
        );
        tracing::debug!("pattern engine: compiled grammar {} as #{}", name, id);
        Ok(GrammarHandle::new(id))
    }

    fn compile_theme(&mut self, name: &str, source: &str) -> Result<ThemeHandle, EngineError> {
        let data: ThemeData = serde_json::from_str(source)
            .map_err(|e| EngineError::invalid_theme(format!("{name}: {e}")))?;

        let mut rules = Vec::new();
        for entry in data.token_colors {
            let selectors = match entry.scope {
                Some(ScopeSelector::One(s)) => s.split(',').map(|s| s.trim().to_string()).collect(),
                Some(ScopeSelector::Many(list)) => list,
                None => continue,
            };

            let mut style = ThemeStyle {
                color: entry.settings.foreground.clone(),
                background_color: entry.settings.background.clone(),
                ..ThemeStyle::default()
            };
            if let Some(font_style) = &entry.settings.font_style {
                style.apply_font_style(font_style);
            }

            for selector in selectors.into_iter().filter(|s| !s.is_empty()) {
                rules.push((selector, style.clone()));
            }
        }

        let id = self.allocate_id();
        self.themes.insert(id, CompiledTheme { rules });
        tracing::debug!("pattern engine: compiled theme {} as #{}", name, id);
        Ok(ThemeHandle::new(id))
    }

    fn set_active_grammar(&mut self, handle: GrammarHandle) -> Result<(), EngineError> {
        if !self.grammars.contains_key(&handle.raw()) {
            return Err(EngineError::failure(format!(
                "unknown grammar handle #{}",
                handle.raw()
            )));
        }
        self.active_grammar = Some(handle.raw());
        Ok(())
    }

    fn set_active_theme(&mut self, handle: ThemeHandle) -> Result<(), EngineError> {
        if !self.themes.contains_key(&handle.raw()) {
            return Err(EngineError::failure(format!(
                "unknown theme handle #{}",
                handle.raw()
            )));
        }
        self.active_theme = Some(handle.raw());
        Ok(())
    }

    fn tokenize(&mut self, text: &str) -> Result<Vec<Token>, EngineError> {
        let grammar_id = self
            .active_grammar
            .ok_or_else(|| EngineError::failure("no active grammar"))?;
        let theme_id = self
            .active_theme
            .ok_or_else(|| EngineError::failure("no active theme"))?;

        let key = (grammar_id, theme_id, text.to_string());
        if self.cache_enabled {
            if let Some(tokens) = self.result_cache.get(&key) {
                return Ok(tokens.clone());
            }
        }

        let grammar = self
            .grammars
            .get(&grammar_id)
            .ok_or_else(|| EngineError::failure("active grammar was released"))?;
        let theme = self.active_theme()?;
        let tokens = Self::scan(grammar, theme, text);

        if self.cache_enabled {
            if self.result_cache.len() >= RESULT_CACHE_ENTRIES {
                self.result_cache.clear();
            }
            self.result_cache.insert(key, tokens.clone());
        }
        Ok(tokens)
    }

    fn resolve_scope_style(&mut self, scope: &str) -> Result<ThemeStyle, EngineError> {
        let theme = self.active_theme()?;
        // Innermost segment of a space-separated scope path wins
        Ok(scope
            .split_whitespace()
            .rev()
            .find_map(|segment| theme.lookup(segment))
            .cloned()
            .unwrap_or_default())
    }

    fn release_grammar(&mut self, handle: GrammarHandle) {
        if self.grammars.remove(&handle.raw()).is_some() {
            self.result_cache.retain(|(g, _, _), _| *g != handle.raw());
        }
        if self.active_grammar == Some(handle.raw()) {
            self.active_grammar = None;
        }
    }

    fn release_theme(&mut self, handle: ThemeHandle) {
        if self.themes.remove(&handle.raw()).is_some() {
            self.result_cache.retain(|(_, t, _), _| *t != handle.raw());
        }
        if self.active_theme == Some(handle.raw()) {
            self.active_theme = None;
        }
    }

    fn set_result_cache_enabled(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
        if !enabled {
            self.result_cache.clear();
        }
    }

    fn on_memory_warning(&mut self) {
        tracing::debug!(
            "pattern engine: dropping {} cached results",
            self.result_cache.len()
        );
        self.result_cache.clear();
    }
}
