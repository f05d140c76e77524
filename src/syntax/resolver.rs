//! Scope cascade for tokens the engine left without a color
//!
//! For a token with no color, each scope is looked up individually in the
//! order the engine supplied them, and the first one that yields a color
//! wins. If none does, the scopes are joined with single spaces and looked
//! up once more. A lookup error counts as "no match"; the cascade never
//! fails and never invents a color.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::style::ThemeStyle;
use crate::syntax::Token;

fn lookup_color<F>(lookup: &mut F, scope: &str) -> Result<Option<String>, EngineError>
where
    F: FnMut(&str) -> Result<ThemeStyle, EngineError>,
{
    let style = lookup(scope)?;
    Ok(if style.has_color() { style.color } else { None })
}

fn cascade<F>(scopes: &[String], mut color_for: F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    if scopes.is_empty() {
        return None;
    }
    scopes
        .iter()
        .find_map(|scope| color_for(scope))
        .or_else(|| color_for(&scopes.join(" ")))
}

/// Scope cascade with a per-theme memo of scope -> color.
///
/// The memo must be cleared whenever the active theme changes.
#[derive(Debug, Default)]
pub struct StyleResolver {
    memo: HashMap<String, Option<String>>,
    capacity: usize,
}

impl StyleResolver {
    /// `capacity` bounds the memo; 0 disables it
    pub fn new(capacity: usize) -> Self {
        Self {
            memo: HashMap::new(),
            capacity,
        }
    }

    pub fn resolve<F>(&mut self, token: &Token, mut lookup: F) -> ThemeStyle
    where
        F: FnMut(&str) -> Result<ThemeStyle, EngineError>,
    {
        let mut style = token.style.clone();
        if style.has_color() {
            return style;
        }

        let capacity = self.capacity;
        let memo = &mut self.memo;
        style.color = cascade(&token.scopes, |scope| {
            if let Some(cached) = memo.get(scope) {
                return cached.clone();
            }
            let result = match lookup_color(&mut lookup, scope) {
                Ok(result) => result,
                Err(e) => {
                    // Not memoized: a later lookup may succeed
                    tracing::warn!("Scope lookup failed for '{}': {}", scope, e);
                    return None;
                }
            };
            if capacity > 0 {
                if memo.len() >= capacity {
                    memo.clear();
                }
                memo.insert(scope.to_string(), result.clone());
            }
            result
        });
        style
    }

    /// Resolve every token in place
    pub fn resolve_all<F>(&mut self, tokens: &mut [Token], mut lookup: F)
    where
        F: FnMut(&str) -> Result<ThemeStyle, EngineError>,
    {
        for token in tokens.iter_mut() {
            token.style = self.resolve(token, &mut lookup);
        }
    }

    /// Forget memoized lookups
    pub fn clear(&mut self) {
        self.memo.clear();
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}
