//! Owned table of loaded grammar and theme handles
//!
//! The cache borrows the engine only for the duration of a call: to
//! compile a new resource or to release a handle it is dropping. Every
//! handle it stores is released exactly once.

use std::collections::HashMap;

use crate::engine::{GrammarHandle, ThemeHandle, TokenizerEngine};
use crate::error::{HighlightError, ResourceKind, Result};

/// A handle of either kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceHandle {
    Grammar(GrammarHandle),
    Theme(ThemeHandle),
}

/// Name-keyed handles of one kind plus the default name
#[derive(Debug)]
struct ResourceTable<H> {
    entries: HashMap<String, H>,
    default: Option<String>,
}

impl<H: Copy> ResourceTable<H> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            default: None,
        }
    }

    /// Insert, auto-promoting the first loaded name to default.
    /// Returns the handle previously stored under `name`.
    fn insert(&mut self, name: &str, handle: H) -> Option<H> {
        let previous = self.entries.insert(name.to_string(), handle);
        if self.default.is_none() {
            self.default = Some(name.to_string());
        }
        previous
    }

    fn remove(&mut self, name: &str) -> Option<H> {
        let handle = self.entries.remove(name)?;
        if self.default.as_deref() == Some(name) {
            self.default = None;
        }
        Some(handle)
    }

    fn drain(&mut self) -> Vec<H> {
        self.entries.drain().map(|(_, handle)| handle).collect()
    }
}

/// Loaded grammars and themes, keyed by name
#[derive(Debug)]
pub struct ResourceCache {
    grammars: ResourceTable<GrammarHandle>,
    themes: ResourceTable<ThemeHandle>,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCache {
    pub fn new() -> Self {
        Self {
            grammars: ResourceTable::new(),
            themes: ResourceTable::new(),
        }
    }

    /// Compile a grammar and store it under `name`, releasing any handle
    /// it replaces.
    pub fn load_grammar(
        &mut self,
        engine: &mut dyn TokenizerEngine,
        name: &str,
        source: &str,
    ) -> Result<GrammarHandle> {
        let scope_name = format!("source.{}", name);
        let handle = engine
            .compile_grammar(name, &scope_name, source)
            .map_err(|e| HighlightError::from_grammar_compile(name, e))?;
        if let Some(previous) = self.insert_grammar(name, handle) {
            tracing::debug!("Releasing superseded grammar handle for {}", name);
            engine.release_grammar(previous);
        }
        Ok(handle)
    }

    /// Compile a theme and store it under `name`, releasing any handle it
    /// replaces.
    pub fn load_theme(
        &mut self,
        engine: &mut dyn TokenizerEngine,
        name: &str,
        source: &str,
    ) -> Result<ThemeHandle> {
        let handle = engine
            .compile_theme(name, source)
            .map_err(|e| HighlightError::from_theme_compile(name, e))?;
        if let Some(previous) = self.insert_theme(name, handle) {
            tracing::debug!("Releasing superseded theme handle for {}", name);
            engine.release_theme(previous);
        }
        Ok(handle)
    }

    /// Register a compiled grammar; returns the superseded handle, if any
    pub fn insert_grammar(&mut self, name: &str, handle: GrammarHandle) -> Option<GrammarHandle> {
        self.grammars.insert(name, handle)
    }

    /// Register a compiled theme; returns the superseded handle, if any
    pub fn insert_theme(&mut self, name: &str, handle: ThemeHandle) -> Option<ThemeHandle> {
        self.themes.insert(name, handle)
    }

    pub fn grammar(&self, name: &str) -> Result<GrammarHandle> {
        self.grammars
            .entries
            .get(name)
            .copied()
            .ok_or_else(|| HighlightError::unknown(ResourceKind::Grammar, name))
    }

    pub fn theme(&self, name: &str) -> Result<ThemeHandle> {
        self.themes
            .entries
            .get(name)
            .copied()
            .ok_or_else(|| HighlightError::unknown(ResourceKind::Theme, name))
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Result<ResourceHandle> {
        match kind {
            ResourceKind::Grammar => self.grammar(name).map(ResourceHandle::Grammar),
            ResourceKind::Theme => self.theme(name).map(ResourceHandle::Theme),
        }
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        match kind {
            ResourceKind::Grammar => self.grammars.entries.contains_key(name),
            ResourceKind::Theme => self.themes.entries.contains_key(name),
        }
    }

    pub fn set_default(&mut self, kind: ResourceKind, name: &str) -> Result<()> {
        if !self.contains(kind, name) {
            return Err(HighlightError::unknown(kind, name));
        }
        let slot = match kind {
            ResourceKind::Grammar => &mut self.grammars.default,
            ResourceKind::Theme => &mut self.themes.default,
        };
        *slot = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self, kind: ResourceKind) -> Option<&str> {
        match kind {
            ResourceKind::Grammar => self.grammars.default.as_deref(),
            ResourceKind::Theme => self.themes.default.as_deref(),
        }
    }

    /// Loaded names of one kind, sorted for stable output
    pub fn list_names(&self, kind: ResourceKind) -> Vec<String> {
        let mut names: Vec<String> = match kind {
            ResourceKind::Grammar => self.grammars.entries.keys().cloned().collect(),
            ResourceKind::Theme => self.themes.entries.keys().cloned().collect(),
        };
        names.sort();
        names
    }

    /// Remove one entry without releasing it. Clears the default if it
    /// pointed at `name`.
    pub fn remove(&mut self, kind: ResourceKind, name: &str) -> Result<ResourceHandle> {
        let removed = match kind {
            ResourceKind::Grammar => self.grammars.remove(name).map(ResourceHandle::Grammar),
            ResourceKind::Theme => self.themes.remove(name).map(ResourceHandle::Theme),
        };
        removed.ok_or_else(|| HighlightError::unknown(kind, name))
    }

    /// Remove one entry and release it on the engine
    pub fn unload(
        &mut self,
        engine: &mut dyn TokenizerEngine,
        kind: ResourceKind,
        name: &str,
    ) -> Result<ResourceHandle> {
        let handle = self.remove(kind, name)?;
        release(engine, handle);
        Ok(handle)
    }

    /// Release every handle. Returns how many were released.
    ///
    /// Default names survive eviction: reloading a resource under the same
    /// name makes it the default again without re-promotion.
    pub fn evict_all(&mut self, engine: &mut dyn TokenizerEngine) -> usize {
        let mut handles: Vec<ResourceHandle> = self
            .grammars
            .drain()
            .into_iter()
            .map(ResourceHandle::Grammar)
            .collect();
        handles.extend(self.themes.drain().into_iter().map(ResourceHandle::Theme));
        for handle in &handles {
            release(engine, *handle);
        }
        handles.len()
    }

    pub fn len(&self) -> usize {
        self.grammars.entries.len() + self.themes.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn release(engine: &mut dyn TokenizerEngine, handle: ResourceHandle) {
    match handle {
        ResourceHandle::Grammar(h) => engine.release_grammar(h),
        ResourceHandle::Theme(h) => engine.release_theme(h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pattern::PatternEngine;

    fn g(raw: u64) -> GrammarHandle {
        GrammarHandle::new(raw)
    }

    #[test]
    fn test_first_grammar_becomes_default() {
        let mut cache = ResourceCache::new();
        assert_eq!(cache.default_name(ResourceKind::Grammar), None);

        cache.insert_grammar("rust", g(1));
        cache.insert_grammar("python", g(2));

        assert_eq!(cache.default_name(ResourceKind::Grammar), Some("rust"));
        assert_eq!(cache.default_name(ResourceKind::Theme), None);
    }

    #[test]
    fn test_reload_returns_superseded_handle() {
        let mut cache = ResourceCache::new();
        assert_eq!(cache.insert_grammar("rust", g(1)), None);
        assert_eq!(cache.insert_grammar("rust", g(2)), Some(g(1)));
        assert_eq!(cache.grammar("rust").unwrap(), g(2));
        assert_eq!(cache.list_names(ResourceKind::Grammar), vec!["rust"]);
    }

    #[test]
    fn test_set_default_requires_loaded_name() {
        let mut cache = ResourceCache::new();
        cache.insert_theme("dark", ThemeHandle::new(1));
        cache.insert_theme("light", ThemeHandle::new(2));

        let err = cache.set_default(ResourceKind::Theme, "nord").unwrap_err();
        assert!(matches!(err, HighlightError::UnknownResource { .. }));

        cache.set_default(ResourceKind::Theme, "light").unwrap();
        assert_eq!(cache.default_name(ResourceKind::Theme), Some("light"));
    }

    #[test]
    fn test_get_by_kind() {
        let mut cache = ResourceCache::new();
        cache.insert_theme("dark", ThemeHandle::new(7));
        assert_eq!(
            cache.get(ResourceKind::Theme, "dark").unwrap(),
            ResourceHandle::Theme(ThemeHandle::new(7))
        );
        assert!(cache.get(ResourceKind::Grammar, "dark").is_err());
    }

    #[test]
    fn test_remove_clears_default() {
        let mut cache = ResourceCache::new();
        cache.insert_grammar("rust", g(1));
        cache.insert_grammar("go", g(2));

        assert_eq!(
            cache.remove(ResourceKind::Grammar, "rust").unwrap(),
            ResourceHandle::Grammar(g(1))
        );
        assert_eq!(cache.default_name(ResourceKind::Grammar), None);

        // Next load promotes again since there is no default now
        cache.insert_grammar("c", g(3));
        assert_eq!(cache.default_name(ResourceKind::Grammar), Some("c"));
        assert!(cache.remove(ResourceKind::Grammar, "rust").is_err());
    }

    const GRAMMAR: &str = r#"{"patterns":[{"match":"fn","name":"keyword"}]}"#;
    const THEME: &str = r#"{"tokenColors":[]}"#;

    #[test]
    fn test_load_replaces_and_releases_previous_handle() {
        let mut engine = PatternEngine::new();
        let mut cache = ResourceCache::new();

        let first = cache.load_grammar(&mut engine, "rust", GRAMMAR).unwrap();
        let second = cache.load_grammar(&mut engine, "rust", GRAMMAR).unwrap();

        assert_ne!(first, second);
        assert_eq!(engine.grammar_count(), 1);
        assert_eq!(cache.grammar("rust").unwrap(), second);
    }

    #[test]
    fn test_load_maps_engine_rejection() {
        let mut engine = PatternEngine::new();
        let mut cache = ResourceCache::new();

        let err = cache.load_grammar(&mut engine, "bad", "{").unwrap_err();
        assert!(matches!(err, HighlightError::InvalidGrammar { .. }));
        let err = cache.load_theme(&mut engine, "bad", "not json").unwrap_err();
        assert!(matches!(err, HighlightError::InvalidTheme { .. }));

        // A failed load never becomes the default
        assert_eq!(cache.default_name(ResourceKind::Grammar), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unload_releases_on_engine() {
        let mut engine = PatternEngine::new();
        let mut cache = ResourceCache::new();
        cache.load_theme(&mut engine, "dark", THEME).unwrap();

        cache
            .unload(&mut engine, ResourceKind::Theme, "dark")
            .unwrap();
        assert_eq!(engine.theme_count(), 0);
        assert!(cache.unload(&mut engine, ResourceKind::Theme, "dark").is_err());
    }

    #[test]
    fn test_evict_all_releases_every_handle_and_keeps_defaults() {
        let mut engine = PatternEngine::new();
        let mut cache = ResourceCache::new();
        cache.load_grammar(&mut engine, "rust", GRAMMAR).unwrap();
        cache.load_grammar(&mut engine, "go", GRAMMAR).unwrap();
        cache.load_theme(&mut engine, "dark", THEME).unwrap();

        assert_eq!(cache.evict_all(&mut engine), 3);
        assert!(cache.is_empty());
        assert_eq!(engine.grammar_count() + engine.theme_count(), 0);
        assert_eq!(cache.default_name(ResourceKind::Grammar), Some("rust"));

        // Evicting an empty cache is fine
        assert_eq!(cache.evict_all(&mut engine), 0);
    }
}
