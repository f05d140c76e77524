//! Highlighting session
//!
//! A [`HighlightSession`] owns one tokenizer engine and funnels every call
//! into it through a [`SerializedExecutor`] lane. The engine keeps a single
//! active grammar/theme pair, so two tokenize requests for different
//! languages must never overlap; the lane guarantees that and keeps the
//! order each caller submitted in.
//!
//! Every operation returns a [`Pending`] handle. Failures go to the caller
//! of the task that failed and are also published as `error` events.
//!
//! ```text
//! Ready ──dispose()──► Disposed
//! ```

use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use crate::config::SessionConfig;
use crate::engine::{GrammarHandle, ThemeHandle, TokenizerEngine};
use crate::error::{HighlightError, ResourceKind, Result};
use crate::events::{EventBus, SessionEvent};
use crate::executor::{Pending, SerializedExecutor};
use crate::projector::{self, ProjectOptions, StyledDocument};
use crate::syntax::{ResourceCache, ResourceHandle, StyleResolver, Token};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Disposed,
}

/// Resource currently selected on the engine
#[derive(Debug, Clone)]
struct Active<H> {
    name: String,
    handle: H,
}

/// Everything that lives on the lane
struct SessionCore {
    engine: Box<dyn TokenizerEngine>,
    cache: ResourceCache,
    active_grammar: Option<Active<GrammarHandle>>,
    active_theme: Option<Active<ThemeHandle>>,
    resolver: StyleResolver,
    /// Host-registered recoverability per error code
    recovery: HashMap<u32, bool>,
    max_input_len: usize,
    events: EventBus,
}

impl SessionCore {
    fn load_grammar(&mut self, name: &str, source: &str) -> Result<GrammarHandle> {
        let handle = self.cache.load_grammar(self.engine.as_mut(), name, source)?;
        self.engine.set_active_grammar(handle)?;
        self.active_grammar = Some(Active {
            name: name.to_string(),
            handle,
        });
        tracing::info!("Loaded grammar: {}", name);
        Ok(handle)
    }

    fn load_theme(&mut self, name: &str, source: &str) -> Result<ThemeHandle> {
        let handle = self.cache.load_theme(self.engine.as_mut(), name, source)?;
        self.engine.set_active_theme(handle)?;
        self.active_theme = Some(Active {
            name: name.to_string(),
            handle,
        });
        self.resolver.clear();
        tracing::info!("Loaded theme: {}", name);
        Ok(handle)
    }

    /// Select `name` on the engine unless its handle is already active
    fn activate_grammar(&mut self, name: &str, handle: GrammarHandle) -> Result<()> {
        if self.active_grammar.as_ref().map(|a| a.handle) == Some(handle) {
            return Ok(());
        }
        self.engine.set_active_grammar(handle)?;
        self.active_grammar = Some(Active {
            name: name.to_string(),
            handle,
        });
        tracing::debug!("Switched active grammar to {}", name);
        Ok(())
    }

    /// Select `name` on the engine unless its handle is already active.
    /// A theme change invalidates the resolver memo.
    fn activate_theme(&mut self, name: &str, handle: ThemeHandle) -> Result<()> {
        if self.active_theme.as_ref().map(|a| a.handle) == Some(handle) {
            return Ok(());
        }
        self.engine.set_active_theme(handle)?;
        self.active_theme = Some(Active {
            name: name.to_string(),
            handle,
        });
        self.resolver.clear();
        tracing::debug!("Switched active theme to {}", name);
        Ok(())
    }

    fn tokenize(&mut self, code: &str, lang: Option<&str>, theme: Option<&str>) -> Result<Vec<Token>> {
        if code.len() > self.max_input_len {
            return Err(HighlightError::InputTooLarge {
                len: code.len(),
                max: self.max_input_len,
            });
        }

        let grammar_name = lang
            .or(self.cache.default_name(ResourceKind::Grammar))
            .ok_or(HighlightError::NoGrammarSpecified)?
            .to_string();
        let theme_name = theme
            .or(self.cache.default_name(ResourceKind::Theme))
            .ok_or(HighlightError::NoThemeSpecified)?
            .to_string();

        let grammar = self.cache.grammar(&grammar_name)?;
        let theme = self.cache.theme(&theme_name)?;
        self.activate_grammar(&grammar_name, grammar)?;
        self.activate_theme(&theme_name, theme)?;

        let mut tokens = self.engine.tokenize(code)?;
        let engine = &mut self.engine;
        self.resolver
            .resolve_all(&mut tokens, |scope| engine.resolve_scope_style(scope));

        tracing::trace!(
            "Tokenized {} bytes as {} / {}: {} tokens",
            code.len(),
            grammar_name,
            theme_name,
            tokens.len()
        );
        Ok(tokens)
    }

    fn unload(&mut self, kind: ResourceKind, name: &str) -> Result<()> {
        let handle = self.cache.unload(self.engine.as_mut(), kind, name)?;
        match handle {
            ResourceHandle::Grammar(h) => {
                if self.active_grammar.as_ref().is_some_and(|a| a.handle == h) {
                    self.active_grammar = None;
                }
            }
            ResourceHandle::Theme(h) => {
                if self.active_theme.as_ref().is_some_and(|a| a.handle == h) {
                    self.active_theme = None;
                    self.resolver.clear();
                }
            }
        }
        tracing::info!("Unloaded {}: {}", kind, name);
        Ok(())
    }

    fn handle_memory_pressure(&mut self) -> usize {
        let released = self.cache.evict_all(self.engine.as_mut());
        self.active_grammar = None;
        self.active_theme = None;
        self.resolver.clear();
        self.engine.on_memory_warning();
        tracing::info!("Memory pressure: released {} handles", released);
        self.events
            .emit_with(|| SessionEvent::telemetry("memory_warning_handled"));
        released
    }

    /// Publish a failed task as an error event
    fn report(&self, operation: &str, err: &HighlightError) {
        let recoverable = self
            .recovery
            .get(&err.code())
            .copied()
            .unwrap_or_else(|| err.is_recoverable());
        tracing::warn!("{} failed: {}", operation, err);
        self.events
            .emit_with(|| SessionEvent::error(operation, err, recoverable));
    }

    /// Final teardown, run as the last thing on the lane
    fn dispose(&mut self) {
        let released = self.cache.evict_all(self.engine.as_mut());
        self.active_grammar = None;
        self.active_theme = None;
        self.resolver.clear();
        tracing::info!("Session disposed, released {} handles", released);
        self.events
            .emit_with(|| SessionEvent::telemetry("session_disposed"));
    }
}

impl Drop for SessionCore {
    fn drop(&mut self) {
        let released = self.cache.evict_all(self.engine.as_mut());
        if released > 0 {
            tracing::debug!("Released {} handles on drop", released);
        }
    }
}

/// A highlighting session over one tokenizer engine.
///
/// Cheap to share behind an `Arc`: every method takes `&self`.
pub struct HighlightSession {
    lane: SerializedExecutor<SessionCore>,
    events: EventBus,
}

impl HighlightSession {
    /// Start a session; `engine` moves onto the session's lane
    pub fn new<E>(engine: E, config: &SessionConfig) -> Result<Self>
    where
        E: TokenizerEngine + 'static,
    {
        let mut engine: Box<dyn TokenizerEngine> = Box::new(engine);
        engine.set_result_cache_enabled(config.cache_enabled);

        let events = EventBus::new();
        let core = SessionCore {
            engine,
            cache: ResourceCache::new(),
            active_grammar: None,
            active_theme: None,
            resolver: StyleResolver::new(config.style_cache_entries),
            recovery: HashMap::new(),
            max_input_len: config.max_input_len,
            events: events.clone(),
        };

        let lane = SerializedExecutor::spawn("highlight-session", core, config.queue_capacity)
            .map_err(|e| {
                HighlightError::EngineFailure(format!("failed to start session lane: {}", e))
            })?;

        Ok(Self { lane, events })
    }

    /// Submit `func` to the lane, publishing its error (if any) as an event
    fn run<T, F>(&self, operation: &'static str, func: F) -> Pending<T>
    where
        F: FnOnce(&mut SessionCore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.lane.submit(operation, move |core| {
            let result = func(core);
            if let Err(err) = &result {
                core.report(operation, err);
            }
            result
        })
    }

    /// Compile and cache a grammar, and make it the active one.
    /// The first grammar loaded becomes the default.
    pub fn load_grammar(&self, name: impl Into<String>, source: impl Into<String>) -> Pending<GrammarHandle> {
        let (name, source) = (name.into(), source.into());
        self.run("load_grammar", move |core| core.load_grammar(&name, &source))
    }

    /// Compile and cache a theme, and make it the active one.
    /// The first theme loaded becomes the default.
    pub fn load_theme(&self, name: impl Into<String>, source: impl Into<String>) -> Pending<ThemeHandle> {
        let (name, source) = (name.into(), source.into());
        self.run("load_theme", move |core| core.load_theme(&name, &source))
    }

    pub fn set_default_grammar(&self, name: impl Into<String>) -> Pending<()> {
        let name = name.into();
        self.run("set_default_grammar", move |core| {
            core.cache.set_default(ResourceKind::Grammar, &name)
        })
    }

    pub fn set_default_theme(&self, name: impl Into<String>) -> Pending<()> {
        let name = name.into();
        self.run("set_default_theme", move |core| {
            core.cache.set_default(ResourceKind::Theme, &name)
        })
    }

    /// Tokenize `code` with `lang` and `theme`, falling back to the
    /// defaults. Tokens come back with their colors resolved as far as the
    /// theme allows.
    pub fn tokenize(&self, code: impl Into<String>, lang: Option<&str>, theme: Option<&str>) -> Pending<Vec<Token>> {
        let code = code.into();
        let lang = lang.map(str::to_string);
        let theme = theme.map(str::to_string);
        self.run("tokenize", move |core| {
            core.tokenize(&code, lang.as_deref(), theme.as_deref())
        })
    }

    /// Tokenize on the lane, then project on the calling thread.
    ///
    /// Blocks until the tokenize task has run.
    pub fn highlight(
        &self,
        code: &str,
        lang: Option<&str>,
        theme: Option<&str>,
        options: &ProjectOptions,
    ) -> Result<StyledDocument> {
        let tokens = self.tokenize(code, lang, theme).wait()?;
        Ok(projector::project(code, &tokens, options))
    }

    pub fn get_loaded_grammars(&self) -> Pending<Vec<String>> {
        self.run("get_loaded_grammars", |core| {
            Ok(core.cache.list_names(ResourceKind::Grammar))
        })
    }

    pub fn get_loaded_themes(&self) -> Pending<Vec<String>> {
        self.run("get_loaded_themes", |core| {
            Ok(core.cache.list_names(ResourceKind::Theme))
        })
    }

    /// Name of the grammar currently selected on the engine
    pub fn active_grammar(&self) -> Pending<Option<String>> {
        self.run("active_grammar", |core| {
            Ok(core.active_grammar.as_ref().map(|a| a.name.clone()))
        })
    }

    /// Name of the theme currently selected on the engine
    pub fn active_theme(&self) -> Pending<Option<String>> {
        self.run("active_theme", |core| {
            Ok(core.active_theme.as_ref().map(|a| a.name.clone()))
        })
    }

    /// Release one grammar. Clears the default and the active selection
    /// if they pointed at it.
    pub fn unload_grammar(&self, name: impl Into<String>) -> Pending<()> {
        let name = name.into();
        self.run("unload_grammar", move |core| {
            core.unload(ResourceKind::Grammar, &name)
        })
    }

    /// Release one theme. Clears the default and the active selection if
    /// they pointed at it.
    pub fn unload_theme(&self, name: impl Into<String>) -> Pending<()> {
        let name = name.into();
        self.run("unload_theme", move |core| core.unload(ResourceKind::Theme, &name))
    }

    /// Toggle the engine's own result cache
    pub fn set_cache_enabled(&self, enabled: bool) -> Pending<()> {
        self.run("set_cache_enabled", move |core| {
            core.engine.set_result_cache_enabled(enabled);
            tracing::debug!("Engine result cache enabled: {}", enabled);
            Ok(())
        })
    }

    /// Release every cached handle and derived cache. Resolves to the
    /// number of handles released.
    pub fn handle_memory_pressure(&self) -> Pending<usize> {
        self.run("handle_memory_pressure", |core| Ok(core.handle_memory_pressure()))
    }

    /// Register whether errors with `code` should be reported as recoverable
    pub fn add_recovery_strategy(&self, code: u32, can_recover: bool) -> Pending<()> {
        self.run("add_recovery_strategy", move |core| {
            core.recovery.insert(code, can_recover);
            Ok(())
        })
    }

    pub fn has_recovery_strategy(&self, code: u32) -> Pending<bool> {
        self.run("has_recovery_strategy", move |core| {
            Ok(core.recovery.contains_key(&code))
        })
    }

    /// Receive error and telemetry events from now on
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        if self.lane.is_running() {
            SessionState::Ready
        } else {
            SessionState::Disposed
        }
    }

    /// Cancel queued tasks, release every handle and stop the lane.
    ///
    /// A task already running finishes first. Every later call on this
    /// session fails with `SessionDisposed`. Calling it again is a no-op.
    pub fn dispose(&self) {
        self.lane.shutdown(SessionCore::dispose);
    }
}

impl Drop for HighlightSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
