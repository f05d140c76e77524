//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use hilite::{
    EngineError, GrammarHandle, HighlightSession, SessionConfig, ThemeHandle, ThemeStyle, Token,
    TokenizerEngine,
};

pub const RUST_GRAMMAR: &str = include_str!("../../samples/grammars/rust.json");
pub const TOML_GRAMMAR: &str = include_str!("../../samples/grammars/toml.json");
pub const DRACULA_THEME: &str = include_str!("../../samples/themes/dracula.json");
pub const LIGHT_THEME: &str = include_str!("../../samples/themes/github-light.json");

/// Source that [`RecordingEngine`] refuses to compile
pub const INVALID_SOURCE: &str = "invalid";

/// What the engine saw, shared between the test and the session's lane
#[derive(Debug, Default)]
pub struct Probe {
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_tokenize: AtomicBool,
}

impl Probe {
    /// Every engine call so far, as `method` or `method:arg`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose method name is `method`
    pub fn calls_to(&self, method: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(':').next() == Some(method))
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls_to(method).len()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Highest number of engine calls ever observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_fail_tokenize(&self, fail: bool) {
        self.fail_tokenize.store(fail, Ordering::SeqCst);
    }

    fn enter(&self, call: String) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call);
        InFlight(self)
    }
}

struct InFlight<'a>(&'a Probe);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scriptable engine that records every call it receives
pub struct RecordingEngine {
    probe: Arc<Probe>,
    next_handle: u64,
    scope_colors: HashMap<String, String>,
    tokens: Vec<Token>,
    delay: Duration,
}

impl RecordingEngine {
    pub fn new() -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let engine = Self {
            probe: Arc::clone(&probe),
            next_handle: 0,
            scope_colors: HashMap::new(),
            tokens: Vec::new(),
            delay: Duration::ZERO,
        };
        (engine, probe)
    }

    /// `resolve_scope_style(scope)` returns `color`
    pub fn with_scope_color(mut self, scope: &str, color: &str) -> Self {
        self.scope_colors.insert(scope.to_string(), color.to_string());
        self
    }

    /// Tokens returned by every `tokenize` call
    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Sleep inside every tokenize call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl TokenizerEngine for RecordingEngine {
    fn compile_grammar(
        &mut self,
        name: &str,
        _scope_name: &str,
        source: &str,
    ) -> Result<GrammarHandle, EngineError> {
        let probe = Arc::clone(&self.probe);
        let _guard = probe.enter(format!("compile_grammar:{}", name));
        if source == INVALID_SOURCE {
            return Err(EngineError::invalid_grammar("rejected"));
        }
        Ok(GrammarHandle::new(self.allocate()))
    }

    fn compile_theme(&mut self, name: &str, source: &str) -> Result<ThemeHandle, EngineError> {
        let probe = Arc::clone(&self.probe);
        let _guard = probe.enter(format!("compile_theme:{}", name));
        if source == INVALID_SOURCE {
            return Err(EngineError::invalid_theme("rejected"));
        }
        Ok(ThemeHandle::new(self.allocate()))
    }

    fn set_active_grammar(&mut self, handle: GrammarHandle) -> Result<(), EngineError> {
        let _guard = self
            .probe
            .enter(format!("set_active_grammar:{}", handle.raw()));
        Ok(())
    }

    fn set_active_theme(&mut self, handle: ThemeHandle) -> Result<(), EngineError> {
        let _guard = self.probe.enter(format!("set_active_theme:{}", handle.raw()));
        Ok(())
    }

    fn tokenize(&mut self, text: &str) -> Result<Vec<Token>, EngineError> {
        let _guard = self.probe.enter(format!("tokenize:{}", text));
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.probe.fail_tokenize.load(Ordering::SeqCst) {
            return Err(EngineError::failure("scripted failure"));
        }
        Ok(self.tokens.clone())
    }

    fn resolve_scope_style(&mut self, scope: &str) -> Result<ThemeStyle, EngineError> {
        let _guard = self.probe.enter(format!("resolve_scope_style:{}", scope));
        if scope == "boom" {
            return Err(EngineError::failure("lookup exploded"));
        }
        Ok(self
            .scope_colors
            .get(scope)
            .map(ThemeStyle::with_color)
            .unwrap_or_default())
    }

    fn release_grammar(&mut self, handle: GrammarHandle) {
        let _guard = self.probe.enter(format!("release_grammar:{}", handle.raw()));
    }

    fn release_theme(&mut self, handle: ThemeHandle) {
        let _guard = self.probe.enter(format!("release_theme:{}", handle.raw()));
    }

    fn set_result_cache_enabled(&mut self, enabled: bool) {
        let _guard = self
            .probe
            .enter(format!("set_result_cache_enabled:{}", enabled));
    }

    fn on_memory_warning(&mut self) {
        let _guard = self.probe.enter("on_memory_warning".to_string());
    }
}

/// Session over a fresh [`RecordingEngine`] with default config
pub fn recording_session() -> (HighlightSession, Arc<Probe>) {
    let (engine, probe) = RecordingEngine::new();
    session_with(engine, probe)
}

pub fn session_with(engine: RecordingEngine, probe: Arc<Probe>) -> (HighlightSession, Arc<Probe>) {
    let session = HighlightSession::new(engine, &SessionConfig::default()).unwrap();
    (session, probe)
}

/// Load a grammar and a theme and wait for both
pub fn load_basics(session: &HighlightSession, grammar: &str, theme: &str) {
    session.load_grammar(grammar, "grammar").wait().unwrap();
    session.load_theme(theme, "theme").wait().unwrap();
}

/// Token without style carrying `scopes`
pub fn unstyled(start: i64, length: i64, scopes: &[&str]) -> Token {
    Token::new(
        start,
        length,
        scopes.iter().map(|s| s.to_string()).collect(),
        ThemeStyle::default(),
    )
}
