//! Tokenizer engine contract
//!
//! The engine compiles grammars and themes, keeps a single active
//! grammar/theme pair and tokenizes text against it. It is not
//! request-scoped, which is why every call into it goes through the
//! session's serialized lane.
//!
//! [`pattern::PatternEngine`] is a small regex-backed implementation used
//! by the command-line tool and the end-to-end tests.

pub mod pattern;

use crate::error::EngineError;
use crate::style::ThemeStyle;
use crate::syntax::Token;

/// Opaque reference to a grammar compiled by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrammarHandle(u64);

impl GrammarHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Opaque reference to a theme compiled by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThemeHandle(u64);

impl ThemeHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Native tokenizer consumed by a highlighting session.
///
/// Implementations only need to be `Send`: the session moves the engine
/// onto its worker thread and never touches it from anywhere else.
pub trait TokenizerEngine: Send {
    fn compile_grammar(
        &mut self,
        name: &str,
        scope_name: &str,
        source: &str,
    ) -> Result<GrammarHandle, EngineError>;

    fn compile_theme(&mut self, name: &str, source: &str) -> Result<ThemeHandle, EngineError>;

    fn set_active_grammar(&mut self, handle: GrammarHandle) -> Result<(), EngineError>;

    fn set_active_theme(&mut self, handle: ThemeHandle) -> Result<(), EngineError>;

    /// Tokenize with the active grammar and theme
    fn tokenize(&mut self, text: &str) -> Result<Vec<Token>, EngineError>;

    /// Look up the style the active theme assigns to a scope string.
    /// An empty style means no rule matched.
    fn resolve_scope_style(&mut self, scope: &str) -> Result<ThemeStyle, EngineError>;

    fn release_grammar(&mut self, handle: GrammarHandle);

    fn release_theme(&mut self, handle: ThemeHandle);

    fn set_result_cache_enabled(&mut self, enabled: bool);

    fn on_memory_warning(&mut self);
}

impl<E: TokenizerEngine + ?Sized> TokenizerEngine for Box<E> {
    fn compile_grammar(
        &mut self,
        name: &str,
        scope_name: &str,
        source: &str,
    ) -> Result<GrammarHandle, EngineError> {
        (**self).compile_grammar(name, scope_name, source)
    }

    fn compile_theme(&mut self, name: &str, source: &str) -> Result<ThemeHandle, EngineError> {
        (**self).compile_theme(name, source)
    }

    fn set_active_grammar(&mut self, handle: GrammarHandle) -> Result<(), EngineError> {
        (**self).set_active_grammar(handle)
    }

    fn set_active_theme(&mut self, handle: ThemeHandle) -> Result<(), EngineError> {
        (**self).set_active_theme(handle)
    }

    fn tokenize(&mut self, text: &str) -> Result<Vec<Token>, EngineError> {
        (**self).tokenize(text)
    }

    fn resolve_scope_style(&mut self, scope: &str) -> Result<ThemeStyle, EngineError> {
        (**self).resolve_scope_style(scope)
    }

    fn release_grammar(&mut self, handle: GrammarHandle) {
        (**self).release_grammar(handle)
    }

    fn release_theme(&mut self, handle: ThemeHandle) {
        (**self).release_theme(handle)
    }

    fn set_result_cache_enabled(&mut self, enabled: bool) {
        (**self).set_result_cache_enabled(enabled)
    }

    fn on_memory_warning(&mut self) {
        (**self).on_memory_warning()
    }
}
