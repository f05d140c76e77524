//! Error taxonomy for highlighting sessions
//!
//! Engines report [`EngineError`]; the session maps those onto
//! [`HighlightError`], which is what callers see.

use std::fmt;

/// Result alias used across the session API
pub type Result<T, E = HighlightError> = std::result::Result<T, E>;

/// Which kind of resource a name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Grammar,
    Theme,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Grammar => write!(f, "grammar"),
            ResourceKind::Theme => write!(f, "theme"),
        }
    }
}

/// Errors surfaced to session callers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HighlightError {
    #[error("invalid grammar '{name}': {message}")]
    InvalidGrammar { name: String, message: String },

    #[error("invalid theme '{name}': {message}")]
    InvalidTheme { name: String, message: String },

    #[error("{kind} not loaded: {name}")]
    UnknownResource { kind: ResourceKind, name: String },

    #[error("no language specified or loaded")]
    NoGrammarSpecified,

    #[error("no theme specified or loaded")]
    NoThemeSpecified,

    #[error("input too large ({len} bytes, max {max})")]
    InputTooLarge { len: usize, max: usize },

    #[error("session has been disposed")]
    SessionDisposed,

    #[error("engine failure: {0}")]
    EngineFailure(String),

    #[error("engine out of memory: {0}")]
    OutOfMemory(String),
}

impl HighlightError {
    /// Stable numeric code, shared with hosts that only see integers
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidGrammar { .. } => 1,
            Self::InvalidTheme { .. } => 2,
            Self::EngineFailure(_) => 4,
            Self::InputTooLarge { .. } => 5,
            Self::OutOfMemory(_) => 7,
            Self::UnknownResource { .. } | Self::NoGrammarSpecified | Self::NoThemeSpecified => 8,
            Self::SessionDisposed => 10,
        }
    }

    /// Whether the session can keep serving requests after this error
    /// when the host has not registered its own policy for the code.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SessionDisposed | Self::OutOfMemory(_))
    }

    /// Short machine-readable name, used in event payloads
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::InvalidGrammar { .. } => "invalid_grammar",
            Self::InvalidTheme { .. } => "invalid_theme",
            Self::UnknownResource { .. } => "unknown_resource",
            Self::NoGrammarSpecified => "no_grammar_specified",
            Self::NoThemeSpecified => "no_theme_specified",
            Self::InputTooLarge { .. } => "input_too_large",
            Self::SessionDisposed => "session_disposed",
            Self::EngineFailure(_) => "engine_failure",
            Self::OutOfMemory(_) => "out_of_memory",
        }
    }

    pub(crate) fn unknown(kind: ResourceKind, name: &str) -> Self {
        Self::UnknownResource {
            kind,
            name: name.to_string(),
        }
    }

    /// Map an engine error raised while compiling a grammar
    pub(crate) fn from_grammar_compile(name: &str, err: EngineError) -> Self {
        match err.kind {
            EngineErrorKind::OutOfMemory => Self::OutOfMemory(err.message),
            EngineErrorKind::Failure => Self::EngineFailure(err.message),
            EngineErrorKind::InvalidGrammar | EngineErrorKind::InvalidTheme => {
                Self::InvalidGrammar {
                    name: name.to_string(),
                    message: err.message,
                }
            }
        }
    }

    /// Map an engine error raised while compiling a theme
    pub(crate) fn from_theme_compile(name: &str, err: EngineError) -> Self {
        match err.kind {
            EngineErrorKind::OutOfMemory => Self::OutOfMemory(err.message),
            EngineErrorKind::Failure => Self::EngineFailure(err.message),
            EngineErrorKind::InvalidGrammar | EngineErrorKind::InvalidTheme => {
                Self::InvalidTheme {
                    name: name.to_string(),
                    message: err.message,
                }
            }
        }
    }
}

impl From<EngineError> for HighlightError {
    fn from(err: EngineError) -> Self {
        match err.kind {
            EngineErrorKind::OutOfMemory => Self::OutOfMemory(err.message),
            _ => Self::EngineFailure(err.message),
        }
    }
}

/// Classification of an engine-side failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    InvalidGrammar,
    InvalidTheme,
    OutOfMemory,
    Failure,
}

/// Error reported by a [`crate::engine::TokenizerEngine`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_grammar(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::InvalidGrammar, message)
    }

    pub fn invalid_theme(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::InvalidTheme, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Failure, message)
    }

    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::OutOfMemory, message)
    }
}
