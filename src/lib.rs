//! hilite - syntax highlighting sessions over a tokenizer engine
//!
//! This crate owns compiled grammar/theme handles, serializes every call
//! into a stateful tokenizer engine, resolves token colors through a scope
//! cascade and projects tokens onto styled text with optional line numbers.

pub mod cli;
pub mod config;
pub mod config_paths;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod projector;
pub mod render;
pub mod session;
pub mod style;
pub mod syntax;
pub mod tracing;

// Re-export commonly used types
pub use config::SessionConfig;
pub use engine::{GrammarHandle, ThemeHandle, TokenizerEngine};
pub use error::{EngineError, EngineErrorKind, HighlightError, ResourceKind, Result};
pub use events::{EventKind, SessionEvent};
pub use executor::{Pending, SerializedExecutor};
pub use projector::{project, ProjectOptions, RunKind, StyleRun, StyledDocument};
pub use session::{HighlightSession, SessionState};
pub use style::ThemeStyle;
pub use syntax::{ResourceCache, StyleResolver, Token};
