//! Syntax data and the pieces of a session that own it
//!
//! - [`Token`]: engine output, offsets in UTF-16 code units
//! - [`ResourceCache`]: name -> grammar/theme handle table
//! - [`StyleResolver`]: scope cascade for tokens without a color
//!
//! ## Data flow
//!
//! ```text
//! load_grammar/load_theme → ResourceCache (compile + register)
//! tokenize → engine tokens → StyleResolver (fill colors) → projector
//! ```

mod cache;
mod resolver;
mod token;

pub use cache::{ResourceCache, ResourceHandle};
pub use resolver::StyleResolver;
pub use token::{utf16_len, Token};
