//! Tokens produced by the tokenizer engine

use serde::{Deserialize, Serialize};

use crate::style::ThemeStyle;

/// A contiguous span of source text with its scope chain and style.
///
/// Offsets are UTF-16 code units into the tokenized text. They are kept
/// signed because they come straight from the engine and are only
/// validated when projected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub start: i64,
    pub length: i64,
    /// Scope chain in the order the engine reported it
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub style: ThemeStyle,
}

impl Token {
    pub fn new(start: i64, length: i64, scopes: Vec<String>, style: ThemeStyle) -> Self {
        Self {
            start,
            length,
            scopes,
            style,
        }
    }

    /// Token with a single scope and no style
    pub fn scoped(start: i64, length: i64, scope: &str) -> Self {
        Self::new(start, length, vec![scope.to_string()], ThemeStyle::default())
    }

    /// Exclusive end offset
    pub fn end(&self) -> i64 {
        self.start.saturating_add(self.length)
    }

    /// Whether the token fits inside a text of `text_len` UTF-16 units
    pub fn is_valid_for(&self, text_len: usize) -> bool {
        self.start >= 0
            && self.length > 0
            && usize::try_from(self.end()).is_ok_and(|end| end <= text_len)
    }
}

/// Length of `text` in UTF-16 code units
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_validity() {
        assert!(Token::scoped(0, 3, "a").is_valid_for(3));
        assert!(!Token::scoped(1, 3, "a").is_valid_for(3));
        assert!(!Token::scoped(-1, 2, "a").is_valid_for(3));
        assert!(!Token::scoped(0, 0, "a").is_valid_for(3));
        assert!(!Token::scoped(i64::MAX, 1, "a").is_valid_for(3));
    }

    #[test]
    fn test_utf16_len_counts_surrogate_pairs() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("é"), 1);
        assert_eq!(utf16_len("🦀"), 2);
    }

    #[test]
    fn test_token_deserializes_from_engine_json() {
        let token: Token =
            serde_json::from_str(r#"{"start":4,"length":2,"scopes":["keyword.control"]}"#)
                .unwrap();
        assert_eq!(token.end(), 6);
        assert_eq!(token.scopes, vec!["keyword.control"]);
        assert!(token.style.color.is_none());
    }
}
