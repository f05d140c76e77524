//! Visual styles attached to tokens and style runs

use serde::{Deserialize, Serialize};

/// Style of a token as reported by the engine or resolved from a theme.
///
/// `color` and `background_color` being `None` means "unresolved"; the
/// presentation layer decides what that looks like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl ThemeStyle {
    /// Style with only a foreground color
    pub fn with_color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }

    /// True when a foreground color is present and non-blank
    pub fn has_color(&self) -> bool {
        self.color.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// True when nothing at all is set
    pub fn is_empty(&self) -> bool {
        !self.has_color()
            && self.background_color.is_none()
            && !self.bold
            && !self.italic
            && !self.underline
    }

    /// Apply a TextMate `fontStyle` string ("bold italic underline")
    pub fn apply_font_style(&mut self, font_style: &str) {
        for part in font_style.split_whitespace() {
            match part {
                "bold" => self.bold = true,
                "italic" => self.italic = true,
                "underline" => self.underline = true,
                _ => {}
            }
        }
    }
}

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color from RGB values (alpha defaults to 255)
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse from "#RGB", "#RRGGBB" or "#RRGGBBAA" hex string
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let s = s.trim().trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| {
            s.get(range)
                .ok_or_else(|| format!("Invalid color format: {}", s))
                .and_then(|hex| u8::from_str_radix(hex, 16).map_err(|e| e.to_string()))
        };
        match s.len() {
            3 => {
                let short = |i: usize| channel(i..i + 1).map(|v| v * 17);
                Ok(Color::rgb(short(0)?, short(1)?, short(2)?))
            }
            6 => Ok(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Color {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
                a: channel(6..8)?,
            }),
            _ => Err(format!("Invalid color format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex_6() {
        let color = Color::from_hex("#1E1E1E").unwrap();
        assert_eq!(color, Color::rgb(0x1E, 0x1E, 0x1E));
        assert_eq!(color.a, 255);
    }

    #[test]
    fn test_color_from_hex_8_and_3() {
        let color = Color::from_hex("#1E1E1E80").unwrap();
        assert_eq!(color.a, 0x80);

        let color = Color::from_hex("#fa0").unwrap();
        assert_eq!(color, Color::rgb(0xFF, 0xAA, 0x00));
    }

    #[test]
    fn test_color_from_hex_rejects_garbage() {
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#GGGGGG").is_err());
        assert!(Color::from_hex("#ééé").is_err());
    }

    #[test]
    fn test_unresolved_style_is_not_white() {
        let style = ThemeStyle::default();
        assert!(!style.has_color());
        assert!(style.is_empty());
        assert!(!ThemeStyle::with_color("  ").has_color());
    }

    #[test]
    fn test_apply_font_style() {
        let mut style = ThemeStyle::default();
        style.apply_font_style("bold underline");
        assert!(style.bold && style.underline && !style.italic);
    }

    #[test]
    fn test_style_serializes_camel_case_without_unset_colors() {
        let style = ThemeStyle {
            background_color: Some("#000000".into()),
            ..ThemeStyle::default()
        };
        let json = serde_json::to_value(&style).unwrap();
        assert_eq!(json["backgroundColor"], "#000000");
        assert!(json.get("color").is_none());
    }
}
