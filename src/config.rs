//! Session configuration
//!
//! Stored as YAML in `~/.config/hilite/config.yaml`. Every field has a
//! default, so a partial (or missing) file is fine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::executor::DEFAULT_QUEUE_CAPACITY;
use crate::projector::ProjectOptions;
use crate::style::ThemeStyle;

/// Largest input accepted by `tokenize`, in bytes (10 MiB)
pub const DEFAULT_MAX_INPUT_LEN: usize = 10 * 1024 * 1024;

/// Memoized scope lookups kept per theme
pub const DEFAULT_STYLE_CACHE_ENTRIES: usize = 1000;

/// Configuration for a highlighting session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Forwarded to the engine's result cache on session start
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Tasks that may wait on the session lane before submitters block
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Largest accepted input for `tokenize`, in bytes
    #[serde(default = "default_max_input_len")]
    pub max_input_len: usize,

    /// Scope lookups memoized by the style resolver (0 disables)
    #[serde(default = "default_style_cache_entries")]
    pub style_cache_entries: usize,

    #[serde(default)]
    pub line_numbers: LineNumberConfig,
}

/// Line-number gutter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineNumberConfig {
    #[serde(default)]
    pub show: bool,

    /// Text between the number and the line content
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Gutter foreground color
    #[serde(default = "default_gutter_color")]
    pub color: String,
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_max_input_len() -> usize {
    DEFAULT_MAX_INPUT_LEN
}

fn default_style_cache_entries() -> usize {
    DEFAULT_STYLE_CACHE_ENTRIES
}

fn default_separator() -> String {
    " | ".to_string()
}

fn default_gutter_color() -> String {
    "#6272A4".to_string()
}

impl Default for LineNumberConfig {
    fn default() -> Self {
        Self {
            show: false,
            separator: default_separator(),
            color: default_gutter_color(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_input_len: DEFAULT_MAX_INPUT_LEN,
            style_cache_entries: DEFAULT_STYLE_CACHE_ENTRIES,
            line_numbers: LineNumberConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load config from the user config dir, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("{}", e);
                Self::default()
            }
        }
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
        Self::from_yaml(&content)
            .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
    }

    /// Save config to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Projection options derived from the line-number settings
    pub fn project_options(&self) -> ProjectOptions {
        ProjectOptions {
            show_line_numbers: self.line_numbers.show,
            gutter_separator: self.line_numbers.separator.clone(),
            gutter_style: ThemeStyle::with_color(self.line_numbers.color.clone()),
        }
    }
}
