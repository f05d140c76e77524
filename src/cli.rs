//! Command-line argument parsing for the highlighter
//!
//! Supports:
//! - Loading any number of grammars and themes as `NAME=PATH`
//! - Picking the language and theme (defaults to the first loaded)
//! - Line numbers and JSON output

use clap::Parser;
use std::path::PathBuf;

/// Highlight a source file in the terminal
#[derive(Parser, Debug)]
#[command(name = "hilite", version, about = "Highlight source code in the terminal")]
pub struct CliArgs {
    /// File to highlight (`-` for stdin)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Grammar to load, as NAME=PATH (repeatable)
    #[arg(short = 'g', long = "grammar", value_name = "NAME=PATH")]
    pub grammars: Vec<String>,

    /// Theme to load, as NAME=PATH (repeatable)
    #[arg(short = 't', long = "theme", value_name = "NAME=PATH")]
    pub themes: Vec<String>,

    /// Language to highlight with (defaults to the first grammar)
    #[arg(short = 'l', long, value_name = "NAME")]
    pub lang: Option<String>,

    /// Theme to highlight with (defaults to the first theme)
    #[arg(long = "theme-name", value_name = "NAME")]
    pub theme_name: Option<String>,

    /// Prefix every line with its number
    #[arg(short = 'n', long)]
    pub line_numbers: bool,

    /// Print the styled document as JSON instead of ANSI text
    #[arg(long)]
    pub json: bool,

    /// Config file (defaults to ~/.config/hilite/config.yaml)
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// A `NAME=PATH` resource argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceArg {
    pub name: String,
    pub path: PathBuf,
}

impl ResourceArg {
    pub fn parse(arg: &str) -> Result<Self, String> {
        let (name, path) = arg
            .split_once('=')
            .ok_or_else(|| format!("Expected NAME=PATH, got '{}'", arg))?;
        let name = name.trim();
        if name.is_empty() || path.is_empty() {
            return Err(format!("Expected NAME=PATH, got '{}'", arg));
        }
        Ok(Self {
            name: name.to_string(),
            path: PathBuf::from(path),
        })
    }
}

/// How output is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Ansi,
    Json,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// `None` reads stdin
    pub input: Option<PathBuf>,
    pub grammars: Vec<ResourceArg>,
    pub themes: Vec<ResourceArg>,
    pub lang: Option<String>,
    pub theme: Option<String>,
    /// Overrides the config file when set
    pub line_numbers: bool,
    pub format: OutputFormat,
    pub config_path: Option<PathBuf>,
    pub log_level: &'static str,
}

impl CliArgs {
    /// Convert parsed CLI args into a run configuration
    pub fn into_config(self) -> Result<RunConfig, String> {
        let grammars = self
            .grammars
            .iter()
            .map(|g| ResourceArg::parse(g))
            .collect::<Result<Vec<_>, _>>()?;
        let themes = self
            .themes
            .iter()
            .map(|t| ResourceArg::parse(t))
            .collect::<Result<Vec<_>, _>>()?;

        if grammars.is_empty() {
            return Err("At least one --grammar NAME=PATH is required".to_string());
        }
        if themes.is_empty() {
            return Err("At least one --theme NAME=PATH is required".to_string());
        }

        let input = if self.file.as_os_str() == "-" {
            None
        } else {
            Some(self.file)
        };

        Ok(RunConfig {
            input,
            grammars,
            themes,
            lang: self.lang,
            theme: self.theme_name,
            line_numbers: self.line_numbers,
            format: if self.json {
                OutputFormat::Json
            } else {
                OutputFormat::Ansi
            },
            config_path: self.config,
            log_level: if self.verbose { "debug" } else { "warn" },
        })
    }
}
