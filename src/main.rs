use std::io::{self, Read, Write};

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use hilite::cli::{CliArgs, OutputFormat, ResourceArg, RunConfig};
use hilite::engine::pattern::PatternEngine;
use hilite::{render, HighlightSession, SessionConfig};

fn read_input(config: &RunConfig) -> Result<String> {
    match &config.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut code = String::new();
            io::stdin()
                .read_to_string(&mut code)
                .context("Failed to read stdin")?;
            Ok(code)
        }
    }
}

fn read_resource(arg: &ResourceArg) -> Result<String> {
    std::fs::read_to_string(&arg.path)
        .with_context(|| format!("Failed to read {} from {}", arg.name, arg.path.display()))
}

fn main() -> Result<()> {
    let config = CliArgs::parse().into_config().map_err(|e| anyhow!(e))?;
    hilite::tracing::init(config.log_level);

    let mut session_config = match &config.config_path {
        Some(path) => SessionConfig::load_from(path).map_err(|e| anyhow!(e))?,
        None => SessionConfig::load(),
    };
    if config.line_numbers {
        session_config.line_numbers.show = true;
    }

    let code = read_input(&config)?;
    let session = HighlightSession::new(PatternEngine::new(), &session_config)?;

    for grammar in &config.grammars {
        let source = read_resource(grammar)?;
        session
            .load_grammar(&grammar.name, source)
            .wait()
            .with_context(|| format!("Failed to load grammar {}", grammar.path.display()))?;
    }
    for theme in &config.themes {
        let source = read_resource(theme)?;
        session
            .load_theme(&theme.name, source)
            .wait()
            .with_context(|| format!("Failed to load theme {}", theme.path.display()))?;
    }

    let document = session.highlight(
        &code,
        config.lang.as_deref(),
        config.theme.as_deref(),
        &session_config.project_options(),
    )?;
    if document.dropped_tokens > 0 {
        tracing::warn!("{} tokens were dropped", document.dropped_tokens);
    }

    let mut stdout = io::stdout().lock();
    match config.format {
        OutputFormat::Ansi => {
            stdout.write_all(render::to_ansi(&document).as_bytes())?;
            if !document.text.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &document)?;
            stdout.write_all(b"\n")?;
        }
    }
    stdout.flush()?;

    session.dispose();
    Ok(())
}
