pub mod cli;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::path::Path;

use cli::{Cli, Command};
use processor::{Bindings, Interpreter};

pub fn run() -> anyhow::Result<()> {
    let args = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Render {
            template,
            bindings,
            json,
            no_code,
        } => {
            // 1. ── Load ───────────────────────────────────────────────────
            let source = read_source(&template)?;
            let bindings = match &bindings {
                Some(path) => {
                    let text = std::fs::read_to_string(path)
                        .with_context(|| format!("Reading {}", path.display()))?;
                    parser::load_bindings(&text)
                        .with_context(|| format!("Loading bindings from {}", path.display()))?
                }
                None => Bindings::new(),
            };

            // 2. ── Render ─────────────────────────────────────────────────
            let mut interpreter = Interpreter::new(&bindings);
            if no_code {
                interpreter = interpreter.without_code();
            }
            let report = processor::render_with(&source, interpreter);

            // 3. ── Write outputs ──────────────────────────────────────────
            if json {
                writer::json::emit(&report, &mut out)?;
            } else {
                writer::text::emit(&report, &mut out).with_context(|| "Writing report")?;
                writer::text::diagnostics(&report, &mut std::io::stderr())
                    .with_context(|| "Writing diagnostics")?;
            }
            if report.has_errors() {
                eprintln!(
                    "{} parse error(s), {} render error(s)",
                    report.parse_errors.len(),
                    report.errors.len()
                );
            }
        }
        Command::Tokens { template, json } => {
            let source = read_source(&template)?;
            let tokens = processor::lex(&source);
            if json {
                writer::json::tokens(&tokens, &source, &mut out)?;
            } else {
                writer::text::tokens(&tokens, &source, &mut out).with_context(|| "Writing tokens")?;
            }
        }
        Command::Tree { template, json } => {
            let source = read_source(&template)?;
            let parsed = processor::parse(&processor::lex(&source), &source);
            if json {
                writer::json::tree(&parsed.root, &mut out)?;
            } else {
                writer::text::tree(&parsed.root, &mut out).with_context(|| "Writing tree")?;
            }
            for error in &parsed.errors {
                eprintln!("{error}");
            }
        }
    }

    Ok(())
}

/// Template text from a file, or stdin for `-`.
fn read_source(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .with_context(|| "Reading template from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))
}
