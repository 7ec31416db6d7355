//! Machine-readable output (`--json`).

use crate::model::Report;
use crate::processor::ast::Node;
use crate::processor::lexer::Token;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

pub fn emit(report: &Report, out: &mut impl Write) -> Result<()> {
    write_pretty(report, out).with_context(|| "Writing JSON report")
}

#[derive(Serialize)]
struct TokenEntry<'t> {
    #[serde(flatten)]
    token: &'t Token,
    text: String,
}

/// Tokens with their source text attached.
pub fn tokens(tokens: &[Token], source: &str, out: &mut impl Write) -> Result<()> {
    let chars: Vec<char> = source.chars().collect();
    let entries: Vec<TokenEntry> = tokens
        .iter()
        .map(|token| TokenEntry {
            token,
            text: token.text(&chars),
        })
        .collect();
    write_pretty(&entries, out).with_context(|| "Writing JSON tokens")
}

pub fn tree(root: &Node, out: &mut impl Write) -> Result<()> {
    write_pretty(root, out).with_context(|| "Writing JSON tree")
}

fn write_pretty<T: Serialize + ?Sized>(value: &T, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
