//! Human-readable output for the terminal.

use crate::model::Report;
use crate::processor::ast::Node;
use crate::processor::lexer::Token;
use std::io::{self, Write};

/// Rendered text, then the code form (if any) after a `---` rule.
pub fn emit(report: &Report, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", report.result)?;
    if let Some(code) = &report.code {
        writeln!(out, "---")?;
        writeln!(out, "{code}")?;
    }
    Ok(())
}

/// One `line:col-line:col: message` per line, parse errors first.
pub fn diagnostics(report: &Report, out: &mut impl Write) -> io::Result<()> {
    for diagnostic in report.diagnostics() {
        writeln!(out, "{diagnostic}")?;
    }
    Ok(())
}

pub fn tokens(tokens: &[Token], source: &str, out: &mut impl Write) -> io::Result<()> {
    let chars: Vec<char> = source.chars().collect();
    for token in tokens {
        writeln!(out, "{} {:?} {:?}", token.range, token.kind, token.text(&chars))?;
    }
    Ok(())
}

pub fn tree(root: &Node, out: &mut impl Write) -> io::Result<()> {
    out.write_all(root.pretty().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Diagnostic, TextRange};
    use crate::processor::lexer::lex;

    fn report() -> Report {
        Report {
            result: "Hi Tom".into(),
            ranges: vec![TextRange::from_coords((0, 0), (0, 3))],
            code: Some("\"Hi \" + name".into()),
            parse_errors: vec![Diagnostic::new(TextRange::from_coords((0, 1), (0, 2)), "missing identifier")],
            errors: vec![Diagnostic::new(TextRange::from_coords((1, 0), (1, 4)), "\"x\" does not exist")],
        }
    }

    #[test]
    fn test_emit_report() {
        let mut out = Vec::new();
        emit(&report(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hi Tom\n---\n\"Hi \" + name\n");

        let mut out = Vec::new();
        let no_code = Report {
            code: None,
            ..report()
        };
        emit(&no_code, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hi Tom\n");
    }

    #[test]
    fn test_diagnostics() {
        let mut out = Vec::new();
        diagnostics(&report(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0:1-0:2: missing identifier\n1:0-1:4: \"x\" does not exist\n"
        );
    }

    #[test]
    fn test_tokens() {
        let src = "a[b]";
        let mut out = Vec::new();
        tokens(&lex(src), src, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0:0-0:1 String \"a\"\n0:1-0:2 BracketOpen \"[\"\n0:2-0:3 Identity \"b\"\n0:3-0:4 BracketClose \"]\"\n"
        );
    }
}
