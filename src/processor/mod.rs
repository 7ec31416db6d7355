//! The language core: lex → parse → interpret.
//!
//! Each stage is a pure function of its inputs and collects problems instead
//! of failing, so a broken block never blanks the rest of the document.
pub mod ast;
pub mod code;
pub mod interpreter;
pub mod lexer;
pub mod symbol;
pub mod template_parser;
pub mod token_stream;

pub use ast::{Node, NodeKind};
pub use interpreter::{Interpretation, Interpreter, interpret};
pub use lexer::{Token, TokenKind, lex, lex_states};
pub use symbol::{Arg, Bindings, Function, Outcome, Symbol};
pub use template_parser::{ParseOutput, parse};

use crate::model::Report;

/// Run the whole pipeline over `source`.
pub fn render(source: &str, bindings: &Bindings) -> Report {
    render_with(source, Interpreter::new(bindings))
}

/// Same as `render`, with a configured interpreter.
pub fn render_with(source: &str, interpreter: Interpreter<'_>) -> Report {
    let tokens = lex(source);
    let parsed = parse(&tokens, source);
    let out = interpreter.interpret(&parsed.root);

    Report {
        result: out.result,
        ranges: out.ranges,
        code: out.code,
        parse_errors: parsed.errors,
        errors: out.errors,
    }
}
