//! Recursive-descent parser that turns the token stream into a `Node` tree.
//!
//! The parser never gives up on a document: a broken code block becomes an
//! `Error` node, which is moved into the error list instead of the tree,
//! and parsing resumes after it.

use super::ast::{Node, NodeKind};
use super::lexer::{Token, TokenKind};
use super::token_stream::TokenStream;
use crate::model::{Diagnostic, TextRange};

/// Deepest allowed `[` nesting. Descent is recursive, so this bounds stack use.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub root: Node,
    pub errors: Vec<Diagnostic>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    #[error("missing identifier")]
    MissingIdentifier,

    #[error("missing closing \"]\"")]
    MissingClose,

    #[error("invalid escape sequence \"{0}\"")]
    InvalidEscape(String),

    #[error("unexpected \"{0}\"")]
    Unexpected(String),

    #[error("blocks nested deeper than {MAX_NESTING}")]
    TooDeep,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct SyntaxError {
    pub range: TextRange,
    pub kind: SyntaxErrorKind,
}

impl SyntaxError {
    fn new(range: TextRange, kind: SyntaxErrorKind) -> Self {
        Self { range, kind }
    }

    fn into_node(self) -> Node {
        Node::error(self.range, self.kind.to_string())
    }
}

/// Parse a lexed template. `source` is the text the tokens came from.
pub fn parse(tokens: &[Token], source: &str) -> ParseOutput {
    Parser::new(tokens, source).parse()
}

struct Parser<'t> {
    stream: TokenStream<'t>,
    source: Vec<char>,
    errors: Vec<Diagnostic>,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], source: &str) -> Self {
        Self {
            stream: TokenStream::new(tokens),
            source: source.chars().collect(),
            errors: Vec::new(),
            depth: 0,
        }
    }

    fn parse(mut self) -> ParseOutput {
        if self.stream.eos() {
            return ParseOutput {
                root: Node::string(TextRange::default(), ""),
                errors: Vec::new(),
            };
        }
        let root = self.concat(None);
        ParseOutput {
            root,
            errors: self.errors,
        }
    }

    /// Prose and code blocks. `indent` is set inside a result alternative:
    /// there `|` and `]` end the run and line indentation is trimmed.
    fn concat(&mut self, indent: Option<usize>) -> Node {
        let mut children = Vec::new();

        while let Some(token) = self.stream.current() {
            let node = match token.kind {
                TokenKind::BracketOpen => self.code_block(),
                TokenKind::String
                | TokenKind::Escape
                | TokenKind::Newline
                | TokenKind::Whitespace => self.text(indent.unwrap_or(0)),
                TokenKind::Pipe | TokenKind::BracketClose if indent.is_some() => break,
                _ => {
                    self.stream.advance();
                    self.invalid_token(token).into_node()
                }
            };
            self.collect(&mut children, node);
        }

        match children.len() {
            0 => Node::string(TextRange::at(self.stream.current_range().start), ""),
            1 => children.remove(0),
            _ => {
                let range = TextRange::span(&children[0].range, &children[children.len() - 1].range);
                Node::new(range, NodeKind::Concat(children))
            }
        }
    }

    fn collect(&mut self, children: &mut Vec<Node>, node: Node) {
        match node.kind {
            NodeKind::Error(message) => self.errors.push(Diagnostic::new(node.range, message)),
            _ => children.push(node),
        }
    }

    fn text(&mut self, indent: usize) -> Node {
        let mut value = String::new();
        let mut range: Option<TextRange> = None;

        while let Some(token) = self.stream.current() {
            match token.kind {
                TokenKind::String | TokenKind::Newline => value.extend(token.slice(&self.source)),
                TokenKind::Escape => value.push('['),
                TokenKind::Whitespace => value.extend(token.slice(&self.source).iter().skip(indent)),
                _ => break,
            }
            self.stream.advance();
            range = Some(match range {
                Some(r) => TextRange::span(&r, &token.range),
                None => token.range,
            });
        }

        Node::string(range.unwrap_or_else(|| self.stream.current_range()), value)
    }

    fn code_block(&mut self) -> Node {
        let Some(open) = self.stream.consume(TokenKind::BracketOpen) else {
            return SyntaxError::new(
                self.stream.current_range(),
                SyntaxErrorKind::Unexpected(String::new()),
            )
            .into_node();
        };

        if self.depth >= MAX_NESTING {
            self.synchronize();
            return SyntaxError::new(open.range, SyntaxErrorKind::TooDeep).into_node();
        }

        self.depth += 1;
        let parsed = self.eval();
        self.depth -= 1;

        match parsed {
            Ok(node) => {
                // leave whatever follows for the caller
                if self.stream.consume(TokenKind::BracketClose).is_none() {
                    return SyntaxError::new(open.range, SyntaxErrorKind::MissingClose).into_node();
                }
                node
            }
            Err(err) => {
                self.synchronize();
                err.into_node()
            }
        }
    }

    /// Skip to just past the `]` that closes the current block.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.stream.advance() {
            match token.kind {
                TokenKind::BracketOpen => depth += 1,
                TokenKind::BracketClose if depth == 0 => break,
                TokenKind::BracketClose => depth -= 1,
                _ => {}
            }
        }
    }

    fn eval(&mut self) -> Result<Node, SyntaxError> {
        self.stream.whitespace();

        let identity = self.path()?;
        let args = self.arguments(identity.range);
        let results = self.results(identity.range);

        let end = match (&results.kind, &args.kind) {
            (NodeKind::Results(r), _) if !r.is_empty() => results.range.end,
            (_, NodeKind::Args(a)) if !a.is_empty() => args.range.end,
            _ => identity.range.end,
        };
        let range = TextRange::new(identity.range.start, end);

        Ok(Node::eval(range, identity, args, results))
    }

    /// `a.b.c`, optionally followed by `?`.
    fn path(&mut self) -> Result<Node, SyntaxError> {
        let first = self.segment().ok_or_else(|| {
            SyntaxError::new(self.stream.current_range(), SyntaxErrorKind::MissingIdentifier)
        })?;
        let mut segments = vec![first];

        while let Some(dot) = self.stream.consume(TokenKind::Dot) {
            let seg = self
                .segment()
                .ok_or_else(|| SyntaxError::new(dot.range, SyntaxErrorKind::MissingIdentifier))?;
            segments.push(seg);
        }

        if let Some(question) = self.stream.consume(TokenKind::QuestionMark) {
            let range = TextRange::span(&segments[0].range, &question.range);
            return Ok(Node::new(range, NodeKind::Exists(segments)));
        }
        Ok(Node::retrieve(segments))
    }

    fn segment(&mut self) -> Option<Node> {
        let token = self
            .stream
            .consume(TokenKind::Identity)
            .or_else(|| self.stream.consume(TokenKind::Article))?;
        Some(Node::identity(token.range, token.text(&self.source)))
    }

    fn arguments(&mut self, identity: TextRange) -> Node {
        let mut values = Vec::new();
        while self.stream.whitespace() {
            match self.value() {
                Some(v) => values.push(v),
                None => break,
            }
        }
        list_node(values, identity, NodeKind::Args)
    }

    /// One argument: adjacent String / Dot tokens, numeric if the whole run
    /// parses as a finite number.
    fn value(&mut self) -> Option<Node> {
        let mut text = String::new();
        let mut range: Option<TextRange> = None;

        while let Some(token) = self.stream.current() {
            if !matches!(token.kind, TokenKind::String | TokenKind::Dot) {
                break;
            }
            text.extend(token.slice(&self.source));
            self.stream.advance();
            range = Some(match range {
                Some(r) => TextRange::span(&r, &token.range),
                None => token.range,
            });
        }

        let range = range?;
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(Node::number_literal(range, n, text)),
            _ => Some(Node::string(range, text)),
        }
    }

    fn results(&mut self, identity: TextRange) -> Node {
        let mut alternatives = Vec::new();
        while let Some(pipe) = self.stream.consume(TokenKind::Pipe) {
            let indent = self.indent_of(pipe);
            alternatives.push(self.concat(Some(indent)));
        }
        list_node(alternatives, identity, NodeKind::Results)
    }

    /// Width of the leading whitespace on `token`'s line.
    fn indent_of(&self, token: &Token) -> usize {
        self.source
            .iter()
            .skip(token.offset)
            .take_while(|c| matches!(c, ' ' | '\t'))
            .count()
    }

    fn invalid_token(&self, token: &Token) -> SyntaxError {
        let text = token.text(&self.source);
        let kind = if token.kind == TokenKind::Error && text == "\\" {
            let next = self
                .source
                .get(token.offset + token.range.end.col)
                .filter(|c| **c != '\n');
            match next {
                Some(c) => SyntaxErrorKind::InvalidEscape(format!("\\{c}")),
                None => SyntaxErrorKind::InvalidEscape("\\".to_string()),
            }
        } else {
            SyntaxErrorKind::Unexpected(text)
        };
        SyntaxError::new(token.range, kind)
    }
}

/// `Args` / `Results` node; empty lists sit at the end of the identity.
fn list_node(children: Vec<Node>, identity: TextRange, kind: fn(Vec<Node>) -> NodeKind) -> Node {
    let range = match (children.first(), children.last()) {
        (Some(first), Some(last)) => TextRange::span(&first.range, &last.range),
        _ => TextRange::at(identity.end),
    };
    Node::new(range, kind(children))
}
