//! Lookahead-1 cursor over a lexed token slice.

use super::lexer::{Token, TokenKind};
use crate::model::TextRange;

pub struct TokenStream<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenStream<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn eos(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    pub fn last(&self) -> Option<&'t Token> {
        self.tokens.last()
    }

    /// Range of the current token, or a zero-width range just past the last
    /// token once the stream is exhausted.
    pub fn current_range(&self) -> TextRange {
        match (self.current(), self.last()) {
            (Some(token), _) => token.range,
            (None, Some(last)) => TextRange::at(last.range.end),
            (None, None) => TextRange::default(),
        }
    }

    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    pub fn matches(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    /// Consume the current token if it is of `kind`.
    pub fn consume(&mut self, kind: TokenKind) -> Option<&'t Token> {
        let token = self.current().filter(|t| t.kind == kind)?;
        self.pos += 1;
        Some(token)
    }

    /// Consume the current token whatever it is.
    pub fn advance(&mut self) -> Option<&'t Token> {
        let token = self.current()?;
        self.pos += 1;
        Some(token)
    }

    /// Skip whitespace and newlines; true if anything was skipped.
    pub fn whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Whitespace | TokenKind::Newline)
        ) {
            self.pos += 1;
        }
        self.pos > start
    }
}
