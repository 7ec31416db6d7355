//! Hand-written, single-pass lexer for the template language.
//!
//! Plain prose is the default; `[` switches into a code block. Inside a
//! block the text before the first `|` is the identity/argument zone and
//! everything after a `|` is a result, which may hold prose and further
//! blocks. Which characters split tokens depends on that zone, so the lexer
//! keeps a small stack of `CodeState`s instead of using regexes.
//
//  Grammar excerpts (informal):
//
//      text     ::= (prose | '\[' | block)*
//      block    ::= '[' ws? identity ('.' identity)* '?'? (ws value)* ('|' result)* ']'
//      result   ::= (prose-without-'|]' | block)*
//
//  Lexical items:
//
//      Identity ::= anything up to ws . ? | ] newline
//      String   ::= prose run, or one argument chunk (split on ws . | ])
//      Escape   ::= '\['
//      Article  ::= 'an' | 'An'   (only when directly followed by ']')
//
//  Every call to `next_token` consumes at least one char, so the scan always
//  terminates; characters nothing else accepts come out as `Error` tokens.

use crate::model::{TextPosition, TextRange};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    String,
    Escape, // '\['
    BracketOpen,
    BracketClose,
    Pipe,
    Dot,
    QuestionMark,
    Whitespace,
    Identity,
    Article,
    Newline,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
    /// Char offset of the start of the token's line. Tokens never span
    /// lines, so `offset + col` indexes straight into the source.
    pub offset: usize,
}

impl Token {
    /// The chars this token covers in `source`.
    pub fn slice<'s>(&self, source: &'s [char]) -> &'s [char] {
        let start = self.offset + self.range.start.col;
        let end = self.offset + self.range.end.col;
        source.get(start..end).unwrap_or(&[])
    }

    pub fn text(&self, source: &[char]) -> String {
        self.slice(source).iter().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CodeState {
    Text,
    CodeStart,
    Identity,
    Arguments,
    Results,
}

/// Snapshot of the lexer after producing one token. Used by editor tooling
/// (syntax colouring needs to know which zone a token was lexed in).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LexerState {
    pub token: Token,
    pub text: String,
    pub stack: Vec<CodeState>,
    pub begin_newline: bool,
}

#[derive(Clone)]
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    offset: usize,
    stack: Vec<CodeState>,
    begin_newline: bool,
}

/// Tokenize the whole of `text`.
pub fn lex(text: &str) -> Vec<Token> {
    Lexer::new(text).collect()
}

/// Tokenize `text`, recording the lexer state after every token.
pub fn lex_states(text: &str) -> Vec<LexerState> {
    let mut lexer = Lexer::new(text);
    let mut states = Vec::new();
    while let Some(token) = lexer.next_token() {
        states.push(LexerState {
            token,
            text: token.text(&lexer.chars),
            stack: lexer.stack.clone(),
            begin_newline: lexer.begin_newline,
        });
    }
    states
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 0,
            offset: 0,
            stack: vec![CodeState::Text],
            begin_newline: false,
        }
    }

    pub fn next_token(&mut self) -> Option<Token> {
        if self.pos >= self.chars.len() {
            return None;
        }

        let start = self.pos;
        let mut kind = self.tokenize();

        // force progress when nothing matched
        if self.pos == start {
            self.pos += 1;
            kind = TokenKind::Error;
        }

        let token = Token {
            kind,
            range: TextRange::new(
                TextPosition::new(self.line, start - self.offset),
                TextPosition::new(self.line, self.pos - self.offset),
            ),
            offset: self.offset,
        };

        if kind == TokenKind::Newline {
            self.line += 1;
            self.offset = self.pos;
        }

        Some(token)
    }

    fn state(&self) -> CodeState {
        self.stack.last().copied().unwrap_or(CodeState::Text)
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Spaces and tabs.
    fn eat_blanks(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek_char(), Some(' ' | '\t')) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn eat_until(&mut self, stops: &[char]) -> bool {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if stops.contains(&c) {
                break;
            }
            self.pos += 1;
        }
        self.pos > start
    }

    fn at_article(&self) -> bool {
        matches!(
            self.chars.get(self.pos..self.pos + 3),
            Some(['a' | 'A', 'n', ']'])
        )
    }

    /// `]` closes the innermost block: drop frames up to and including the
    /// `CodeStart` that opened it.
    fn close_block(&mut self) -> TokenKind {
        match self.stack.iter().rposition(|s| *s == CodeState::CodeStart) {
            Some(idx) => {
                self.stack.truncate(idx);
                TokenKind::BracketClose
            }
            None => TokenKind::Error,
        }
    }

    fn tokenize(&mut self) -> TokenKind {
        // indentation run at the start of a prose line
        if self.begin_newline {
            self.begin_newline = false;
            if matches!(self.state(), CodeState::Text | CodeState::Results) && self.eat_blanks() {
                return TokenKind::Whitespace;
            }
        }

        if self.eat('\n') {
            self.begin_newline = true;
            if self.state() == CodeState::Identity {
                self.stack.push(CodeState::Arguments);
            }
            return TokenKind::Newline;
        }
        if self.eat('\\') {
            if self.eat('[') {
                return TokenKind::Escape;
            }
            return TokenKind::Error;
        }

        match self.state() {
            CodeState::Text => {
                if self.eat('[') {
                    self.stack.push(CodeState::CodeStart);
                    return TokenKind::BracketOpen;
                }
                if self.eat_until(&['[', '\n', '\\']) {
                    return TokenKind::String;
                }
            }
            CodeState::Results => {
                if self.eat('[') {
                    self.stack.push(CodeState::CodeStart);
                    return TokenKind::BracketOpen;
                }
                if self.eat('|') {
                    return TokenKind::Pipe;
                }
                if self.eat(']') {
                    return self.close_block();
                }
                if self.eat_until(&['[', ']', '|', '\n', '\\']) {
                    return TokenKind::String;
                }
            }
            CodeState::CodeStart => {
                if self.eat_blanks() {
                    return TokenKind::Whitespace;
                }
                self.stack.push(CodeState::Identity);
                return self.identity();
            }
            CodeState::Identity => return self.identity(),
            CodeState::Arguments => {
                if self.eat_blanks() {
                    return TokenKind::Whitespace;
                }
                if self.eat('.') {
                    return TokenKind::Dot;
                }
                if self.eat('|') {
                    self.stack.push(CodeState::Results);
                    return TokenKind::Pipe;
                }
                if self.eat(']') {
                    return self.close_block();
                }
                if self.eat_until(&[' ', '\t', '\n', '.', '|', ']']) {
                    return TokenKind::String;
                }
            }
        }

        TokenKind::Error
    }

    fn identity(&mut self) -> TokenKind {
        if self.eat_blanks() {
            self.stack.push(CodeState::Arguments);
            return TokenKind::Whitespace;
        }
        if self.eat('.') {
            return TokenKind::Dot;
        }
        if self.eat('?') {
            return TokenKind::QuestionMark;
        }
        if self.eat('|') {
            self.stack.push(CodeState::Results);
            return TokenKind::Pipe;
        }
        if self.eat(']') {
            return self.close_block();
        }
        if self.at_article() {
            self.pos += 2;
            return TokenKind::Article;
        }
        if self.eat_until(&[' ', '\t', '\n', '.', '?', '|', ']']) {
            return TokenKind::Identity;
        }
        TokenKind::Error
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
