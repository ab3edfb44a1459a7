//! Core parser struct and helper methods.

use crate::ast::*;
use crate::error::ParserError;
use crate::lexer::{Token, TokenKind};
use crate::span::Span;

pub type ParseResult<T> = Result<T, ParserError>;

/// Deepest nesting of expressions and blocks the parser accepts.
pub const MAX_NESTING: usize = 128;

/// Recursive-descent parser for Tern.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) current: usize,
    depth: usize,
}

impl Parser {
    /// `tokens` must end with an `Eof` token, as produced by the scanner.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens = tokens;
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let (pos, line) = tokens
                .last()
                .map(|t| (t.span.end, t.span.line))
                .unwrap_or((0, 1));
            tokens.push(Token::eof(pos, line, 1));
        }
        Self {
            tokens,
            current: 0,
            depth: 0,
        }
    }

    /// Parse a complete program.
    pub fn parse(&mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();

        self.skip_separators();
        while !self.is_at_end() {
            statements.push(self.declaration()?);
            self.skip_separators();
        }

        Ok(Program::new(statements))
    }

    /// Run `parse` one nesting level deeper, failing past `MAX_NESTING`.
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(ParserError::general(
                format!("nesting deeper than {} levels", MAX_NESTING),
                self.peek().span,
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // ===== Token manipulation =====

    pub(crate) fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.tokens[self.current.saturating_sub(1)].clone()
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    pub(crate) fn peek_nth(&self, n: usize) -> &Token {
        let index = (self.current + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        if self.is_at_end() {
            false
        } else {
            std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
        }
    }

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(format!("{}", kind)))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> ParseResult<String> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// `a` or `a.b.c`.
    pub(crate) fn expect_dotted_identifier(&mut self) -> ParseResult<String> {
        let mut name = self.expect_identifier()?;
        while self.check(&TokenKind::Dot)
            && matches!(self.peek_nth(1).kind, TokenKind::Identifier(_))
        {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    /// Consume `end <keyword>`.
    pub(crate) fn expect_end(&mut self, keyword: &TokenKind) -> ParseResult<()> {
        self.expect(&TokenKind::End)?;
        self.expect(keyword)?;
        Ok(())
    }

    pub(crate) fn skip_separators(&mut self) {
        while self.match_token(&TokenKind::Semicolon) {}
    }

    /// True when the next token cannot continue the current statement:
    /// a separator, a block keyword, end of input, or a new line.
    pub(crate) fn at_statement_end(&self) -> bool {
        if self.is_at_end() {
            return true;
        }
        match self.peek().kind {
            TokenKind::Semicolon
            | TokenKind::End
            | TokenKind::Elif
            | TokenKind::Else
            | TokenKind::Catch
            | TokenKind::Finally => true,
            _ => self.peek().span.line != self.previous().span.line,
        }
    }

    pub(crate) fn unexpected(&self, expected: impl Into<String>) -> ParserError {
        if self.is_at_end() {
            return ParserError::UnexpectedEof(self.current_span());
        }
        ParserError::unexpected_token(expected, format!("{}", self.peek().kind), self.current_span())
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn previous_span(&self) -> Span {
        self.previous().span
    }
}
