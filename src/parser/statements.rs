//! Statement parsing: if, while, for, try, return, assignments.

use crate::ast::*;
use crate::error::ParserError;
use crate::lexer::TokenKind;

use super::core::{ParseResult, Parser};

impl Parser {
    pub(crate) fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Return => self.return_statement(),
            TokenKind::Break => {
                let span = self.advance().span;
                Ok(Stmt::new(StmtKind::Break, span))
            }
            TokenKind::Continue => {
                let span = self.advance().span;
                Ok(Stmt::new(StmtKind::Continue, span))
            }
            TokenKind::Try => self.try_statement(),
            TokenKind::Throw => {
                let start_span = self.advance().span;
                let value = self.expression()?;
                let span = start_span.merge(value.span);
                Ok(Stmt::new(StmtKind::Throw(value), span))
            }
            TokenKind::Do => {
                let start_span = self.advance().span;
                let body = self.block()?;
                self.expect(&TokenKind::End)?;
                let span = start_span.merge(self.previous_span());
                Ok(Stmt::new(StmtKind::Block(body), span))
            }
            _ => self.expression_statement(),
        }
    }

    /// Parse declarations until a block-closing keyword (`end`, `elif`,
    /// `else`, `catch`, `finally`) or end of input.
    pub(crate) fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.nested(|parser| {
            let mut statements = Vec::new();
            parser.skip_separators();
            while !parser.is_at_end() && !parser.at_block_close() {
                statements.push(parser.declaration()?);
                parser.skip_separators();
            }
            Ok(statements)
        })
    }

    fn at_block_close(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::End
                | TokenKind::Elif
                | TokenKind::Else
                | TokenKind::Catch
                | TokenKind::Finally
        )
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        self.advance(); // `if` or `elif`
        let stmt = self.if_chain(start_span)?;
        self.expect_end(&TokenKind::If)?;
        Ok(stmt)
    }

    /// The condition and branches after `if`/`elif`; `elif` nests in the
    /// else branch. Does not consume the closing `end if`.
    fn if_chain(&mut self, start_span: crate::span::Span) -> ParseResult<Stmt> {
        let condition = self.expression()?;
        self.expect(&TokenKind::Then)?;
        let then_branch = self.block()?;

        let else_branch = if self.check(&TokenKind::Elif) {
            let elif_span = self.advance().span;
            Some(vec![self.if_chain(elif_span)?])
        } else if self.match_token(&TokenKind::Else) {
            Some(self.block()?)
        } else {
            None
        };

        let span = start_span.merge(self.previous_span());
        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span,
        ))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        self.expect(&TokenKind::While)?;
        let condition = self.expression()?;
        self.expect(&TokenKind::Do)?;
        let body = self.block()?;
        self.expect_end(&TokenKind::While)?;

        let span = start_span.merge(self.previous_span());
        Ok(Stmt::new(StmtKind::While { condition, body }, span))
    }

    /// `for [each] x in xs do ... end for` or `for i in a .. b do ... end for`.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        self.expect(&TokenKind::For)?;
        self.match_token(&TokenKind::Each);
        let variable = self.expect_identifier()?;
        self.expect(&TokenKind::In)?;
        let first = self.expression()?;

        let range_end = if self.match_token(&TokenKind::DotDot) {
            Some(self.expression()?)
        } else {
            None
        };

        self.expect(&TokenKind::Do)?;
        let body = self.block()?;
        self.expect_end(&TokenKind::For)?;

        let span = start_span.merge(self.previous_span());
        let kind = match range_end {
            Some(end) => StmtKind::ForRange {
                variable,
                start: first,
                end,
                body,
            },
            None => StmtKind::ForEach {
                variable,
                iterable: first,
                body,
            },
        };
        Ok(Stmt::new(kind, span))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        self.expect(&TokenKind::Return)?;

        let value = if self.at_statement_end() {
            None
        } else {
            Some(self.expression()?)
        };

        let span = start_span.merge(self.previous_span());
        Ok(Stmt::new(StmtKind::Return(value), span))
    }

    fn try_statement(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        self.expect(&TokenKind::Try)?;
        let body = self.block()?;

        let (catch_var, catch_block) = if self.match_token(&TokenKind::Catch) {
            let catch_line = self.previous_span().line;
            let var = match &self.peek().kind {
                TokenKind::Identifier(name) if self.peek().span.line == catch_line => {
                    let name = name.clone();
                    self.advance();
                    Some(name)
                }
                _ => None,
            };
            (var, Some(self.block()?))
        } else {
            (None, None)
        };

        let finally_block = if self.match_token(&TokenKind::Finally) {
            Some(self.block()?)
        } else {
            None
        };

        if catch_block.is_none() && finally_block.is_none() {
            return Err(ParserError::general(
                "try requires a catch or finally block",
                start_span,
            ));
        }
        self.expect_end(&TokenKind::Try)?;

        let span = start_span.merge(self.previous_span());
        Ok(Stmt::new(
            StmtKind::Try {
                body,
                catch_var,
                catch_block,
                finally_block,
            },
            span,
        ))
    }

    /// An expression, or an assignment when `=` follows a name, member or
    /// index target.
    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;

        if self.match_token(&TokenKind::Equal) {
            match &expr.kind {
                ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => {}
                _ => return Err(ParserError::InvalidAssignmentTarget(expr.span)),
            }
            let value = self.expression()?;
            let span = expr.span.merge(value.span);
            return Ok(Stmt::new(
                StmtKind::Assign {
                    target: expr,
                    value,
                },
                span,
            ));
        }

        let span = expr.span;
        Ok(Stmt::new(StmtKind::Expression(expr), span))
    }
}
