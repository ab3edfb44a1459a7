//! Expression parsing using Pratt precedence.

use crate::ast::*;
use crate::error::ParserError;
use crate::lexer::TokenKind;
use crate::span::Span;

use super::core::{ParseResult, Parser};
use super::precedence::{get_precedence, Precedence};

impl Parser {
    pub(crate) fn expression(&mut self) -> ParseResult<Expr> {
        self.parse_precedence(Precedence::Ternary)
    }

    pub(crate) fn parse_precedence(&mut self, min_precedence: Precedence) -> ParseResult<Expr> {
        self.nested(|parser| parser.precedence_climb(min_precedence))
    }

    fn precedence_climb(&mut self, min_precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.is_at_end() {
            let precedence = get_precedence(&self.peek().kind);
            if precedence == Precedence::None || precedence < min_precedence {
                break;
            }
            // A bracket or paren on a new line starts a new statement
            if matches!(
                self.peek().kind,
                TokenKind::LeftParen | TokenKind::LeftBracket
            ) && self.peek().span.line != self.previous().span.line
            {
                break;
            }

            left = self.parse_infix(left, precedence)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        if self.is_at_end() {
            return Err(ParserError::UnexpectedEof(self.current_span()));
        }
        let token = self.advance();
        let start_span = token.span;

        match &token.kind {
            TokenKind::IntLiteral(n) => Ok(Expr::new(ExprKind::IntLiteral(*n), start_span)),
            TokenKind::FloatLiteral(n) => Ok(Expr::new(ExprKind::FloatLiteral(*n), start_span)),
            TokenKind::StringLiteral(s) => {
                Ok(Expr::new(ExprKind::StringLiteral(s.clone()), start_span))
            }
            TokenKind::BoolLiteral(b) => Ok(Expr::new(ExprKind::BoolLiteral(*b), start_span)),
            TokenKind::Null => Ok(Expr::new(ExprKind::Null, start_span)),

            TokenKind::Identifier(name) => {
                Ok(Expr::new(ExprKind::Identifier(name.clone()), start_span))
            }

            TokenKind::LeftParen => self.parse_paren(start_span),
            TokenKind::LeftBracket => self.parse_list(start_span),
            TokenKind::LeftBrace => self.parse_map(start_span),

            TokenKind::Minus => self.unary_expr(UnaryOp::Negate, start_span),
            TokenKind::Not => self.unary_expr(UnaryOp::Not, start_span),

            TokenKind::New => {
                let class_name = self.expect_dotted_identifier()?;
                self.expect(&TokenKind::LeftParen)?;
                let arguments = self.parse_arguments()?;
                self.expect(&TokenKind::RightParen)?;
                let span = start_span.merge(self.previous_span());
                Ok(Expr::new(
                    ExprKind::New {
                        class_name,
                        arguments,
                    },
                    span,
                ))
            }

            TokenKind::Fn => self.parse_lambda(start_span),

            _ => Err(ParserError::unexpected_token(
                "expression",
                format!("{}", token.kind),
                token.span,
            )),
        }
    }

    fn unary_expr(&mut self, operator: UnaryOp, start_span: Span) -> ParseResult<Expr> {
        let operand = self.parse_precedence(Precedence::Unary)?;
        let span = start_span.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                operator,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `(expr)` is grouping, `()` and `(a, b)` are tuples.
    fn parse_paren(&mut self, start_span: Span) -> ParseResult<Expr> {
        if self.match_token(&TokenKind::RightParen) {
            let span = start_span.merge(self.previous_span());
            return Ok(Expr::new(ExprKind::Tuple(Vec::new()), span));
        }

        let first = self.expression()?;
        if !self.check(&TokenKind::Comma) {
            self.expect(&TokenKind::RightParen)?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RightParen) {
                break;
            }
            items.push(self.expression()?);
        }
        self.expect(&TokenKind::RightParen)?;
        let span = start_span.merge(self.previous_span());
        Ok(Expr::new(ExprKind::Tuple(items), span))
    }

    fn parse_list(&mut self, start_span: Span) -> ParseResult<Expr> {
        let mut items = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            items.push(self.expression()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBracket)?;
        let span = start_span.merge(self.previous_span());
        Ok(Expr::new(ExprKind::List(items), span))
    }

    fn parse_map(&mut self, start_span: Span) -> ParseResult<Expr> {
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key = self.expression()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.expression()?;
            entries.push((key, value));
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace)?;
        let span = start_span.merge(self.previous_span());
        Ok(Expr::new(ExprKind::Map(entries), span))
    }

    /// `fn(x: Int) -> Int => x * 2` or `fn(x) do ... end fn`.
    fn parse_lambda(&mut self, start_span: Span) -> ParseResult<Expr> {
        self.expect(&TokenKind::LeftParen)?;
        let params = self.parse_parameters()?;
        self.expect(&TokenKind::RightParen)?;

        let return_type = if self.match_token(&TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = if self.match_token(&TokenKind::FatArrow) {
            let value = self.expression()?;
            let span = value.span;
            vec![Stmt::new(StmtKind::Return(Some(value)), span)]
        } else {
            self.expect(&TokenKind::Do)?;
            let body = self.block()?;
            self.expect_end(&TokenKind::Fn)?;
            body
        };

        let span = start_span.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::Lambda {
                params,
                return_type,
                body,
            },
            span,
        ))
    }

    fn parse_infix(&mut self, left: Expr, precedence: Precedence) -> ParseResult<Expr> {
        let token = self.advance();
        let start_span = left.span;

        match &token.kind {
            TokenKind::Plus => self.binary_expr(left, BinaryOp::Add, precedence),
            TokenKind::Minus => self.binary_expr(left, BinaryOp::Subtract, precedence),
            TokenKind::Star => self.binary_expr(left, BinaryOp::Multiply, precedence),
            TokenKind::Slash => self.binary_expr(left, BinaryOp::Divide, precedence),
            TokenKind::Percent => self.binary_expr(left, BinaryOp::Modulo, precedence),
            TokenKind::EqualEqual => self.binary_expr(left, BinaryOp::Equal, precedence),
            TokenKind::BangEqual => self.binary_expr(left, BinaryOp::NotEqual, precedence),
            TokenKind::Less => self.binary_expr(left, BinaryOp::Less, precedence),
            TokenKind::LessEqual => self.binary_expr(left, BinaryOp::LessEqual, precedence),
            TokenKind::Greater => self.binary_expr(left, BinaryOp::Greater, precedence),
            TokenKind::GreaterEqual => self.binary_expr(left, BinaryOp::GreaterEqual, precedence),
            TokenKind::And => self.binary_expr(left, BinaryOp::And, precedence),
            TokenKind::Or => self.binary_expr(left, BinaryOp::Or, precedence),

            // Right associative
            TokenKind::StarStar => {
                let right = self.parse_precedence(Precedence::Power)?;
                let span = start_span.merge(right.span);
                Ok(Expr::new(
                    ExprKind::Binary {
                        left: Box::new(left),
                        operator: BinaryOp::Power,
                        right: Box::new(right),
                    },
                    span,
                ))
            }

            TokenKind::Question => {
                let then_expr = self.expression()?;
                self.expect(&TokenKind::Colon)?;
                let else_expr = self.parse_precedence(precedence)?;
                let span = start_span.merge(else_expr.span);
                Ok(Expr::new(
                    ExprKind::Ternary {
                        condition: Box::new(left),
                        then_branch: Box::new(then_expr),
                        else_branch: Box::new(else_expr),
                    },
                    span,
                ))
            }

            TokenKind::LeftParen => {
                let arguments = self.parse_arguments()?;
                self.expect(&TokenKind::RightParen)?;
                let span = start_span.merge(self.previous_span());
                self.call_expr(left, arguments, span)
            }

            TokenKind::Dot => {
                let name = self.expect_identifier()?;
                let span = start_span.merge(self.previous_span());
                Ok(Expr::new(
                    ExprKind::Member {
                        object: Box::new(left),
                        name,
                    },
                    span,
                ))
            }

            TokenKind::LeftBracket => {
                let index = self.expression()?;
                self.expect(&TokenKind::RightBracket)?;
                let span = start_span.merge(self.previous_span());
                Ok(Expr::new(
                    ExprKind::Index {
                        object: Box::new(left),
                        index: Box::new(index),
                    },
                    span,
                ))
            }

            _ => Err(ParserError::unexpected_token(
                "infix operator",
                format!("{}", token.kind),
                token.span,
            )),
        }
    }

    /// Identifier chains become calls by dotted name; a member of any other
    /// expression becomes a method call on that receiver.
    fn call_expr(&self, callee: Expr, arguments: Vec<Expr>, span: Span) -> ParseResult<Expr> {
        if let Some(name) = callee.dotted_name() {
            return Ok(Expr::new(ExprKind::Call { name, arguments }, span));
        }
        match callee.kind {
            ExprKind::Member { object, name } => Ok(Expr::new(
                ExprKind::MethodCall {
                    receiver: object,
                    method: name,
                    arguments,
                },
                span,
            )),
            _ => Err(ParserError::general(
                "only named functions and methods can be called",
                callee.span,
            )),
        }
    }

    fn binary_expr(
        &mut self,
        left: Expr,
        operator: BinaryOp,
        precedence: Precedence,
    ) -> ParseResult<Expr> {
        let right = self.parse_precedence(precedence.next())?;
        let span = left.span.merge(right.span);
        Ok(Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            span,
        ))
    }

    pub(crate) fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut arguments = Vec::new();

        if !self.check(&TokenKind::RightParen) {
            arguments.push(self.expression()?);
            while self.match_token(&TokenKind::Comma) {
                arguments.push(self.expression()?);
            }
        }

        Ok(arguments)
    }
}
