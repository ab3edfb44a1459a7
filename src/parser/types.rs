//! Type annotation parsing.

use crate::ast::*;
use crate::error::ParserError;
use crate::lexer::TokenKind;
use crate::span::Span;

use super::core::{ParseResult, Parser};

impl Parser {
    pub(crate) fn parse_type(&mut self) -> ParseResult<TypeAnnotation> {
        let start_span = self.current_span();

        let base_type = match &self.peek().kind {
            TokenKind::Identifier(_) => {
                let name = self.expect_dotted_identifier()?;
                self.parse_named_type(name, start_span)?
            }
            TokenKind::Fn => {
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                let params = self.parse_type_list(&TokenKind::RightParen)?;
                self.expect(&TokenKind::Arrow)?;
                let return_type = Box::new(self.parse_type()?);
                let span = start_span.merge(return_type.span);
                TypeAnnotation::new(
                    TypeKind::Function {
                        params,
                        return_type,
                    },
                    span,
                )
            }
            TokenKind::LeftParen => {
                self.advance();
                let items = self.parse_type_list(&TokenKind::RightParen)?;
                let span = start_span.merge(self.previous_span());
                TypeAnnotation::new(TypeKind::Tuple(items), span)
            }
            _ => {
                return Err(ParserError::unexpected_token(
                    "type",
                    format!("{}", self.peek().kind),
                    self.current_span(),
                ));
            }
        };

        if self.match_token(&TokenKind::Question) {
            let span = start_span.merge(self.previous_span());
            return Ok(TypeAnnotation::new(
                TypeKind::Optional(Box::new(base_type)),
                span,
            ));
        }

        Ok(base_type)
    }

    /// `List<T>`, `Set<T>`, `Map<K, V>` or a plain name.
    fn parse_named_type(&mut self, name: String, start_span: Span) -> ParseResult<TypeAnnotation> {
        if !self.check(&TokenKind::Less) {
            return Ok(TypeAnnotation::new(TypeKind::Named(name), start_span));
        }

        let open = self.advance();
        let args = self.parse_type_list(&TokenKind::Greater)?;
        let span = start_span.merge(self.previous_span());

        let kind = match (name.as_str(), args.as_slice()) {
            ("List", [inner]) => TypeKind::List(Box::new(inner.clone())),
            ("Set", [inner]) => TypeKind::Set(Box::new(inner.clone())),
            ("Map", [key, value]) => TypeKind::Map(Box::new(key.clone()), Box::new(value.clone())),
            _ => {
                return Err(ParserError::general(
                    format!("'{}' does not take {} type arguments", name, args.len()),
                    open.span,
                ))
            }
        };

        Ok(TypeAnnotation::new(kind, span))
    }

    /// Comma separated types up to and including `close`.
    fn parse_type_list(&mut self, close: &TokenKind) -> ParseResult<Vec<TypeAnnotation>> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.parse_type()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }
}
