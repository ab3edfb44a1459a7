//! Declaration parsing: variables, functions, classes, modules, imports.

use crate::ast::*;
use crate::error::ParserError;
use crate::lexer::TokenKind;

use super::core::{ParseResult, Parser};

impl Parser {
    pub(crate) fn declaration(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::Var | TokenKind::Const => self.var_declaration(),
            TokenKind::Function => {
                let decl = self.function_declaration()?;
                let span = decl.span;
                Ok(Stmt::new(StmtKind::Function(decl), span))
            }
            TokenKind::Class => self.class_declaration(ClassKind::Class),
            TokenKind::Contract => self.class_declaration(ClassKind::Contract),
            TokenKind::Module => self.module_declaration(),
            TokenKind::Import | TokenKind::From => self.import_declaration(),
            TokenKind::Export => self.export_declaration(),
            _ => self.statement(),
        }
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        let constant = self.advance().kind == TokenKind::Const;
        let name = self.expect_identifier()?;

        let type_annotation = if self.match_token(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let initializer = if self.match_token(&TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        if constant && initializer.is_none() {
            return Err(ParserError::general(
                format!("constant '{}' needs an initializer", name),
                start_span,
            ));
        }

        let span = start_span.merge(self.previous_span());
        Ok(Stmt::new(
            StmtKind::VarDecl {
                name,
                constant,
                type_annotation,
                initializer,
            },
            span,
        ))
    }

    pub(crate) fn function_declaration(&mut self) -> ParseResult<FunctionDecl> {
        let start_span = self.current_span();
        self.expect(&TokenKind::Function)?;
        let name = self.expect_identifier()?;

        self.expect(&TokenKind::LeftParen)?;
        let params = self.parse_parameters()?;
        self.expect(&TokenKind::RightParen)?;

        let return_type = if self.match_token(&TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = self.block()?;
        self.expect_end(&TokenKind::Function)?;

        let span = start_span.merge(self.previous_span());
        Ok(FunctionDecl {
            name,
            params,
            return_type,
            body,
            span,
        })
    }

    pub(crate) fn parse_parameters(&mut self) -> ParseResult<Vec<Parameter>> {
        let mut params = Vec::new();

        while !self.check(&TokenKind::RightParen) {
            let span = self.current_span();
            let name = self.expect_identifier()?;
            let type_annotation = if self.match_token(&TokenKind::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            params.push(Parameter {
                name,
                type_annotation,
                span: span.merge(self.previous_span()),
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    fn class_declaration(&mut self, kind: ClassKind) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        let keyword = self.advance().kind;
        let name = self.expect_identifier()?;

        let superclass = if self.match_token(&TokenKind::Extends) {
            Some(self.expect_dotted_identifier()?)
        } else {
            None
        };

        let mut fields = Vec::new();
        let mut methods = Vec::new();

        self.skip_separators();
        while !self.is_at_end() && !self.check(&TokenKind::End) {
            match self.peek().kind {
                TokenKind::Var | TokenKind::Const => {
                    let stmt = self.var_declaration()?;
                    if let StmtKind::VarDecl {
                        name,
                        constant,
                        type_annotation,
                        initializer,
                    } = stmt.kind
                    {
                        fields.push(FieldDecl {
                            name,
                            constant,
                            type_annotation,
                            initializer,
                            span: stmt.span,
                        });
                    }
                }
                TokenKind::Function => methods.push(self.function_declaration()?),
                _ => return Err(self.unexpected("field or method declaration")),
            }
            self.skip_separators();
        }
        self.expect_end(&keyword)?;

        let span = start_span.merge(self.previous_span());
        Ok(Stmt::new(
            StmtKind::Class(ClassDecl {
                name,
                kind,
                superclass,
                fields,
                methods,
                span,
            }),
            span,
        ))
    }

    fn module_declaration(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        self.expect(&TokenKind::Module)?;
        let name = self.expect_identifier()?;
        let body = self.block()?;
        self.expect_end(&TokenKind::Module)?;

        let span = start_span.merge(self.previous_span());
        Ok(Stmt::new(
            StmtKind::Module(ModuleDecl { name, body, span }),
            span,
        ))
    }

    /// `import M`, `import M as A`, `from M import a, b`.
    fn import_declaration(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();

        let (module, kind) = if self.match_token(&TokenKind::From) {
            let module = self.expect_dotted_identifier()?;
            self.expect(&TokenKind::Import)?;
            let mut names = vec![self.expect_identifier()?];
            while self.match_token(&TokenKind::Comma) {
                names.push(self.expect_identifier()?);
            }
            (module, ImportKind::From(names))
        } else {
            self.expect(&TokenKind::Import)?;
            let module = self.expect_dotted_identifier()?;
            if self.match_token(&TokenKind::As) {
                (module, ImportKind::Alias(self.expect_identifier()?))
            } else {
                (module, ImportKind::Whole)
            }
        };

        let span = start_span.merge(self.previous_span());
        Ok(Stmt::new(
            StmtKind::Import(ImportDecl { module, kind, span }),
            span,
        ))
    }

    fn export_declaration(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        self.expect(&TokenKind::Export)?;

        if !matches!(
            self.peek().kind,
            TokenKind::Var
                | TokenKind::Const
                | TokenKind::Function
                | TokenKind::Class
                | TokenKind::Contract
                | TokenKind::Module
        ) {
            return Err(self.unexpected("declaration after 'export'"));
        }

        let inner = self.declaration()?;
        let span = start_span.merge(inner.span);
        Ok(Stmt::new(StmtKind::Export(Box::new(inner)), span))
    }
}
