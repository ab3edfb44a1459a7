//! Statement checking.

use crate::ast::*;
use crate::error::SemanticError;
use crate::span::Span;
use crate::types::symbol::{Symbol, SymbolKind};
use crate::types::type_repr::Type;

use super::{Analyzer, SemanticResult};

impl Analyzer {
    pub(crate) fn check_stmt(&mut self, stmt: &Stmt) -> SemanticResult<()> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.check_expr(expr)?;
                Ok(())
            }

            StmtKind::VarDecl {
                name,
                constant,
                type_annotation,
                initializer,
            } => self.check_var_decl(
                name,
                *constant,
                type_annotation.as_ref(),
                initializer.as_ref(),
                stmt.span,
            ),

            StmtKind::Assign { target, value } => self.check_assign(target, value),

            StmtKind::Block(statements) => self.check_scoped_block(statements),

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.check_expr(condition)?;
                self.expect_condition(&cond, condition.span)?;
                self.check_scoped_block(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.check_scoped_block(else_branch)?;
                }
                Ok(())
            }

            StmtKind::While { condition, body } => {
                let cond = self.check_expr(condition)?;
                self.expect_condition(&cond, condition.span)?;
                self.check_loop_body(None, body)
            }

            StmtKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                let iter_ty = self.check_expr(iterable)?;
                let element = iter_ty.element_type().ok_or_else(|| {
                    SemanticError::general(
                        format!("cannot iterate over a value of type {}", iter_ty),
                        iterable.span,
                    )
                })?;
                self.check_loop_body(Some((variable, element, stmt.span)), body)
            }

            StmtKind::ForRange {
                variable,
                start,
                end,
                body,
            } => {
                for bound in [start, end] {
                    let ty = self.check_expr(bound)?;
                    self.expect_compatible(&ty, &Type::Int, bound.span)?;
                }
                self.check_loop_body(Some((variable, Type::Int, stmt.span)), body)
            }

            // Signatures were registered by the first pass
            StmtKind::Function(decl) => self.check_function_decl(decl),
            StmtKind::Class(decl) => self.check_class_decl(decl),
            StmtKind::Module(decl) => self.check_module_decl(decl),

            StmtKind::Return(value) => self.check_return(value.as_ref(), stmt.span),

            StmtKind::Break | StmtKind::Continue => {
                if self.loop_depth == 0 {
                    let word = if matches!(stmt.kind, StmtKind::Break) {
                        "break"
                    } else {
                        "continue"
                    };
                    return Err(SemanticError::general(
                        format!("'{}' outside of a loop", word),
                        stmt.span,
                    ));
                }
                Ok(())
            }

            StmtKind::Try {
                body,
                catch_var,
                catch_block,
                finally_block,
            } => {
                self.check_scoped_block(body)?;
                if let Some(catch_block) = catch_block {
                    self.symbols.enter_scope();
                    let result = self.check_catch(catch_var.as_deref(), catch_block, stmt.span);
                    self.symbols.exit_scope();
                    result?;
                }
                if let Some(finally_block) = finally_block {
                    self.check_scoped_block(finally_block)?;
                }
                Ok(())
            }

            StmtKind::Throw(value) => {
                self.check_expr(value)?;
                Ok(())
            }

            // Imports are spliced away by the module resolver
            StmtKind::Import(_) => Ok(()),

            StmtKind::Export(inner) => self.check_stmt(inner),
        }
    }

    fn check_var_decl(
        &mut self,
        name: &str,
        constant: bool,
        annotation: Option<&TypeAnnotation>,
        initializer: Option<&Expr>,
        span: Span,
    ) -> SemanticResult<()> {
        let init_ty = match initializer {
            Some(init) => Some(self.check_expr(init)?),
            None => None,
        };

        let ty = match (annotation, init_ty) {
            (Some(annotation), Some(actual)) => {
                let declared = self.resolve_type(annotation)?;
                let init_span = initializer.map(|e| e.span).unwrap_or(span);
                self.expect_compatible(&actual, &declared, init_span)?;
                declared
            }
            (Some(annotation), None) => self.resolve_type(annotation)?,
            // `var x = null` may later hold anything
            (None, Some(Type::Null)) => Type::any(),
            (None, Some(actual)) => actual,
            (None, None) => Type::any(),
        };

        let kind = if constant {
            SymbolKind::Const
        } else {
            SymbolKind::Var
        };
        self.symbols.declare(Symbol::new(name, kind, ty), span)
    }

    fn check_assign(&mut self, target: &Expr, value: &Expr) -> SemanticResult<()> {
        let value_ty = self.check_expr(value)?;

        if let Some(name) = target.dotted_name() {
            if let Some(symbol) = self.symbols.lookup(&name).cloned() {
                if !symbol.kind.is_assignable() {
                    return Err(SemanticError::InvalidAssignment {
                        kind: symbol.kind.to_string(),
                        name,
                        span: target.span,
                    });
                }
                if !name.contains('.') {
                    self.check_capture(&name, target.span)?;
                }
                self.annotations.record(target.span, symbol.ty.clone());
                return self.expect_compatible(&value_ty, &symbol.ty, value.span);
            }
        }

        match &target.kind {
            ExprKind::Identifier(name) => {
                Err(SemanticError::UndefinedIdentifier(name.clone(), target.span))
            }
            ExprKind::Member { object, .. } => {
                self.check_expr(object)?;
                Ok(())
            }
            ExprKind::Index { object, index } => {
                self.check_expr(object)?;
                self.check_expr(index)?;
                Ok(())
            }
            _ => Err(SemanticError::general("invalid assignment target", target.span)),
        }
    }

    /// A loop body in its own scope, optionally binding the loop variable.
    fn check_loop_body(
        &mut self,
        variable: Option<(&String, Type, Span)>,
        body: &[Stmt],
    ) -> SemanticResult<()> {
        self.symbols.enter_scope();
        self.loop_depth += 1;
        let result = match variable {
            Some((name, ty, span)) => self
                .symbols
                .declare(Symbol::new(name, SymbolKind::Var, ty), span)
                .and_then(|_| self.check_block(body)),
            None => self.check_block(body),
        };
        self.loop_depth -= 1;
        self.symbols.exit_scope();
        result
    }

    fn check_catch(
        &mut self,
        variable: Option<&str>,
        body: &[Stmt],
        span: Span,
    ) -> SemanticResult<()> {
        if let Some(name) = variable {
            self.symbols
                .declare(Symbol::new(name, SymbolKind::Var, Type::any()), span)?;
        }
        self.check_block(body)
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span) -> SemanticResult<()> {
        let Some(expected) = self.return_types.last().cloned() else {
            return Err(SemanticError::general("'return' outside of a function", span));
        };
        let actual = match value {
            Some(expr) => self.check_expr(expr)?,
            None => Type::Null,
        };
        let at = value.map(|e| e.span).unwrap_or(span);
        self.expect_compatible(&actual, &expected, at)
    }
}
