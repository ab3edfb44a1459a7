//! Expression checking.

mod access;
mod calls;
mod operators;

use crate::ast::*;
use crate::error::SemanticError;
use crate::span::Span;
use crate::types::type_repr::Type;

use super::{Analyzer, SemanticResult};

impl Analyzer {
    /// Check an expression and record its type.
    pub(crate) fn check_expr(&mut self, expr: &Expr) -> SemanticResult<Type> {
        let ty = self.infer_expr(expr)?;
        self.annotations.record(expr.span, ty.clone());
        Ok(ty)
    }

    fn infer_expr(&mut self, expr: &Expr) -> SemanticResult<Type> {
        match &expr.kind {
            ExprKind::IntLiteral(_) => Ok(Type::Int),
            ExprKind::FloatLiteral(_) => Ok(Type::Float),
            ExprKind::StringLiteral(_) => Ok(Type::String),
            ExprKind::BoolLiteral(_) => Ok(Type::Bool),
            ExprKind::Null => Ok(Type::Null),

            ExprKind::Identifier(name) => self.check_identifier(name, expr.span),

            ExprKind::Binary {
                left,
                operator,
                right,
            } => self.check_binary_expr(expr.span, left, *operator, right),
            ExprKind::Unary { operator, operand } => {
                self.check_unary_expr(expr.span, *operator, operand)
            }

            ExprKind::Call { name, arguments } => self.check_call_expr(expr.span, name, arguments),
            ExprKind::MethodCall {
                receiver,
                method,
                arguments,
            } => self.check_method_call_expr(expr.span, receiver, method, arguments),

            ExprKind::Member { object, name } => self.check_member_expr(expr, object, name),
            ExprKind::Index { object, index } => {
                self.check_expr(object)?;
                self.check_expr(index)?;
                Ok(Type::any())
            }

            ExprKind::List(items) => {
                let element = self.common_type(items)?;
                Ok(Type::List(Box::new(element)))
            }
            ExprKind::Map(entries) => {
                let mut keys = Type::any();
                let mut values = Type::any();
                for (i, (key, value)) in entries.iter().enumerate() {
                    let k = self.check_expr(key)?;
                    let v = self.check_expr(value)?;
                    if i == 0 {
                        keys = k;
                        values = v;
                    } else {
                        keys = keys.join(&k);
                        values = values.join(&v);
                    }
                }
                Ok(Type::Map(Box::new(keys), Box::new(values)))
            }
            ExprKind::Tuple(items) => {
                let types = items
                    .iter()
                    .map(|item| self.check_expr(item))
                    .collect::<SemanticResult<Vec<_>>>()?;
                Ok(Type::Tuple(types))
            }

            ExprKind::Lambda {
                params,
                return_type,
                body,
            } => self.check_function_body(params, return_type.as_ref(), body, None),

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.check_expr(condition)?;
                self.expect_condition(&cond, condition.span)?;
                let then_ty = self.check_expr(then_branch)?;
                let else_ty = self.check_expr(else_branch)?;
                Ok(then_ty.join(&else_ty))
            }

            ExprKind::New {
                class_name,
                arguments,
            } => {
                match self.symbols.lookup(class_name) {
                    Some(symbol) if symbol.kind.is_class() => {}
                    _ => {
                        return Err(SemanticError::UndefinedClass(
                            class_name.clone(),
                            expr.span,
                        ))
                    }
                }
                for arg in arguments {
                    self.check_expr(arg)?;
                }
                Ok(Type::named(class_name.clone()))
            }
        }
    }

    fn check_identifier(&mut self, name: &str, span: Span) -> SemanticResult<Type> {
        match self.symbols.lookup(name) {
            Some(symbol) => {
                let ty = symbol.ty.clone();
                if !name.contains('.') {
                    self.check_capture(name, span)?;
                }
                Ok(ty)
            }
            None if super::BUILTIN_FUNCTIONS.contains(&name) => {
                Ok(Type::Function(vec![Type::any()], Box::new(Type::any())))
            }
            None => Err(SemanticError::UndefinedIdentifier(name.to_string(), span)),
        }
    }

    /// Reject use of a local variable that belongs to an enclosing function:
    /// functions and lambdas only see their own locals and globals.
    pub(crate) fn check_capture(&self, name: &str, span: Span) -> SemanticResult<()> {
        let Some(&base) = self.function_bases.last() else {
            return Ok(());
        };
        match self.symbols.lookup_with_depth(name) {
            Some((depth, symbol)) if depth > 0 && depth < base && symbol.kind.is_value() => {
                Err(SemanticError::general(
                    format!(
                        "'{}' belongs to an enclosing scope and is not visible here",
                        name
                    ),
                    span,
                ))
            }
            _ => Ok(()),
        }
    }

    /// Element type of a list literal: the join of all item types.
    fn common_type(&mut self, items: &[Expr]) -> SemanticResult<Type> {
        let mut result: Option<Type> = None;
        for item in items {
            let ty = self.check_expr(item)?;
            result = Some(match result {
                None => ty,
                Some(prev) => prev.join(&ty),
            });
        }
        Ok(result.unwrap_or_else(Type::any))
    }
}
