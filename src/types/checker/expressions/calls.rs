//! Call checking: calls by name, method calls, builtins.

use crate::ast::*;
use crate::error::SemanticError;
use crate::span::Span;
use crate::types::checker::{is_builtin_namespaced, BUILTIN_FUNCTIONS};
use crate::types::symbol::SymbolKind;
use crate::types::type_repr::Type;

use super::super::{Analyzer, SemanticResult};

impl Analyzer {
    /// `f(a)`, `M.f(a)`, `obj.m(a)`: which one it is depends on what the
    /// name resolves to.
    pub(crate) fn check_call_expr(
        &mut self,
        span: Span,
        name: &str,
        arguments: &[Expr],
    ) -> SemanticResult<Type> {
        let arg_types = self.check_arguments(arguments)?;

        if BUILTIN_FUNCTIONS.contains(&name) {
            return Ok(builtin_return_type(name));
        }

        if let Some(symbol) = self.symbols.lookup(name).cloned() {
            return match symbol.kind {
                SymbolKind::Function => {
                    if let Some((owner, _)) = name.rsplit_once('.') {
                        if self.symbols.lookup(owner).is_some_and(|s| s.kind.is_class()) {
                            return Err(SemanticError::general(
                                format!("method '{}' must be called on an instance", name),
                                span,
                            ));
                        }
                    }
                    self.check_signature(name, &symbol.ty, &arg_types, arguments, span)
                }
                kind if kind.is_value() => {
                    if !name.contains('.') {
                        self.check_capture(name, span)?;
                    }
                    match &symbol.ty {
                        Type::Function(..) => {
                            self.check_signature(name, &symbol.ty, &arg_types, arguments, span)
                        }
                        t if t.is_any() => Ok(Type::any()),
                        _ => Err(SemanticError::NotCallable(name.to_string(), span)),
                    }
                }
                _ => Err(SemanticError::NotCallable(name.to_string(), span)),
            };
        }

        // Natives are checked at run time
        if is_builtin_namespaced(name) {
            return Ok(Type::any());
        }

        if let Some((receiver, method)) = name.rsplit_once('.') {
            let receiver_ty = self.check_receiver(receiver, span)?;
            return self.method_type(&receiver_ty, method, &arg_types, arguments, span);
        }

        Err(SemanticError::UndefinedIdentifier(name.to_string(), span))
    }

    pub(crate) fn check_method_call_expr(
        &mut self,
        span: Span,
        receiver: &Expr,
        method: &str,
        arguments: &[Expr],
    ) -> SemanticResult<Type> {
        let receiver_ty = self.check_expr(receiver)?;
        let arg_types = self.check_arguments(arguments)?;
        self.method_type(&receiver_ty, method, &arg_types, arguments, span)
    }

    fn check_arguments(&mut self, arguments: &[Expr]) -> SemanticResult<Vec<Type>> {
        arguments.iter().map(|arg| self.check_expr(arg)).collect()
    }

    /// Exact arity and per-argument compatibility against a function type.
    fn check_signature(
        &self,
        name: &str,
        ty: &Type,
        arg_types: &[Type],
        arguments: &[Expr],
        span: Span,
    ) -> SemanticResult<Type> {
        let Type::Function(params, ret) = ty else {
            return Err(SemanticError::NotCallable(name.to_string(), span));
        };
        if params.len() != arg_types.len() {
            return Err(SemanticError::WrongArity {
                name: name.to_string(),
                expected: params.len(),
                got: arg_types.len(),
                span,
            });
        }
        for ((param, actual), arg) in params.iter().zip(arg_types).zip(arguments) {
            self.expect_compatible(actual, param, arg.span)?;
        }
        Ok((**ret).clone())
    }

    /// The dotted prefix of a method call such as `p` in `p.move()` or
    /// `this.items` in `this.items.append(x)`.
    fn check_receiver(&mut self, receiver: &str, span: Span) -> SemanticResult<Type> {
        if let Some(symbol) = self.symbols.lookup(receiver).cloned() {
            if !symbol.kind.is_value() {
                return Err(SemanticError::UndefinedIdentifier(receiver.to_string(), span));
            }
            if !receiver.contains('.') {
                self.check_capture(receiver, span)?;
            }
            return Ok(symbol.ty);
        }

        let root = receiver.split('.').next().unwrap_or(receiver);
        match self.symbols.lookup(root) {
            Some(symbol) if symbol.kind.is_value() => {
                self.check_capture(root, span)?;
                Ok(Type::any())
            }
            _ => Err(SemanticError::UndefinedIdentifier(receiver.to_string(), span)),
        }
    }

    /// Methods of known classes are checked like functions; anything else
    /// (lists, strings, maps, `Any`) dispatches at run time.
    fn method_type(
        &self,
        receiver_ty: &Type,
        method: &str,
        arg_types: &[Type],
        arguments: &[Expr],
        span: Span,
    ) -> SemanticResult<Type> {
        let Type::Named(class) = receiver_ty else {
            return Ok(Type::any());
        };
        let Some(class_symbol) = self.symbols.lookup(class).filter(|s| s.kind.is_class()) else {
            return Ok(Type::any());
        };
        match self.symbols.member(class_symbol, method) {
            Some(member) if member.kind == SymbolKind::Function => {
                let name = format!("{}.{}", class, method);
                self.check_signature(&name, &member.ty, arg_types, arguments, span)
            }
            _ => Err(SemanticError::general(
                format!("'{}' has no method '{}'", class, method),
                span,
            )),
        }
    }
}

fn builtin_return_type(name: &str) -> Type {
    match name {
        "print" | "println" => Type::Null,
        "len" | "int" => Type::Int,
        "float" => Type::Float,
        "str" | "type_of" | "input" => Type::String,
        _ => Type::any(),
    }
}
