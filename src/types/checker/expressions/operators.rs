//! Operator checking.

use crate::ast::*;
use crate::error::SemanticError;
use crate::span::Span;
use crate::types::type_repr::Type;

use super::super::{Analyzer, SemanticResult};

impl Analyzer {
    pub(crate) fn check_binary_expr(
        &mut self,
        span: Span,
        left: &Expr,
        operator: BinaryOp,
        right: &Expr,
    ) -> SemanticResult<Type> {
        let left_type = self.check_expr(left)?;
        let right_type = self.check_expr(right)?;

        let invalid = || SemanticError::InvalidOperands {
            op: operator.to_string(),
            left: left_type.to_string(),
            right: right_type.to_string(),
            span,
        };

        match operator {
            BinaryOp::Add
                if left_type == Type::String && right_type == Type::String =>
            {
                Ok(Type::String)
            }
            op if op.is_arithmetic() => {
                if left_type.is_any() || right_type.is_any() {
                    Ok(Type::any())
                } else if left_type.is_numeric() && right_type.is_numeric() {
                    if left_type == Type::Float || right_type == Type::Float {
                        Ok(Type::Float)
                    } else {
                        Ok(Type::Int)
                    }
                } else {
                    Err(invalid())
                }
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                if left_type == Type::Null
                    || right_type == Type::Null
                    || self.compatible(&left_type, &right_type)
                    || self.compatible(&right_type, &left_type)
                {
                    Ok(Type::Bool)
                } else {
                    Err(invalid())
                }
            }
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                if left_type.is_compatible(&right_type) {
                    Ok(Type::Bool)
                } else {
                    Err(invalid())
                }
            }
            BinaryOp::And | BinaryOp::Or => {
                let is_bool = |t: &Type| *t == Type::Bool || t.is_any();
                if is_bool(&left_type) && is_bool(&right_type) {
                    Ok(Type::Bool)
                } else {
                    Err(invalid())
                }
            }
            _ => Err(invalid()),
        }
    }

    pub(crate) fn check_unary_expr(
        &mut self,
        span: Span,
        operator: UnaryOp,
        operand: &Expr,
    ) -> SemanticResult<Type> {
        let ty = self.check_expr(operand)?;
        match operator {
            UnaryOp::Negate if ty.is_numeric() || ty.is_any() => Ok(ty),
            UnaryOp::Not if ty == Type::Bool || ty.is_any() => Ok(Type::Bool),
            _ => Err(SemanticError::general(
                format!("invalid operand type for '{}': {}", operator, ty),
                span,
            )),
        }
    }
}
