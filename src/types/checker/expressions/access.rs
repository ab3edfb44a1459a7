//! Member access checking.

use crate::ast::*;
use crate::types::type_repr::Type;

use super::super::{Analyzer, SemanticResult};

impl Analyzer {
    /// `Geometry.PI` names a flattened global and keeps its type; any other
    /// member access is dynamic and typed `Any`.
    pub(crate) fn check_member_expr(
        &mut self,
        expr: &Expr,
        object: &Expr,
        _name: &str,
    ) -> SemanticResult<Type> {
        if let Some(full) = expr.dotted_name() {
            if let Some(symbol) = self.symbols.lookup(&full) {
                let owner_is_class = full
                    .rsplit_once('.')
                    .and_then(|(owner, _)| self.symbols.lookup(owner))
                    .is_some_and(|s| s.kind.is_class());
                if !owner_is_class && !symbol.kind.is_class() {
                    return Ok(symbol.ty.clone());
                }
            }
        }

        self.check_expr(object)?;
        Ok(Type::any())
    }
}
