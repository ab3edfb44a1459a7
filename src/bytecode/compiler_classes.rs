//! Class and contract lowering.
//!
//! A class compiles to its methods only: each method body sits behind the
//! mangled label `Class.method`. Instances are created by the VM as tagged
//! maps, and field declarations do not produce code.

use crate::ast::ClassDecl;

use super::compiler::Compiler;

impl Compiler {
    pub(crate) fn compile_class(&mut self, decl: &ClassDecl) {
        for method in &decl.methods {
            let label = format!("{}.{}", decl.name, method.name);
            self.compile_function(
                &label,
                &method.params,
                &method.body,
                Some(&decl.name),
                method.span.line,
            );
        }
    }
}
