//! Declaration checking: functions, classes, contracts and modules.

use crate::ast::*;
use crate::error::SemanticError;
use crate::types::symbol::{Scope, Symbol, SymbolKind};
use crate::types::type_repr::Type;

use super::{Analyzer, SemanticResult};

impl Analyzer {
    /// First pass over a statement list: register every function, class,
    /// contract and module it declares. Class names go in before any
    /// signature is resolved so that members may mention later classes.
    pub(crate) fn declare_siblings(&mut self, statements: &[Stmt]) -> SemanticResult<()> {
        for stmt in statements {
            match &unwrap_export(stmt).kind {
                StmtKind::Class(decl) => {
                    let kind = match decl.kind {
                        ClassKind::Class => SymbolKind::Class,
                        ClassKind::Contract => SymbolKind::Contract,
                    };
                    let symbol = Symbol::new(&decl.name, kind, Type::named(&decl.name))
                        .with_scope(Scope::new())
                        .with_parent(decl.superclass.clone());
                    self.symbols.declare(symbol, decl.span)?;
                }
                StmtKind::Module(decl) => {
                    let symbol = Symbol::new(&decl.name, SymbolKind::Module, Type::named(&decl.name))
                        .with_scope(Scope::new());
                    self.symbols.declare(symbol, decl.span)?;
                }
                _ => {}
            }
        }

        for stmt in statements {
            match &unwrap_export(stmt).kind {
                StmtKind::Function(decl) => {
                    let ty = self.function_type(&decl.params, decl.return_type.as_ref())?;
                    self.symbols
                        .declare(Symbol::new(&decl.name, SymbolKind::Function, ty), decl.span)?;
                }
                StmtKind::Class(decl) => self.declare_members(decl)?,
                _ => {}
            }
        }

        Ok(())
    }

    /// Fill a class symbol's scope with its field and method signatures.
    fn declare_members(&mut self, decl: &ClassDecl) -> SemanticResult<()> {
        let mut scope = Scope::new();

        for field in &decl.fields {
            let kind = if field.constant {
                SymbolKind::Const
            } else {
                SymbolKind::Var
            };
            let ty = self.resolve_optional(field.type_annotation.as_ref())?;
            if scope.contains(&field.name) {
                return Err(SemanticError::Redeclaration(field.name.clone(), field.span));
            }
            scope.insert(Symbol::new(&field.name, kind, ty));
        }

        for method in &decl.methods {
            let ty = self.function_type(&method.params, method.return_type.as_ref())?;
            if scope.contains(&method.name) {
                return Err(SemanticError::Redeclaration(method.name.clone(), method.span));
            }
            scope.insert(Symbol::new(&method.name, SymbolKind::Function, ty));
        }

        let symbol = self
            .symbols
            .lookup_current(&decl.name)
            .cloned()
            .ok_or_else(|| SemanticError::UndefinedClass(decl.name.clone(), decl.span))?;
        self.symbols.update(Symbol {
            child_scope: Some(Box::new(scope)),
            ..symbol
        });
        Ok(())
    }

    pub(crate) fn function_type(
        &self,
        params: &[Parameter],
        return_type: Option<&TypeAnnotation>,
    ) -> SemanticResult<Type> {
        let params = params
            .iter()
            .map(|p| self.resolve_optional(p.type_annotation.as_ref()))
            .collect::<SemanticResult<Vec<_>>>()?;
        let ret = self.resolve_optional(return_type)?;
        Ok(Type::Function(params, Box::new(ret)))
    }

    /// Second pass for a function or method body. Returns the function type.
    pub(crate) fn check_function_body(
        &mut self,
        params: &[Parameter],
        return_type: Option<&TypeAnnotation>,
        body: &[Stmt],
        this_class: Option<&str>,
    ) -> SemanticResult<Type> {
        let ty = self.function_type(params, return_type)?;
        let ret = match &ty {
            Type::Function(_, ret) => (**ret).clone(),
            _ => Type::any(),
        };

        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        self.symbols.enter_scope();
        self.function_bases.push(self.symbols.depth() - 1);
        self.return_types.push(ret);

        let result = self.check_function_scope(params, body, this_class);

        self.return_types.pop();
        self.function_bases.pop();
        self.symbols.exit_scope();
        self.loop_depth = saved_loop_depth;

        result.map(|_| ty)
    }

    fn check_function_scope(
        &mut self,
        params: &[Parameter],
        body: &[Stmt],
        this_class: Option<&str>,
    ) -> SemanticResult<()> {
        if let Some(class) = this_class {
            self.symbols.declare(
                Symbol::new("this", SymbolKind::Var, Type::named(class)),
                Default::default(),
            )?;
        }
        for param in params {
            let ty = self.resolve_optional(param.type_annotation.as_ref())?;
            self.symbols
                .declare(Symbol::new(&param.name, SymbolKind::Parameter, ty), param.span)?;
        }
        self.check_block(body)
    }

    pub(crate) fn check_function_decl(&mut self, decl: &FunctionDecl) -> SemanticResult<()> {
        self.check_function_body(&decl.params, decl.return_type.as_ref(), &decl.body, None)?;
        Ok(())
    }

    pub(crate) fn check_class_decl(&mut self, decl: &ClassDecl) -> SemanticResult<()> {
        if let Some(parent) = &decl.superclass {
            match self.symbols.lookup(parent) {
                Some(symbol) if symbol.kind.is_class() => {}
                _ => return Err(SemanticError::UndefinedClass(parent.clone(), decl.span)),
            }
            if self.symbols.is_subclass(parent, &decl.name) {
                return Err(SemanticError::general(
                    format!("class '{}' inherits from itself", decl.name),
                    decl.span,
                ));
            }
        }

        let scope = self
            .symbols
            .lookup(&decl.name)
            .and_then(|symbol| symbol.child_scope.as_deref().cloned())
            .unwrap_or_default();

        self.symbols.push_scope(scope);
        self.classes.push(decl.name.clone());
        let result = self.check_class_body(decl);
        self.classes.pop();
        self.symbols.exit_scope();
        result
    }

    fn check_class_body(&mut self, decl: &ClassDecl) -> SemanticResult<()> {
        for field in &decl.fields {
            if let Some(init) = &field.initializer {
                let actual = self.check_expr(init)?;
                let declared = self.resolve_optional(field.type_annotation.as_ref())?;
                self.expect_compatible(&actual, &declared, init.span)?;
            }
        }
        for method in &decl.methods {
            self.check_function_body(
                &method.params,
                method.return_type.as_ref(),
                &method.body,
                Some(&decl.name),
            )?;
        }
        Ok(())
    }

    /// Check an inline module body in its own scope and attach that scope
    /// to the module symbol.
    pub(crate) fn check_module_decl(&mut self, decl: &ModuleDecl) -> SemanticResult<()> {
        self.symbols.enter_scope();
        let result = self.check_block(&decl.body);
        let scope = self.symbols.exit_scope().unwrap_or_default();
        result?;

        if let Some(symbol) = self.symbols.lookup_current(&decl.name).cloned() {
            self.symbols.update(symbol.with_scope(scope));
        }
        Ok(())
    }
}

fn unwrap_export(stmt: &Stmt) -> &Stmt {
    match &stmt.kind {
        StmtKind::Export(inner) => unwrap_export(inner),
        _ => stmt,
    }
}
