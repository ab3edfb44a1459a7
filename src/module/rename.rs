//! Reference rewriting for spliced modules.
//!
//! Walks a statement list and rewrites every name, call target, `new`
//! class and type annotation found in a rename map. Names bound locally
//! (parameters, loop variables, catch variables, block-level `var`s) are
//! left alone. Locals are tracked per function: a body never sees the
//! locals of the function around it.

use std::collections::{HashMap, HashSet};

use crate::ast::*;

pub(crate) struct Renamer<'a> {
    names: &'a HashMap<String, String>,
    locals: Vec<HashSet<String>>,
}

impl<'a> Renamer<'a> {
    pub(crate) fn new(names: &'a HashMap<String, String>) -> Self {
        Self {
            names,
            locals: Vec::new(),
        }
    }

    /// Rewrite a module's top-level statements. Top-level declarations are
    /// the module's members, not locals.
    pub(crate) fn rename_program(&mut self, statements: &mut [Stmt]) {
        for stmt in statements {
            self.stmt(stmt, true);
        }
    }

    /// The new spelling of a dotted path, if any prefix of it is renamed.
    /// Type and class names ignore locals; value names do not.
    fn rename(&self, path: &str, respect_locals: bool) -> Option<String> {
        let (renamed, consumed) = self.lookup(path, respect_locals)?;
        let rest: Vec<&str> = path.split('.').skip(consumed).collect();
        if rest.is_empty() {
            Some(renamed)
        } else {
            Some(format!("{}.{}", renamed, rest.join(".")))
        }
    }

    /// Longest renamed prefix of `path` and how many segments it covers.
    fn lookup(&self, path: &str, respect_locals: bool) -> Option<(String, usize)> {
        let segments: Vec<&str> = path.split('.').collect();
        if respect_locals && self.is_local(segments[0]) {
            return None;
        }
        (1..=segments.len()).rev().find_map(|n| {
            self.names
                .get(&segments[..n].join("."))
                .map(|renamed| (renamed.clone(), n))
        })
    }

    fn is_local(&self, name: &str) -> bool {
        self.locals.iter().any(|scope| scope.contains(name))
    }

    fn bind(&mut self, name: &str) {
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn block(&mut self, statements: &mut [Stmt], binding: Option<&str>) {
        self.locals.push(HashSet::new());
        if let Some(name) = binding {
            self.bind(name);
        }
        for stmt in statements {
            self.stmt(stmt, false);
        }
        self.locals.pop();
    }

    fn stmt(&mut self, stmt: &mut Stmt, top_level: bool) {
        match &mut stmt.kind {
            StmtKind::Expression(expr) | StmtKind::Throw(expr) => self.expr(expr),
            StmtKind::Return(value) => {
                if let Some(expr) = value {
                    self.expr(expr);
                }
            }
            StmtKind::VarDecl {
                name,
                type_annotation,
                initializer,
                ..
            } => {
                if let Some(annotation) = type_annotation {
                    self.annotation(annotation);
                }
                if let Some(init) = initializer {
                    self.expr(init);
                }
                if !top_level {
                    self.bind(name);
                }
            }
            StmtKind::Assign { target, value } => {
                self.expr(target);
                self.expr(value);
            }
            StmtKind::Block(body) => self.block(body, None),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.block(then_branch, None);
                if let Some(else_branch) = else_branch {
                    self.block(else_branch, None);
                }
            }
            StmtKind::While { condition, body } => {
                self.expr(condition);
                self.block(body, None);
            }
            StmtKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                self.expr(iterable);
                self.block(body, Some(variable.as_str()));
            }
            StmtKind::ForRange {
                variable,
                start,
                end,
                body,
            } => {
                self.expr(start);
                self.expr(end);
                self.block(body, Some(variable.as_str()));
            }
            StmtKind::Function(decl) => {
                if !top_level {
                    self.bind(&decl.name);
                }
                self.function(&mut decl.params, decl.return_type.as_mut(), &mut decl.body);
            }
            StmtKind::Class(decl) => self.class(decl),
            StmtKind::Module(decl) => self.block(&mut decl.body, None),
            StmtKind::Try {
                body,
                catch_var,
                catch_block,
                finally_block,
            } => {
                self.block(body, None);
                if let Some(catch_block) = catch_block {
                    self.block(catch_block, catch_var.as_deref());
                }
                if let Some(finally_block) = finally_block {
                    self.block(finally_block, None);
                }
            }
            StmtKind::Export(inner) => self.stmt(inner, top_level),
            StmtKind::Break | StmtKind::Continue | StmtKind::Import(_) => {}
        }
    }

    fn class(&mut self, decl: &mut ClassDecl) {
        if let Some(parent) = &decl.superclass {
            if let Some(renamed) = self.rename(parent, false) {
                decl.superclass = Some(renamed);
            }
        }
        let saved = std::mem::take(&mut self.locals);
        for field in &mut decl.fields {
            if let Some(annotation) = &mut field.type_annotation {
                self.annotation(annotation);
            }
            if let Some(init) = &mut field.initializer {
                self.expr(init);
            }
        }
        self.locals = saved;
        for method in &mut decl.methods {
            self.function(&mut method.params, method.return_type.as_mut(), &mut method.body);
        }
    }

    fn function(
        &mut self,
        params: &mut [Parameter],
        return_type: Option<&mut TypeAnnotation>,
        body: &mut [Stmt],
    ) {
        for param in params.iter_mut() {
            if let Some(annotation) = &mut param.type_annotation {
                self.annotation(annotation);
            }
        }
        if let Some(annotation) = return_type {
            self.annotation(annotation);
        }

        let saved = std::mem::take(&mut self.locals);
        self.locals.push(params.iter().map(|p| p.name.clone()).collect());
        for stmt in body {
            self.stmt(stmt, false);
        }
        self.locals = saved;
    }

    fn expr(&mut self, expr: &mut Expr) {
        if matches!(expr.kind, ExprKind::Identifier(_) | ExprKind::Member { .. }) {
            if let Some(path) = expr.dotted_name() {
                if let Some(renamed) = self.rename_chain(&path, expr) {
                    *expr = renamed;
                    return;
                }
            }
        }

        match &mut expr.kind {
            ExprKind::IntLiteral(_)
            | ExprKind::FloatLiteral(_)
            | ExprKind::StringLiteral(_)
            | ExprKind::BoolLiteral(_)
            | ExprKind::Null
            | ExprKind::Identifier(_) => {}
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Call { name, arguments } => {
                if let Some(renamed) = self.rename(name, true) {
                    *name = renamed;
                }
                self.exprs(arguments);
            }
            ExprKind::MethodCall {
                receiver,
                arguments,
                ..
            } => {
                self.expr(receiver);
                self.exprs(arguments);
            }
            ExprKind::Member { object, .. } => self.expr(object),
            ExprKind::Index { object, index } => {
                self.expr(object);
                self.expr(index);
            }
            ExprKind::List(items) | ExprKind::Tuple(items) => self.exprs(items),
            ExprKind::Map(entries) => {
                for (key, value) in entries {
                    self.expr(key);
                    self.expr(value);
                }
            }
            ExprKind::Lambda {
                params,
                return_type,
                body,
            } => self.function(params, return_type.as_mut(), body),
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.expr(then_branch);
                self.expr(else_branch);
            }
            ExprKind::New {
                class_name,
                arguments,
            } => {
                if let Some(renamed) = self.rename(class_name, false) {
                    *class_name = renamed;
                }
                self.exprs(arguments);
            }
        }
    }

    fn exprs(&mut self, exprs: &mut [Expr]) {
        for expr in exprs {
            self.expr(expr);
        }
    }

    /// Rebuild an identifier/member chain whose prefix is renamed: the
    /// renamed prefix becomes one (dotted) identifier and the remaining
    /// segments stay member accesses.
    fn rename_chain(&self, path: &str, expr: &Expr) -> Option<Expr> {
        let (renamed, consumed) = self.lookup(path, true)?;
        let span = expr.span;
        let rebuilt = path.split('.').skip(consumed).fold(
            Expr::new(ExprKind::Identifier(renamed), span),
            |object, name| {
                Expr::new(
                    ExprKind::Member {
                        object: Box::new(object),
                        name: name.to_string(),
                    },
                    span,
                )
            },
        );
        Some(rebuilt)
    }

    fn annotation(&self, annotation: &mut TypeAnnotation) {
        match &mut annotation.kind {
            TypeKind::Named(name) => {
                if let Some(renamed) = self.rename(name, false) {
                    *name = renamed;
                }
            }
            TypeKind::List(inner) | TypeKind::Set(inner) | TypeKind::Optional(inner) => {
                self.annotation(inner)
            }
            TypeKind::Map(key, value) => {
                self.annotation(key);
                self.annotation(value);
            }
            TypeKind::Tuple(items) => {
                for item in items {
                    self.annotation(item);
                }
            }
            TypeKind::Function {
                params,
                return_type,
            } => {
                for param in params {
                    self.annotation(param);
                }
                self.annotation(return_type);
            }
        }
    }
}
