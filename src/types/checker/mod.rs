//! Semantic analyzer for Tern.
//!
//! A single depth-first walk over an import-resolved program. Every list of
//! statements is checked in two passes: the first registers the functions,
//! classes, contracts and modules it declares (so siblings can refer to each
//! other in any order), the second checks bodies. The first violation aborts
//! the analysis.

mod declarations;
mod expressions;
mod statements;

use crate::ast::*;
use crate::error::SemanticError;
use crate::span::Span;
use crate::types::symbol::SymbolTable;
use crate::types::type_repr::Type;

pub(crate) type SemanticResult<T> = Result<T, SemanticError>;

/// Natives callable by plain name.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "print", "println", "len", "str", "int", "float", "type_of", "input",
];

/// Namespaces whose dotted calls are natives and are not arity-checked.
pub const BUILTIN_NAMESPACES: &[&str] = &[
    "List", "Map", "String", "Int", "Float", "Math", "System", "Json", "Crypto", "Http", "File",
];

/// True for names such as `String.length` that live in a native namespace.
pub fn is_builtin_namespaced(name: &str) -> bool {
    name.split_once('.')
        .map(|(ns, _)| BUILTIN_NAMESPACES.contains(&ns))
        .unwrap_or(false)
}

/// The type of every checked expression, in visiting order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeAnnotations {
    entries: Vec<(Span, Type)>,
}

impl TypeAnnotations {
    pub fn record(&mut self, span: Span, ty: Type) {
        self.entries.push((span, ty));
    }

    /// The type recorded for the expression at `span`; for nested
    /// expressions sharing a span this is the outermost one.
    pub fn type_at(&self, span: Span) -> Option<&Type> {
        self.entries
            .iter()
            .rev()
            .find(|(s, _)| *s == span)
            .map(|(_, ty)| ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Span, Type)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Checks scopes and types of a program.
pub struct Analyzer {
    pub(crate) symbols: SymbolTable,
    pub(crate) annotations: TypeAnnotations,
    /// Declared return type of each enclosing function, innermost last.
    pub(crate) return_types: Vec<Type>,
    /// Enclosing class names, innermost last.
    pub(crate) classes: Vec<String>,
    /// Scope depth at which each enclosing function body starts. Locals
    /// below the innermost one are not visible at run time.
    pub(crate) function_bases: Vec<usize>,
    pub(crate) loop_depth: usize,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            annotations: TypeAnnotations::default(),
            return_types: Vec::new(),
            classes: Vec::new(),
            function_bases: Vec::new(),
            loop_depth: 0,
        }
    }

    /// Analyze a complete program and return the type of every expression.
    pub fn analyze(&mut self, program: &Program) -> SemanticResult<TypeAnnotations> {
        self.annotations = TypeAnnotations::default();
        self.check_block(&program.statements)?;
        tracing::debug!(
            expressions = self.annotations.len(),
            "semantic analysis complete"
        );
        Ok(std::mem::take(&mut self.annotations))
    }

    /// Both passes over one statement list, in the current scope.
    pub(crate) fn check_block(&mut self, statements: &[Stmt]) -> SemanticResult<()> {
        self.declare_siblings(statements)?;
        for stmt in statements {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    /// Like `check_block`, inside a fresh scope.
    pub(crate) fn check_scoped_block(&mut self, statements: &[Stmt]) -> SemanticResult<()> {
        self.symbols.enter_scope();
        let result = self.check_block(statements);
        self.symbols.exit_scope();
        result
    }

    pub(crate) fn resolve_type(&self, annotation: &TypeAnnotation) -> SemanticResult<Type> {
        Ok(match &annotation.kind {
            TypeKind::Named(name) => match name.as_str() {
                "Int" => Type::Int,
                "Float" => Type::Float,
                "String" => Type::String,
                "Bool" => Type::Bool,
                "Null" => Type::Null,
                "Any" => Type::any(),
                // Bare collection names without parameters hold anything
                "List" => Type::List(Box::new(Type::any())),
                "Map" => Type::Map(Box::new(Type::any()), Box::new(Type::any())),
                "Set" => Type::Set(Box::new(Type::any())),
                _ => match self.symbols.lookup(name) {
                    Some(symbol) if symbol.kind.is_class() => Type::named(name.clone()),
                    _ => return Err(SemanticError::UndefinedClass(name.clone(), annotation.span)),
                },
            },
            TypeKind::List(inner) => Type::List(Box::new(self.resolve_type(inner)?)),
            TypeKind::Set(inner) => Type::Set(Box::new(self.resolve_type(inner)?)),
            TypeKind::Map(key, value) => Type::Map(
                Box::new(self.resolve_type(key)?),
                Box::new(self.resolve_type(value)?),
            ),
            TypeKind::Tuple(items) => Type::Tuple(
                items
                    .iter()
                    .map(|t| self.resolve_type(t))
                    .collect::<SemanticResult<_>>()?,
            ),
            TypeKind::Function {
                params,
                return_type,
            } => Type::Function(
                params
                    .iter()
                    .map(|t| self.resolve_type(t))
                    .collect::<SemanticResult<_>>()?,
                Box::new(self.resolve_type(return_type)?),
            ),
            TypeKind::Optional(inner) => Type::Optional(Box::new(self.resolve_type(inner)?)),
        })
    }

    pub(crate) fn resolve_optional(
        &self,
        annotation: Option<&TypeAnnotation>,
    ) -> SemanticResult<Type> {
        match annotation {
            Some(annotation) => self.resolve_type(annotation),
            None => Ok(Type::any()),
        }
    }

    /// Structural compatibility plus subclass-to-superclass for class types.
    pub(crate) fn compatible(&self, actual: &Type, expected: &Type) -> bool {
        if actual.is_compatible(expected) {
            return true;
        }
        match (actual, expected) {
            (Type::Named(child), Type::Named(ancestor)) => {
                self.symbols.is_subclass(child, ancestor)
            }
            (Type::Named(_), Type::Optional(inner)) => self.compatible(actual, inner),
            _ => false,
        }
    }

    pub(crate) fn expect_compatible(
        &self,
        actual: &Type,
        expected: &Type,
        span: Span,
    ) -> SemanticResult<()> {
        if self.compatible(actual, expected) {
            Ok(())
        } else {
            Err(SemanticError::mismatch(
                expected.to_string(),
                actual.to_string(),
                span,
            ))
        }
    }

    pub(crate) fn expect_condition(&self, ty: &Type, span: Span) -> SemanticResult<()> {
        if *ty == Type::Bool || ty.is_any() {
            Ok(())
        } else {
            Err(SemanticError::mismatch("Bool", ty.to_string(), span))
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
