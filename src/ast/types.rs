//! Type annotation AST nodes.

use crate::span::Span;

/// A type annotation in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub kind: TypeKind,
    pub span: Span,
}

impl TypeAnnotation {
    pub fn new(kind: TypeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The kinds of types that can be written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Int, Float, String, Bool, Null, Any, or a (possibly dotted) class name
    Named(String),
    /// List<T>
    List(Box<TypeAnnotation>),
    /// Map<K, V>
    Map(Box<TypeAnnotation>, Box<TypeAnnotation>),
    /// Set<T>
    Set(Box<TypeAnnotation>),
    /// (A, B)
    Tuple(Vec<TypeAnnotation>),
    /// fn(A, B) -> C
    Function {
        params: Vec<TypeAnnotation>,
        return_type: Box<TypeAnnotation>,
    },
    /// T?
    Optional(Box<TypeAnnotation>),
}

impl std::fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TypeKind::Named(name) => write!(f, "{}", name),
            TypeKind::List(inner) => write!(f, "List<{}>", inner),
            TypeKind::Map(key, value) => write!(f, "Map<{}, {}>", key, value),
            TypeKind::Set(inner) => write!(f, "Set<{}>", inner),
            TypeKind::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            TypeKind::Function {
                params,
                return_type,
            } => {
                write!(f, "fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") -> {}", return_type)
            }
            TypeKind::Optional(inner) => write!(f, "{}?", inner),
        }
    }
}
