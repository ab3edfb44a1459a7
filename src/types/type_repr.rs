//! Static type representation used by the analyzer.

use std::fmt;

/// A Tern type. `Named("Any")` is the dynamic wildcard: it is compatible
/// with every type in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Null,
    List(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Set(Box<Type>),
    Tuple(Vec<Type>),
    Function(Vec<Type>, Box<Type>),
    /// Class, contract, module or `Any`; compared by name
    Named(String),
    Optional(Box<Type>),
}

pub const ANY: &str = "Any";

impl Type {
    pub fn any() -> Type {
        Type::Named(ANY.to_string())
    }

    pub fn named(name: impl Into<String>) -> Type {
        Type::Named(name.into())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Named(name) if name == ANY)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Structural compatibility. Symmetric, with `Any` matching everything,
    /// Int and Float interchangeable, and `Null`/`T` both fitting `T?`.
    pub fn is_compatible(&self, other: &Type) -> bool {
        if self.is_any() || other.is_any() || self == other {
            return true;
        }

        match (self, other) {
            (Type::Int, Type::Float) | (Type::Float, Type::Int) => true,
            (Type::List(a), Type::List(b)) | (Type::Set(a), Type::Set(b)) => a.is_compatible(b),
            (Type::Map(k1, v1), Type::Map(k2, v2)) => k1.is_compatible(k2) && v1.is_compatible(v2),
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_compatible(y))
            }
            (Type::Function(p1, r1), Type::Function(p2, r2)) => {
                p1.len() == p2.len()
                    && p1.iter().zip(p2).all(|(x, y)| x.is_compatible(y))
                    && r1.is_compatible(r2)
            }
            (Type::Optional(a), Type::Optional(b)) => a.is_compatible(b),
            (Type::Null, Type::Optional(_)) | (Type::Optional(_), Type::Null) => true,
            (Type::Optional(inner), t) | (t, Type::Optional(inner)) => inner.is_compatible(t),
            _ => false,
        }
    }

    /// The element type produced by iterating over a value of this type.
    pub fn element_type(&self) -> Option<Type> {
        match self {
            Type::List(inner) | Type::Set(inner) => Some((**inner).clone()),
            Type::String => Some(Type::String),
            Type::Tuple(_) => Some(Type::any()),
            t if t.is_any() => Some(Type::any()),
            _ => None,
        }
    }

    /// Least common type of two branches: equal types stay, mixed numbers
    /// widen to Float, anything else becomes `Any`.
    pub fn join(&self, other: &Type) -> Type {
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Type::Int, Type::Float) | (Type::Float, Type::Int) => Type::Float,
            (Type::Null, t) | (t, Type::Null) if !t.is_any() => match t {
                Type::Optional(_) => t.clone(),
                _ => Type::Optional(Box::new(t.clone())),
            },
            _ => Type::any(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::String => write!(f, "String"),
            Type::Bool => write!(f, "Bool"),
            Type::Null => write!(f, "Null"),
            Type::List(inner) => write!(f, "List<{}>", inner),
            Type::Map(key, value) => write!(f, "Map<{}, {}>", key, value),
            Type::Set(inner) => write!(f, "Set<{}>", inner),
            Type::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Type::Function(params, ret) => {
                write!(f, "fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") -> {}", ret)
            }
            Type::Named(name) => write!(f, "{}", name),
            Type::Optional(inner) => write!(f, "{}?", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_is_a_wildcard_both_ways() {
        let list = Type::List(Box::new(Type::Int));
        assert!(Type::any().is_compatible(&list));
        assert!(list.is_compatible(&Type::any()));
        assert!(Type::Function(vec![Type::any()], Box::new(Type::Int))
            .is_compatible(&Type::Function(vec![Type::String], Box::new(Type::any()))));
    }

    #[test]
    fn numbers_are_cross_compatible() {
        assert!(Type::Int.is_compatible(&Type::Float));
        assert!(Type::Float.is_compatible(&Type::Int));
        assert!(!Type::Int.is_compatible(&Type::String));
    }

    #[test]
    fn optional_accepts_null_and_inner() {
        let opt = Type::Optional(Box::new(Type::String));
        assert!(Type::Null.is_compatible(&opt));
        assert!(Type::String.is_compatible(&opt));
        assert!(!Type::Bool.is_compatible(&opt));
        assert!(!Type::Null.is_compatible(&Type::String));
    }

    #[test]
    fn named_types_compare_nominally() {
        assert!(Type::named("Dog").is_compatible(&Type::named("Dog")));
        assert!(!Type::named("Dog").is_compatible(&Type::named("Cat")));
    }

    #[test]
    fn join_widens() {
        assert_eq!(Type::Int.join(&Type::Float), Type::Float);
        assert_eq!(Type::Int.join(&Type::String), Type::any());
        assert_eq!(
            Type::Null.join(&Type::Int),
            Type::Optional(Box::new(Type::Int))
        );
    }

    #[test]
    fn display_matches_annotation_syntax() {
        let t = Type::Map(
            Box::new(Type::String),
            Box::new(Type::List(Box::new(Type::Int))),
        );
        assert_eq!(t.to_string(), "Map<String, List<Int>>");
        assert_eq!(
            Type::Function(vec![Type::Int], Box::new(Type::Bool)).to_string(),
            "fn(Int) -> Bool"
        );
    }
}
