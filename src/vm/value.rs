//! Runtime values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// Reserved map key holding an instance's class name.
pub const TYPE_KEY: &str = "__type__";

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<IndexMap<String, Value>>>;

/// A runtime value. Scalars are copied; lists and maps share their storage
/// with every copy of the handle.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
    List(ListRef),
    Map(MapRef),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: IndexMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    /// A fresh instance of `class`: a map holding only its type tag.
    pub fn instance(class: &str) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(TYPE_KEY.to_string(), Value::String(class.to_string()));
        Value::map(fields)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bool(_) => "Bool",
            Value::Null => "Null",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
        }
    }

    /// Only `null` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    /// The class of an instance, or `None` for plain values and maps.
    pub fn class_name(&self) -> Option<String> {
        match self {
            Value::Map(map) => match map.borrow().get(TYPE_KEY) {
                Some(Value::String(class)) => Some(class.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Map keys are strings; other values are keyed by their display form.
    pub fn to_key(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Identity of a list or map's storage.
    fn storage(&self) -> Option<*const ()> {
        match self {
            Value::List(items) => Some(Rc::as_ptr(items) as *const ()),
            Value::Map(map) => Some(Rc::as_ptr(map) as *const ()),
            _ => None,
        }
    }

    /// Writes the value. `open` holds the collections currently being
    /// written; meeting one again prints `[...]` or `{...}`.
    fn write_to(
        &self,
        f: &mut fmt::Formatter<'_>,
        open: &mut Vec<*const ()>,
        quoted: bool,
    ) -> fmt::Result {
        if let Some(ptr) = self.storage() {
            if open.contains(&ptr) {
                return match self {
                    Value::List(_) => write!(f, "[...]"),
                    _ => write!(f, "{{...}}"),
                };
            }
            open.push(ptr);
        }
        let result = match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            // Strings are quoted inside collections.
            Value::String(s) if quoted => write!(f, "\"{}\"", s),
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.write_to(f, open, true)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": ", key)?;
                    value.write_to(f, open, true)?;
                }
                write!(f, "}}")
            }
        };
        if self.storage().is_some() {
            open.pop();
        }
        result
    }

    /// Structural comparison. A pair of collections already under
    /// comparison counts as equal, so self-containing values terminate.
    fn equals(&self, other: &Self, open: &mut Vec<(*const (), *const ())>) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ());
                if open.contains(&pair) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return false;
                }
                open.push(pair);
                let equal = a.iter().zip(b.iter()).all(|(x, y)| x.equals(y, open));
                open.pop();
                equal
            }
            (Value::Map(a), Value::Map(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ());
                if open.contains(&pair) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return false;
                }
                open.push(pair);
                let equal = a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| x.equals(y, open)));
                open.pop();
                equal
            }
            _ => false,
        }
    }
}

/// Structural equality. `Int` and `Float` compare numerically.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, &mut Vec::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, &mut Vec::new(), false)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_share_storage_between_copies() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = a.clone();
        if let Value::List(items) = &b {
            items.borrow_mut().push(Value::Int(2));
        }
        assert_eq!(a.to_string(), "[1, 2]");
    }

    #[test]
    fn numbers_compare_across_kinds() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
        assert_ne!(Value::Int(3), Value::String("3".into()));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
        let list = Value::list(vec!["a".into(), Value::Null, Value::Bool(true)]);
        assert_eq!(list.to_string(), "[\"a\", null, true]");
        assert_eq!(Value::instance("Point").to_string(), "{\"__type__\": \"Point\"}");
    }

    #[test]
    fn self_containing_collections_print_and_compare() {
        let a = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &a {
            items.borrow_mut().push(a.clone());
        }
        assert_eq!(a.to_string(), "[1, [...]]");

        let b = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &b {
            items.borrow_mut().push(b.clone());
        }
        assert_eq!(a, b);

        let m = Value::map(IndexMap::new());
        if let Value::Map(map) = &m {
            map.borrow_mut().insert("me".to_string(), m.clone());
        }
        assert_eq!(m.to_string(), "{\"me\": {...}}");
    }

    #[test]
    fn maps_compare_by_entries() {
        let mut x = IndexMap::new();
        x.insert("a".to_string(), Value::Int(1));
        x.insert("b".to_string(), Value::Int(2));
        let mut y = IndexMap::new();
        y.insert("b".to_string(), Value::Int(2));
        y.insert("a".to_string(), Value::Int(1));
        assert_eq!(Value::map(x), Value::map(y));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn instances_carry_their_class() {
        assert_eq!(Value::instance("Dog").class_name().as_deref(), Some("Dog"));
        assert_eq!(Value::map(IndexMap::new()).class_name(), None);
    }
}
