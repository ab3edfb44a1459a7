//! Native functions callable from Tern code.
//!
//! Every native is registered under its full name (`print`,
//! `String.length`) with an arity contract. Arguments arrive in push order,
//! so for a redirected method call the receiver is argument 0.

mod collections;
mod console;
mod crypto;
mod http;
mod json;
mod math;
mod strings;
mod system;

use std::fmt;
use std::io::{BufRead, Write};

use ahash::AHashMap;

use crate::error::RuntimeError;

use super::value::{ListRef, MapRef, Value};

pub use crypto::bytes_to_hex;

/// A native implementation. Errors are plain messages; the registry tags
/// them with the native's name.
pub type NativeFn = fn(&mut NativeContext<'_>, &[Value]) -> Result<Value, String>;

/// How many arguments a native accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// Inclusive bounds.
    Range(usize, usize),
    Variadic,
}

impl Arity {
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Arity::Exact(n) => argc == n,
            Arity::Range(min, max) => (min..=max).contains(&argc),
            Arity::Variadic => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::Range(min, max) => write!(f, "{} to {}", min, max),
            Arity::Variadic => write!(f, "any number of"),
        }
    }
}

/// What a native may touch besides its arguments.
pub struct NativeContext<'a> {
    pub out: &'a mut dyn Write,
    pub input: &'a mut dyn BufRead,
    /// Script arguments, exposed by `System.args`.
    pub args: &'a [String],
}

#[derive(Clone, Copy)]
pub struct Native {
    pub name: &'static str,
    pub arity: Arity,
    pub func: NativeFn,
}

impl Native {
    /// Check the arity and run the native.
    pub fn invoke(&self, ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
        if !self.arity.accepts(args.len()) {
            return Err(RuntimeError::WrongArity {
                name: self.name.to_string(),
                expected: self.arity.to_string(),
                got: args.len(),
            });
        }
        (self.func)(ctx, args).map_err(|message| RuntimeError::native(self.name, message))
    }
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Natives keyed by full name.
#[derive(Debug, Default, Clone)]
pub struct NativeRegistry {
    natives: AHashMap<&'static str, Native>,
}

impl NativeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard library.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        console::register(&mut registry);
        strings::register(&mut registry);
        collections::register(&mut registry);
        math::register(&mut registry);
        json::register(&mut registry);
        crypto::register(&mut registry);
        http::register(&mut registry);
        system::register(&mut registry);
        registry
    }

    pub fn register(&mut self, name: &'static str, arity: Arity, func: NativeFn) {
        self.natives.insert(name, Native { name, arity, func });
    }

    pub fn get(&self, name: &str) -> Option<&Native> {
        self.natives.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.natives.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.natives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.natives.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.natives.keys().copied()
    }
}

// --- Argument helpers shared by the native modules ---

fn mismatch(expected: &str, got: &Value) -> String {
    format!("expects {}, got {}", expected, got.type_name())
}

pub(crate) fn string_arg(args: &[Value], index: usize) -> Result<&str, String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(mismatch("String", other)),
        None => Err(format!("missing argument {}", index + 1)),
    }
}

pub(crate) fn int_arg(args: &[Value], index: usize) -> Result<i64, String> {
    match args.get(index) {
        Some(Value::Int(n)) => Ok(*n),
        Some(other) => Err(mismatch("Int", other)),
        None => Err(format!("missing argument {}", index + 1)),
    }
}

pub(crate) fn number_arg(args: &[Value], index: usize) -> Result<f64, String> {
    match args.get(index) {
        Some(value) => value.as_f64().ok_or_else(|| mismatch("number", value)),
        None => Err(format!("missing argument {}", index + 1)),
    }
}

pub(crate) fn list_arg(args: &[Value], index: usize) -> Result<ListRef, String> {
    match args.get(index) {
        Some(Value::List(items)) => Ok(items.clone()),
        Some(other) => Err(mismatch("List", other)),
        None => Err(format!("missing argument {}", index + 1)),
    }
}

pub(crate) fn map_arg(args: &[Value], index: usize) -> Result<MapRef, String> {
    match args.get(index) {
        Some(Value::Map(map)) => Ok(map.clone()),
        Some(other) => Err(mismatch("Map", other)),
        None => Err(format!("missing argument {}", index + 1)),
    }
}

/// A list index, checked against `len` (`inclusive` allows `len` itself).
pub(crate) fn checked_index(index: i64, len: usize, inclusive: bool) -> Result<usize, String> {
    let limit = if inclusive { len + 1 } else { len };
    usize::try_from(index)
        .ok()
        .filter(|&i| i < limit)
        .ok_or_else(|| format!("index {} out of bounds (length {})", index, len))
}

/// Clamp `[start, end)` slice bounds to `len`.
pub(crate) fn slice_bounds(start: i64, end: Option<i64>, len: usize) -> (usize, usize) {
    let clamp = |n: i64| n.clamp(0, len as i64) as usize;
    let start = clamp(start);
    let end = end.map(clamp).unwrap_or(len);
    (start, end.max(start))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Cursor;

    use super::*;

    /// Call a default native with no console input.
    pub fn call(name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        call_with_output(name, args).map(|(value, _)| value)
    }

    /// Call a default native, returning its result and what it printed.
    pub fn call_with_output(name: &str, args: Vec<Value>) -> Result<(Value, String), RuntimeError> {
        let registry = NativeRegistry::with_defaults();
        let native = registry
            .get(name)
            .copied()
            .unwrap_or_else(|| panic!("no native named {}", name));
        let mut out = Vec::new();
        let mut input = Cursor::new(Vec::new());
        let script_args = vec!["one".to_string(), "two".to_string()];
        let mut ctx = NativeContext {
            out: &mut out,
            input: &mut input,
            args: &script_args,
        };
        let value = native.invoke(&mut ctx, &args)?;
        Ok((value, String::from_utf8_lossy(&out).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::call;
    use super::*;

    #[test]
    fn arity_contracts() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(3));
        assert!(Arity::Range(1, 2).accepts(1));
        assert!(!Arity::Range(1, 2).accepts(0));
        assert!(Arity::Variadic.accepts(0));
    }

    #[test]
    fn wrong_arity_names_the_native() {
        let err = call("String.length", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "String.length expects 1 arguments but got 0");
    }

    #[test]
    fn native_errors_are_tagged() {
        let err = call("String.upper", vec![Value::Int(1)]).unwrap_err();
        assert_eq!(err.to_string(), "String.upper: expects String, got Int");
    }

    #[test]
    fn every_namespace_is_populated() {
        let registry = NativeRegistry::with_defaults();
        for namespace in crate::types::checker::BUILTIN_NAMESPACES {
            assert!(
                registry
                    .names()
                    .any(|name| name.starts_with(&format!("{}.", namespace))),
                "no natives in {}",
                namespace
            );
        }
        for name in crate::types::checker::BUILTIN_FUNCTIONS {
            assert!(registry.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn slice_bounds_are_clamped() {
        assert_eq!(slice_bounds(1, Some(3), 5), (1, 3));
        assert_eq!(slice_bounds(-2, Some(99), 5), (0, 5));
        assert_eq!(slice_bounds(4, Some(2), 5), (4, 4));
        assert_eq!(slice_bounds(2, None, 5), (2, 5));
    }
}
