//! `String.*` natives. Positions and lengths count characters.

use regex::Regex;

use crate::vm::value::Value;

use super::{int_arg, slice_bounds, string_arg, Arity, NativeRegistry};

pub fn register(registry: &mut NativeRegistry) {
    registry.register("String.length", Arity::Exact(1), |_, args| {
        Ok(Value::Int(string_arg(args, 0)?.chars().count() as i64))
    });

    registry.register("String.upper", Arity::Exact(1), |_, args| {
        Ok(Value::String(string_arg(args, 0)?.to_uppercase()))
    });

    registry.register("String.lower", Arity::Exact(1), |_, args| {
        Ok(Value::String(string_arg(args, 0)?.to_lowercase()))
    });

    registry.register("String.trim", Arity::Exact(1), |_, args| {
        Ok(Value::String(string_arg(args, 0)?.trim().to_string()))
    });

    // An empty separator splits into characters.
    registry.register("String.split", Arity::Exact(2), |_, args| {
        let s = string_arg(args, 0)?;
        let separator = string_arg(args, 1)?;
        let parts: Vec<Value> = if separator.is_empty() {
            s.chars().map(|c| Value::String(c.to_string())).collect()
        } else {
            s.split(separator).map(Value::from).collect()
        };
        Ok(Value::list(parts))
    });

    registry.register("String.slice", Arity::Range(2, 3), |_, args| {
        let chars: Vec<char> = string_arg(args, 0)?.chars().collect();
        let end = match args.get(2) {
            Some(_) => Some(int_arg(args, 2)?),
            None => None,
        };
        let (start, end) = slice_bounds(int_arg(args, 1)?, end, chars.len());
        Ok(Value::String(chars[start..end].iter().collect()))
    });

    registry.register("String.contains", Arity::Exact(2), |_, args| {
        Ok(Value::Bool(string_arg(args, 0)?.contains(string_arg(args, 1)?)))
    });

    registry.register("String.replace", Arity::Exact(3), |_, args| {
        let s = string_arg(args, 0)?;
        Ok(Value::String(
            s.replace(string_arg(args, 1)?, string_arg(args, 2)?),
        ))
    });

    // Character position of the first match, or -1.
    registry.register("String.index_of", Arity::Exact(2), |_, args| {
        let s = string_arg(args, 0)?;
        let needle = string_arg(args, 1)?;
        Ok(Value::Int(match s.find(needle) {
            Some(byte) => s[..byte].chars().count() as i64,
            None => -1,
        }))
    });

    registry.register("String.starts_with", Arity::Exact(2), |_, args| {
        Ok(Value::Bool(string_arg(args, 0)?.starts_with(string_arg(args, 1)?)))
    });

    registry.register("String.ends_with", Arity::Exact(2), |_, args| {
        Ok(Value::Bool(string_arg(args, 0)?.ends_with(string_arg(args, 1)?)))
    });

    registry.register("String.to_int", Arity::Exact(1), |_, args| {
        let s = string_arg(args, 0)?;
        s.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("cannot convert \"{}\" to Int", s))
    });

    registry.register("String.to_float", Arity::Exact(1), |_, args| {
        let s = string_arg(args, 0)?;
        s.trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("cannot convert \"{}\" to Float", s))
    });

    registry.register("String.matches", Arity::Exact(2), |_, args| {
        let s = string_arg(args, 0)?;
        let pattern = string_arg(args, 1)?;
        let re = Regex::new(pattern).map_err(|e| format!("invalid pattern: {}", e))?;
        Ok(Value::Bool(re.is_match(s)))
    });
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::testing::call;
    use crate::vm::value::Value;

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn length_of_hello_is_five() {
        assert_eq!(call("String.length", vec![s("hello")]).unwrap(), Value::Int(5));
    }

    #[test]
    fn case_and_trim() {
        assert_eq!(call("String.upper", vec![s("abc")]).unwrap(), s("ABC"));
        assert_eq!(call("String.lower", vec![s("AbC")]).unwrap(), s("abc"));
        assert_eq!(call("String.trim", vec![s("  x ")]).unwrap(), s("x"));
    }

    #[test]
    fn split_and_slice() {
        assert_eq!(
            call("String.split", vec![s("a,b,c"), s(",")]).unwrap(),
            Value::list(vec![s("a"), s("b"), s("c")])
        );
        assert_eq!(
            call("String.split", vec![s("ab"), s("")]).unwrap(),
            Value::list(vec![s("a"), s("b")])
        );
        assert_eq!(
            call("String.slice", vec![s("hello"), Value::Int(1), Value::Int(3)]).unwrap(),
            s("el")
        );
        assert_eq!(
            call("String.slice", vec![s("hello"), Value::Int(2)]).unwrap(),
            s("llo")
        );
    }

    #[test]
    fn searching() {
        assert_eq!(
            call("String.index_of", vec![s("héllo"), s("l")]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            call("String.index_of", vec![s("abc"), s("z")]).unwrap(),
            Value::Int(-1)
        );
        assert_eq!(
            call("String.contains", vec![s("abc"), s("bc")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("String.replace", vec![s("a-b-c"), s("-"), s("+")]).unwrap(),
            s("a+b+c")
        );
        assert_eq!(
            call("String.starts_with", vec![s("tern"), s("te")]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn regex_matching() {
        assert_eq!(
            call("String.matches", vec![s("abc123"), s(r"^[a-z]+\d+$")]).unwrap(),
            Value::Bool(true)
        );
        assert!(call("String.matches", vec![s("x"), s("(")]).is_err());
    }

    #[test]
    fn numeric_parsing() {
        assert_eq!(call("String.to_int", vec![s("12")]).unwrap(), Value::Int(12));
        assert_eq!(
            call("String.to_float", vec![s("1.5")]).unwrap(),
            Value::Float(1.5)
        );
        assert!(call("String.to_int", vec![s("1.5")]).is_err());
    }
}
