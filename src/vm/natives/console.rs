//! Console and conversion natives.

use std::io::{BufRead, Write};

use crate::vm::value::Value;

use super::math::float_to_int;
use super::{Arity, NativeContext, NativeRegistry};

pub fn register(registry: &mut NativeRegistry) {
    registry.register("print", Arity::Variadic, print);
    registry.register("println", Arity::Variadic, print);
    registry.register("input", Arity::Range(0, 1), input);

    registry.register("str", Arity::Exact(1), |_, args| {
        Ok(Value::String(args[0].to_string()))
    });

    registry.register("int", Arity::Exact(1), |_, args| match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(n) => float_to_int(*n, f64::trunc).map(Value::Int),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("cannot convert \"{}\" to Int", s)),
        other => Err(format!("cannot convert {} to Int", other.type_name())),
    });

    registry.register("float", Arity::Exact(1), |_, args| match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(n) => Ok(Value::Float(*n)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("cannot convert \"{}\" to Float", s)),
        other => Err(format!("cannot convert {} to Float", other.type_name())),
    });

    registry.register("len", Arity::Exact(1), |_, args| match &args[0] {
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::List(items) => Ok(Value::Int(items.borrow().len() as i64)),
        Value::Map(map) => Ok(Value::Int(map.borrow().len() as i64)),
        other => Err(format!("{} has no length", other.type_name())),
    });

    // Instances report their class.
    registry.register("type_of", Arity::Exact(1), |_, args| {
        Ok(Value::String(
            args[0]
                .class_name()
                .unwrap_or_else(|| args[0].type_name().to_string()),
        ))
    });
}

/// Arguments separated by spaces, then a newline.
fn print(ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    let line: Vec<String> = args.iter().map(Value::to_string).collect();
    writeln!(ctx.out, "{}", line.join(" ")).map_err(|e| e.to_string())?;
    Ok(Value::Null)
}

/// Read one line without its terminator; `null` at end of input.
fn input(ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    if let Some(prompt) = args.first() {
        write!(ctx.out, "{}", prompt).map_err(|e| e.to_string())?;
        ctx.out.flush().map_err(|e| e.to_string())?;
    }
    let mut line = String::new();
    let read = ctx.input.read_line(&mut line).map_err(|e| e.to_string())?;
    if read == 0 {
        return Ok(Value::Null);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']);
    Ok(Value::String(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::testing::{call, call_with_output};
    use crate::vm::value::Value;

    #[test]
    fn print_joins_with_spaces() {
        let (value, out) =
            call_with_output("print", vec!["a".into(), Value::Int(1), Value::Float(2.0)]).unwrap();
        assert_eq!(value, Value::Null);
        assert_eq!(out, "a 1 2.0\n");
    }

    #[test]
    fn conversions() {
        assert_eq!(call("int", vec![" 42 ".into()]).unwrap(), Value::Int(42));
        assert_eq!(call("int", vec![Value::Float(3.9)]).unwrap(), Value::Int(3));
        assert_eq!(call("float", vec![Value::Int(2)]).unwrap(), Value::Float(2.0));
        assert_eq!(
            call("str", vec![Value::list(vec![Value::Int(1)])]).unwrap(),
            Value::String("[1]".into())
        );
        assert!(call("int", vec!["abc".into()]).is_err());
    }

    #[test]
    fn int_rejects_floats_outside_the_int_range() {
        let err = call("int", vec![Value::Float(1e30)]).unwrap_err();
        assert!(err.to_string().contains("does not fit in an Int"), "{}", err);
        assert!(call("int", vec![Value::Float(f64::NAN)]).is_err());
        assert!(call("int", vec![Value::Float(f64::NEG_INFINITY)]).is_err());
        assert_eq!(call("int", vec![Value::Float(-7.8)]).unwrap(), Value::Int(-7));
    }

    #[test]
    fn len_counts_characters_and_elements() {
        assert_eq!(call("len", vec!["héllo".into()]).unwrap(), Value::Int(5));
        assert_eq!(
            call("len", vec![Value::list(vec![Value::Null, Value::Null])]).unwrap(),
            Value::Int(2)
        );
        assert!(call("len", vec![Value::Int(3)]).is_err());
    }

    #[test]
    fn type_of_reports_class_for_instances() {
        assert_eq!(call("type_of", vec![Value::Int(1)]).unwrap(), Value::String("Int".into()));
        assert_eq!(
            call("type_of", vec![Value::instance("Dog")]).unwrap(),
            Value::String("Dog".into())
        );
    }

    #[test]
    fn input_at_end_of_stream_is_null() {
        assert_eq!(call("input", vec![]).unwrap(), Value::Null);
    }
}
