//! Numeric natives: `Math.*`, `Int.*` and `Float.*`.

use rand::Rng;

use crate::vm::value::Value;

use super::{int_arg, number_arg, Arity, NativeRegistry};

pub fn register(registry: &mut NativeRegistry) {
    registry.register("Math.floor", Arity::Exact(1), |_, args| round_with(args, f64::floor));
    registry.register("Math.ceil", Arity::Exact(1), |_, args| round_with(args, f64::ceil));
    registry.register("Math.round", Arity::Exact(1), |_, args| round_with(args, f64::round));

    registry.register("Math.sqrt", Arity::Exact(1), |_, args| {
        Ok(Value::Float(number_arg(args, 0)?.sqrt()))
    });
    registry.register("Math.sin", Arity::Exact(1), |_, args| {
        Ok(Value::Float(number_arg(args, 0)?.sin()))
    });
    registry.register("Math.cos", Arity::Exact(1), |_, args| {
        Ok(Value::Float(number_arg(args, 0)?.cos()))
    });
    registry.register("Math.tan", Arity::Exact(1), |_, args| {
        Ok(Value::Float(number_arg(args, 0)?.tan()))
    });

    registry.register("Math.abs", Arity::Exact(1), |_, args| abs(args));

    registry.register("Math.pow", Arity::Exact(2), |_, args| {
        Ok(Value::Float(number_arg(args, 0)?.powf(number_arg(args, 1)?)))
    });

    registry.register("Math.min", Arity::Exact(2), |_, args| match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(*a.min(b))),
        _ => Ok(Value::Float(number_arg(args, 0)?.min(number_arg(args, 1)?))),
    });

    registry.register("Math.max", Arity::Exact(2), |_, args| match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(*a.max(b))),
        _ => Ok(Value::Float(number_arg(args, 0)?.max(number_arg(args, 1)?))),
    });

    // Uniform in [0, 1).
    registry.register("Math.random", Arity::Exact(0), |_, _| {
        Ok(Value::Float(rand::thread_rng().gen::<f64>()))
    });

    // Uniform in [min, max], both inclusive.
    registry.register("Math.random_int", Arity::Exact(2), |_, args| {
        let (min, max) = (int_arg(args, 0)?, int_arg(args, 1)?);
        if min > max {
            return Err(format!("empty range {}..{}", min, max));
        }
        Ok(Value::Int(rand::thread_rng().gen_range(min..=max)))
    });

    registry.register("Math.pi", Arity::Exact(0), |_, _| {
        Ok(Value::Float(std::f64::consts::PI))
    });

    registry.register("Int.to_string", Arity::Exact(1), |_, args| {
        Ok(Value::String(int_arg(args, 0)?.to_string()))
    });
    registry.register("Int.abs", Arity::Exact(1), |_, args| {
        int_arg(args, 0)?;
        abs(args)
    });

    registry.register("Float.to_string", Arity::Exact(1), |_, args| {
        float_arg(args)?;
        Ok(Value::String(args[0].to_string()))
    });
    registry.register("Float.abs", Arity::Exact(1), |_, args| {
        Ok(Value::Float(float_arg(args)?.abs()))
    });
    registry.register("Float.floor", Arity::Exact(1), |_, args| {
        float_arg(args)?;
        round_with(args, f64::floor)
    });
    registry.register("Float.ceil", Arity::Exact(1), |_, args| {
        float_arg(args)?;
        round_with(args, f64::ceil)
    });
    registry.register("Float.round", Arity::Exact(1), |_, args| {
        float_arg(args)?;
        round_with(args, f64::round)
    });
}

fn float_arg(args: &[Value]) -> Result<f64, String> {
    match &args[0] {
        Value::Float(n) => Ok(*n),
        other => Err(format!("expects Float, got {}", other.type_name())),
    }
}

/// Integers pass through; floats are rounded to an `Int`.
fn round_with(args: &[Value], round: fn(f64) -> f64) -> Result<Value, String> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(n) => float_to_int(*n, round).map(Value::Int),
        other => Err(format!("expects number, got {}", other.type_name())),
    }
}

/// `round(n)` as an `Int`, or an error when it is not finite or out of range.
pub(super) fn float_to_int(n: f64, round: fn(f64) -> f64) -> Result<i64, String> {
    let rounded = round(n);
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Ok(rounded as i64)
    } else {
        Err(format!("{} does not fit in an Int", n))
    }
}

fn abs(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| "Integer overflow".to_string()),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        other => Err(format!("expects number, got {}", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::testing::call;
    use crate::vm::value::Value;

    #[test]
    fn rounding_returns_ints() {
        assert_eq!(call("Math.floor", vec![Value::Float(2.7)]).unwrap(), Value::Int(2));
        assert_eq!(call("Math.ceil", vec![Value::Float(2.1)]).unwrap(), Value::Int(3));
        assert_eq!(call("Math.round", vec![Value::Float(-2.5)]).unwrap(), Value::Int(-3));
        assert_eq!(call("Math.floor", vec![Value::Int(4)]).unwrap(), Value::Int(4));
        assert!(call("Math.floor", vec![Value::Float(f64::NAN)]).is_err());
    }

    #[test]
    fn min_max_keep_ints() {
        assert_eq!(
            call("Math.min", vec![Value::Int(3), Value::Int(1)]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            call("Math.max", vec![Value::Int(3), Value::Float(4.5)]).unwrap(),
            Value::Float(4.5)
        );
    }

    #[test]
    fn random_int_stays_in_range() {
        for _ in 0..50 {
            match call("Math.random_int", vec![Value::Int(1), Value::Int(3)]).unwrap() {
                Value::Int(n) => assert!((1..=3).contains(&n)),
                other => panic!("expected Int, got {:?}", other),
            }
        }
        assert!(call("Math.random_int", vec![Value::Int(3), Value::Int(1)]).is_err());
    }

    #[test]
    fn abs_checks_overflow() {
        assert_eq!(call("Int.abs", vec![Value::Int(-4)]).unwrap(), Value::Int(4));
        assert!(call("Int.abs", vec![Value::Int(i64::MIN)]).is_err());
        assert_eq!(call("Float.abs", vec![Value::Float(-1.5)]).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn sqrt_and_pi() {
        assert_eq!(call("Math.sqrt", vec![Value::Int(9)]).unwrap(), Value::Float(3.0));
        assert_eq!(
            call("Math.pi", vec![]).unwrap(),
            Value::Float(std::f64::consts::PI)
        );
        assert_eq!(
            call("Float.to_string", vec![Value::Float(2.0)]).unwrap(),
            Value::String("2.0".into())
        );
    }
}
