//! Operators, indexing and member access on runtime values.

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::RuntimeError;

use super::value::Value;

fn invalid_operands(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::InvalidOperands {
        op: op.to_string(),
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    }
}

/// Apply a binary operator. Int/Float mixes promote to Float; integer
/// arithmetic is checked.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    use Value::{Float, Int};

    match op {
        BinaryOp::Equal => return Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => return Ok(Value::Bool(left != right)),
        BinaryOp::And => return Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => return Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            return compare(op, left, right)
        }
        _ => {}
    }

    if let (Value::String(a), Value::String(b), BinaryOp::Add) = (left, right, op) {
        return Ok(Value::String(format!("{}{}", a, b)));
    }

    match (left, right) {
        // A negative exponent leaves the integers.
        (Int(a), Int(b)) if op == BinaryOp::Power && *b < 0 => {
            Ok(Float((*a as f64).powf(*b as f64)))
        }
        (Int(a), Int(b)) => int_arithmetic(op, *a, *b)
            .map(Int)
            .ok_or_else(|| match op {
                BinaryOp::Divide if *b == 0 => RuntimeError::DivisionByZero,
                BinaryOp::Modulo if *b == 0 => RuntimeError::ModuloByZero,
                _ => RuntimeError::IntegerOverflow,
            }),
        (Int(_) | Float(_), Int(_) | Float(_)) => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => float_arithmetic(op, a, b)
                .map(Float)
                .ok_or_else(|| invalid_operands(op, left, right)),
            _ => Err(invalid_operands(op, left, right)),
        },
        _ => Err(invalid_operands(op, left, right)),
    }
}

/// `None` on overflow or a zero divisor.
fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
    match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide => a.checked_div(b),
        BinaryOp::Modulo => a.checked_rem(b),
        BinaryOp::Power => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
        _ => None,
    }
}

/// IEEE semantics: division by zero gives an infinity or NaN.
fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Option<f64> {
    match op {
        BinaryOp::Add => Some(a + b),
        BinaryOp::Subtract => Some(a - b),
        BinaryOp::Multiply => Some(a * b),
        BinaryOp::Divide => Some(a / b),
        BinaryOp::Modulo => Some(a % b),
        BinaryOp::Power => Some(a.powf(b)),
        _ => None,
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => return Err(invalid_operands(op, left, right)),
        },
    };
    // NaN compares false every way.
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        BinaryOp::Less => ordering.is_lt(),
        BinaryOp::LessEqual => ordering.is_le(),
        BinaryOp::Greater => ordering.is_gt(),
        _ => ordering.is_ge(),
    }))
}

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, RuntimeError> {
    match (op, operand) {
        (UnaryOp::Negate, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or(RuntimeError::IntegerOverflow),
        (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (op, value) => Err(RuntimeError::InvalidOperand {
            op: op.to_string(),
            operand: value.type_name().to_string(),
        }),
    }
}

fn list_index(index: i64, length: usize) -> Result<usize, RuntimeError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < length)
        .ok_or(RuntimeError::IndexOutOfBounds { index, length })
}

/// `object[index]`. Missing map keys read as `null`.
pub fn load_index(object: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match (object, index) {
        (Value::List(items), Value::Int(i)) => {
            let items = items.borrow();
            let i = list_index(*i, items.len())?;
            Ok(items[i].clone())
        }
        (Value::String(s), Value::Int(i)) => {
            let length = s.chars().count();
            let i = list_index(*i, length)?;
            Ok(s.chars().nth(i).map(|c| Value::String(c.to_string())).unwrap_or(Value::Null))
        }
        (Value::Map(map), key) => Ok(map.borrow().get(&key.to_key()).cloned().unwrap_or(Value::Null)),
        _ => Err(RuntimeError::type_error(format!(
            "Cannot index {} with {}",
            object.type_name(),
            index.type_name()
        ))),
    }
}

/// `object[index] = value`, in place.
pub fn store_index(object: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match (object, index) {
        (Value::List(items), Value::Int(i)) => {
            let mut items = items.borrow_mut();
            let i = list_index(*i, items.len())?;
            items[i] = value;
            Ok(())
        }
        (Value::Map(map), key) => {
            map.borrow_mut().insert(key.to_key(), value);
            Ok(())
        }
        _ => Err(RuntimeError::type_error(format!(
            "Cannot assign to an index of {} with {}",
            object.type_name(),
            index.type_name()
        ))),
    }
}

/// `object.name`. Only maps (and so instances) have members; a missing one
/// reads as `null`.
pub fn load_member(object: &Value, name: &str) -> Result<Value, RuntimeError> {
    match object {
        Value::Map(map) => Ok(map.borrow().get(name).cloned().unwrap_or(Value::Null)),
        other => Err(RuntimeError::type_error(format!(
            "Cannot access member '{}' on {}",
            name,
            other.type_name()
        ))),
    }
}

pub fn store_member(object: &Value, name: &str, value: Value) -> Result<(), RuntimeError> {
    match object {
        Value::Map(map) => {
            map.borrow_mut().insert(name.to_string(), value);
            Ok(())
        }
        other => Err(RuntimeError::type_error(format!(
            "Cannot set member '{}' on {}",
            name,
            other.type_name()
        ))),
    }
}
