//! `Json.parse` and `Json.stringify`.

use indexmap::IndexMap;

use crate::vm::value::Value;

use super::{string_arg, Arity, NativeRegistry};

pub fn register(registry: &mut NativeRegistry) {
    registry.register("Json.parse", Arity::Exact(1), |_, args| {
        let text = string_arg(args, 0)?;
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))?;
        Ok(json_to_value(json))
    });

    registry.register("Json.stringify", Arity::Exact(1), |_, args| {
        let json = value_to_json(&args[0], 0)?;
        serde_json::to_string(&json)
            .map(Value::String)
            .map_err(|e| e.to_string())
    });
}

/// Lists and maps nested deeper than this are assumed to be cyclic.
const MAX_DEPTH: usize = 256;

pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::list(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(entries) => Value::map(
            entries
                .into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect::<IndexMap<_, _>>(),
        ),
    }
}

/// Non-finite floats become `null`.
pub fn value_to_json(value: &Value, depth: usize) -> Result<serde_json::Value, String> {
    if depth > MAX_DEPTH {
        return Err("value is nested too deeply (cyclic?)".to_string());
    }
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Float(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(
            items
                .borrow()
                .iter()
                .map(|item| value_to_json(item, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        Value::Map(map) => serde_json::Value::Object(
            map.borrow()
                .iter()
                .map(|(k, v)| Ok((k.clone(), value_to_json(v, depth + 1)?)))
                .collect::<Result<_, String>>()?,
        ),
    })
}
