//! `System.*` and `File.*` natives.
//!
//! `System.call` and `System.exit` need the machine itself and are handled
//! by the VM.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::vm::value::Value;

use super::{int_arg, string_arg, Arity, NativeRegistry};

pub fn register(registry: &mut NativeRegistry) {
    // Seconds since the Unix epoch.
    registry.register("System.time", Arity::Exact(0), |_, _| {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| e.to_string())?;
        Ok(Value::Float(elapsed.as_secs_f64()))
    });

    registry.register("System.now", Arity::Exact(0), |_, _| {
        Ok(Value::String(chrono::Utc::now().to_rfc3339()))
    });

    registry.register("System.sleep", Arity::Exact(1), |_, args| {
        let millis = int_arg(args, 0)?;
        let millis = u64::try_from(millis).map_err(|_| format!("negative duration {}", millis))?;
        thread::sleep(Duration::from_millis(millis));
        Ok(Value::Null)
    });

    // `null` when unset.
    registry.register("System.env", Arity::Exact(1), |_, args| {
        Ok(std::env::var(string_arg(args, 0)?)
            .map(Value::String)
            .unwrap_or(Value::Null))
    });

    registry.register("System.args", Arity::Exact(0), |ctx, _| {
        Ok(Value::list(
            ctx.args.iter().map(|a| Value::String(a.clone())).collect(),
        ))
    });

    registry.register("File.read", Arity::Exact(1), |_, args| {
        let path = string_arg(args, 0)?;
        fs::read_to_string(path)
            .map(Value::String)
            .map_err(|e| format!("cannot read {}: {}", path, e))
    });

    // Replaces the file's contents.
    registry.register("File.write", Arity::Exact(2), |_, args| {
        let path = string_arg(args, 0)?;
        let content = match &args[1] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        fs::write(path, content).map_err(|e| format!("cannot write {}: {}", path, e))?;
        Ok(Value::Null)
    });

    registry.register("File.exists", Arity::Exact(1), |_, args| {
        Ok(Value::Bool(Path::new(string_arg(args, 0)?).exists()))
    });
}
