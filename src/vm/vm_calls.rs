//! Function calls, returns and the VM intrinsics.

use crate::error::RuntimeError;
use crate::types::checker::is_builtin_namespaced;

use super::natives::{Native, NativeContext};
use super::value::Value;
use super::vm::{new_scope, CallFrame, Vm, MAX_FRAMES};

impl Vm {
    /// `Call(name, argc)`. Resolution order: intrinsics, natives, user
    /// functions, then a variable holding a function name.
    pub(crate) fn call(&mut self, name: &str, argc: usize) -> Result<(), RuntimeError> {
        tracing::trace!(function = name, argc, depth = self.frames.len(), "call");

        match name {
            "System.call" => return self.call_by_name(argc),
            "System.exit" => return self.exit(argc),
            _ => {}
        }

        if let Some(native) = self.natives.get(name).copied() {
            return self.call_native(&native, argc);
        }

        if self.program.functions.contains_key(name) {
            return self.call_function(name, argc, false);
        }

        if let Some(Value::String(target)) = self.lookup(name) {
            if self.program.functions.contains_key(&target) {
                return self.call_function(&target, argc, false);
            }
        }

        if is_builtin_namespaced(name) {
            Err(RuntimeError::UnknownNative(name.to_string()))
        } else {
            Err(RuntimeError::FunctionNotFound(name.to_string()))
        }
    }

    /// Pop `argc` arguments, run the native and push its result.
    pub(crate) fn call_native(&mut self, native: &Native, argc: usize) -> Result<(), RuntimeError> {
        let args = self.pop_n(argc)?;
        let mut ctx = NativeContext {
            out: &mut *self.out,
            input: &mut *self.input,
            args: &self.args,
        };
        let result = native.invoke(&mut ctx, &args)?;
        self.push(result);
        Ok(())
    }

    /// Enter a compiled function. The arguments (and, for a method, the
    /// receiver beneath them) stay on the stack for the callee's prologue.
    pub(crate) fn call_function(
        &mut self,
        label: &str,
        argc: usize,
        is_method: bool,
    ) -> Result<(), RuntimeError> {
        if let Some(&arity) = self.program.functions.get(label) {
            if arity != argc {
                return Err(RuntimeError::WrongArity {
                    name: label.to_string(),
                    expected: arity.to_string(),
                    got: argc,
                });
            }
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::StackOverflow(MAX_FRAMES));
        }

        let target = self.label(label)?;
        let stack_base = self
            .stack
            .len()
            .checked_sub(argc + usize::from(is_method))
            .ok_or(RuntimeError::StackUnderflow)?;

        let callee_scopes = vec![self.globals.clone(), new_scope()];
        let scopes = std::mem::replace(&mut self.scopes, callee_scopes);
        self.frames.push(CallFrame {
            return_ip: self.ip,
            scopes,
            stack_base,
            function: label.to_string(),
        });
        self.ip = target;
        Ok(())
    }

    /// `Return`: restore the caller and push the return value. Returning
    /// with no caller halts the machine.
    pub(crate) fn return_from_call(&mut self) -> Result<(), RuntimeError> {
        let value = self.pop()?;
        let Some(frame) = self.frames.pop() else {
            self.halted = true;
            return Ok(());
        };
        tracing::trace!(function = %frame.function, "return");

        self.stack.truncate(frame.stack_base);
        let depth = self.frames.len();
        self.handlers.retain(|handler| handler.frame_depth <= depth);
        self.scopes = frame.scopes;
        self.ip = frame.return_ip;
        self.push(value);
        Ok(())
    }

    /// `System.call(name, args...)`: call a user function chosen at run
    /// time. Only compiled functions are reachable this way.
    fn call_by_name(&mut self, argc: usize) -> Result<(), RuntimeError> {
        if argc == 0 {
            return Err(RuntimeError::WrongArity {
                name: "System.call".to_string(),
                expected: "at least 1".to_string(),
                got: 0,
            });
        }
        let mut args = self.pop_n(argc)?;
        let name = match args.remove(0) {
            Value::String(name) => name,
            other => {
                return Err(RuntimeError::native(
                    "System.call",
                    format!("expects String function name, got {}", other.type_name()),
                ))
            }
        };
        if !self.program.functions.contains_key(&name) {
            return Err(RuntimeError::FunctionNotFound(name));
        }
        let argc = args.len();
        self.stack.extend(args);
        self.call_function(&name, argc, false)
    }

    /// `System.exit([code])`: stop with an exit status.
    fn exit(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let code = match self.pop_n(argc)?.as_slice() {
            [] => 0,
            [Value::Int(code)] => i32::try_from(*code).map_err(|_| {
                RuntimeError::native("System.exit", format!("exit code {} out of range", code))
            })?,
            [other] => {
                return Err(RuntimeError::native(
                    "System.exit",
                    format!("expects Int, got {}", other.type_name()),
                ))
            }
            args => {
                return Err(RuntimeError::WrongArity {
                    name: "System.exit".to_string(),
                    expected: "0 to 1".to_string(),
                    got: args.len(),
                })
            }
        };
        tracing::debug!(code, "System.exit");
        self.exit_code = code;
        self.halted = true;
        self.push(Value::Null);
        Ok(())
    }
}
