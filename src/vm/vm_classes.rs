//! Instances and method dispatch.
//!
//! An instance is a map tagged with `__type__`. Method calls on an instance
//! go to the compiled label `Class.method`, walking up the parent chain on
//! a miss. Method calls on lists, strings, numbers and plain maps are
//! redirected to the natives of their type with the receiver as the first
//! argument.

use crate::error::RuntimeError;

use super::value::Value;
use super::vm::Vm;

impl Vm {
    /// `MethodCall(method, argc)`. The receiver sits beneath the arguments.
    pub(crate) fn call_method(&mut self, method: &str, argc: usize) -> Result<(), RuntimeError> {
        let receiver = self.peek(argc)?;
        let type_name = match receiver {
            Value::Map(_) => match receiver.class_name() {
                Some(class) => return self.dispatch_instance(&class, method, argc),
                None => "Map",
            },
            Value::List(_) | Value::String(_) | Value::Int(_) | Value::Float(_) => {
                receiver.type_name()
            }
            Value::Bool(_) | Value::Null => {
                return Err(RuntimeError::InvalidReceiver {
                    method: method.to_string(),
                    type_name: receiver.type_name().to_string(),
                })
            }
        };

        let name = format!("{}.{}", type_name, method);
        match self.natives.get(&name).copied() {
            Some(native) => self.call_native(&native, argc + 1),
            None => Err(RuntimeError::MethodNotFound {
                class: type_name.to_string(),
                method: method.to_string(),
            }),
        }
    }

    fn dispatch_instance(&mut self, class: &str, method: &str, argc: usize) -> Result<(), RuntimeError> {
        let label = self
            .resolve_method(class, method)
            .ok_or_else(|| RuntimeError::MethodNotFound {
                class: class.to_string(),
                method: method.to_string(),
            })?;
        self.call_function(&label, argc, true)
    }

    /// The label implementing `method` for `class`: its own, or the nearest
    /// ancestor's.
    pub fn resolve_method(&self, class: &str, method: &str) -> Option<String> {
        let mut current = Some(class.to_string());
        // Bounded by the number of classes, so a cyclic chain terminates.
        for _ in 0..=self.program.classes.len() {
            let class = current?;
            let label = format!("{}.{}", class, method);
            if self.program.functions.contains_key(&label) {
                return Some(label);
            }
            current = self.program.parent_of(&class).map(str::to_string);
        }
        None
    }

    /// `New(class, argc)`: a fresh instance holding only its type tag. The
    /// arguments are evaluated for their effects and discarded; no
    /// constructor runs.
    pub(crate) fn instantiate(&mut self, class: &str, argc: usize) -> Result<(), RuntimeError> {
        self.pop_n(argc)?;
        if !self.program.classes.contains_key(class) {
            return Err(RuntimeError::type_error(format!("Unknown class: {}", class)));
        }
        self.push(Value::instance(class));
        Ok(())
    }
}
