//! Stack-based virtual machine for Tern bytecode.
//!
//! Variables live in a chain of named scopes (global first); calls save the
//! caller's chain in a frame and start the callee on `[global, fresh]`.
//! Instances are maps tagged with `__type__`, and all side effects go
//! through natives.

pub mod natives;
pub mod value;
#[allow(clippy::module_inception)]
pub mod vm;
mod vm_calls;
mod vm_classes;
mod vm_exceptions;
pub mod vm_ops;

#[cfg(test)]
mod tests;

pub use natives::{Arity, Native, NativeContext, NativeFn, NativeRegistry};
pub use value::{Value, TYPE_KEY};
pub use vm::{CallFrame, CaptureOutput, ExceptionHandler, Vm, MAX_FRAMES};
