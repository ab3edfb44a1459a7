//! Structured exception handling: TryBegin, TryEnd and Throw.
//!
//! Only values raised by `throw` are catchable. Other runtime errors end
//! the program.

use crate::error::RuntimeError;

use super::value::Value;
use super::vm::{ExceptionHandler, Vm};

impl Vm {
    pub(crate) fn begin_try(&mut self, catch_label: &str) -> Result<(), RuntimeError> {
        let target = self.label(catch_label)?;
        self.handlers.push(ExceptionHandler {
            target,
            stack_height: self.stack.len(),
            frame_depth: self.frames.len(),
            scopes: self.scopes.clone(),
        });
        Ok(())
    }

    pub(crate) fn end_try(&mut self) {
        self.handlers.pop();
    }

    /// Unwind to the innermost handler: drop the frames, stack values and
    /// scopes opened since its `TryBegin`, then jump to the catch code with
    /// the thrown value on the stack.
    pub(crate) fn throw(&mut self, value: Value) -> Result<(), RuntimeError> {
        let Some(handler) = self.handlers.pop() else {
            return Err(RuntimeError::Uncaught(value.to_string()));
        };
        tracing::debug!(
            value = %value,
            unwound_frames = self.frames.len() - handler.frame_depth.min(self.frames.len()),
            "exception caught"
        );

        self.frames.truncate(handler.frame_depth);
        self.stack.truncate(handler.stack_height);
        self.scopes = handler.scopes;
        self.push(value);
        self.ip = handler.target;
        Ok(())
    }
}
