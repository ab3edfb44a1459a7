//! The bytecode virtual machine: stack-based execution engine.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::bytecode::{BytecodeProgram, Instruction, MAIN_LABEL};
use crate::error::RuntimeError;

use super::natives::NativeRegistry;
use super::value::Value;
use super::vm_ops;

/// Deepest call nesting before the VM reports a stack overflow.
pub const MAX_FRAMES: usize = 10_000;

/// One lexical scope: variable name to value.
pub type ScopeRef = Rc<RefCell<IndexMap<String, Value>>>;

pub(crate) fn new_scope() -> ScopeRef {
    Rc::new(RefCell::new(IndexMap::new()))
}

/// A call frame on the VM call stack.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Instruction to resume at in the caller.
    pub return_ip: usize,
    /// The caller's scope chain.
    pub scopes: Vec<ScopeRef>,
    /// Stack height below the callee's arguments (and receiver).
    pub stack_base: usize,
    pub function: String,
}

/// A handler pushed by `TryBegin`.
#[derive(Debug, Clone)]
pub struct ExceptionHandler {
    /// Index of the catch label.
    pub target: usize,
    /// Stack height when TryBegin was executed.
    pub stack_height: usize,
    /// Call frame depth when TryBegin was executed.
    pub frame_depth: usize,
    /// Scope chain when TryBegin was executed.
    pub scopes: Vec<ScopeRef>,
}

/// The bytecode VM.
pub struct Vm {
    pub(crate) program: Rc<BytecodeProgram>,
    labels: AHashMap<String, usize>,
    /// Operand stack.
    pub(crate) stack: Vec<Value>,
    /// Current scope chain, innermost last. Index 0 is the global scope.
    pub(crate) scopes: Vec<ScopeRef>,
    pub(crate) globals: ScopeRef,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) handlers: Vec<ExceptionHandler>,
    pub(crate) natives: NativeRegistry,
    pub(crate) ip: usize,
    pub(crate) halted: bool,
    pub(crate) exit_code: i32,
    pub(crate) out: Box<dyn Write>,
    pub(crate) input: Box<dyn BufRead>,
    pub(crate) args: Vec<String>,
}

impl Vm {
    /// A VM for `program`, writing to stdout and reading from stdin.
    pub fn new(program: BytecodeProgram) -> Self {
        let globals = new_scope();
        let mut vm = Self {
            program: Rc::new(BytecodeProgram::new()),
            labels: AHashMap::new(),
            stack: Vec::with_capacity(256),
            scopes: vec![globals.clone()],
            globals,
            frames: Vec::with_capacity(64),
            handlers: Vec::new(),
            natives: NativeRegistry::with_defaults(),
            ip: 0,
            halted: false,
            exit_code: 0,
            out: Box::new(io::stdout()),
            input: Box::new(io::BufReader::new(io::stdin())),
            args: Vec::new(),
        };
        vm.load(program);
        vm
    }

    /// Send program output to `out` instead of stdout.
    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    /// Read `input()` lines from `input` instead of stdin.
    pub fn with_input(mut self, input: impl BufRead + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    /// Script arguments returned by `System.args`.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Register extra natives.
    pub fn natives_mut(&mut self) -> &mut NativeRegistry {
        &mut self.natives
    }

    /// Replace the program, keeping global variables. Labels are resolved
    /// here, once.
    pub fn load(&mut self, program: BytecodeProgram) {
        self.labels = program.label_table();
        self.program = Rc::new(program);
        self.stack.clear();
        self.frames.clear();
        self.handlers.clear();
        self.scopes = vec![self.globals.clone()];
        self.halted = false;
        self.exit_code = 0;
    }

    /// Run the loaded program from `__main__`. Returns the exit status set
    /// by `System.exit`, or 0.
    pub fn run(&mut self) -> Result<i32, RuntimeError> {
        self.ip = self.labels.get(MAIN_LABEL).copied().unwrap_or(0);
        self.halted = false;
        let program = Rc::clone(&self.program);

        while !self.halted && self.ip < program.instructions.len() {
            let ip = self.ip;
            self.ip += 1;
            if let Err(err) = self.execute(&program.instructions[ip]) {
                let line = program.lines.get(ip).copied().unwrap_or(0);
                tracing::debug!(ip, line, error = %err, "runtime error");
                let _ = self.out.flush();
                return Err(err);
            }
        }

        let _ = self.out.flush();
        tracing::debug!(exit_code = self.exit_code, "vm halted");
        Ok(self.exit_code)
    }

    /// The value of a global variable.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    pub fn globals(&self) -> Vec<String> {
        self.globals.borrow().keys().cloned().collect()
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<(), RuntimeError> {
        match instruction {
            Instruction::PushInt(n) => self.push(Value::Int(*n)),
            Instruction::PushFloat(n) => self.push(Value::Float(*n)),
            Instruction::PushString(s) => self.push(Value::String(s.clone())),
            Instruction::PushBool(b) => self.push(Value::Bool(*b)),
            Instruction::PushNull => self.push(Value::Null),

            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Dup => {
                let top = self.peek(0)?.clone();
                self.push(top);
            }

            Instruction::Load(name) => {
                let value = self
                    .lookup(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
                self.push(value);
            }
            Instruction::Store(name) => {
                let value = self.pop()?;
                self.assign(name, value)?;
            }
            Instruction::Define(name) => {
                let value = self.pop()?;
                self.define(name, value);
            }

            Instruction::LoadIndex => {
                let index = self.pop()?;
                let object = self.pop()?;
                self.push(vm_ops::load_index(&object, &index)?);
            }
            Instruction::StoreIndex => {
                let value = self.pop()?;
                let index = self.pop()?;
                let object = self.pop()?;
                vm_ops::store_index(&object, &index, value)?;
            }
            Instruction::LoadMember(name) => {
                let object = self.pop()?;
                self.push(vm_ops::load_member(&object, name)?);
            }
            Instruction::StoreMember(name) => {
                let value = self.pop()?;
                let object = self.pop()?;
                vm_ops::store_member(&object, name, value)?;
            }
            Instruction::MakeList(n) | Instruction::MakeTuple(n) => {
                let items = self.pop_n(*n)?;
                self.push(Value::list(items));
            }
            Instruction::MakeMap(n) => {
                let flat = self.pop_n(n * 2)?;
                let mut entries = IndexMap::with_capacity(*n);
                let mut iter = flat.into_iter();
                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    entries.insert(key.to_key(), value);
                }
                self.push(Value::map(entries));
            }

            Instruction::BinOp(op) => {
                let right = self.pop()?;
                let left = self.pop()?;
                self.push(vm_ops::binary(*op, &left, &right)?);
            }
            Instruction::UnOp(op) => {
                let operand = self.pop()?;
                self.push(vm_ops::unary(*op, &operand)?);
            }

            Instruction::Call(name, argc) => self.call(name, *argc)?,
            Instruction::MethodCall(name, argc) => self.call_method(name, *argc)?,
            Instruction::New(class, argc) => self.instantiate(class, *argc)?,
            Instruction::Return => self.return_from_call()?,

            Instruction::Jump(label) => self.ip = self.label(label)?,
            Instruction::JumpIfFalse(label) => {
                if !self.pop()?.is_truthy() {
                    self.ip = self.label(label)?;
                }
            }
            Instruction::JumpIfTrue(label) => {
                if self.pop()?.is_truthy() {
                    self.ip = self.label(label)?;
                }
            }
            Instruction::Label(_) => {}
            Instruction::PushScope => self.scopes.push(new_scope()),
            Instruction::PopScope => {
                if self.scopes.len() > 1 {
                    self.scopes.pop();
                }
            }
            Instruction::Halt => self.halted = true,

            Instruction::TryBegin(label) => self.begin_try(label)?,
            Instruction::TryEnd => self.end_try(),
            Instruction::Throw => {
                let value = self.pop()?;
                self.throw(value)?;
            }
        }
        Ok(())
    }

    // --- Stack ---

    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// The value `depth` slots below the top.
    pub(crate) fn peek(&self, depth: usize) -> Result<&Value, RuntimeError> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .map(|i| &self.stack[i])
            .ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop `n` values, returned in push order.
    pub(crate) fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        let start = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or(RuntimeError::StackUnderflow)?;
        Ok(self.stack.split_off(start))
    }

    // --- Scopes ---

    pub(crate) fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.borrow().get(name).cloned())
    }

    /// Update the nearest existing binding.
    fn assign(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        for scope in self.scopes.iter().rev() {
            if let Some(slot) = scope.borrow_mut().get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// Bind in the innermost scope, replacing any binding there.
    fn define(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last() {
            scope.borrow_mut().insert(name.to_string(), value);
        }
    }

    pub(crate) fn label(&self, name: &str) -> Result<usize, RuntimeError> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UndefinedLabel(name.to_string()))
    }
}

/// A cloneable in-memory output sink, for capturing program output.
#[derive(Debug, Clone, Default)]
pub struct CaptureOutput(Rc<RefCell<Vec<u8>>>);

impl CaptureOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for CaptureOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
