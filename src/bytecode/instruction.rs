//! Bytecode instructions for the Tern VM.

use std::fmt;

use crate::ast::{BinaryOp, UnaryOp};

/// A single bytecode instruction. Jumps and calls refer to labels and
/// functions by name; the VM resolves labels once when a program is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // --- Literals ---
    PushInt(i64),
    PushFloat(f64),
    PushString(String),
    PushBool(bool),
    PushNull,

    // --- Stack manipulation ---
    /// Discard the top value.
    Pop,
    /// Duplicate the top value.
    Dup,

    // --- Variables ---
    /// Push the value bound to a name, searching the scope chain outward.
    Load(String),
    /// Pop a value into the nearest existing binding of a name.
    Store(String),
    /// Pop a value into a new binding in the innermost scope.
    Define(String),

    // --- Collections and objects ---
    /// Pop index and object, push `object[index]`.
    LoadIndex,
    /// Pop value, index and object; `object[index] = value`.
    StoreIndex,
    /// Pop an object, push one of its members.
    LoadMember(String),
    /// Pop value and object; set the member in place.
    StoreMember(String),
    MakeList(usize),
    /// Build a map from `2 * n` stacked values (key, value, key, value...).
    MakeMap(usize),
    /// Tuples are lists at run time.
    MakeTuple(usize),

    // --- Operators ---
    BinOp(BinaryOp),
    UnOp(UnaryOp),

    // --- Calls ---
    /// Call a native or user function by name with `argc` stacked arguments.
    Call(String, usize),
    /// Call a method on the receiver that sits beneath `argc` arguments.
    MethodCall(String, usize),
    /// Pop `argc` arguments and push a new instance of a class.
    New(String, usize),
    Return,

    // --- Control flow ---
    Jump(String),
    /// Pop the condition; jump when it is falsy.
    JumpIfFalse(String),
    /// Pop the condition; jump when it is truthy.
    JumpIfTrue(String),
    Label(String),
    PushScope,
    PopScope,
    Halt,

    // --- Exceptions ---
    /// Register a handler at the label for the code that follows.
    TryBegin(String),
    /// Drop the innermost handler.
    TryEnd,
    /// Pop a value and unwind to the innermost handler.
    Throw,
}

impl Instruction {
    /// The label a jump or handler refers to.
    pub fn target(&self) -> Option<&str> {
        match self {
            Instruction::Jump(label)
            | Instruction::JumpIfFalse(label)
            | Instruction::JumpIfTrue(label)
            | Instruction::TryBegin(label) => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushInt(n) => write!(f, "PUSH_INT      {}", n),
            Instruction::PushFloat(n) => write!(f, "PUSH_FLOAT    {:?}", n),
            Instruction::PushString(s) => write!(f, "PUSH_STRING   {:?}", s),
            Instruction::PushBool(b) => write!(f, "PUSH_BOOL     {}", b),
            Instruction::PushNull => write!(f, "PUSH_NULL"),
            Instruction::Pop => write!(f, "POP"),
            Instruction::Dup => write!(f, "DUP"),
            Instruction::Load(name) => write!(f, "LOAD          {}", name),
            Instruction::Store(name) => write!(f, "STORE         {}", name),
            Instruction::Define(name) => write!(f, "DEFINE        {}", name),
            Instruction::LoadIndex => write!(f, "LOAD_INDEX"),
            Instruction::StoreIndex => write!(f, "STORE_INDEX"),
            Instruction::LoadMember(name) => write!(f, "LOAD_MEMBER   {}", name),
            Instruction::StoreMember(name) => write!(f, "STORE_MEMBER  {}", name),
            Instruction::MakeList(n) => write!(f, "MAKE_LIST     {}", n),
            Instruction::MakeMap(n) => write!(f, "MAKE_MAP      {}", n),
            Instruction::MakeTuple(n) => write!(f, "MAKE_TUPLE    {}", n),
            Instruction::BinOp(op) => write!(f, "BINOP         {}", op),
            Instruction::UnOp(op) => write!(f, "UNOP          {}", op),
            Instruction::Call(name, argc) => write!(f, "CALL          {} ({})", name, argc),
            Instruction::MethodCall(name, argc) => {
                write!(f, "METHOD_CALL   {} ({})", name, argc)
            }
            Instruction::New(class, argc) => write!(f, "NEW           {} ({})", class, argc),
            Instruction::Return => write!(f, "RETURN"),
            Instruction::Jump(label) => write!(f, "JUMP          {}", label),
            Instruction::JumpIfFalse(label) => write!(f, "JUMP_IF_FALSE {}", label),
            Instruction::JumpIfTrue(label) => write!(f, "JUMP_IF_TRUE  {}", label),
            Instruction::Label(label) => write!(f, "{}:", label),
            Instruction::PushScope => write!(f, "PUSH_SCOPE"),
            Instruction::PopScope => write!(f, "POP_SCOPE"),
            Instruction::Halt => write!(f, "HALT"),
            Instruction::TryBegin(label) => write!(f, "TRY_BEGIN     {}", label),
            Instruction::TryEnd => write!(f, "TRY_END"),
            Instruction::Throw => write!(f, "THROW"),
        }
    }
}
