//! Bytecode for the Tern VM.
//!
//! - `instruction`: the instruction set
//! - `program`: a compiled program and its label table
//! - `compiler`: lowers an import-resolved AST to bytecode
//! - `disassembler`: listing output for `tern compile`

pub mod compiler;
mod compiler_classes;
mod compiler_exprs;
mod compiler_stmts;
pub mod disassembler;
pub mod instruction;
pub mod program;

pub use compiler::Compiler;
pub use disassembler::disassemble;
pub use instruction::Instruction;
pub use program::{BytecodeProgram, MAIN_LABEL};

/// Compile an import-resolved program.
pub fn compile(program: &crate::ast::Program) -> BytecodeProgram {
    Compiler::compile(program)
}
