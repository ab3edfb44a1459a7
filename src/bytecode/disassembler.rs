//! Human-readable listing of a compiled program, printed by `tern compile`.

use std::fmt::Write;

use super::instruction::Instruction;
use super::program::BytecodeProgram;

/// Disassemble a whole program.
pub fn disassemble(program: &BytecodeProgram) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "== program: {} instructions, {} functions, {} classes ==",
        program.len(),
        program.functions.len(),
        program.classes.len()
    );

    for (class, parent) in &program.classes {
        match parent {
            Some(parent) => {
                let _ = writeln!(output, "; class {} extends {}", class, parent);
            }
            None => {
                let _ = writeln!(output, "; class {}", class);
            }
        }
    }

    let mut previous_line = None;
    for (offset, instruction) in program.instructions.iter().enumerate() {
        let line = program.lines.get(offset).copied().unwrap_or(0);
        output.push_str(&disassemble_instruction(
            instruction,
            offset,
            line,
            previous_line == Some(line),
        ));
        output.push('\n');
        previous_line = Some(line);
    }

    output
}

/// Disassemble a single instruction. Labels are flush left; repeated
/// source lines are shown as `|`.
pub fn disassemble_instruction(
    instruction: &Instruction,
    offset: usize,
    line: usize,
    same_line: bool,
) -> String {
    let line_str = if same_line {
        "   |".to_string()
    } else {
        format!("{:4}", line)
    };
    match instruction {
        Instruction::Label(_) => format!("{:04} {} {}", offset, line_str, instruction),
        _ => format!("{:04} {}     {}", offset, line_str, instruction),
    }
}
