//! A compiled program: one flat instruction stream plus metadata.

use ahash::AHashMap;
use indexmap::IndexMap;

use super::instruction::Instruction;

/// Label of the program entry point.
pub const MAIN_LABEL: &str = "__main__";

/// The compiler's output and the VM's input.
///
/// Layout: `__main__`, the top-level code, `Halt`, then every function,
/// method and lambda body behind its own label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytecodeProgram {
    pub instructions: Vec<Instruction>,
    /// Source line of each instruction.
    pub lines: Vec<usize>,
    /// Class name to parent class name.
    pub classes: IndexMap<String, Option<String>>,
    /// Callable user functions (including `Class.method` and `__lambda_N`)
    /// and their parameter counts. Only these can be called by name.
    pub functions: IndexMap<String, usize>,
}

impl BytecodeProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: Instruction, line: usize) {
        self.instructions.push(instruction);
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Label name to instruction index, built by one linear scan. A label
    /// defined twice resolves to its last definition.
    pub fn label_table(&self) -> AHashMap<String, usize> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(index, instruction)| match instruction {
                Instruction::Label(name) => Some((name.clone(), index)),
                _ => None,
            })
            .collect()
    }

    /// The parent of a class, if it has one.
    pub fn parent_of(&self, class: &str) -> Option<&str> {
        self.classes.get(class).and_then(|parent| parent.as_deref())
    }
}
