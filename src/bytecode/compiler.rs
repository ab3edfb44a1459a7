//! AST-to-bytecode compiler.
//!
//! Lowers an import-resolved program into one flat instruction stream. Top
//! level code goes under `__main__`; every function, method and lambda body
//! is compiled once behind its own label and appended after the main code.
//! Variables stay named: the VM resolves them on its scope chain.

use std::collections::{HashMap, HashSet};

use crate::ast::{Parameter, Program, Stmt, StmtKind};
use crate::types::checker::{is_builtin_namespaced, BUILTIN_FUNCTIONS};

use super::instruction::Instruction;
use super::program::{BytecodeProgram, MAIN_LABEL};

/// Natives the VM implements itself because they need the machine state.
pub const INTRINSICS: &[&str] = &["System.call", "System.exit"];

/// Code emitted for one body, with the source line of each instruction.
type Code = Vec<(Instruction, usize)>;

/// Targets for `break` and `continue` in the innermost loop.
#[derive(Debug, Clone)]
pub(crate) struct LoopContext {
    pub continue_label: String,
    pub break_label: String,
    /// Scope depth outside the per-iteration scope.
    pub scope_depth: usize,
    /// Open `try` blocks outside the loop.
    pub try_depth: usize,
}

/// Per-body state, saved and restored around nested function bodies.
#[derive(Debug, Default)]
pub(crate) struct FunctionContext {
    /// Names declared in each open block, innermost last.
    pub locals: Vec<HashSet<String>>,
    pub loops: Vec<LoopContext>,
    pub scope_depth: usize,
    pub try_depth: usize,
    /// Enclosing class when compiling a method.
    pub class: Option<String>,
}

/// The compiler: transforms an AST into a `BytecodeProgram`.
pub struct Compiler {
    pub(crate) code: Code,
    /// Finished function bodies, in compilation order.
    pub(crate) bodies: Vec<Code>,
    pub(crate) program: BytecodeProgram,
    pub(crate) ctx: FunctionContext,
    /// Top-level variables and constants (possibly dotted after flattening).
    pub(crate) globals: HashSet<String>,
    /// Methods declared directly in each class.
    pub(crate) class_methods: HashMap<String, HashSet<String>>,
    label_counter: usize,
    lambda_counter: usize,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            bodies: Vec::new(),
            program: BytecodeProgram::new(),
            ctx: FunctionContext::default(),
            globals: HashSet::new(),
            class_methods: HashMap::new(),
            label_counter: 0,
            lambda_counter: 0,
        }
    }

    /// Compile a full program.
    pub fn compile(program: &Program) -> BytecodeProgram {
        let mut compiler = Compiler::new();
        compiler.collect_declarations(&program.statements, true);

        compiler.emit(Instruction::Label(MAIN_LABEL.to_string()), 0);
        for stmt in &program.statements {
            compiler.compile_stmt(stmt);
        }
        let last_line = program.statements.last().map(|s| s.span.line).unwrap_or(0);
        compiler.emit(Instruction::Halt, last_line);

        compiler.finish()
    }

    fn finish(mut self) -> BytecodeProgram {
        let main = std::mem::take(&mut self.code);
        for (instruction, line) in main.into_iter().chain(self.bodies.into_iter().flatten()) {
            self.program.push(instruction, line);
        }
        tracing::debug!(
            instructions = self.program.len(),
            functions = self.program.functions.len(),
            classes = self.program.classes.len(),
            "compilation complete"
        );
        self.program
    }

    /// Register every function, method, class and global up front so that
    /// calls can be lowered before the callee's declaration is reached.
    fn collect_declarations(&mut self, statements: &[Stmt], top_level: bool) {
        for stmt in statements {
            match &stmt.kind {
                StmtKind::VarDecl { name, .. } if top_level => {
                    self.globals.insert(name.clone());
                }
                StmtKind::Function(decl) => {
                    self.program
                        .functions
                        .insert(decl.name.clone(), decl.params.len());
                    self.collect_declarations(&decl.body, false);
                }
                StmtKind::Class(decl) => {
                    self.program
                        .classes
                        .insert(decl.name.clone(), decl.superclass.clone());
                    let methods = self.class_methods.entry(decl.name.clone()).or_default();
                    for method in &decl.methods {
                        methods.insert(method.name.clone());
                    }
                    for method in &decl.methods {
                        self.program.functions.insert(
                            format!("{}.{}", decl.name, method.name),
                            method.params.len(),
                        );
                        self.collect_declarations(&method.body, false);
                    }
                }
                StmtKind::Module(decl) => self.collect_declarations(&decl.body, top_level),
                StmtKind::Export(inner) => {
                    self.collect_declarations(std::slice::from_ref(inner.as_ref()), top_level)
                }
                StmtKind::Block(body) | StmtKind::While { body, .. } => {
                    self.collect_declarations(body, false)
                }
                StmtKind::ForEach { body, .. } | StmtKind::ForRange { body, .. } => {
                    self.collect_declarations(body, false)
                }
                StmtKind::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    self.collect_declarations(then_branch, false);
                    if let Some(else_branch) = else_branch {
                        self.collect_declarations(else_branch, false);
                    }
                }
                StmtKind::Try {
                    body,
                    catch_block,
                    finally_block,
                    ..
                } => {
                    self.collect_declarations(body, false);
                    for block in [catch_block, finally_block].into_iter().flatten() {
                        self.collect_declarations(block, false);
                    }
                }
                _ => {}
            }
        }
    }

    // --- Emission helpers ---

    pub(crate) fn emit(&mut self, instruction: Instruction, line: usize) {
        self.code.push((instruction, line));
    }

    /// A label name unique within the program.
    pub(crate) fn fresh_label(&mut self, kind: &str) -> String {
        self.label_counter += 1;
        format!("__{}_{}", kind, self.label_counter)
    }

    pub(crate) fn begin_scope(&mut self, line: usize) {
        self.emit(Instruction::PushScope, line);
        self.ctx.scope_depth += 1;
        self.ctx.locals.push(HashSet::new());
    }

    pub(crate) fn end_scope(&mut self, line: usize) {
        self.emit(Instruction::PopScope, line);
        self.ctx.scope_depth -= 1;
        self.ctx.locals.pop();
    }

    pub(crate) fn declare_local(&mut self, name: &str) {
        if let Some(scope) = self.ctx.locals.last_mut() {
            scope.insert(name.to_string());
        }
    }

    pub(crate) fn is_local(&self, name: &str) -> bool {
        self.ctx.locals.iter().any(|scope| scope.contains(name))
    }

    /// True when `name` is bound to a value at run time in the current body.
    pub(crate) fn is_variable(&self, name: &str) -> bool {
        self.is_local(name) || self.globals.contains(name)
    }

    /// True when a call to `name` should go through `Call` rather than be
    /// turned into a method call on a dotted receiver.
    pub(crate) fn is_callable_name(&self, name: &str) -> bool {
        self.program.functions.contains_key(name)
            || BUILTIN_FUNCTIONS.contains(&name)
            || INTRINSICS.contains(&name)
            || is_builtin_namespaced(name)
            || self.is_variable(name)
    }

    /// Inside a method, a bare call to a method of the enclosing class (or
    /// one of its ancestors) targets `this`.
    pub(crate) fn is_sibling_method(&self, name: &str) -> bool {
        let Some(class) = self.ctx.class.as_deref() else {
            return false;
        };
        if self.is_callable_name(name) {
            return false;
        }
        let mut current = Some(class.to_string());
        let mut steps = 0;
        while let Some(class) = current {
            if steps > 64 {
                break;
            }
            if self
                .class_methods
                .get(&class)
                .is_some_and(|methods| methods.contains(name))
            {
                return true;
            }
            current = self.program.parent_of(&class).map(str::to_string);
            steps += 1;
        }
        false
    }

    /// Compile a function, method or lambda body behind `label`.
    ///
    /// Arguments arrive on the stack in push order, so the prologue defines
    /// parameters last-first; a method's receiver sits beneath them and is
    /// bound to `this` last.
    pub(crate) fn compile_function(
        &mut self,
        label: &str,
        params: &[Parameter],
        body: &[Stmt],
        class: Option<&str>,
        line: usize,
    ) {
        let saved_code = std::mem::take(&mut self.code);
        let saved_ctx = std::mem::replace(
            &mut self.ctx,
            FunctionContext {
                class: class.map(str::to_string),
                ..FunctionContext::default()
            },
        );

        self.emit(Instruction::Label(label.to_string()), line);
        let mut locals: HashSet<String> = HashSet::new();
        for param in params.iter().rev() {
            self.emit(Instruction::Define(param.name.clone()), param.span.line);
            locals.insert(param.name.clone());
        }
        if class.is_some() {
            self.emit(Instruction::Define("this".to_string()), line);
            locals.insert("this".to_string());
        }
        self.ctx.locals.push(locals);

        for stmt in body {
            self.compile_stmt(stmt);
        }
        let end_line = body.last().map(|s| s.span.line).unwrap_or(line);
        self.emit(Instruction::PushNull, end_line);
        self.emit(Instruction::Return, end_line);

        let finished = std::mem::replace(&mut self.code, saved_code);
        self.bodies.push(finished);
        self.ctx = saved_ctx;
    }

    /// Register and compile a lambda; returns its hidden label.
    pub(crate) fn compile_lambda(
        &mut self,
        params: &[Parameter],
        body: &[Stmt],
        line: usize,
    ) -> String {
        let label = format!("__lambda_{}", self.lambda_counter);
        self.lambda_counter += 1;
        self.program.functions.insert(label.clone(), params.len());
        self.compile_function(&label, params, body, None, line);
        label
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse_source;

    fn compile(source: &str) -> BytecodeProgram {
        Compiler::compile(&parse_source(source).unwrap())
    }

    fn main_code(program: &BytecodeProgram) -> Vec<Instruction> {
        program
            .instructions
            .iter()
            .take_while(|i| **i != Instruction::Halt)
            .cloned()
            .collect()
    }

    fn body_of(program: &BytecodeProgram, label: &str) -> Vec<Instruction> {
        let start = program
            .instructions
            .iter()
            .position(|i| *i == Instruction::Label(label.to_string()))
            .unwrap();
        let end = program.instructions[start..]
            .iter()
            .position(|i| *i == Instruction::Return)
            .unwrap();
        program.instructions[start..=start + end].to_vec()
    }

    #[test]
    fn main_comes_first_and_bodies_follow_halt() {
        let program = compile("function f()\n return 1\nend function\nprint(f())");
        assert_eq!(program.instructions[0], Instruction::Label(MAIN_LABEL.into()));
        let halt = program
            .instructions
            .iter()
            .position(|i| *i == Instruction::Halt)
            .unwrap();
        let f = program
            .instructions
            .iter()
            .position(|i| *i == Instruction::Label("f".into()))
            .unwrap();
        assert!(f > halt);
        assert_eq!(program.functions.get("f"), Some(&0));
    }

    #[test]
    fn parameters_are_defined_in_reverse() {
        let program = compile("function add(a, b)\n return a + b\nend function");
        assert_eq!(
            body_of(&program, "add")[..3],
            [
                Instruction::Label("add".into()),
                Instruction::Define("b".into()),
                Instruction::Define("a".into()),
            ]
        );
    }

    #[test]
    fn methods_bind_this_after_parameters() {
        let program = compile("class P\n function move(dx)\n this.x = dx\n end function\nend class");
        let body = body_of(&program, "P.move");
        assert_eq!(body[1], Instruction::Define("dx".into()));
        assert_eq!(body[2], Instruction::Define("this".into()));
        assert!(body.contains(&Instruction::StoreMember("x".into())));
        assert_eq!(program.classes.get("P"), Some(&None));
    }

    #[test]
    fn every_body_ends_with_null_return() {
        let program = compile("function f()\nend function");
        assert_eq!(
            body_of(&program, "f"),
            vec![
                Instruction::Label("f".into()),
                Instruction::PushNull,
                Instruction::Return,
            ]
        );
    }

    #[test]
    fn declarations_define_in_innermost_scope() {
        let program = compile("var x = 10\nx = x - 1");
        assert_eq!(
            main_code(&program),
            vec![
                Instruction::Label(MAIN_LABEL.into()),
                Instruction::PushInt(10),
                Instruction::Define("x".into()),
                Instruction::Load("x".into()),
                Instruction::PushInt(1),
                Instruction::BinOp(crate::ast::BinaryOp::Subtract),
                Instruction::Store("x".into()),
            ]
        );
    }

    #[test]
    fn lambdas_get_hidden_labels() {
        let program = compile("var f = fn(x) => x * 2\nvar g = fn(y) => y");
        assert!(main_code(&program).contains(&Instruction::PushString("__lambda_0".into())));
        assert!(main_code(&program).contains(&Instruction::PushString("__lambda_1".into())));
        assert_eq!(program.functions.get("__lambda_0"), Some(&1));
    }

    #[test]
    fn sibling_method_calls_target_this() {
        let source = r#"
            class Counter
                function bump()
                    this.n = this.n + 1
                end function
                function twice()
                    bump()
                    bump()
                end function
            end class
        "#;
        let program = compile(source);
        let body = body_of(&program, "Counter.twice");
        assert_eq!(
            body[2..4],
            [
                Instruction::Load("this".into()),
                Instruction::MethodCall("bump".into(), 0),
            ]
        );
    }
}
